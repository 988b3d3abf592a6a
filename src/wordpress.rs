use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::WordPressConfig;
use crate::error::{Error, Result};
use crate::types::{MediaReference, PublishedPost};

/// Yoast SEO の meta description カスタムフィールド
pub const YOAST_META_DESCRIPTION_KEY: &str = "_yoast_wpseo_metadesc";

#[derive(Debug, Clone)]
pub struct WordPressClient {
    client: Client,
    base_url: String,
    authorization: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostMeta {
    #[serde(rename = "_yoast_wpseo_metadesc")]
    pub meta_description: Option<String>,
}

/// `POST /posts` に送る投稿データ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
    pub meta: PostMeta,
}

impl PostDraft {
    /// 公開状態の投稿を作成
    pub fn publish(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            status: PostStatus::Publish,
            categories: None,
            featured_media: None,
            meta: PostMeta {
                meta_description: None,
            },
        }
    }

    /// カテゴリーを設定（空リストは送信しない）
    pub fn with_categories(mut self, category_ids: &[u64]) -> Self {
        self.categories = (!category_ids.is_empty()).then(|| category_ids.to_vec());
        self
    }

    /// アイキャッチ画像を設定（0 は未設定扱い）
    pub fn with_featured_media(mut self, media: Option<MediaReference>) -> Self {
        self.featured_media = media.map(|m| m.id).filter(|id| *id != 0);
        self
    }

    pub fn with_meta_description(mut self, meta_description: impl Into<String>) -> Self {
        self.meta.meta_description = Some(meta_description.into());
        self
    }
}

/// WordPress が返すメディア / 投稿の最小限のフィールド
#[derive(Debug, Deserialize)]
struct CreatedEntity {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
}

impl WordPressClient {
    pub fn new(config: &WordPressConfig) -> Result<Self> {
        let app_key = config
            .get_app_key()
            .ok_or_else(|| Error::Config("WP_APP_KEY is not set".to_string()))?;

        // タイムアウト設定付きのHTTPクライアントを作成
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent("autopost-rs/0.3")
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization: basic_authorization(app_key),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, &self.authorization)
    }

    /// 2xx 以外はレスポンス本文ごとエラーにする
    async fn read_success(response: Response) -> Result<CreatedEntity> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::WordPress {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Upload an image to the media library.
    ///
    /// Failures are logged (with the WordPress response body when there is
    /// one) and reported as `None`.
    pub async fn upload_media(
        &self,
        image_path: &Path,
        title: &str,
        alt_text: &str,
    ) -> Option<MediaReference> {
        if !image_path.exists() {
            error!("Image file does not exist: {}", image_path.display());
            return None;
        }

        match self.try_upload_media(image_path, title, alt_text).await {
            Ok(media) => {
                info!("Image uploaded successfully. Media ID: {}", media);
                Some(media)
            }
            Err(Error::WordPress { status, body }) => {
                error!("HTTP error {} while uploading image", status);
                debug!("WordPress response: {}", body);
                None
            }
            Err(e) => {
                error!("Error while uploading image: {}", e);
                None
            }
        }
    }

    /// Upload media file to WordPress
    pub async fn try_upload_media(
        &self,
        image_path: &Path,
        title: &str,
        alt_text: &str,
    ) -> Result<MediaReference> {
        let file_data = tokio::fs::read(image_path).await?;
        let filename = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(file_data)
                    .file_name(filename.clone())
                    .mime_str("image/png")?,
            )
            .text("title", title.to_string())
            .text("alt_text", alt_text.to_string());

        let url = self.endpoint("media");
        info!("Uploading media file: {} to {}", filename, url);

        let response = self
            .authorized(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;
        let media = Self::read_success(response).await?;
        debug!("WordPress media source URL: {:?}", media.source_url);

        match media.id {
            Some(id) if id != 0 => Ok(MediaReference { id }),
            _ => Err(Error::ExternalApi(
                "Failed to retrieve media ID from response".to_string(),
            )),
        }
    }

    /// Create a post. Errors always propagate to the caller.
    pub async fn create_post(&self, draft: &PostDraft) -> Result<PublishedPost> {
        let url = self.endpoint("posts");
        info!("Creating WordPress post: {}", draft.title);

        let response = self
            .authorized(self.client.post(&url))
            .json(draft)
            .send()
            .await?;

        let created = match Self::read_success(response).await {
            Ok(created) => created,
            Err(e) => {
                if let Error::WordPress { status, body } = &e {
                    error!("HTTP error {} while creating post", status);
                    debug!("WordPress response: {}", body);
                }
                return Err(e);
            }
        };

        let id = created
            .id
            .ok_or_else(|| Error::ExternalApi("Post response carries no id".to_string()))?;
        info!("Successfully created post with ID: {}", id);

        Ok(PublishedPost {
            id,
            link: created.link,
        })
    }
}

/// `Authorization: Basic <base64(app_key)>`
pub fn basic_authorization(app_key: &str) -> String {
    format!("Basic {}", general_purpose::STANDARD.encode(app_key.as_bytes()))
}
