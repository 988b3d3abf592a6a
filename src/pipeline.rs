//! 投稿パイプライン
//!
//! `SEARCH → GENERATE → SANITIZE → IMAGE → UPLOAD → PUBLISH` を順番に実行し、
//! 最初の致命的な失敗で停止する。

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::content::{sanitize_title, ContentGenerator};
use crate::error::{Error, Result};
use crate::image::ImageGenerator;
use crate::llm::LlmClient;
use crate::search::SearchCollector;
use crate::types::{MediaReference, PublishedPost};
use crate::wordpress::{PostDraft, WordPressClient};

/// Number of body words used for the SEO meta description
pub const META_DESCRIPTION_WORDS: usize = 100;

/// パイプラインの各段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Generate,
    Image,
    Upload,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Search => "search",
            Stage::Generate => "generate",
            Stage::Image => "image",
            Stage::Upload => "upload",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// 1回の実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub post: PublishedPost,
    pub media: MediaReference,
    pub image_path: PathBuf,
    pub title: String,
    /// 記事本文がフォールバック値だった
    pub content_fallback: bool,
    /// 画像プロンプトがフォールバック値だった
    pub image_prompt_fallback: bool,
}

/// First `META_DESCRIPTION_WORDS` whitespace-delimited words of the body,
/// joined by single spaces.
pub fn meta_description(body: &str) -> String {
    body.split_whitespace()
        .take(META_DESCRIPTION_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn halt(stage: Stage, reason: impl Into<String>) -> Error {
    let reason = reason.into();
    error!("Stopping run at {} stage: {}", stage, reason);
    Error::Halted { stage, reason }
}

pub struct Pipeline {
    search: SearchCollector,
    content: ContentGenerator,
    image: ImageGenerator,
    wordpress: WordPressClient,
    category_ids: Vec<u64>,
}

impl Pipeline {
    pub fn new(
        search: SearchCollector,
        content: ContentGenerator,
        image: ImageGenerator,
        wordpress: WordPressClient,
        category_ids: Vec<u64>,
    ) -> Self {
        Self {
            search,
            content,
            image,
            wordpress,
            category_ids,
        }
    }

    /// 設定から全コンポーネントを組み立てる
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = Arc::new(LlmClient::new(config.llm.clone())?);

        Ok(Self::new(
            SearchCollector::from_config(&config.search)?,
            ContentGenerator::new(Arc::clone(&llm), config.brand.clone()),
            ImageGenerator::new(llm, &config.image)?,
            WordPressClient::new(&config.wordpress)?,
            config.wordpress.category_ids.clone(),
        ))
    }

    /// Run every stage once.
    pub async fn run(&self) -> Result<RunReport> {
        info!("🚀 Starting blog post run");

        let latest_info = self.search.gather().await;
        if latest_info.trim().is_empty() {
            return Err(halt(Stage::Search, "no search results were collected"));
        }

        let generated = self.content.generate(&latest_info).await;
        let content_fallback = generated.is_fallback();
        if let Some(reason) = generated.fallback_reason() {
            warn!("Continuing with fallback article: {}", reason);
        }
        let article = generated.into_inner();
        let title = sanitize_title(&article.title);
        info!("📝 Post title: {}", title);

        let image = self
            .image
            .generate(Some(&title))
            .await
            .ok_or_else(|| halt(Stage::Image, "image generation failed"))?;
        let image_prompt_fallback = image.prompt.is_fallback();

        let media = self
            .wordpress
            .upload_media(&image.path, &title, &title)
            .await
            .ok_or_else(|| halt(Stage::Upload, "image upload failed"))?;

        let draft = PostDraft::publish(title.clone(), article.body.clone())
            .with_categories(&self.category_ids)
            .with_featured_media(Some(media))
            .with_meta_description(meta_description(&article.body));

        let post = self.wordpress.create_post(&draft).await.map_err(|e| {
            error!("Failed to create post: {}", e);
            e
        })?;

        info!("✅ Blog post created with ID: {}", post.id);
        info!("Check the Yoast SEO panel to confirm the meta description was applied");

        Ok(RunReport {
            post,
            media,
            image_path: image.path,
            title,
            content_fallback,
            image_prompt_fallback,
        })
    }
}
