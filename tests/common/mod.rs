//! 統合テスト用のモックサーバー
//!
//! SerpAPI・チャット補完・画像生成・WordPress の各エンドポイントを
//! 1つの axum ルーターで 127.0.0.1:0 に立て、受け取ったリクエストを記録する。

#![allow(dead_code)]

use autopost_rs::config::AppConfig;
use autopost_rs::llm::LlmConfig;
use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const WP_APP_KEY: &str = "editor:abcd efgh ijkl";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-data";

pub const WELL_FORMED_REPLY: &str = "Title: **\"QubePay\" Makes Checkout Effortless**\n\
Content: Online payments keep evolving. QubePay Online Payments helps every business \
accept cards and wallets.\n\nGet in touch with QubePay today!";

/// モックの応答内容
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub results_per_query: usize,
    pub failing_query: Option<String>,
    pub chat_status: u16,
    pub chat_reply: String,
    pub image_status: u16,
    pub image_body: Value,
    pub media_status: u16,
    pub media_body: Value,
    pub post_status: u16,
    pub post_body: Value,
}

impl Default for MockBehavior {
    fn default() -> Self {
        use base64::{engine::general_purpose, Engine as _};

        Self {
            results_per_query: 5,
            failing_query: None,
            chat_status: 200,
            chat_reply: WELL_FORMED_REPLY.to_string(),
            image_status: 200,
            image_body: json!({
                "success": true,
                "result": general_purpose::STANDARD.encode(PNG_BYTES),
                "errors": []
            }),
            media_status: 201,
            media_body: json!({"id": 4242, "source_url": "https://blog.example/wp-content/uploads/a.png"}),
            post_status: 201,
            post_body: json!({"id": 777, "link": "https://blog.example/?p=777"}),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub alt_text: Option<String>,
    pub authorization: Option<String>,
}

/// モックが受け取ったリクエスト
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub searches: Vec<HashMap<String, String>>,
    pub chats: Vec<Value>,
    pub images: Vec<Value>,
    pub image_authorization: Vec<String>,
    pub uploads: Vec<MediaUpload>,
    pub posts: Vec<Value>,
    pub post_authorization: Vec<String>,
}

pub struct MockState {
    behavior: MockBehavior,
    recorded: Mutex<Recorded>,
}

pub struct MockServer {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockServer {
    pub async fn start(behavior: MockBehavior) -> Self {
        let state = Arc::new(MockState {
            behavior,
            recorded: Mutex::new(Recorded::default()),
        });

        let app = Router::new()
            .route("/search.json", get(search))
            .route("/v1/chat/completions", post(chat))
            .route("/ai/run", post(image))
            .route("/wp-json/wp/v2/media", post(media))
            .route("/wp-json/wp/v2/posts", post(posts))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn recorded(&self) -> Recorded {
        self.state.recorded.lock().unwrap().clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// このモックを向いた検証済みの設定
    pub fn app_config(&self, output_dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();

        config.wordpress.base_url = self.url("/wp-json/wp/v2");
        config.wordpress.app_key = Some(secret(WP_APP_KEY));
        config.wordpress.timeout_seconds = Some(5);

        config.search.endpoint = self.url("/search.json");
        config.search.api_key = Some(secret("serp_test"));
        config.search.timeout_seconds = Some(5);

        config.llm = LlmConfig::custom(
            self.url("/v1/chat/completions"),
            Some("gsk_test".to_string()),
            "llama-3.3-70b-versatile",
        );
        config.llm.timeout_secs = 5;

        config.image.api_url = Some(self.url("/ai/run"));
        config.image.api_token = Some(secret("cf_test"));
        config.image.output_dir = output_dir.to_path_buf();
        config.image.timeout_seconds = Some(5);

        config
    }
}

fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string().into_boxed_str())
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn search(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let query = params.get("q").cloned().unwrap_or_default();
    state.recorded.lock().unwrap().searches.push(params);

    if state.behavior.failing_query.as_deref() == Some(query.as_str()) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "upstream unavailable"})),
        );
    }

    let results: Vec<Value> = (1..=state.behavior.results_per_query)
        .map(|i| {
            json!({
                "position": i,
                "title": format!("{} headline {}", query, i),
                "link": format!("https://news.example/{}/{}", query.replace(' ', "-"), i),
                "snippet": format!("{} snippet {}", query, i)
            })
        })
        .collect();

    (StatusCode::OK, Json(json!({"organic_results": results})))
}

async fn chat(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.recorded.lock().unwrap().chats.push(body);

    if state.behavior.chat_status != 200 {
        return (
            status(state.behavior.chat_status),
            Json(json!({"error": {"message": "model unavailable"}})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "id": "chatcmpl-test",
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": state.behavior.chat_reply},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
        })),
    )
}

async fn image(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    {
        let mut recorded = state.recorded.lock().unwrap();
        recorded.images.push(body);
        if let Some(auth) = authorization(&headers) {
            recorded.image_authorization.push(auth);
        }
    }

    (
        status(state.behavior.image_status),
        Json(state.behavior.image_body.clone()),
    )
}

async fn media(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut upload = MediaUpload {
        authorization: authorization(&headers),
        ..MediaUpload::default()
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                upload.bytes = field.bytes().await.unwrap().to_vec();
            }
            "title" => upload.title = Some(field.text().await.unwrap()),
            "alt_text" => upload.alt_text = Some(field.text().await.unwrap()),
            _ => {}
        }
    }

    state.recorded.lock().unwrap().uploads.push(upload);
    (
        status(state.behavior.media_status),
        Json(state.behavior.media_body.clone()),
    )
}

async fn posts(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    {
        let mut recorded = state.recorded.lock().unwrap();
        recorded.posts.push(body);
        if let Some(auth) = authorization(&headers) {
            recorded.post_authorization.push(auth);
        }
    }

    (
        status(state.behavior.post_status),
        Json(state.behavior.post_body.clone()),
    )
}
