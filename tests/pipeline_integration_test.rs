//! パイプライン全体の統合テスト

mod common;

use async_trait::async_trait;
use autopost_rs::content::{ContentGenerator, GENERATION_ERROR_BODY};
use autopost_rs::image::ImageGenerator;
use autopost_rs::llm::providers::LlmProvider;
use autopost_rs::llm::{LlmClient, LlmConfig, LlmRequest, LlmResponse, LlmResult};
use autopost_rs::search::{SearchCollector, SearchProvider};
use autopost_rs::types::{MediaReference, SearchSnippet};
use autopost_rs::wordpress::WordPressClient;
use autopost_rs::{Error, Pipeline, Stage};
use common::{MockBehavior, MockServer, PNG_BYTES};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct EmptySearch;

#[async_trait]
impl SearchProvider for EmptySearch {
    async fn search(
        &self,
        _query: &str,
        _num_results: u32,
        _language: &str,
    ) -> autopost_rs::Result<Vec<SearchSnippet>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "empty"
    }
}

struct CountingLlm {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmProvider for CountingLlm {
    async fn complete(&self, _request: &LlmRequest) -> LlmResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: "Title: T\nContent: C".to_string(),
            model: "counting".to_string(),
            usage: Default::default(),
            id: None,
            finish_reason: None,
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[tokio::test]
async fn test_full_run_publishes_post() {
    let server = MockServer::start(MockBehavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = server.app_config(dir.path());

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();

    assert_eq!(report.post.id, 777);
    assert_eq!(report.media, MediaReference { id: 4242 });
    assert_eq!(report.title, "QubePay Makes Checkout Effortless");
    assert_eq!(report.image_path, dir.path().join("QubePay_Online_Payments.png"));
    assert!(!report.content_fallback);
    assert!(!report.image_prompt_fallback);
    assert_eq!(std::fs::read(&report.image_path).unwrap(), PNG_BYTES);

    let recorded = server.recorded();
    assert_eq!(recorded.searches.len(), 2);

    // 本文生成のみ。画像プロンプトにはタイトルを使う
    assert_eq!(recorded.chats.len(), 1);
    let prompt = recorded.chats[0]["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Title: Online Payments headline 1"));
    assert_eq!(recorded.chats[0]["max_tokens"], 1024);
    assert_eq!(recorded.chats[0]["temperature"].as_f64(), Some(0.9));

    assert_eq!(
        recorded.images,
        vec![json!({"prompt": "QubePay Makes Checkout Effortless"})]
    );
    assert_eq!(recorded.uploads.len(), 1);
    assert_eq!(
        recorded.uploads[0].alt_text.as_deref(),
        Some("QubePay Makes Checkout Effortless")
    );

    let body = "Online payments keep evolving. QubePay Online Payments helps every business \
accept cards and wallets.\n\nGet in touch with QubePay today!";
    assert_eq!(
        recorded.posts,
        vec![json!({
            "title": "QubePay Makes Checkout Effortless",
            "content": body,
            "status": "publish",
            "categories": [180],
            "featured_media": 4242,
            "meta": {
                "_yoast_wpseo_metadesc": "Online payments keep evolving. QubePay Online Payments helps every business accept cards and wallets. Get in touch with QubePay today!"
            }
        })]
    );
}

#[tokio::test]
async fn test_unparseable_reply_uses_placeholder_title() {
    let server = MockServer::start(MockBehavior {
        chat_reply: "Here is a post without any markers.".to_string(),
        ..MockBehavior::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = server.app_config(dir.path());

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();

    assert!(report.content_fallback);
    assert_eq!(report.title, "QubePay Blog Post");
    let posts = server.recorded().posts;
    assert_eq!(posts[0]["content"], "Here is a post without any markers.");
}

#[tokio::test]
async fn test_model_failure_publishes_error_body() {
    let server = MockServer::start(MockBehavior {
        chat_status: 500,
        ..MockBehavior::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = server.app_config(dir.path());

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();

    assert!(report.content_fallback);
    assert_eq!(report.title, "QubePay Blog Post");

    let recorded = server.recorded();
    assert_eq!(recorded.chats.len(), 1);
    assert_eq!(recorded.chats[0]["temperature"].as_f64(), Some(0.9));
    assert_eq!(
        recorded.images,
        vec![json!({"prompt": "QubePay Blog Post"})]
    );

    let posts = recorded.posts;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "QubePay Blog Post");
    assert_eq!(posts[0]["status"], "publish");
    assert_eq!(posts[0]["content"], GENERATION_ERROR_BODY);
    assert_eq!(posts[0]["meta"]["_yoast_wpseo_metadesc"], GENERATION_ERROR_BODY);
}

#[tokio::test]
async fn test_empty_search_halts_before_generation() {
    let server = MockServer::start(MockBehavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let config = server.app_config(dir.path());

    let calls = Arc::new(AtomicUsize::new(0));
    let llm = Arc::new(LlmClient::with_provider(
        Box::new(CountingLlm {
            calls: Arc::clone(&calls),
        }),
        LlmConfig::default(),
    ));

    let pipeline = Pipeline::new(
        SearchCollector::new(Arc::new(EmptySearch), &config.search),
        ContentGenerator::new(Arc::clone(&llm), config.brand.clone()),
        ImageGenerator::new(llm, &config.image).unwrap(),
        WordPressClient::new(&config.wordpress).unwrap(),
        config.wordpress.category_ids.clone(),
    );

    let err = pipeline.run().await.unwrap_err();
    assert_eq!(err.halted_stage(), Some(Stage::Search));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let recorded = server.recorded();
    assert!(recorded.images.is_empty());
    assert!(recorded.posts.is_empty());
}

#[tokio::test]
async fn test_image_failure_halts_before_upload() {
    let server = MockServer::start(MockBehavior {
        image_body: json!({"success": false, "errors": [{"message": "quota"}]}),
        ..MockBehavior::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = server.app_config(dir.path());

    let err = Pipeline::from_config(&config).unwrap().run().await.unwrap_err();

    assert_eq!(err.halted_stage(), Some(Stage::Image));
    let recorded = server.recorded();
    assert!(recorded.uploads.is_empty());
    assert!(recorded.posts.is_empty());
}

#[tokio::test]
async fn test_upload_failure_halts_before_publish() {
    let server = MockServer::start(MockBehavior {
        media_status: 500,
        media_body: json!({"code": "rest_upload_unknown_error"}),
        ..MockBehavior::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = server.app_config(dir.path());

    let err = Pipeline::from_config(&config).unwrap().run().await.unwrap_err();

    assert_eq!(err.halted_stage(), Some(Stage::Upload));
    assert!(server.recorded().posts.is_empty());
}

#[tokio::test]
async fn test_publish_failure_propagates() {
    let server = MockServer::start(MockBehavior {
        post_status: 400,
        post_body: json!({"code": "rest_invalid_param"}),
        ..MockBehavior::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = server.app_config(dir.path());

    let err = Pipeline::from_config(&config).unwrap().run().await.unwrap_err();

    assert!(matches!(err, Error::WordPress { status: 400, .. }));
    assert_eq!(err.halted_stage(), None);
}
