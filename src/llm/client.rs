//! LLMクライアント

use crate::llm::{
    config::LlmConfig,
    error::LlmResult,
    providers::{create_provider, LlmProvider},
    types::{LlmRequest, LlmResponse},
};

/// LLMクライアント
pub struct LlmClient {
    provider: Box<dyn LlmProvider>,
    config: LlmConfig,
}

impl LlmClient {
    /// 新しいクライアントを作成
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        config.validate()?;
        let provider = create_provider(&config)?;

        Ok(Self { provider, config })
    }

    /// 任意のプロバイダーでクライアントを作成（テスト用の差し替えなど）
    pub fn with_provider(provider: Box<dyn LlmProvider>, config: LlmConfig) -> Self {
        Self { provider, config }
    }

    /// 完了リクエストを送信
    pub async fn complete(&self, request: LlmRequest) -> LlmResult<LlmResponse> {
        self.provider.complete(&request).await
    }

    /// プロバイダー名を取得
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider.name())
            .field("model", &self.config.default_model)
            .finish()
    }
}
