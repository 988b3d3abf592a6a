//! LLMプロバイダー実装

pub mod openai;

use crate::llm::{
    config::LlmConfig,
    error::LlmResult,
    types::{LlmRequest, LlmResponse},
};
use async_trait::async_trait;

/// LLMプロバイダートレイト
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 通常の完了リクエスト
    async fn complete(&self, request: &LlmRequest) -> LlmResult<LlmResponse>;

    /// プロバイダー名を取得
    fn name(&self) -> &str;
}

/// プロバイダーファクトリー
///
/// Groq / OpenAI / カスタムはいずれも OpenAI 互換のチャット補完APIを話すため、
/// 同じHTTP実装を使う。
pub fn create_provider(config: &LlmConfig) -> LlmResult<Box<dyn LlmProvider>> {
    Ok(Box::new(openai::OpenAICompatibleProvider::new(config.clone())?))
}
