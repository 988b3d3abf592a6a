//! OpenAI互換プロバイダー実装（Groq / OpenAI / カスタム）

use crate::llm::{
    config::{LlmConfig, LlmProvider as ProviderType},
    error::{LlmError, LlmResult},
    providers::LlmProvider as LlmProviderTrait,
    types::{LlmRequest, LlmResponse, Message, TokenUsage},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

/// OpenAI互換チャット補完プロバイダー
#[derive(Debug)]
pub struct OpenAICompatibleProvider {
    client: Client,
    endpoint: String,
    config: LlmConfig,
}

impl OpenAICompatibleProvider {
    /// 新しいプロバイダーを作成
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        config.validate()?;
        let endpoint = config.endpoint_url()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent("autopost-rs/0.3")
            .build()
            .map_err(|e| LlmError::ConfigError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.config.timeout_secs)
        } else {
            LlmError::NetworkError(e.to_string())
        }
    }
}

#[async_trait]
impl LlmProviderTrait for OpenAICompatibleProvider {
    async fn complete(&self, request: &LlmRequest) -> LlmResult<LlmResponse> {
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);

        let body = ChatCompletionRequest {
            model,
            messages: &request.messages,
            temperature: request
                .temperature
                .unwrap_or(self.config.default_temperature),
            max_tokens: request.max_tokens.or(Some(self.config.default_max_tokens)),
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = self.config.get_api_key() {
            builder = builder.bearer_auth(api_key);
        }

        debug!("Sending chat completion request to {} (model={})", self.endpoint, model);
        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthError(text),
                StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitError(text),
                _ => LlmError::ApiError(format!("{}: {}", status, text)),
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::EmptyResponse("No choices in response".to_string()))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| LlmError::EmptyResponse("Choice carries no content".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: parsed.model.unwrap_or_else(|| model.to_string()),
            usage,
            id: parsed.id,
            finish_reason: choice.finish_reason,
        })
    }

    fn name(&self) -> &str {
        match self.config.provider {
            ProviderType::Groq => "Groq",
            ProviderType::OpenAI => "OpenAI",
            ProviderType::Custom => "Custom",
        }
    }
}
