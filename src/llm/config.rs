//! LLM統合の設定

use crate::llm::error::{LlmError, LlmResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Groq のチャット補完エンドポイント（OpenAI互換）
pub const GROQ_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// OpenAI のチャット補完エンドポイント
pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// LLMプロバイダー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Groq (Llama 3系など)
    Groq,
    /// OpenAI (GPT-4oなど)
    OpenAI,
    /// カスタムのOpenAI互換エンドポイント
    Custom,
}

/// LLM設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// プロバイダー
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,
    /// APIキー（セキュア）
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
    /// チャット補完エンドポイントの完全なURL（省略時はプロバイダー既定値）
    #[serde(default)]
    pub endpoint: Option<String>,
    /// デフォルトモデル
    #[serde(default = "default_model")]
    pub default_model: String,
    /// リクエストタイムアウト（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// デフォルト温度
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    /// デフォルト最大トークン数
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: usize,
}

fn default_provider() -> LlmProvider {
    LlmProvider::Groq
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    2048
}

impl LlmConfig {
    /// Groq設定を作成
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Groq,
            api_key: Some(SecretString::new(api_key.into().into_boxed_str())),
            default_model: model.into(),
            ..Self::default()
        }
    }

    /// OpenAI設定を作成
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: Some(SecretString::new(api_key.into().into_boxed_str())),
            default_model: model.into(),
            ..Self::default()
        }
    }

    /// カスタムエンドポイント設定を作成
    pub fn custom(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider: LlmProvider::Custom,
            api_key: api_key.map(|k| SecretString::new(k.into_boxed_str())),
            endpoint: Some(endpoint.into()),
            default_model: model.into(),
            ..Self::default()
        }
    }

    /// タイムアウトを取得
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// APIキーを取得（露出）
    pub fn get_api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }

    /// 実際に呼び出すエンドポイントURL
    pub fn endpoint_url(&self) -> LlmResult<String> {
        if let Some(endpoint) = self.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            return Ok(endpoint.to_string());
        }

        match self.provider {
            LlmProvider::Groq => Ok(GROQ_CHAT_COMPLETIONS_URL.to_string()),
            LlmProvider::OpenAI => Ok(OPENAI_CHAT_COMPLETIONS_URL.to_string()),
            LlmProvider::Custom => Err(LlmError::ConfigError(
                "Endpoint is required for custom providers".to_string(),
            )),
        }
    }

    /// 設定を検証
    pub fn validate(&self) -> LlmResult<()> {
        match self.provider {
            LlmProvider::Groq | LlmProvider::OpenAI => {
                if self.get_api_key().map_or(true, str::is_empty) {
                    return Err(LlmError::ConfigError(
                        "API key is required for hosted providers".to_string(),
                    ));
                }
            }
            LlmProvider::Custom => {}
        }

        let endpoint = self.endpoint_url()?;
        url::Url::parse(&endpoint)
            .map_err(|e| LlmError::ConfigError(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        // 温度の範囲チェック
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(LlmError::ConfigError(
                "Temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        // max_tokensの妥当性チェック
        if self.default_max_tokens == 0 || self.default_max_tokens > 100_000 {
            return Err(LlmError::ConfigError(
                "max_tokens must be between 1 and 100000".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            endpoint: None,
            default_model: default_model(),
            timeout_secs: default_timeout(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
        }
    }
}
