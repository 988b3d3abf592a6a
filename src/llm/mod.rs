//! LLM統合レイヤー
//!
//! 記事本文と画像プロンプトの生成に使う、OpenAI互換の
//! チャット補完エンドポイント（Groq など）との通信を担当します。

pub mod client;
pub mod config;
pub mod error;
pub mod providers;
pub mod types;

pub use client::LlmClient;
pub use config::{LlmConfig, LlmProvider};
pub use error::{LlmError, LlmResult};
pub use types::{LlmRequest, LlmResponse, Message, Role};
