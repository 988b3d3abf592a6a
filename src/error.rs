//! Error types for the autopost pipeline.

use thiserror::Error;

use crate::image::ImageError;
use crate::llm::LlmError;
use crate::pipeline::Stage;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pipeline operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source could not be read or deserialized
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    /// Network error (no response was received)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Search provider error
    #[error("Search provider error: {0}")]
    Search(String),

    /// Image generation error
    #[error("Image generation error: {0}")]
    Image(#[from] ImageError),

    /// WordPress answered with a non-success status
    #[error("WordPress API error {status}: {body}")]
    WordPress { status: u16, body: String },

    /// Malformed answer from a remote service
    #[error("External API error: {0}")]
    ExternalApi(String),

    /// A pipeline gate stopped the run
    #[error("Run halted at {stage} stage: {reason}")]
    Halted { stage: Stage, reason: String },
}

impl Error {
    /// The pipeline stage a halt happened at, if this is a gate failure
    pub fn halted_stage(&self) -> Option<Stage> {
        match self {
            Error::Halted { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
