//! Illustration generation (Cloudflare Workers AI text-to-image)
//!
//! The service answers with `{"success": bool, "result": ..., "errors": [...]}`
//! where `result` is either the base64 image itself or `{"image": "<base64>"}`.

use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ImageConfig;
use crate::error::{Error, Result};
use crate::llm::{LlmClient, LlmRequest};
use crate::types::{GeneratedImage, Outcome};

/// Prompt used when the model cannot write one
pub const DEFAULT_IMAGE_PROMPT: &str =
    "Generate an image of online payments for a fintech blog post.";

const PROMPT_TEMPERATURE: f32 = 0.9;
const PROMPT_MAX_TOKENS: usize = 512;

const SCENE_META_PROMPT: &str = "Create a detailed and unique image prompt for an AI-generated image. \
The image should depict a bustling modern fintech environment, showcasing online payment solutions. \
Include elements such as a diverse group of people using smartphones and laptops for transactions, \
digital payment icons floating in the background, a sleek payment terminal, and a virtual dashboard \
displaying financial analytics. The scene should convey innovation, connectivity, and a futuristic \
approach to financial technology.";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image service reported failure: {0}")]
    Unsuccessful(String),

    #[error("unexpected 'result' format: {0}")]
    UnexpectedShape(String),

    #[error("no 'image' key found in result")]
    MissingImageKey,

    #[error("image payload is empty")]
    EmptyPayload,

    #[error("base64 decode failed: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("image service returned {status}: {body}")]
    Http { status: u16, body: String },
}

/// Response envelope of the image service
#[derive(Debug, Deserialize)]
pub struct ImageEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl ImageEnvelope {
    pub fn into_payload(self) -> std::result::Result<ImagePayload, ImageError> {
        if !self.success {
            let reported = self
                .errors
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ImageError::Unsuccessful(reported));
        }
        ImagePayload::from_result(&self.result)
    }
}

/// The two accepted shapes of `result`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// `"result": "<base64>"`
    Bare(String),
    /// `"result": {"image": "<base64>"}`
    Wrapped(String),
}

impl ImagePayload {
    pub fn from_result(result: &Value) -> std::result::Result<Self, ImageError> {
        let payload = match result {
            Value::String(encoded) => ImagePayload::Bare(encoded.clone()),
            Value::Object(map) => match map.get("image") {
                Some(Value::String(encoded)) if !encoded.is_empty() => {
                    ImagePayload::Wrapped(encoded.clone())
                }
                _ => return Err(ImageError::MissingImageKey),
            },
            other => return Err(ImageError::UnexpectedShape(shape_name(other).to_string())),
        };

        if payload.encoded().trim().is_empty() {
            return Err(ImageError::EmptyPayload);
        }
        Ok(payload)
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ImagePayload::Bare(_) => "bare string",
            ImagePayload::Wrapped(_) => "object with image key",
        }
    }

    pub fn encoded(&self) -> &str {
        match self {
            ImagePayload::Bare(encoded) | ImagePayload::Wrapped(encoded) => encoded,
        }
    }

    /// Decode with the standard alphabet, ignoring embedded whitespace.
    pub fn decode(&self) -> std::result::Result<Vec<u8>, ImageError> {
        let cleaned: String = self
            .encoded()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Ok(general_purpose::STANDARD.decode(cleaned)?)
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Collapse any run of whitespace (including newlines) into single spaces.
pub fn normalize_prompt(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct ImageGenerator {
    llm: Arc<LlmClient>,
    client: Client,
    api_url: String,
    api_token: SecretString,
    output_path: PathBuf,
}

impl ImageGenerator {
    pub fn new(llm: Arc<LlmClient>, config: &ImageConfig) -> Result<Self> {
        let api_url = config
            .api_url
            .clone()
            .ok_or_else(|| Error::Config("CLOUDFLARE_API_URL is not set".to_string()))?;
        let api_token = config
            .api_token
            .clone()
            .ok_or_else(|| Error::Config("CLOUDFLARE_API_TOKEN is not set".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent("autopost-rs/0.3")
            .build()?;

        Ok(Self {
            llm,
            client,
            api_url,
            api_token,
            output_path: config.output_path(),
        })
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Use the seed when given, otherwise ask the model for a scene
    /// description, otherwise fall back to the default prompt.
    pub async fn resolve_prompt(&self, seed: Option<&str>) -> Outcome<String> {
        if let Some(seed) = seed.filter(|s| !s.trim().is_empty()) {
            return Outcome::Generated(normalize_prompt(seed));
        }

        let request = LlmRequest::user(SCENE_META_PROMPT)
            .with_temperature(PROMPT_TEMPERATURE)
            .with_max_tokens(PROMPT_MAX_TOKENS);

        match self.llm.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                debug!("Generated image prompt from LLM: {}", response.content.trim());
                Outcome::Generated(normalize_prompt(&response.content))
            }
            Ok(_) => {
                warn!("LLM returned an empty image prompt, using default prompt");
                Outcome::fallback(DEFAULT_IMAGE_PROMPT.to_string(), "empty prompt from LLM")
            }
            Err(e) => {
                error!("Failed to generate image prompt, falling back to default prompt: {}", e);
                Outcome::fallback(DEFAULT_IMAGE_PROMPT.to_string(), e.to_string())
            }
        }
    }

    /// Send one prompt to the image service and return the decoded bytes.
    pub async fn request_image(&self, prompt: &str) -> Result<Vec<u8>> {
        debug!("Sending image request to {} with prompt: {}", self.api_url, prompt);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_token.expose_secret())
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ImageError::Http {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let envelope: ImageEnvelope = serde_json::from_str(&text)?;
        let payload = envelope.into_payload()?;
        debug!("Image result shape: {}", payload.shape());
        Ok(payload.decode()?)
    }

    /// Write the image to the fixed output path, replacing any earlier file.
    pub async fn save(&self, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::write(&self.output_path, bytes).await?;
        Ok(self.output_path.clone())
    }

    /// Full image stage. Any failure is logged and reported as `None`.
    pub async fn generate(&self, seed: Option<&str>) -> Option<GeneratedImage> {
        let prompt = self.resolve_prompt(seed).await;
        info!("🎨 Generating image for prompt: {}", prompt.value());

        let bytes = match self.request_image(prompt.value()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Image generation failed: {}", e);
                return None;
            }
        };

        match self.save(&bytes).await {
            Ok(path) => {
                info!("🖼️  Image saved successfully: {} ({} bytes)", path.display(), bytes.len());
                Some(GeneratedImage { path, prompt })
            }
            Err(e) => {
                error!("Failed to write image to {}: {}", self.output_path.display(), e);
                None
            }
        }
    }
}
