//! アプリケーション設定
//!
//! 起動時に一度だけ読み込み、各コンポーネントのコンストラクタへ明示的に渡す。
//! 読み込み順: 既定値 → 設定ファイル → `AUTOPOST_*` 環境変数 → 従来の環境変数
//! （`WP_APP_KEY`, `SERP_API_KEY` など）。

use crate::error::{Error, Result};
use crate::llm::LlmConfig;
use crate::logging::LogRotation;
use ::config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_WORDPRESS_BASE_URL: &str = "https://www.qubepay.com/wp-json/wp/v2";
pub const DEFAULT_SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub wordpress: WordPressConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub brand: BrandProfile,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPressConfig {
    /// REST API のベースURL（`/wp-json/wp/v2` まで含む）
    #[serde(default = "default_wordpress_base_url")]
    pub base_url: String,
    /// `user:application-password` 形式の Application Password
    #[serde(default, skip_serializing)]
    pub app_key: Option<SecretString>,
    pub timeout_seconds: Option<u64>,
    /// 投稿に付与するカテゴリーID
    #[serde(default = "default_category_ids")]
    pub category_ids: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_serpapi_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,
    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,
    #[serde(default = "default_language")]
    pub language: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// 画像生成APIのURL（Cloudflare Workers AI など）
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_token: Option<SecretString>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// 保存ファイル名の元になる名前（空白は `_` に置換される）
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
    pub timeout_seconds: Option<u64>,
}

/// プロンプトに埋め込むブランド情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandProfile {
    #[serde(default = "default_brand_name")]
    pub name: String,
    #[serde(default = "default_brand_description")]
    pub description: String,
    #[serde(default = "default_brand_keyword")]
    pub keyword: String,
    /// 生成失敗時に使うタイトル
    #[serde(default = "default_placeholder_title")]
    pub placeholder_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// daily / hourly / never
    #[serde(default)]
    pub rotation: LogRotation,
}

fn default_wordpress_base_url() -> String {
    DEFAULT_WORDPRESS_BASE_URL.to_string()
}

fn default_category_ids() -> Vec<u64> {
    vec![180]
}

fn default_serpapi_endpoint() -> String {
    DEFAULT_SERPAPI_ENDPOINT.to_string()
}

fn default_engine() -> String {
    "google".to_string()
}

fn default_queries() -> Vec<String> {
    vec!["Online Payments".to_string(), "Fintech News".to_string()]
}

fn default_results_per_query() -> u32 {
    5
}

fn default_language() -> String {
    "en".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_stem() -> String {
    "QubePay Online Payments".to_string()
}

fn default_brand_name() -> String {
    "QubePay".to_string()
}

fn default_brand_description() -> String {
    "an Online Payments Provider. The company offers various payment solutions for all business types".to_string()
}

fn default_brand_keyword() -> String {
    "QubePay Online Payments".to_string()
}

fn default_placeholder_title() -> String {
    "QubePay Blog Post".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            base_url: default_wordpress_base_url(),
            app_key: None,
            timeout_seconds: Some(30),
            category_ids: default_category_ids(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_serpapi_endpoint(),
            api_key: None,
            engine: default_engine(),
            queries: default_queries(),
            results_per_query: default_results_per_query(),
            language: default_language(),
            timeout_seconds: Some(30),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            output_dir: default_output_dir(),
            file_stem: default_file_stem(),
            timeout_seconds: Some(120),
        }
    }
}

impl Default for BrandProfile {
    fn default() -> Self {
        Self {
            name: default_brand_name(),
            description: default_brand_description(),
            keyword: default_brand_keyword(),
            placeholder_title: default_placeholder_title(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_enabled: false,
            log_dir: default_log_dir(),
            rotation: LogRotation::Daily,
        }
    }
}

impl WordPressConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(30))
    }

    pub fn get_app_key(&self) -> Option<&str> {
        self.app_key.as_ref().map(|k| k.expose_secret())
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(30))
    }

    pub fn get_api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }
}

impl ImageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(120))
    }

    pub fn get_api_token(&self) -> Option<&str> {
        self.api_token.as_ref().map(|k| k.expose_secret())
    }

    /// 生成画像の保存先。実行ごとに同じパスへ上書きされる
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.png", self.file_stem.replace(' ', "_")))
    }
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into_boxed_str())
}

/// ベースURL（`.../openai/v1`）なら `/chat/completions` を補う
fn chat_completions_url(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.ends_with(CHAT_COMPLETIONS_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, CHAT_COMPLETIONS_PATH)
    }
}

fn require_secret(value: Option<&str>, name: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(Error::Config(format!("{} is not set", name))),
    }
}

fn require_url(value: &str, name: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| Error::Config(format!("{} '{}' is not a valid URL: {}", name, value, e)))
}

impl AppConfig {
    /// 標準の場所の設定ファイルと環境変数から読み込む
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load_from_env().build()
    }

    /// 従来の環境変数（.env 互換）で上書き
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("WP_APP_KEY") {
            self.wordpress.app_key = Some(secret(v));
        }
        if let Some(v) = get("WP_BASE_URL") {
            self.wordpress.base_url = v;
        }
        if let Some(v) = get("GROQ_API_URL") {
            self.llm.endpoint = Some(chat_completions_url(&v));
        }
        if let Some(v) = get("GROQ_API_KEY") {
            self.llm.api_key = Some(secret(v));
        }
        if let Some(v) = get("SERP_API_KEY") {
            self.search.api_key = Some(secret(v));
        }
        if let Some(v) = get("CLOUDFLARE_API_URL") {
            self.image.api_url = Some(v);
        }
        if let Some(v) = get("CLOUDFLARE_API_TOKEN") {
            self.image.api_token = Some(secret(v));
        }
    }

    /// 設定を検証
    pub fn validate(&self) -> Result<()> {
        require_url(&self.wordpress.base_url, "wordpress.base_url")?;
        require_secret(self.wordpress.get_app_key(), "WP_APP_KEY")?;

        require_url(&self.search.endpoint, "search.endpoint")?;
        require_secret(self.search.get_api_key(), "SERP_API_KEY")?;
        if self.search.queries.iter().all(|q| q.trim().is_empty()) {
            return Err(Error::Config("search.queries must not be empty".to_string()));
        }
        if self.search.results_per_query == 0 {
            return Err(Error::Config(
                "search.results_per_query must be at least 1".to_string(),
            ));
        }

        self.llm
            .validate()
            .map_err(|e| Error::Config(format!("llm: {}", e)))?;

        let image_url = self
            .image
            .api_url
            .as_deref()
            .ok_or_else(|| Error::Config("CLOUDFLARE_API_URL is not set".to_string()))?;
        require_url(image_url, "image.api_url")?;
        require_secret(self.image.get_api_token(), "CLOUDFLARE_API_TOKEN")?;

        Ok(())
    }

    /// 読み込んだ設定をデバッグ出力（秘密情報は有無のみ）
    pub fn log_loaded(&self) {
        let presence = |v: Option<&str>| if v.is_some() { "set" } else { "missing" };

        debug!("WordPress base URL: {}", self.wordpress.base_url);
        debug!("WP_APP_KEY: {}", presence(self.wordpress.get_app_key()));
        debug!("SERP_API_KEY: {}", presence(self.search.get_api_key()));
        debug!("LLM API key: {}", presence(self.llm.get_api_key()));
        debug!("CLOUDFLARE_API_TOKEN: {}", presence(self.image.get_api_token()));
        debug!("Search queries: {:?}", self.search.queries);
        debug!("Image output path: {}", self.image.output_path().display());
    }
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    load_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
        }
    }

    /// 明示的な設定ファイルを指定（存在しなければエラー）
    pub fn load_from_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// `AUTOPOST_*` と従来の環境変数を読み込む
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// 読み込みと検証を行い最終的な設定を返す
    pub fn build(self) -> Result<AppConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.config_file {
            builder = builder.add_source(File::from(path.as_path()).required(true));
        } else {
            builder = builder
                .add_source(File::with_name("autopost").required(false))
                .add_source(File::with_name("config/autopost").required(false));
        }

        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix("AUTOPOST")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("search.queries")
                    .with_list_parse_key("wordpress.category_ids")
                    .try_parsing(true),
            );
        }

        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        if self.load_env {
            config.apply_legacy_env(|key| std::env::var(key).ok());
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
