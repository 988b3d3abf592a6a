use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogSettings;

const LOG_FILE_NAME: &str = "autopost.log";

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// ログレベル (trace, debug, info, warn, error) または EnvFilter 構文
    pub level: String,
    /// ログディレクトリ
    pub log_dir: PathBuf,
    /// ファイルローテーション設定
    pub rotation: LogRotation,
    /// ファイル出力有効
    pub file_enabled: bool,
}

/// ログファイルのローテーション間隔（設定ファイルでは小文字で指定）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// 日次ローテーション
    #[default]
    Daily,
    /// 時間毎ローテーション
    Hourly,
    /// ローテーションなし
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            rotation: LogRotation::Daily,
            file_enabled: false,
        }
    }
}

impl LogConfig {
    /// アプリ設定からログ設定を作成
    pub fn from_settings(settings: &LogSettings) -> Self {
        Self {
            level: settings.level.clone(),
            log_dir: settings.log_dir.clone(),
            rotation: settings.rotation,
            file_enabled: settings.file_enabled,
        }
    }

    /// `RUST_LOG` があればそれを優先し、なければ設定レベルを使う
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// ログディレクトリを確保
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// ログシステムを初期化
///
/// ファイル出力が有効な場合は書き込みスレッドのガードを返す。
/// 呼び出し側はプロセス終了まで保持すること。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = config.env_filter();

    if !config.file_enabled {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e))?;
        return Ok(None);
    }

    ensure_log_dir(&config.log_dir)?;

    let file_appender = match config.rotation {
        LogRotation::Daily => rolling::daily(&config.log_dir, LOG_FILE_NAME),
        LogRotation::Hourly => rolling::hourly(&config.log_dir, LOG_FILE_NAME),
        LogRotation::Never => rolling::never(&config.log_dir, LOG_FILE_NAME),
    };
    let (non_blocking, guard) = non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr.and(non_blocking))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install subscriber: {}", e))?;

    tracing::info!("📂 ログディレクトリ: {}", config.log_dir.display());
    Ok(Some(guard))
}
