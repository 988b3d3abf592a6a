use std::process::ExitCode;

use autopost_rs::config::AppConfig;
use autopost_rs::logging::{init_logging, LogConfig};
use autopost_rs::Pipeline;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // .env の値を環境変数として読み込む（存在しなくてもよい）
    dotenv::dotenv().ok();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            let _ = init_logging(&LogConfig::default());
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // ガードはプロセス終了まで保持する
    let _guard = match init_logging(&LogConfig::from_settings(&config.log)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.log_loaded();

    let pipeline = match Pipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to build pipeline: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run().await {
        Ok(report) => {
            info!(
                "Published '{}' as post {} (media {})",
                report.title, report.post.id, report.media
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.halted_stage() {
                Some(stage) => error!("Run stopped at the {} stage: {}", stage, e),
                None => error!("Run failed: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}
