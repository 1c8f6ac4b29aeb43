pub mod clear;
pub mod logs;
pub mod serve;
pub mod start;
pub mod status;
pub mod stop;

use clap::Args;
use std::path::PathBuf;

use crate::collector::{CollectorConfig, DEFAULT_LOG_FILE, DEFAULT_PORT};

/// Shared `--port` / `--log-file` options.
#[derive(Args, Debug, Clone)]
pub struct CollectorArgs {
    /// Port the collector listens on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Path of the NDJSON log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

impl CollectorArgs {
    pub fn config(&self) -> CollectorConfig {
        CollectorConfig {
            port: self.port,
            log_file: self.log_file.clone(),
        }
    }
}

pub async fn run_cli_async<F, Fut>(f: F) -> i32
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<(), String>>,
{
    match f().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}
