//! Print the collected log as raw NDJSON.

use clap::Args;

use crate::cli::{CollectorArgs, run_cli_async};
use crate::collector::client;

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    #[command(flatten)]
    pub collector: CollectorArgs,
}

pub async fn run(args: LogsArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: LogsArgs) -> Result<(), String> {
    let config = args.collector.config();
    let body = client::fetch_logs(config.port).await?;
    print!("{body}");
    Ok(())
}
