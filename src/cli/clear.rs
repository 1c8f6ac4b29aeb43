//! Truncate the collected log and reset the entry counter.

use clap::Args;

use crate::cli::{CollectorArgs, run_cli_async};
use crate::collector::client;

#[derive(Args, Debug, Clone)]
pub struct ClearArgs {
    #[command(flatten)]
    pub collector: CollectorArgs,
}

pub async fn run(args: ClearArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: ClearArgs) -> Result<(), String> {
    let config = args.collector.config();
    client::clear(config.port).await?;
    println!("Log cleared");
    Ok(())
}
