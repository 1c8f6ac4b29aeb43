//! Stop the collector daemon.

use clap::Args;

use crate::cli::{CollectorArgs, run_cli_async};
use crate::collector;

#[derive(Args, Debug, Clone)]
pub struct StopArgs {
    #[command(flatten)]
    pub collector: CollectorArgs,
}

pub async fn run(args: StopArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: StopArgs) -> Result<(), String> {
    let config = args.collector.config();

    if !collector::is_listening(config.port) {
        println!("Collector is not running");
        // A stale lock may still be around; stop() cleans it up.
        collector::stop(&config)?;
        return Ok(());
    }

    collector::stop(&config)?;
    println!("Collector stopped");
    Ok(())
}
