//! Start the collector daemon.

use clap::Args;

use crate::cli::{CollectorArgs, run_cli_async};
use crate::collector;

#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    #[command(flatten)]
    pub collector: CollectorArgs,
}

pub async fn run(args: StartArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: StartArgs) -> Result<(), String> {
    let config = args.collector.config();

    if collector::is_listening(config.port) {
        println!(
            "Collector already running at http://127.0.0.1:{}",
            config.port
        );
        return Ok(());
    }

    collector::start(&config)?;

    println!(
        "Collector started at http://127.0.0.1:{} logging to {}",
        config.port,
        config.log_file.display()
    );
    Ok(())
}
