//! Run the collector server in the foreground.

use clap::Args;

use crate::cli::{CollectorArgs, run_cli_async};
use crate::collector::server;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub collector: CollectorArgs,
}

pub async fn run(args: ServeArgs) -> i32 {
    run_cli_async(|| async move {
        let config = args.collector.config();
        server::run_server(&config).await
    })
    .await
}
