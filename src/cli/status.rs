//! Show collector status and entry count.

use clap::Args;
use tracing::debug;

use crate::cli::{CollectorArgs, run_cli_async};
use crate::collector::{self, client};

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub collector: CollectorArgs,
}

pub async fn run(args: StatusArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: StatusArgs) -> Result<(), String> {
    let config = args.collector.config();
    let lock_file = collector::lock_path(&config);

    let lock = collector::read_lock(&lock_file)?;
    if let Some(lock) = &lock {
        debug!(pid = lock.pid, port = lock.port, "Found collector lockfile");
    }

    // Trust the lock's port over the CLI default when available.
    let port = lock.as_ref().map_or(config.port, |lock| lock.port);

    match client::health(port).await {
        Ok(summary) => {
            println!("Collector: running (port {})", summary.port);
            if let Some(lock) = &lock {
                println!("Pid: {}", lock.pid);
            }
            println!("Status: {}", summary.status);
            println!("Entries: {}", summary.log_count);
            Ok(())
        }
        Err(err) => {
            debug!(error = %err, "Collector health check failed");
            println!("Collector: not running");
            Ok(())
        }
    }
}
