#![forbid(unsafe_code)]

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub mod cli;
pub mod collector;

#[derive(Parser)]
#[command(
    name = "probelog",
    version,
    about = "Local log collector for hypothesis-driven debugging"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the collector server in the foreground
    Serve(cli::serve::ServeArgs),
    /// Start the collector as a detached daemon
    Start(cli::start::StartArgs),
    /// Stop the collector daemon
    Stop(cli::stop::StopArgs),
    /// Show collector status and entry count
    Status(cli::status::StatusArgs),
    /// Print the collected log as raw NDJSON
    Logs(cli::logs::LogsArgs),
    /// Truncate the log and reset the entry counter
    Clear(cli::clear::ClearArgs),
}

/// Parse CLI arguments and dispatch to the matching subcommand.
/// Returns the process exit code.
pub async fn run_cli(args: Vec<String>) -> i32 {
    match Cli::try_parse_from(args) {
        Ok(cli) => match cli.command {
            Some(Commands::Serve(args)) => cli::serve::run(args).await,
            Some(Commands::Start(args)) => cli::start::run(args).await,
            Some(Commands::Stop(args)) => cli::stop::run(args).await,
            Some(Commands::Status(args)) => cli::status::run(args).await,
            Some(Commands::Logs(args)) => cli::logs::run(args).await,
            Some(Commands::Clear(args)) => cli::clear::run(args).await,
            None => {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                println!();
                0
            }
        },
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

/// Initialize the tracing subscriber.
///
/// PROBELOG_LOG controls the log level: "trace", "debug", "info", "warn",
/// "error", or a full tracing filter spec like "probelog=debug,axum=warn".
pub fn init_tracing() {
    let crate_root = module_path!().to_string();

    let filter = match std::env::var("PROBELOG_LOG") {
        Ok(level) if is_plain_level(&level) => {
            format!("{crate_root}={level}")
        }
        Ok(spec) => spec,
        Err(_) => format!("{crate_root}=info"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}
