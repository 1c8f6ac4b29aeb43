//! probelog - local NDJSON log collector for hypothesis-driven debugging.

#[tokio::main]
async fn main() {
    probelog::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let code = probelog::run_cli(args).await;
    std::process::exit(code);
}
