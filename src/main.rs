use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cart_tools::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output on stdout stays parseable
    let default_level = if cli.verbose { "cart_tools=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "error",
                        "kind": e.kind(),
                        "message": e.status_message(),
                    })
                );
            } else {
                eprintln!("{} {}", "✗".red(), e.status_message());
            }
            ExitCode::FAILURE
        }
    }
}
