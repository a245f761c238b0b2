//! Conclave - live progress streaming for multi-agent work
//!
//! CLI entry point for the Conclave server and watcher.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cli;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "conclave=info,conclave_core=info,conclave_stream=info,tower_http=info".into()
    });
    // Logs go to stderr; `watch` prints the reconstructed view on stdout
    let json = std::env::var("CONCLAVE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let cli = cli::Cli::parse();
    cli::run(cli).await
}
