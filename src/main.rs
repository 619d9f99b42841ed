//! Shellgate - feature-gated remote shell
//!
//! CLI entry point for the Shellgate server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod api;
mod cli;
mod middleware;
mod server;

/// Set to `json` for JSON log lines
const LOG_FORMAT_ENV: &str = "SHELLGATE_LOG_FORMAT";

/// Used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str =
    "shellgate=info,shellgate_core=info,shellgate_tools=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let cli = cli::Cli::parse();

    let json_logs = cli.log_json
        || std::env::var(LOG_FORMAT_ENV)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(fmt_layer)
        .init();

    if !dotenv_loaded && matches!(cli.command, Some(cli::Commands::Serve)) {
        warn!(".env file not found, using configuration files and environment only");
    }

    cli::run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        for target in ["shellgate=", "shellgate_core=", "shellgate_tools="] {
            assert!(
                DEFAULT_LOG_FILTER.split(',').any(|d| d.starts_with(target)),
                "{target} missing"
            );
        }
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
