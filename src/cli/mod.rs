//! CLI module for Shellgate
//!
//! Provides commands:
//! - `serve`: Start the HTTP server
//! - `doctor`: Environment checks
//! - `check-path`: Show the path guard decision for a path
//! - `check-schedule`: Validate a cron-style schedule

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

pub mod doctor;

/// Shellgate CLI
#[derive(Parser, Debug)]
#[command(name = "shellgate")]
#[command(about = "Feature-gated remote shell, script store and file browser")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server
    Serve,
    /// Check the shell, PTY and script root configuration
    Doctor,
    /// Resolve a path the way the file browser would
    CheckPath {
        /// Path to check
        path: String,
        /// Also require the path to stay under this directory
        #[arg(long)]
        within: Option<PathBuf>,
    },
    /// Validate a 5-field schedule expression
    CheckSchedule {
        /// Schedule, e.g. "0 3 * * *"
        expr: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) => crate::server::run().await,
        Some(Commands::Doctor) => doctor::run().await,
        Some(Commands::CheckPath { path, within }) => {
            let config = crate::server::load_config()?;
            let guard = crate::server::path_guard(&config);
            let decision = match &within {
                Some(boundary) => guard.resolve_within(&path, boundary),
                None => guard.resolve(&path),
            };
            println!("{}", serde_json::to_string_pretty(&path_report(&path, decision))?);
            Ok(())
        }
        Some(Commands::CheckSchedule { expr }) => {
            let report = match shellgate_tools::scripts::validate_schedule(&expr) {
                Ok(normalized) => json!({ "valid": true, "schedule": normalized }),
                Err(e) => json!({ "valid": false, "code": e.code(), "error": e.public_message() }),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn path_report(raw: &str, decision: shellgate_tools::Result<PathBuf>) -> serde_json::Value {
    match decision {
        Ok(resolved) => json!({
            "path": raw,
            "allowed": true,
            "resolved": resolved.display().to_string(),
        }),
        Err(e) => json!({
            "path": raw,
            "allowed": false,
            "code": e.code(),
            "error": e.public_message(),
        }),
    }
}
