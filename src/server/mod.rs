//! Server module for Shellgate
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Startup configuration checks
//! - `state`: Runtime components shared by handlers
//! - `init`: Server initialization and run loop

pub mod config;
mod init;
mod loader;
mod state;
mod validation;

pub use init::{build_router, run, API_KEY_ENV};
pub use loader::load_config;
pub use state::{path_guard, AppState};
