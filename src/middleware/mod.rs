//! Middleware for the HTTP server
//!
//! - Authentication extractor (Bearer token / API key) and scope checks
//! - Feature-gate check for terminal-backed routes

pub mod auth;
pub mod gate;
