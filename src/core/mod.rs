//! Core building blocks shared by every command
//!
//! - **config**: server configuration (octo.toml, environment, flags)
//! - **context**: resolved settings plus the repository, built once in main.rs
//! - **error**: error types with contextual help messages and exit codes

pub mod config;
pub mod context;
pub mod error;
