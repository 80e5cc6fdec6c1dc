//! CLI commands for octo-release
//!
//! - **create_release**: build a release plan and create the release
//! - **scan**: list the packages a folder would contribute, offline
//!
//! Commands that talk to the server accept `&ClientContext` so settings and
//! the HTTP client are built once.

pub mod create_release;
pub mod scan;

pub use create_release::{CreateReleaseOptions, run_create_release};
pub use scan::run_scan_folder;
