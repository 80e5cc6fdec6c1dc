//! Server context - resolve once, pass everywhere
//!
//! `ClientContext` holds the resolved server settings and the repository that
//! talks to that server. `main.rs` builds it once for commands that need the
//! server and passes it by reference.

use crate::client::{HttpRepository, Repository};
use crate::core::config::{ClientConfig, ConfigOverrides, ServerSettings};
use crate::core::error::ReleaseResult;
use std::path::Path;
use std::sync::Arc;

/// Shared state for commands that talk to the deployment server
#[derive(Clone)]
pub struct ClientContext {
  /// Server URL, API key and space after layering file, env and flags
  pub settings: ServerSettings,

  /// Remote access, behind a trait so commands can run against any server
  pub repository: Arc<dyn Repository>,
}

impl ClientContext {
  /// Load octo.toml from `root`, layer env and flag overrides, and connect
  pub fn build(root: &Path, overrides: &ConfigOverrides) -> ReleaseResult<Self> {
    let settings = ClientConfig::load(root)?.apply_env().resolve(overrides, root)?;
    tracing::debug!("using server {} (space {})", settings.server, settings.space);
    let repository = Arc::new(HttpRepository::new(&settings)?);

    Ok(Self {
      settings,
      repository,
    })
  }

  pub fn repository(&self) -> &dyn Repository {
    self.repository.as_ref()
  }
}
