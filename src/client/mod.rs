//! Access to the deployment server
//!
//! - **model**: JSON resources (projects, channels, processes, templates, feeds, releases)
//! - **http**: `reqwest` implementation of [`Repository`]
//!
//! The release planning code only ever sees the [`Repository`] trait, so tests
//! substitute an in-memory server.

pub mod http;
pub mod model;

#[cfg(test)]
pub mod fake;

use crate::core::error::ReleaseResult;
use crate::release::rules::RuleValidator;
use async_trait::async_trait;
use model::{
  ChannelResource, DeploymentProcessResource, FeedResource, PackageResource, PackageSearchFilter, ProjectResource,
  ReleaseResource, ReleaseTemplateResource,
};

pub use http::HttpRepository;

#[async_trait]
pub trait Repository: RuleValidator {
  /// Project by ID or name (case-insensitive)
  async fn find_project(&self, id_or_name: &str) -> ReleaseResult<Option<ProjectResource>>;

  /// Channels of a project; empty when the server predates channels
  async fn project_channels(&self, project: &ProjectResource) -> ReleaseResult<Vec<ChannelResource>>;

  async fn deployment_process(&self, id: &str) -> ReleaseResult<Option<DeploymentProcessResource>>;

  async fn deployment_process_at_git_ref(
    &self,
    project: &ProjectResource,
    git_ref: &str,
  ) -> ReleaseResult<Option<DeploymentProcessResource>>;

  /// Release template for a process and channel, read at `git_ref` for
  /// version-controlled projects
  async fn release_template(
    &self,
    project: &ProjectResource,
    process: &DeploymentProcessResource,
    channel: Option<&ChannelResource>,
    git_ref: Option<&str>,
  ) -> ReleaseResult<Option<ReleaseTemplateResource>>;

  /// Feeds matching any of the given IDs or names, in one call
  async fn feeds(&self, ids_or_names: &[String]) -> ReleaseResult<Vec<FeedResource>>;

  /// Package versions in a feed, newest first
  async fn search_packages(
    &self,
    feed: &FeedResource,
    filter: &PackageSearchFilter,
  ) -> ReleaseResult<Vec<PackageResource>>;

  async fn find_release(&self, project: &ProjectResource, version: &str) -> ReleaseResult<Option<ReleaseResource>>;

  async fn create_release(&self, release: &ReleaseResource) -> ReleaseResult<ReleaseResource>;
}
