//! In-memory deployment server for unit tests

use super::Repository;
use super::model::{
  ChannelResource, DeploymentProcessResource, FeedResource, PackageResource, PackageSearchFilter, ProjectResource,
  ReleaseResource, ReleaseTemplateResource, VersionRuleTestRequest, VersionRuleTestResponse,
};
use crate::core::error::ReleaseResult;
use crate::release::rules::RuleValidator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeRepository {
  pub projects: Vec<ProjectResource>,
  pub channels: Vec<ChannelResource>,
  pub processes: Vec<DeploymentProcessResource>,
  /// Processes by git reference
  pub git_processes: HashMap<String, DeploymentProcessResource>,
  /// Templates by channel ID ("" for channel-less builds)
  pub templates: HashMap<String, ReleaseTemplateResource>,
  pub feeds: Vec<FeedResource>,
  /// Search results by package ID, newest first
  pub packages: HashMap<String, Vec<String>>,
  /// Rule-test verdicts by version; unknown versions satisfy everything
  pub rule_answers: HashMap<String, VersionRuleTestResponse>,
  pub releases: Mutex<Vec<ReleaseResource>>,
  pub searches: Mutex<Vec<PackageSearchFilter>>,
  pub rule_tests: Mutex<Vec<VersionRuleTestRequest>>,
  pub feed_lookups: Mutex<Vec<Vec<String>>>,
}

impl FakeRepository {
  pub fn searches(&self) -> Vec<PackageSearchFilter> {
    self.searches.lock().unwrap().clone()
  }

  pub fn rule_tests(&self) -> Vec<VersionRuleTestRequest> {
    self.rule_tests.lock().unwrap().clone()
  }

  pub fn feed_lookups(&self) -> Vec<Vec<String>> {
    self.feed_lookups.lock().unwrap().clone()
  }
}

#[async_trait]
impl RuleValidator for FakeRepository {
  async fn test_version_rule(&self, request: &VersionRuleTestRequest) -> ReleaseResult<VersionRuleTestResponse> {
    self.rule_tests.lock().unwrap().push(request.clone());
    Ok(
      self
        .rule_answers
        .get(&request.version)
        .cloned()
        .unwrap_or(VersionRuleTestResponse {
          satisfies_version_range: true,
          satisfies_pre_release_tag: true,
        }),
    )
  }
}

#[async_trait]
impl Repository for FakeRepository {
  async fn find_project(&self, id_or_name: &str) -> ReleaseResult<Option<ProjectResource>> {
    Ok(
      self
        .projects
        .iter()
        .find(|p| p.id == id_or_name || p.name.eq_ignore_ascii_case(id_or_name))
        .cloned(),
    )
  }

  async fn project_channels(&self, _project: &ProjectResource) -> ReleaseResult<Vec<ChannelResource>> {
    Ok(self.channels.clone())
  }

  async fn deployment_process(&self, id: &str) -> ReleaseResult<Option<DeploymentProcessResource>> {
    Ok(self.processes.iter().find(|p| p.id == id).cloned())
  }

  async fn deployment_process_at_git_ref(
    &self,
    _project: &ProjectResource,
    git_ref: &str,
  ) -> ReleaseResult<Option<DeploymentProcessResource>> {
    Ok(self.git_processes.get(git_ref).cloned())
  }

  async fn release_template(
    &self,
    _project: &ProjectResource,
    _process: &DeploymentProcessResource,
    channel: Option<&ChannelResource>,
    _git_ref: Option<&str>,
  ) -> ReleaseResult<Option<ReleaseTemplateResource>> {
    let key = channel.map(|c| c.id.as_str()).unwrap_or_default();
    Ok(self.templates.get(key).cloned())
  }

  async fn feeds(&self, ids_or_names: &[String]) -> ReleaseResult<Vec<FeedResource>> {
    self.feed_lookups.lock().unwrap().push(ids_or_names.to_vec());
    Ok(
      self
        .feeds
        .iter()
        .filter(|f| {
          ids_or_names
            .iter()
            .any(|k| f.id.eq_ignore_ascii_case(k) || f.name.eq_ignore_ascii_case(k))
        })
        .cloned()
        .collect(),
    )
  }

  async fn search_packages(
    &self,
    _feed: &FeedResource,
    filter: &PackageSearchFilter,
  ) -> ReleaseResult<Vec<PackageResource>> {
    self.searches.lock().unwrap().push(filter.clone());
    Ok(
      self
        .packages
        .get(&filter.package_id)
        .map(|versions| {
          versions
            .iter()
            .take(filter.take.max(1))
            .map(|version| PackageResource {
              package_id: filter.package_id.clone(),
              version: version.clone(),
            })
            .collect()
        })
        .unwrap_or_default(),
    )
  }

  async fn find_release(&self, _project: &ProjectResource, version: &str) -> ReleaseResult<Option<ReleaseResource>> {
    Ok(self.releases.lock().unwrap().iter().find(|r| r.version == version).cloned())
  }

  async fn create_release(&self, release: &ReleaseResource) -> ReleaseResult<ReleaseResource> {
    let mut releases = self.releases.lock().unwrap();
    let mut created = release.clone();
    created.id = Some(format!("Releases-{}", releases.len() + 1));
    releases.push(created.clone());
    Ok(created)
  }
}
