//! Build a release plan from the deployment server
//!
//! Two entry branches, picked by whether a git reference was supplied:
//! database-backed projects read the process by ID, version-controlled
//! projects read process and template at the reference. Both then resolve the
//! remaining package versions from their feeds one step at a time and test
//! every package step against the channel's version rules.
//!
//! Per-step problems (dynamic packages, empty feeds) are logged and leave the
//! step unresolved. The caller decides what to do with the plan.

use super::plan::{ReleasePlan, ReleasePlanItem, VersionSource};
use super::rules::{find_rule, test_rule};
use crate::client::Repository;
use crate::client::model::{ChannelResource, FeedResource, PackageSearchFilter, ProjectResource};
use crate::core::error::{ReleaseError, ReleaseResult, ValidationError};
use crate::versions::PackageVersionResolver;
use std::collections::HashMap;
use tracing::{debug, error, info};

/// Assembles release plans against a [`Repository`]
pub struct ReleasePlanBuilder<'a> {
  repository: &'a dyn Repository,
  /// Overrides the channel rule's tag when searching feeds
  pre_release_tag: Option<String>,
}

impl<'a> ReleasePlanBuilder<'a> {
  pub fn new(repository: &'a dyn Repository) -> Self {
    Self {
      repository,
      pre_release_tag: None,
    }
  }

  pub fn with_pre_release_tag(mut self, tag: Option<String>) -> Self {
    self.pre_release_tag = tag.filter(|t| !t.trim().is_empty());
    self
  }

  /// Build a plan for one project and channel
  ///
  /// A blank git reference counts as none.
  pub async fn build(
    &self,
    project: &ProjectResource,
    channel: Option<&ChannelResource>,
    resolver: &PackageVersionResolver,
    git_ref: Option<&str>,
  ) -> ReleaseResult<ReleasePlan> {
    match git_ref.map(str::trim).filter(|r| !r.is_empty()) {
      None => self.build_from_database(project, channel, resolver).await,
      Some(git_ref) => self.build_from_git_ref(project, channel, resolver, git_ref).await,
    }
  }

  async fn build_from_database(
    &self,
    project: &ProjectResource,
    channel: Option<&ChannelResource>,
    resolver: &PackageVersionResolver,
  ) -> ReleaseResult<ReleasePlan> {
    if project.is_version_controlled {
      return Err(ValidationError::GitReferenceMissing.into());
    }

    debug!("reading deployment process {} from the database", project.deployment_process_id);
    let process = self
      .repository
      .deployment_process(&project.deployment_process_id)
      .await?
      .ok_or_else(|| ReleaseError::not_found(format!("Could not find a deployment process for project {}", project.name)))?;

    let template = self
      .repository
      .release_template(project, &process, channel, None)
      .await?
      .ok_or_else(|| {
        ReleaseError::not_found(format!(
          "Could not find a release template for project {}, channel {}",
          project.name,
          channel_name(channel)
        ))
      })?;

    let plan = ReleasePlan::new(project, channel, &template, &process, resolver);
    self.complete(plan, project, channel, FeedKey::Id).await
  }

  async fn build_from_git_ref(
    &self,
    project: &ProjectResource,
    channel: Option<&ChannelResource>,
    resolver: &PackageVersionResolver,
    git_ref: &str,
  ) -> ReleaseResult<ReleasePlan> {
    if !project.is_version_controlled {
      return Err(
        ValidationError::GitReferenceNotSupported {
          git_ref: git_ref.to_string(),
        }
        .into(),
      );
    }

    debug!("reading deployment process of {} at {}", project.name, git_ref);
    let process = self
      .repository
      .deployment_process_at_git_ref(project, git_ref)
      .await?
      .ok_or_else(|| ReleaseError::not_found(format!("Could not find a deployment process for project {}", project.name)))?;

    let template = self
      .repository
      .release_template(project, &process, channel, Some(git_ref))
      .await?
      .ok_or_else(|| {
        ReleaseError::not_found(format!(
          "Could not find a release template for project {}, channel {}, git ref {}",
          project.name,
          channel_name(channel),
          git_ref
        ))
      })?;

    let plan = ReleasePlan::new(project, channel, &template, &process, resolver);
    self.complete(plan, project, channel, FeedKey::Name).await
  }

  /// Resolve what is left from feeds, then test every step against the channel
  async fn complete(
    &self,
    mut plan: ReleasePlan,
    project: &ProjectResource,
    channel: Option<&ChannelResource>,
    feed_key: FeedKey,
  ) -> ReleaseResult<ReleasePlan> {
    // Rule tests need the feed ID of every package step, resolved or not
    let feeds = self.load_feeds(&plan, feed_key, channel.is_some()).await?;

    for item in plan.package_steps.iter_mut().filter(|item| !item.is_resolved()) {
      if !item.source.is_resolvable() {
        error!(
          "The version of step {} cannot be automatically resolved because the feed or package ID is dynamic",
          item.display_name()
        );
        continue;
      }

      let feed_ref = item.source.feed_id();
      let feed = feeds.get(&feed_ref.to_ascii_lowercase()).ok_or_else(|| {
        ReleaseError::not_found(format!(
          "Could not find a feed with ID or name {} for project {}",
          feed_ref, project.name
        ))
      })?;

      self.resolve_from_feed(item, feed, channel).await?;
    }

    if let Some(channel) = channel {
      for item in plan.package_steps.iter_mut() {
        let rule = find_rule(channel, &item.action_name, item.package_reference_name.as_deref());
        let feed_id = feeds
          .get(&item.source.feed_id().to_ascii_lowercase())
          .map(|feed| feed.id.clone())
          .unwrap_or_else(|| item.source.feed_id().to_string());
        let result = test_rule(self.repository, rule, item.version.as_deref(), &feed_id).await?;
        item.channel_version_rule_test_result = Some(result);
      }
    }

    info!(
      "built release plan for {} in channel {}: {} package step(s), {} script step(s)",
      project.name,
      channel_name(channel),
      plan.package_steps.len(),
      plan.script_steps.len()
    );
    Ok(plan)
  }

  /// Fetch the feeds the plan refers to in a single call
  ///
  /// Only unresolved steps are looked up unless `include_resolved` is set.
  /// The map is keyed on the lowercased ID or name.
  async fn load_feeds(
    &self,
    plan: &ReleasePlan,
    feed_key: FeedKey,
    include_resolved: bool,
  ) -> ReleaseResult<HashMap<String, FeedResource>> {
    let mut wanted: Vec<String> = plan
      .package_steps
      .iter()
      .filter(|item| (include_resolved || !item.is_resolved()) && item.source.is_resolvable())
      .map(|item| item.source.feed_id().to_string())
      .collect();
    wanted.sort();
    wanted.dedup();

    if wanted.is_empty() {
      return Ok(HashMap::new());
    }

    let feeds = self.repository.feeds(&wanted).await?;
    Ok(
      feeds
        .into_iter()
        .map(|feed| {
          let key = match feed_key {
            FeedKey::Id => feed.id.to_ascii_lowercase(),
            FeedKey::Name => feed.name.to_ascii_lowercase(),
          };
          (key, feed)
        })
        .collect(),
    )
  }

  async fn resolve_from_feed(
    &self,
    item: &mut ReleasePlanItem,
    feed: &FeedResource,
    channel: Option<&ChannelResource>,
  ) -> ReleaseResult<()> {
    let rule = channel.and_then(|c| find_rule(c, &item.action_name, item.package_reference_name.as_deref()));
    let filter = PackageSearchFilter {
      package_id: item.package_id().to_string(),
      version_range: rule.and_then(|r| r.version_range.clone()).filter(|r| !r.is_empty()),
      pre_release_tag: self
        .pre_release_tag
        .clone()
        .or_else(|| rule.and_then(|r| r.tag.clone()).filter(|t| !t.is_empty())),
      take: 1,
    };

    debug!(
      "searching feed {} for {} (range {:?}, tag {:?})",
      feed.name, filter.package_id, filter.version_range, filter.pre_release_tag
    );
    let packages = self.repository.search_packages(feed, &filter).await?;

    match packages.into_iter().next() {
      Some(latest) => {
        debug!("step {} resolved to {}", item.display_name(), latest.version);
        item.version = Some(latest.version);
        item.version_source = VersionSource::AutoResolved;
      }
      None => {
        error!(
          "Could not find any packages with ID {} in feed {} for step {}",
          filter.package_id,
          feed.name,
          item.display_name()
        );
      }
    }
    Ok(())
  }
}

/// How template feed references are matched to feeds
#[derive(Debug, Clone, Copy)]
enum FeedKey {
  Id,
  /// Version-controlled processes refer to feeds by name
  Name,
}

fn channel_name(channel: Option<&ChannelResource>) -> &str {
  channel.map(|c| c.name.as_str()).unwrap_or("(none)")
}
