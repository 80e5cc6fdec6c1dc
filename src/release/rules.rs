//! Channel version rules: which rule governs a package step, and whether a
//! candidate version satisfies it
//!
//! Finding the rule is a pure scan over the channel. Judging a version against
//! a range and tag is the server's job and goes through [`RuleValidator`].

use crate::client::model::{ChannelResource, ChannelVersionRule, VersionRuleTestRequest, VersionRuleTestResponse};
use crate::core::error::ReleaseResult;
use async_trait::async_trait;
use serde::Serialize;

/// Remote check of a version against a rule's range and pre-release tag
#[async_trait]
pub trait RuleValidator: Send + Sync {
  async fn test_version_rule(&self, request: &VersionRuleTestRequest) -> ReleaseResult<VersionRuleTestResponse>;
}

/// Outcome of testing a step's version against its channel rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelRuleTestResult {
  pub satisfies_version_range: bool,
  pub satisfies_pre_release_tag: bool,
  /// Set when no rule applied, so anything goes
  pub is_null: bool,
}

impl ChannelRuleTestResult {
  /// Result for a step no rule applies to
  pub fn null() -> Self {
    Self {
      satisfies_version_range: true,
      satisfies_pre_release_tag: true,
      is_null: true,
    }
  }

  /// Result for a step with a rule but no version to test
  pub fn failed() -> Self {
    Self {
      satisfies_version_range: false,
      satisfies_pre_release_tag: false,
      is_null: false,
    }
  }

  pub fn is_satisfied(&self) -> bool {
    self.satisfies_version_range && self.satisfies_pre_release_tag
  }

  /// Short label for plan tables
  pub fn summary(&self) -> &'static str {
    match (self.is_null, self.satisfies_version_range, self.satisfies_pre_release_tag) {
      (true, _, _) => "Allowed",
      (false, true, true) => "Passed",
      (false, false, true) => "Range",
      (false, true, false) => "Tag",
      (false, false, false) => "Range+Tag",
    }
  }
}

impl From<VersionRuleTestResponse> for ChannelRuleTestResult {
  fn from(response: VersionRuleTestResponse) -> Self {
    Self {
      satisfies_version_range: response.satisfies_version_range,
      satisfies_pre_release_tag: response.satisfies_pre_release_tag,
      is_null: false,
    }
  }
}

/// First rule of the channel scoped to this action and package reference
///
/// Names compare exactly. A missing package reference on either side counts
/// as the unnamed package.
pub fn find_rule<'a>(
  channel: &'a ChannelResource,
  action_name: &str,
  package_reference_name: Option<&str>,
) -> Option<&'a ChannelVersionRule> {
  let reference = package_reference_name.unwrap_or_default();
  channel.rules.iter().find(|rule| {
    rule.action_packages.iter().any(|scope| {
      scope.deployment_action == action_name && scope.package_reference.as_deref().unwrap_or_default() == reference
    })
  })
}

/// Test a candidate version against a rule
///
/// No rule means anything goes; a rule with no candidate version always fails
/// and never reaches the server.
pub async fn test_rule<V>(
  validator: &V,
  rule: Option<&ChannelVersionRule>,
  version: Option<&str>,
  feed_id: &str,
) -> ReleaseResult<ChannelRuleTestResult>
where
  V: RuleValidator + ?Sized,
{
  let Some(rule) = rule else {
    return Ok(ChannelRuleTestResult::null());
  };

  let Some(version) = version.filter(|v| !v.trim().is_empty()) else {
    return Ok(ChannelRuleTestResult::failed());
  };

  let request = VersionRuleTestRequest {
    version: version.to_string(),
    version_range: rule.version_range.clone(),
    pre_release_tag: rule.tag.clone(),
    feed_id: feed_id.to_string(),
  };
  let response = validator.test_version_rule(&request).await?;
  tracing::debug!(
    "version {} against range {:?} tag {:?}: range={} tag={}",
    version,
    rule.version_range,
    rule.tag,
    response.satisfies_version_range,
    response.satisfies_pre_release_tag
  );
  Ok(response.into())
}
