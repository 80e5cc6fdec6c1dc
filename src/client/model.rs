//! Resources exchanged with the deployment server
//!
//! Field names follow the server's PascalCase JSON. Collections default to
//! empty so partial payloads from older servers still deserialize.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Action property naming the package an action deploys
pub const PACKAGE_ID_PROPERTY: &str = "Octopus.Action.Package.PackageId";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectResource {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub deployment_process_id: String,
  #[serde(default)]
  pub is_version_controlled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChannelResource {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub is_default: bool,
  #[serde(default)]
  pub rules: Vec<ChannelVersionRule>,
}

/// A version constraint scoped to a set of (action, package reference) pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChannelVersionRule {
  #[serde(default)]
  pub version_range: Option<String>,
  #[serde(default)]
  pub tag: Option<String>,
  #[serde(default)]
  pub action_packages: Vec<DeploymentActionPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentActionPackage {
  pub deployment_action: String,
  #[serde(default)]
  pub package_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentProcessResource {
  pub id: String,
  #[serde(default)]
  pub steps: Vec<DeploymentStepResource>,
}

impl DeploymentProcessResource {
  /// All actions across all steps, in process order
  pub fn actions(&self) -> impl Iterator<Item = &DeploymentActionResource> {
    self.steps.iter().flat_map(|step| step.actions.iter())
  }

  pub fn find_action(&self, name: &str) -> Option<&DeploymentActionResource> {
    self.actions().find(|action| action.name == name)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentStepResource {
  pub name: String,
  #[serde(default)]
  pub actions: Vec<DeploymentActionResource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentActionResource {
  pub name: String,
  #[serde(default)]
  pub is_disabled: bool,
  #[serde(default)]
  pub properties: HashMap<String, serde_json::Value>,
  /// Channel IDs the action is limited to; empty means every channel
  #[serde(default)]
  pub channels: Vec<String>,
}

impl DeploymentActionResource {
  pub fn has_package(&self) -> bool {
    self.properties.contains_key(PACKAGE_ID_PROPERTY)
  }

  /// Whether the action runs in the given channel
  pub fn runs_in_channel(&self, channel_id: Option<&str>) -> bool {
    match channel_id {
      _ if self.channels.is_empty() => true,
      Some(id) => self.channels.iter().any(|c| c == id),
      None => false,
    }
  }
}

/// Server-computed package references a release needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseTemplateResource {
  #[serde(default)]
  pub next_version_increment: Option<String>,
  #[serde(default)]
  pub versioning_package_step_name: Option<String>,
  #[serde(default)]
  pub versioning_package_reference_name: Option<String>,
  #[serde(default)]
  pub packages: Vec<ReleaseTemplatePackage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseTemplatePackage {
  pub action_name: String,
  #[serde(default)]
  pub package_reference_name: Option<String>,
  #[serde(default)]
  pub package_id: String,
  #[serde(default)]
  pub feed_id: String,
  /// False when the feed or package ID is bound at deploy time
  #[serde(default = "resolvable_by_default")]
  pub is_resolvable: bool,
  #[serde(default)]
  pub version_selected_last_release: Option<String>,
}

fn resolvable_by_default() -> bool {
  true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedResource {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub feed_type: Option<String>,
}

/// One package version returned by a feed search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageResource {
  pub package_id: String,
  pub version: String,
}

/// Filters for a feed search; results come back newest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSearchFilter {
  pub package_id: String,
  pub version_range: Option<String>,
  pub pre_release_tag: Option<String>,
  pub take: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionRuleTestRequest {
  pub version: String,
  pub version_range: Option<String>,
  pub pre_release_tag: Option<String>,
  pub feed_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionRuleTestResponse {
  pub satisfies_version_range: bool,
  pub satisfies_pre_release_tag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelectedPackage {
  pub action_name: String,
  #[serde(default)]
  pub package_reference_name: Option<String>,
  pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseResource {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub version: String,
  pub project_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub channel_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub release_notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version_control_reference: Option<String>,
  #[serde(default)]
  pub selected_packages: Vec<SelectedPackage>,
}

/// Paged collection wrapper used by list endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Page<T> {
  #[serde(default = "Vec::new")]
  pub items: Vec<T>,
}
