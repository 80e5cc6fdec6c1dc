//! Release plan: every step of a release and the package version it will use
//!
//! A plan is built once per release attempt. Package steps come 1:1 from the
//! server's release template and are resolved eagerly against the
//! command-line versions; script steps come from the deployment process. The
//! builder fills in the rest, and the predicates here decide whether the plan
//! can become a release.

use super::rules::ChannelRuleTestResult;
use crate::client::model::{
  ChannelResource, DeploymentProcessResource, ProjectResource, ReleaseTemplatePackage, ReleaseTemplateResource,
  SelectedPackage,
};
use crate::core::error::{ReleaseResult, ValidationError};
use crate::utils::pad;
use crate::versions::{PackageVersion, PackageVersionResolver};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Plan identifier (SHA256 hash of the selections)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanId(String);

impl PlanId {
  pub fn from_contents(contents: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    Self(format!("{:x}", hasher.finalize()))
  }

  /// First 12 characters
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// Where a step's version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
  /// Supplied with --package, --packagesFolder or --defaultPackageVersion
  Explicit,
  /// Latest matching version found in the feed
  AutoResolved,
  /// Not resolved yet
  NotApplicable,
}

impl fmt::Display for VersionSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionSource::Explicit => write!(f, "Specified explicitly"),
      VersionSource::AutoResolved => write!(f, "Latest available"),
      VersionSource::NotApplicable => write!(f, "Cannot resolve"),
    }
  }
}

/// How the package of a step can be located before deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackageSource {
  /// Feed and package ID are fixed, so the feed can be searched
  Resolvable { package_id: String, feed_id: String },
  /// Feed or package ID is an expression bound at deploy time
  Dynamic { package_id: String, feed_id: String },
}

impl PackageSource {
  pub fn package_id(&self) -> &str {
    match self {
      PackageSource::Resolvable { package_id, .. } | PackageSource::Dynamic { package_id, .. } => package_id,
    }
  }

  pub fn feed_id(&self) -> &str {
    match self {
      PackageSource::Resolvable { feed_id, .. } | PackageSource::Dynamic { feed_id, .. } => feed_id,
    }
  }

  pub fn is_resolvable(&self) -> bool {
    matches!(self, PackageSource::Resolvable { .. })
  }
}

/// One package reference of a deployment step
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlanItem {
  pub action_name: String,
  pub package_reference_name: Option<String>,
  pub source: PackageSource,
  pub version: Option<String>,
  pub version_source: VersionSource,
  /// None until tested; a null result means no rule applies
  pub channel_version_rule_test_result: Option<ChannelRuleTestResult>,
  pub is_disabled: bool,
}

impl ReleasePlanItem {
  fn from_template(
    package: &ReleaseTemplatePackage,
    process: &DeploymentProcessResource,
    resolver: &PackageVersionResolver,
  ) -> Self {
    let source = if package.is_resolvable {
      PackageSource::Resolvable {
        package_id: package.package_id.clone(),
        feed_id: package.feed_id.clone(),
      }
    } else {
      PackageSource::Dynamic {
        package_id: package.package_id.clone(),
        feed_id: package.feed_id.clone(),
      }
    };

    let version = resolver
      .resolve_version(
        &package.action_name,
        &package.package_id,
        package.package_reference_name.as_deref(),
      )
      .filter(|v| !v.trim().is_empty());
    let version_source = if version.is_some() {
      VersionSource::Explicit
    } else {
      VersionSource::NotApplicable
    };

    let is_disabled = process
      .find_action(&package.action_name)
      .is_some_and(|action| action.is_disabled);

    Self {
      action_name: package.action_name.clone(),
      package_reference_name: package.package_reference_name.clone().filter(|r| !r.is_empty()),
      source,
      version,
      version_source,
      channel_version_rule_test_result: None,
      is_disabled,
    }
  }

  pub fn package_id(&self) -> &str {
    self.source.package_id()
  }

  pub fn is_resolved(&self) -> bool {
    self.version.as_deref().is_some_and(|v| !v.trim().is_empty())
  }

  pub fn violates_channel_rule(&self) -> bool {
    self
      .channel_version_rule_test_result
      .is_some_and(|result| !result.is_satisfied())
  }

  /// Step name, plus the package reference when there is one
  pub fn display_name(&self) -> String {
    match &self.package_reference_name {
      Some(reference) => format!("{}:{}", self.action_name, reference),
      None => self.action_name.clone(),
    }
  }
}

/// A deployment action that runs without a package
#[derive(Debug, Clone, Serialize)]
pub struct ScriptStep {
  pub action_name: String,
  pub is_disabled: bool,
  /// Channel IDs the action is limited to; empty means every channel
  pub channels: Vec<String>,
}

/// Either kind of step, for code that walks the whole plan
#[derive(Debug, Clone, Copy)]
pub enum PlanStep<'a> {
  Package(&'a ReleasePlanItem),
  Script(&'a ScriptStep),
}

impl PlanStep<'_> {
  pub fn is_enabled(&self) -> bool {
    match self {
      PlanStep::Package(item) => !item.is_disabled,
      PlanStep::Script(step) => !step.is_disabled,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
  pub project_name: String,
  /// None when the server predates channels
  pub channel: Option<ChannelResource>,
  pub release_template: ReleaseTemplateResource,
  pub package_steps: Vec<ReleasePlanItem>,
  pub script_steps: Vec<ScriptStep>,
}

impl ReleasePlan {
  pub fn new(
    project: &ProjectResource,
    channel: Option<&ChannelResource>,
    release_template: &ReleaseTemplateResource,
    process: &DeploymentProcessResource,
    resolver: &PackageVersionResolver,
  ) -> Self {
    let channel_id = channel.map(|c| c.id.as_str());

    let script_steps = process
      .actions()
      .filter(|action| !action.has_package() && !action.is_disabled)
      .filter(|action| action.runs_in_channel(channel_id))
      .map(|action| ScriptStep {
        action_name: action.name.clone(),
        is_disabled: action.is_disabled,
        channels: action.channels.clone(),
      })
      .collect();

    let package_steps = release_template
      .packages
      .iter()
      .map(|package| ReleasePlanItem::from_template(package, process, resolver))
      .collect();

    Self {
      project_name: project.name.clone(),
      channel: channel.cloned(),
      release_template: release_template.clone(),
      package_steps,
      script_steps,
    }
  }

  /// Package steps and script steps, packages first
  pub fn steps(&self) -> impl Iterator<Item = PlanStep<'_>> {
    self
      .package_steps
      .iter()
      .map(PlanStep::Package)
      .chain(self.script_steps.iter().map(PlanStep::Script))
  }

  pub fn unresolved_steps(&self) -> impl Iterator<Item = &ReleasePlanItem> {
    self.package_steps.iter().filter(|item| !item.is_resolved())
  }

  pub fn has_unresolved_steps(&self) -> bool {
    self.unresolved_steps().next().is_some()
  }

  pub fn has_steps_violating_channel_version_rules(&self) -> bool {
    self.channel.is_some() && self.package_steps.iter().any(ReleasePlanItem::violates_channel_rule)
  }

  pub fn channel_has_any_enabled_steps(&self) -> bool {
    self.steps().any(|step| step.is_enabled())
  }

  pub fn is_viable_release_plan(&self) -> bool {
    !self.has_unresolved_steps() && !self.has_steps_violating_channel_version_rules() && self.channel_has_any_enabled_steps()
  }

  /// Why the plan is not viable, or None when it is
  pub fn non_viable_reason(&self, ignore_channel_rules: bool) -> Option<String> {
    if self.has_unresolved_steps() {
      let names: Vec<String> = self.unresolved_steps().map(ReleasePlanItem::display_name).collect();
      return Some(format!("no version could be resolved for {}", names.join(", ")));
    }
    if !ignore_channel_rules && self.has_steps_violating_channel_version_rules() {
      let names: Vec<String> = self
        .package_steps
        .iter()
        .filter(|item| item.violates_channel_rule())
        .map(ReleasePlanItem::display_name)
        .collect();
      return Some(format!(
        "{} violate the version rules of channel {}",
        names.join(", "),
        self.channel_name()
      ));
    }
    if !self.channel_has_any_enabled_steps() {
      return Some(format!("channel {} has no enabled steps", self.channel_name()));
    }
    None
  }

  /// Highest version across all package steps
  pub fn highest_version_number(&self) -> ReleaseResult<String> {
    if self.package_steps.is_empty() {
      return Err(ValidationError::NoPackageSteps.into());
    }

    let mut highest: Option<PackageVersion> = None;
    for item in &self.package_steps {
      let raw = item.version.as_deref().unwrap_or_default();
      let version = PackageVersion::try_parse(raw).ok_or_else(|| ValidationError::InvalidVersion {
        version: raw.to_string(),
        context: format!("package version of step {}", item.display_name()),
      })?;
      if highest.as_ref().is_none_or(|current| version > *current) {
        highest = Some(version);
      }
    }

    Ok(highest.map(|v| v.to_string()).unwrap_or_default())
  }

  /// Resolved version of a specific step's package
  pub fn version_for_step(&self, action_name: &str, package_reference_name: Option<&str>) -> Option<&str> {
    let reference = package_reference_name.unwrap_or_default();
    self
      .package_steps
      .iter()
      .find(|item| {
        item.action_name.eq_ignore_ascii_case(action_name)
          && item.package_reference_name.as_deref().unwrap_or_default().eq_ignore_ascii_case(reference)
      })
      .and_then(|item| item.version.as_deref())
  }

  /// Packages to submit with the release
  pub fn selected_packages(&self) -> Vec<SelectedPackage> {
    self
      .package_steps
      .iter()
      .filter_map(|item| {
        item.version.as_ref().map(|version| SelectedPackage {
          action_name: item.action_name.clone(),
          package_reference_name: item.package_reference_name.clone(),
          version: version.clone(),
        })
      })
      .collect()
  }

  /// Fingerprint over the channel and every step's selection
  pub fn id(&self) -> PlanId {
    let mut contents = self.channel.as_ref().map(|c| c.id.clone()).unwrap_or_default();
    for item in &self.package_steps {
      contents.push('\n');
      contents.push_str(&item.action_name);
      contents.push(':');
      contents.push_str(item.package_reference_name.as_deref().unwrap_or_default());
      contents.push('=');
      contents.push_str(item.version.as_deref().unwrap_or_default());
    }
    PlanId::from_contents(contents.as_bytes())
  }

  pub fn channel_name(&self) -> &str {
    self.channel.as_ref().map(|c| c.name.as_str()).unwrap_or("(none)")
  }

  /// Render the plan as an aligned text table
  pub fn format_as_table(&self) -> String {
    let mut output = String::new();

    if self.package_steps.is_empty() && self.script_steps.is_empty() {
      output.push_str("   There are no steps in this release plan\n");
      return output;
    }

    let headers = ["#", "Name", "Version", "Source", "Version rules"];
    let mut rows: Vec<[String; 5]> = Vec::new();
    for (i, item) in self.package_steps.iter().enumerate() {
      let rules = match (&self.channel, item.channel_version_rule_test_result) {
        (None, _) => "n/a".to_string(),
        (Some(_), None) => "Not tested".to_string(),
        (Some(_), Some(result)) => result.summary().to_string(),
      };
      let mut name = item.display_name();
      if item.is_disabled {
        name.push_str(" (disabled)");
      }
      rows.push([
        (i + 1).to_string(),
        name,
        item.version.clone().unwrap_or_else(|| "(unresolved)".to_string()),
        item.version_source.to_string(),
        rules,
      ]);
    }

    if !rows.is_empty() {
      let mut widths = headers.map(str::len);
      for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
          *width = (*width).max(cell.chars().count());
        }
      }

      let line = |cells: &[String]| {
        let padded: Vec<String> = cells.iter().zip(widths.iter()).map(|(c, w)| pad(c, *w)).collect();
        format!("   {}\n", padded.join("  ").trim_end())
      };
      output.push_str(&line(&headers.map(str::to_string)));
      output.push_str(&line(&widths.map(|w| "-".repeat(w))));
      for row in &rows {
        output.push_str(&line(row));
      }
    }

    if !self.script_steps.is_empty() {
      if !rows.is_empty() {
        output.push('\n');
      }
      output.push_str("   Steps without packages:\n");
      for step in &self.script_steps {
        output.push_str(&format!("   - {}\n", step.action_name));
      }
    }

    output
  }
}

impl fmt::Display for ReleasePlan {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.format_as_table())
  }
}
