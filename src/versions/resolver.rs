//! Version assignments supplied on the command line
//!
//! Operators can pin versions globally (`--defaultPackageVersion`), per step,
//! per package ID, or per step and named package reference. The resolver keeps
//! every assignment and answers "which version applies here" by walking from
//! the most specific key to the least specific one.

use super::folder;
use super::key::{PackageKey, WILDCARD};
use super::version::PackageVersion;
use crate::core::error::{ReleaseResult, ValidationError};
use std::collections::HashMap;
use std::path::Path;

/// Characters accepted between the parts of a `--package` value
pub const DELIMITERS: [char; 3] = [':', '=', '/'];

#[derive(Debug, Clone, Default)]
pub struct PackageVersionResolver {
  versions: HashMap<PackageKey, String>,
  default_version: Option<String>,
}

impl PackageVersionResolver {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse and store a combined `identifier[:packageRef]:version` value
  ///
  /// Two parts assign the step's unnamed package; three parts name the
  /// reference, and an empty middle part (`Step::1.0.0`) selects the unnamed
  /// package explicitly.
  pub fn add_spec(&mut self, spec: &str) -> ReleaseResult<()> {
    let invalid = |reason: &str| ValidationError::InvalidPackageSpec {
      spec: spec.to_string(),
      reason: reason.to_string(),
    };

    let parts: Vec<&str> = spec.split(DELIMITERS).map(str::trim).collect();
    match parts.as_slice() {
      [id, version] => {
        if id.is_empty() || version.is_empty() {
          return Err(invalid("the step name or package ID and the version must both be supplied").into());
        }
        self.add(id, version);
      }
      [id, reference, version] => {
        if id.is_empty() || version.is_empty() {
          return Err(invalid("the step name or package ID and the version must both be supplied").into());
        }
        self.add_reference(id, reference, version);
      }
      [_] => return Err(invalid("expected an identifier and a version separated by ':', '=' or '/'").into()),
      _ => return Err(invalid("expected at most three values: identifier, package reference and version").into()),
    }

    Ok(())
  }

  /// Assign a version to the unnamed package of a step or package ID
  ///
  /// A bare wildcard identifier means "everything" and sets the default.
  pub fn add(&mut self, step_or_package_id: &str, package_version: &str) {
    if step_or_package_id.trim() == WILDCARD {
      self.set_default(package_version);
      return;
    }
    self.add_reference(step_or_package_id, "", package_version);
  }

  /// Assign a version to a named package reference of a step or package ID
  ///
  /// When a value already exists the higher version is kept if both parse;
  /// otherwise the newest value replaces the old one.
  pub fn add_reference(&mut self, step_or_package_id: &str, package_reference_name: &str, package_version: &str) {
    if step_or_package_id.trim() == WILDCARD && package_reference_name.trim() == WILDCARD {
      self.set_default(package_version);
      return;
    }

    let key = PackageKey::new(step_or_package_id, package_reference_name);
    let package_version = package_version.trim().to_string();

    if let Some(current) = self.versions.get(&key) {
      let incoming = PackageVersion::try_parse(&package_version);
      let existing = PackageVersion::try_parse(current);
      if let (Some(incoming), Some(existing)) = (incoming, existing)
        && incoming <= existing
      {
        tracing::debug!(
          "keeping {} for {} over lower or equal {}",
          current,
          key,
          package_version
        );
        return;
      }
    }

    tracing::debug!("version {} assigned to {}", package_version, key);
    self.versions.insert(key, package_version);
  }

  /// Set the version used when nothing more specific matches
  ///
  /// Rejects values that do not parse and contain a delimiter, since those are
  /// almost always a keyed `--package` value passed to the wrong option.
  pub fn default_version(&mut self, version: &str) -> ReleaseResult<()> {
    let version = version.trim();
    if PackageVersion::try_parse(version).is_none() && version.contains(DELIMITERS) {
      return Err(
        ValidationError::InvalidDefaultVersion {
          version: version.to_string(),
        }
        .into(),
      );
    }
    self.set_default(version);
    Ok(())
  }

  fn set_default(&mut self, version: &str) {
    tracing::debug!("default package version set to {}", version.trim());
    self.default_version = Some(version.trim().to_string());
  }

  /// Scan a folder of package archives and assign each discovered version
  pub fn add_folder(&mut self, path: &Path) -> ReleaseResult<usize> {
    let found = folder::scan(path)?;
    for package in &found {
      self.add(&package.package_id, &package.version);
    }
    Ok(found.len())
  }

  /// Resolve the version for a step's package
  ///
  /// Order, first hit wins, step name before package ID at each level:
  /// 1. exact `(step, reference)` then `(package, reference)`
  /// 2. `(*, reference)`
  /// 3. `(step, *)` then `(package, *)`
  /// 4. the default version
  pub fn resolve_version(
    &self,
    step_name: &str,
    package_id: &str,
    package_reference_name: Option<&str>,
  ) -> Option<String> {
    let reference = package_reference_name.unwrap_or_default();
    let identifiers = [step_name, package_id];

    let exact = identifiers.iter().map(|id| PackageKey::new(id, reference));
    let any_step = std::iter::once(PackageKey::new(WILDCARD, reference));
    let any_reference = identifiers.iter().map(|id| PackageKey::new(id, WILDCARD));

    exact
      .chain(any_step)
      .chain(any_reference)
      .find_map(|key| self.versions.get(&key).cloned())
      .or_else(|| self.default_version.clone())
  }

  /// Whether any assignment or default has been supplied
  pub fn is_empty(&self) -> bool {
    self.versions.is_empty() && self.default_version.is_none()
  }
}
