//! Structured package versions and their ordering
//!
//! Accepts `major[.minor[.patch[.revision]]][-prerelease][+build]`. Missing
//! numeric parts count as zero, pre-release identifiers follow SemVer 2.0
//! precedence, and build metadata never affects ordering.

use semver::{BuildMetadata, Prerelease};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed package version
#[derive(Debug, Clone)]
pub struct PackageVersion {
  pub major: u64,
  pub minor: u64,
  pub patch: u64,
  pub revision: u64,
  pub pre: Prerelease,
  pub build: BuildMetadata,
  original: String,
}

impl PackageVersion {
  /// Parse a version, returning None for anything that is not structured
  /// (Docker tags such as `latest`, blank strings, ...)
  pub fn try_parse(value: &str) -> Option<Self> {
    value.parse().ok()
  }
}

impl FromStr for PackageVersion {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    let original = value.trim();
    if original.is_empty() {
      return Err("version is empty".to_string());
    }

    let (rest, build) = match original.split_once('+') {
      Some((rest, build)) => (rest, BuildMetadata::new(build).map_err(|e| e.to_string())?),
      None => (original, BuildMetadata::EMPTY),
    };
    let (numbers, pre) = match rest.split_once('-') {
      Some((numbers, pre)) => (numbers, Prerelease::new(pre).map_err(|e| e.to_string())?),
      None => (rest, Prerelease::EMPTY),
    };

    let parts: Vec<&str> = numbers.split('.').collect();
    if parts.len() > 4 {
      return Err(format!("too many numeric parts in '{}'", original));
    }

    let mut values = [0u64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
      if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not a number in '{}'", part, original));
      }
      *slot = part.parse().map_err(|_| format!("'{}' is out of range in '{}'", part, original))?;
    }

    Ok(Self {
      major: values[0],
      minor: values[1],
      patch: values[2],
      revision: values[3],
      pre,
      build,
      original: original.to_string(),
    })
  }
}

impl Ord for PackageVersion {
  fn cmp(&self, other: &Self) -> Ordering {
    (self.major, self.minor, self.patch, self.revision)
      .cmp(&(other.major, other.minor, other.patch, other.revision))
      .then_with(|| self.pre.cmp(&other.pre))
  }
}

impl PartialOrd for PackageVersion {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for PackageVersion {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for PackageVersion {}

impl fmt::Display for PackageVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.original)
  }
}
