use std::fmt;

/// Token that matches any step, package ID or package reference
pub const WILDCARD: &str = "*";

/// Lookup key for a version assignment: a step name or package ID paired with
/// a package reference name. Both halves are case-folded on construction so
/// equality and hashing ignore case. An empty reference is the step's unnamed
/// package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageKey {
  step_or_package_id: String,
  package_reference_name: String,
}

impl PackageKey {
  pub fn new(step_or_package_id: &str, package_reference_name: &str) -> Self {
    Self {
      step_or_package_id: step_or_package_id.trim().to_lowercase(),
      package_reference_name: package_reference_name.trim().to_lowercase(),
    }
  }
}

impl fmt::Display for PackageKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.package_reference_name.is_empty() {
      write!(f, "{}", self.step_or_package_id)
    } else {
      write!(f, "{}:{}", self.step_or_package_id, self.package_reference_name)
    }
  }
}
