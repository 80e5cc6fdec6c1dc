//! Scan folder command implementation
//!
//! Lists the packages `--packagesFolder` would pick up, without a server.

use crate::core::error::ReleaseResult;
use crate::utils::pad;
use crate::versions::folder;
use std::path::Path;

/// Run the scan-folder command
pub fn run_scan_folder(path: &Path, json: bool) -> ReleaseResult<()> {
  let packages = folder::scan(path)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&packages)?);
    return Ok(());
  }

  if packages.is_empty() {
    println!("⚠️  No packages found in {}", path.display());
    return Ok(());
  }

  let id_width = packages.iter().map(|p| p.package_id.chars().count()).max().unwrap_or(0);
  let version_width = packages.iter().map(|p| p.version.chars().count()).max().unwrap_or(0);

  println!("📦 {} package(s) in {}", packages.len(), path.display());
  println!();
  for package in &packages {
    println!(
      "   {}  {}  {}",
      pad(&package.package_id, id_width),
      pad(&package.version, version_width),
      package.path
    );
  }

  Ok(())
}
