//! Discover package versions from a folder of built artifacts
//!
//! `.nupkg` archives carry their identity in an embedded `.nuspec` manifest.
//! Everything else is identified by its file name,
//! `{packageId}.{version}{extension}`.

use crate::core::error::{ReleaseResult, ResultExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

const MANIFEST_ARCHIVE_EXTENSION: &str = ".nupkg";

/// Archive extensions identified by file name, longest first so `.tar.gz`
/// is tried before `.tar`
pub const FILENAME_EXTENSIONS: [&str; 7] = [".tar.bz2", ".tar.gz", ".tar.bz", ".zip", ".tgz", ".tbz", ".tar"];

// An ID token is a run of word characters with at least one non-digit, so a
// bare number can never be mistaken for part of the ID.
static PACKAGE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
  let token = r"[0-9]*[A-Za-z_][A-Za-z0-9_]*";
  let identifier = r"[0-9A-Za-z-]+";
  let pattern = format!(
    r"^(?P<id>{token}(?:[._-]{token})*?)\.(?P<version>\d+(?:\.\d+){{0,3}}(?:-{identifier}(?:\.{identifier})*)?(?:\+{identifier}(?:\.{identifier})*)?)$"
  );
  Regex::new(&pattern).expect("package filename pattern is valid")
});

/// A package found in a folder scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundPackage {
  pub package_id: String,
  pub version: String,
  pub path: String,
}

#[derive(Debug, Deserialize)]
struct Nuspec {
  metadata: NuspecMetadata,
}

#[derive(Debug, Deserialize)]
struct NuspecMetadata {
  id: String,
  version: String,
}

/// Split a file name into package ID and version
///
/// Returns None when the extension is not a known archive type or the stem
/// does not follow `{packageId}.{version}`.
pub fn parse_package_filename(file_name: &str) -> Option<(String, String)> {
  let lower = file_name.to_ascii_lowercase();
  let extension = FILENAME_EXTENSIONS.iter().find(|ext| lower.ends_with(*ext))?;
  let stem = &file_name[..file_name.len() - extension.len()];

  let captures = PACKAGE_FILENAME.captures(stem)?;
  Some((captures["id"].to_string(), captures["version"].to_string()))
}

/// Read package ID and version from a `.nupkg` manifest
pub fn read_manifest(path: &Path) -> ReleaseResult<(String, String)> {
  let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
  let mut archive = zip::ZipArchive::new(file)?;

  for index in 0..archive.len() {
    let mut entry = archive.by_index(index)?;
    let name = entry.name().to_string();
    if name.contains('/') || !name.to_ascii_lowercase().ends_with(".nuspec") {
      continue;
    }

    let mut xml = String::new();
    entry
      .read_to_string(&mut xml)
      .with_context(|| format!("Failed to read {} from {}", name, path.display()))?;
    let nuspec: Nuspec = quick_xml::de::from_str(&xml)?;
    return Ok((nuspec.metadata.id.trim().to_string(), nuspec.metadata.version.trim().to_string()));
  }

  Err(format!("No .nuspec manifest found in {}", path.display()).into())
}

/// Recursively scan a folder for package archives
pub fn scan(folder: &Path) -> ReleaseResult<Vec<FoundPackage>> {
  if !folder.is_dir() {
    return Err(format!("Packages folder {} does not exist or is not a directory", folder.display()).into());
  }

  let mut found = Vec::new();
  for entry in WalkDir::new(folder).follow_links(false).sort_by_file_name() {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }

    let path = entry.path();
    let file_name = entry.file_name().to_string_lossy().into_owned();

    let identity = if file_name.to_ascii_lowercase().ends_with(MANIFEST_ARCHIVE_EXTENSION) {
      match read_manifest(path) {
        Ok(identity) => Some(identity),
        Err(e) => {
          tracing::warn!("could not read package manifest from {}: {}", path.display(), e);
          let stem = &file_name[..file_name.len() - MANIFEST_ARCHIVE_EXTENSION.len()];
          PACKAGE_FILENAME
            .captures(stem)
            .map(|c| (c["id"].to_string(), c["version"].to_string()))
        }
      }
    } else {
      parse_package_filename(&file_name)
    };

    match identity {
      Some((package_id, version)) => {
        tracing::debug!("found {} {} at {}", package_id, version, path.display());
        found.push(FoundPackage {
          package_id,
          version,
          path: path.display().to_string(),
        });
      }
      None => tracing::debug!("skipping {}", path.display()),
    }
  }

  Ok(found)
}
