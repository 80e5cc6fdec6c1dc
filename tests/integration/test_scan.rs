//! Integration tests for `octo-release scan-folder`

use crate::helpers::{TestDir, run_octo_release, run_octo_release_raw};
use anyhow::Result;

#[test]
fn test_scan_lists_packages() -> Result<()> {
  let dir = TestDir::new()?;
  dir.write_file("packages/Acme.Web.1.2.0.zip", b"zip")?;
  dir.write_file("packages/nested/acme.worker.2.0.0-beta.1.tar.gz", b"tgz")?;
  dir.write_file("packages/README.md", b"not a package")?;

  let output = run_octo_release(&dir.path, &["scan-folder", "packages"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("2 package(s)"), "stdout: {}", stdout);
  assert!(stdout.contains("Acme.Web"));
  assert!(stdout.contains("2.0.0-beta.1"));
  assert!(!stdout.contains("README"));

  Ok(())
}

#[test]
fn test_scan_json_reads_nupkg_manifest() -> Result<()> {
  let dir = TestDir::new()?;
  dir.write_nupkg("packages/build-output.nupkg", "Acme.Api", "3.1.0")?;

  let output = run_octo_release(&dir.path, &["scan-folder", "packages", "--json"])?;
  let found: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  let found = found.as_array().expect("scan output is an array");
  assert_eq!(found.len(), 1);
  assert_eq!(found[0]["package_id"], "Acme.Api");
  assert_eq!(found[0]["version"], "3.1.0");

  Ok(())
}

#[test]
fn test_scan_empty_folder() -> Result<()> {
  let dir = TestDir::new()?;
  std::fs::create_dir_all(dir.path.join("packages"))?;

  let output = run_octo_release(&dir.path, &["scan-folder", "packages"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("No packages found"));

  Ok(())
}

#[test]
fn test_scan_missing_folder_fails() -> Result<()> {
  let dir = TestDir::new()?;

  let output = run_octo_release_raw(&dir.path, &["scan-folder", "missing"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("does not exist"), "stderr: {}", stderr);

  Ok(())
}
