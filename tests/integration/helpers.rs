//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch directory to run the binary in
pub struct TestDir {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestDir {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    Ok(Self { _root: root, path })
  }

  /// Write a file, creating parent directories
  pub fn write_file(&self, relative: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = self.path.join(relative);
    if let Some(parent) = file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file_path, content)?;
    Ok(file_path)
  }

  /// Write a `.nupkg` archive whose manifest carries `id` and `version`
  pub fn write_nupkg(&self, relative: &str, id: &str, version: &str) -> Result<PathBuf> {
    let file_path = self.write_file(relative, &[])?;
    let file = std::fs::File::create(&file_path)?;
    let mut archive = zip::ZipWriter::new(file);
    archive.start_file(format!("{}.nuspec", id), zip::write::SimpleFileOptions::default())?;
    write!(
      archive,
      r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>{}</id>
    <version>{}</version>
    <authors>Test Author</authors>
  </metadata>
</package>
"#,
      id, version
    )?;
    archive.finish()?;
    Ok(file_path)
  }
}

/// Command for the octo-release binary with server settings cleared from the environment
pub fn octo_release(cwd: &Path, args: &[&str]) -> Command {
  let mut command = Command::new(env!("CARGO_BIN_EXE_octo-release"));
  command
    .current_dir(cwd)
    .args(args)
    .env_remove("OCTOPUS_URL")
    .env_remove("OCTOPUS_API_KEY")
    .env_remove("OCTOPUS_SPACE")
    .env("RUST_LOG", "warn");
  command
}

/// Run octo-release and return its output, whatever the exit status
pub fn run_octo_release_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  octo_release(cwd, args).output().context("Failed to run octo-release")
}

/// Run octo-release and fail unless it succeeds
pub fn run_octo_release(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_octo_release_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "octo-release command failed: octo-release {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run octo-release off the async runtime so a mock server on it keeps serving
pub async fn run_octo_release_async(cwd: &Path, args: &[&str]) -> Result<Output> {
  let cwd = cwd.to_path_buf();
  let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
  tokio::task::spawn_blocking(move || {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_octo_release_raw(&cwd, &args)
  })
  .await?
}
