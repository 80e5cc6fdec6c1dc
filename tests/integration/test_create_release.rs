//! Integration tests for `octo-release create-release`

use crate::helpers::{TestDir, run_octo_release_async, run_octo_release_raw};
use anyhow::Result;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROCESS_ID: &str = "deploymentprocess-Projects-1";

/// Mount a one-step project whose feed offers `versions`, newest first
async fn mount_project(server: &MockServer, versions: &[&str]) {
  Mock::given(method("GET"))
    .and(path("/api/Spaces-1/projects/all"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
      "Id": "Projects-1",
      "Name": "Acme",
      "DeploymentProcessId": PROCESS_ID,
      "IsVersionControlled": false
    }])))
    .mount(server)
    .await;

  Mock::given(method("GET"))
    .and(path("/api/Spaces-1/projects/Projects-1/channels"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "Items": [{ "Id": "Channels-1", "Name": "Default", "IsDefault": true, "Rules": [] }]
    })))
    .mount(server)
    .await;

  Mock::given(method("GET"))
    .and(path(format!("/api/Spaces-1/deploymentprocesses/{}", PROCESS_ID)))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "Id": PROCESS_ID,
      "Steps": [{
        "Name": "Deploy Web",
        "Actions": [{
          "Name": "Deploy Web",
          "IsDisabled": false,
          "Properties": { "Octopus.Action.Package.PackageId": "Acme.Web" },
          "Channels": []
        }]
      }]
    })))
    .mount(server)
    .await;

  Mock::given(method("GET"))
    .and(path(format!("/api/Spaces-1/deploymentprocesses/{}/template", PROCESS_ID)))
    .and(query_param("channel", "Channels-1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "Packages": [{
        "ActionName": "Deploy Web",
        "PackageId": "Acme.Web",
        "FeedId": "Feeds-1",
        "IsResolvable": true
      }]
    })))
    .mount(server)
    .await;

  Mock::given(method("GET"))
    .and(path("/api/Spaces-1/feeds/all"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "Id": "Feeds-1", "Name": "Built-in" }])))
    .mount(server)
    .await;

  let items: Vec<Value> = versions
    .iter()
    .map(|v| json!({ "PackageId": "Acme.Web", "Version": v }))
    .collect();
  Mock::given(method("GET"))
    .and(path("/api/Spaces-1/feeds/Feeds-1/packages/versions"))
    .and(query_param("packageId", "Acme.Web"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Items": items })))
    .mount(server)
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whatif_prints_plan_without_creating() -> Result<()> {
  let server = MockServer::start().await;
  mount_project(&server, &["1.4.2"]).await;
  Mock::given(method("POST"))
    .and(path("/api/Spaces-1/releases"))
    .respond_with(ResponseTemplate::new(201))
    .expect(0)
    .mount(&server)
    .await;

  let dir = TestDir::new()?;
  let output = run_octo_release_async(
    &dir.path,
    &["--server", &server.uri(), "create-release", "--project", "Acme", "--whatif", "--json"],
  )
  .await?;
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

  let report: Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(report["outcome"], "whatif");
  assert_eq!(report["version"], "1.4.2");
  assert_eq!(report["plan_id"].as_str().map(str::len), Some(12));
  assert_eq!(report["plan"]["package_steps"][0]["version_source"], "auto_resolved");

  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_creates_release_with_explicit_package() -> Result<()> {
  let server = MockServer::start().await;
  mount_project(&server, &["1.4.2"]).await;
  Mock::given(method("POST"))
    .and(path("/api/Spaces-1/releases"))
    .and(body_partial_json(json!({
      "Version": "2.0.0",
      "ProjectId": "Projects-1",
      "ChannelId": "Channels-1",
      "ReleaseNotes": "First cut"
    })))
    .respond_with(ResponseTemplate::new(201).set_body_json(json!({
      "Id": "Releases-7",
      "Version": "2.0.0",
      "ProjectId": "Projects-1",
      "ChannelId": "Channels-1"
    })))
    .expect(1)
    .mount(&server)
    .await;

  let dir = TestDir::new()?;
  let output = run_octo_release_async(
    &dir.path,
    &[
      "--server",
      &server.uri(),
      "create-release",
      "--project",
      "acme",
      "--package",
      "Deploy Web:2.0.0",
      "--releaseNotes",
      "First cut",
    ],
  )
  .await?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
  assert!(stdout.contains("Specified explicitly"), "stdout: {}", stdout);
  assert!(stdout.contains("Created release 2.0.0 (Releases-7)"), "stdout: {}", stdout);

  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_packages_folder_supplies_versions() -> Result<()> {
  let server = MockServer::start().await;
  mount_project(&server, &["1.4.2"]).await;

  let dir = TestDir::new()?;
  dir.write_file("packages/Acme.Web.2.0.0.zip", b"zip")?;
  dir.write_file("packages/archive/Acme.Web.3.0.0.zip", b"zip")?;
  let folder = dir.path.join("packages");

  let output = run_octo_release_async(
    &dir.path,
    &[
      "--server",
      &server.uri(),
      "create-release",
      "--project",
      "Acme",
      "--channel",
      "Default",
      "--packagesFolder",
      folder.to_str().unwrap(),
      "--whatif",
      "--json",
    ],
  )
  .await?;
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

  let report: Value = serde_json::from_slice(&output.stdout)?;
  let step = &report["plan"]["package_steps"][0];
  assert_eq!(step["version"], "3.0.0");
  assert_eq!(step["version_source"], "explicit");
  assert_eq!(report["version"], "3.0.0");

  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unresolved_package_blocks_release() -> Result<()> {
  let server = MockServer::start().await;
  mount_project(&server, &[]).await;
  Mock::given(method("POST"))
    .and(path("/api/Spaces-1/releases"))
    .respond_with(ResponseTemplate::new(201))
    .expect(0)
    .mount(&server)
    .await;

  let dir = TestDir::new()?;
  let output = run_octo_release_async(
    &dir.path,
    &["--server", &server.uri(), "create-release", "--project", "Acme", "--channel", "Default"],
  )
  .await?;

  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("not viable"), "stderr: {}", stderr);
  assert!(stderr.contains("Deploy Web"), "stderr: {}", stderr);

  Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_and_api_key_from_config_file() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/Spaces-1/projects/all"))
    .and(header("X-Octopus-ApiKey", "API-FROM-FILE"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
    .expect(1)
    .mount(&server)
    .await;

  let dir = TestDir::new()?;
  dir.write_file(
    "octo.toml",
    format!("server = \"{}/\"\napi_key = \"API-FROM-FILE\"\n", server.uri()).as_bytes(),
  )?;

  let output = run_octo_release_async(&dir.path, &["create-release", "--project", "Missing"]).await?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Could not find project Missing"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_missing_server_is_config_error() -> Result<()> {
  let dir = TestDir::new()?;

  let output = run_octo_release_raw(&dir.path, &["create-release", "--project", "Acme"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("No deployment server configured"), "stderr: {}", stderr);
  assert!(stderr.contains("OCTOPUS_URL"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_invalid_server_in_config_file() -> Result<()> {
  let dir = TestDir::new()?;
  dir.write_file(".octo.toml", b"server = \"deploy.example.com\"\n")?;

  let output = run_octo_release_raw(&dir.path, &["create-release", "--project", "Acme"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Invalid server URL"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_malformed_package_fails_before_network() -> Result<()> {
  let dir = TestDir::new()?;

  // Nothing listens on the discard port; validation must fail first
  let output = run_octo_release_raw(
    &dir.path,
    &[
      "--server",
      "http://127.0.0.1:9",
      "create-release",
      "--project",
      "Acme",
      "--package",
      "Deploy Web",
    ],
  )?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("is invalid"), "stderr: {}", stderr);

  Ok(())
}
