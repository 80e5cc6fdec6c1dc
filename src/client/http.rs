//! HTTP client for the deployment server's REST API
//!
//! Every call is a single request; there is no retry or backoff here.

use super::Repository;
use super::model::{
  ChannelResource, DeploymentProcessResource, FeedResource, PackageResource, PackageSearchFilter, Page,
  ProjectResource, ReleaseResource, ReleaseTemplateResource, VersionRuleTestRequest, VersionRuleTestResponse,
};
use crate::core::config::ServerSettings;
use crate::core::error::{ApiError, ReleaseError, ReleaseResult};
use crate::release::rules::RuleValidator;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const API_KEY_HEADER: &str = "X-Octopus-ApiKey";
const MAX_ERROR_BODY: usize = 500;
const CHANNEL_PAGE_SIZE: usize = 1000;

pub struct HttpRepository {
  http: Client,
  base: Url,
  space: String,
  api_key: Option<String>,
}

impl HttpRepository {
  pub fn new(settings: &ServerSettings) -> ReleaseResult<Self> {
    let base = Url::parse(&settings.server)
      .map_err(|e| ReleaseError::message(format!("Invalid server URL {}: {}", settings.server, e)))?;
    let http = Client::builder()
      .timeout(Duration::from_secs(settings.timeout_secs))
      .build()?;

    Ok(Self {
      http,
      base,
      space: settings.space.clone(),
      api_key: settings.api_key.clone(),
    })
  }

  /// `{server}/api/{space}/{segments...}` with each segment percent-encoded
  fn url(&self, segments: &[&str]) -> ReleaseResult<Url> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| ReleaseError::message(format!("Server URL {} cannot be used as a base", self.base)))?
      .pop_if_empty()
      .push("api")
      .push(&self.space)
      .extend(segments);
    Ok(url)
  }

  fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    let builder = builder.header(reqwest::header::ACCEPT, "application/json");
    match &self.api_key {
      Some(key) => builder.header(API_KEY_HEADER, key),
      None => builder,
    }
  }

  async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder, url: &Url) -> ReleaseResult<Option<T>> {
    let response = self.request(builder).send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
      tracing::debug!("{} returned 404", url);
      return Ok(None);
    }
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(
        ApiError::Status {
          url: url.to_string(),
          status: status.as_u16(),
          body: body.chars().take(MAX_ERROR_BODY).collect(),
        }
        .into(),
      );
    }

    let value = response.json::<T>().await.map_err(|e| ApiError::Decode {
      url: url.to_string(),
      reason: e.to_string(),
    })?;
    Ok(Some(value))
  }

  async fn get_optional<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> ReleaseResult<Option<T>> {
    tracing::debug!("GET {}", url);
    let builder = self.http.get(url.clone()).query(query);
    self.send(builder, &url).await
  }

  async fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> ReleaseResult<T> {
    let what = url.to_string();
    self
      .get_optional(url, query)
      .await?
      .ok_or_else(|| ReleaseError::not_found(format!("{} returned 404", what)))
  }

  async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, url: Url, body: &B) -> ReleaseResult<T> {
    tracing::debug!("POST {}", url);
    let builder = self.http.post(url.clone()).json(body);
    let what = url.to_string();
    self
      .send(builder, &url)
      .await?
      .ok_or_else(|| ReleaseError::not_found(format!("{} returned 404", what)))
  }
}

fn channel_query(channel: Option<&ChannelResource>) -> Vec<(&'static str, String)> {
  channel.map(|c| vec![("channel", c.id.clone())]).unwrap_or_default()
}

#[async_trait]
impl RuleValidator for HttpRepository {
  async fn test_version_rule(&self, request: &VersionRuleTestRequest) -> ReleaseResult<VersionRuleTestResponse> {
    let url = self.url(&["channels", "rule-test"])?;
    self.post(url, request).await
  }
}

#[async_trait]
impl Repository for HttpRepository {
  async fn find_project(&self, id_or_name: &str) -> ReleaseResult<Option<ProjectResource>> {
    let projects: Vec<ProjectResource> = self.get(self.url(&["projects", "all"])?, &[]).await?;
    Ok(projects.into_iter().find(|p| {
      p.id.eq_ignore_ascii_case(id_or_name) || p.name.to_lowercase() == id_or_name.trim().to_lowercase()
    }))
  }

  async fn project_channels(&self, project: &ProjectResource) -> ReleaseResult<Vec<ChannelResource>> {
    let url = self.url(&["projects", &project.id, "channels"])?;
    let page: Option<Page<ChannelResource>> = self
      .get_optional(url, &[("take", CHANNEL_PAGE_SIZE.to_string())])
      .await?;
    Ok(page.map(|p| p.items).unwrap_or_default())
  }

  async fn deployment_process(&self, id: &str) -> ReleaseResult<Option<DeploymentProcessResource>> {
    self.get_optional(self.url(&["deploymentprocesses", id])?, &[]).await
  }

  async fn deployment_process_at_git_ref(
    &self,
    project: &ProjectResource,
    git_ref: &str,
  ) -> ReleaseResult<Option<DeploymentProcessResource>> {
    let url = self.url(&["projects", &project.id, git_ref, "deploymentprocesses"])?;
    self.get_optional(url, &[]).await
  }

  async fn release_template(
    &self,
    project: &ProjectResource,
    process: &DeploymentProcessResource,
    channel: Option<&ChannelResource>,
    git_ref: Option<&str>,
  ) -> ReleaseResult<Option<ReleaseTemplateResource>> {
    let url = match git_ref {
      Some(git_ref) => self.url(&["projects", &project.id, git_ref, "deploymentprocesses", "template"])?,
      None => self.url(&["deploymentprocesses", &process.id, "template"])?,
    };
    self.get_optional(url, &channel_query(channel)).await
  }

  async fn feeds(&self, ids_or_names: &[String]) -> ReleaseResult<Vec<FeedResource>> {
    if ids_or_names.is_empty() {
      return Ok(Vec::new());
    }
    let feeds: Vec<FeedResource> = self.get(self.url(&["feeds", "all"])?, &[]).await?;
    Ok(
      feeds
        .into_iter()
        .filter(|feed| {
          ids_or_names
            .iter()
            .any(|wanted| feed.id.eq_ignore_ascii_case(wanted) || feed.name.eq_ignore_ascii_case(wanted))
        })
        .collect(),
    )
  }

  async fn search_packages(
    &self,
    feed: &FeedResource,
    filter: &PackageSearchFilter,
  ) -> ReleaseResult<Vec<PackageResource>> {
    let url = self.url(&["feeds", &feed.id, "packages", "versions"])?;
    let mut query = vec![
      ("packageId", filter.package_id.clone()),
      ("take", filter.take.max(1).to_string()),
    ];
    if let Some(range) = &filter.version_range {
      query.push(("versionRange", range.clone()));
    }
    if let Some(tag) = &filter.pre_release_tag {
      query.push(("preReleaseTag", tag.clone()));
    }

    let page: Option<Page<PackageResource>> = self.get_optional(url, &query).await?;
    Ok(page.map(|p| p.items).unwrap_or_default())
  }

  async fn find_release(&self, project: &ProjectResource, version: &str) -> ReleaseResult<Option<ReleaseResource>> {
    let url = self.url(&["projects", &project.id, "releases", version])?;
    self.get_optional(url, &[]).await
  }

  async fn create_release(&self, release: &ReleaseResource) -> ReleaseResult<ReleaseResource> {
    self.post(self.url(&["releases"])?, release).await
  }
}
