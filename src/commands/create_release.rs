//! Create release command implementation
//!
//! Parses every version argument up front, builds a release plan (picking a
//! channel when none was given), refuses unviable plans, works out the
//! release number and finally creates the release unless `--whatif` is set.

use crate::client::Repository;
use crate::client::model::{ChannelResource, ProjectResource, ReleaseResource};
use crate::core::context::ClientContext;
use crate::core::error::{ReleaseError, ReleaseResult, ResultExt, ValidationError};
use crate::release::{ReleasePlan, ReleasePlanBuilder};
use crate::versions::PackageVersionResolver;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments of `create-release`
#[derive(Debug, Clone, Default)]
pub struct CreateReleaseOptions {
  pub project: String,
  pub channel: Option<String>,
  pub packages: Vec<String>,
  pub default_package_version: Option<String>,
  pub packages_folder: Option<PathBuf>,
  pub package_prerelease: Option<String>,
  pub ignore_channel_rules: bool,
  pub git_ref: Option<String>,
  pub version: Option<String>,
  pub whatif: bool,
  pub ignore_existing: bool,
  pub release_notes: Option<String>,
  pub release_notes_file: Option<PathBuf>,
  pub json: bool,
}

/// What happened, for `--json`
#[derive(Debug, Serialize)]
struct CreateReleaseReport<'a> {
  plan_id: String,
  version: String,
  /// created, exists or whatif
  outcome: &'static str,
  release_id: Option<String>,
  plan: &'a ReleasePlan,
}

/// Run the create-release command
pub async fn run_create_release(ctx: &ClientContext, options: CreateReleaseOptions) -> ReleaseResult<()> {
  let resolver = build_resolver(&options)?;
  let release_notes = read_release_notes(&options)?;
  let repository = ctx.repository();

  let project = repository
    .find_project(&options.project)
    .await?
    .ok_or_else(|| ReleaseError::not_found(format!("Could not find project {}", options.project)))?;
  info!("creating a release for project {} on {}", project.name, ctx.settings.server);

  let plan = build_plan(repository, &project, &resolver, &options).await?;

  if !options.json {
    println!("📦 Release plan for {} (channel {}, plan {})", project.name, plan.channel_name(), plan.id());
    println!();
    print!("{}", plan.format_as_table());
    println!();
  }

  if let Some(reason) = plan.non_viable_reason(options.ignore_channel_rules) {
    return Err(ValidationError::UnviablePlan { reason }.into());
  }
  if options.ignore_channel_rules && plan.has_steps_violating_channel_version_rules() {
    println!("⚠️  Ignoring channel version rule violations (--ignoreChannelRules)");
  }

  let version = release_version(&options, &plan)?;
  debug!("release number {}", version);

  if options.whatif {
    report(&options, &plan, &version, "whatif", None, || {
      println!("🔍 What-if mode: release {} was not created", version);
    })?;
    return Ok(());
  }

  if options.ignore_existing
    && let Some(existing) = repository.find_release(&project, &version).await?
  {
    report(&options, &plan, &version, "exists", existing.id.clone(), || {
      println!("⚠️  A release with version {} already exists, skipping", version);
    })?;
    return Ok(());
  }

  let release = ReleaseResource {
    id: None,
    version: version.clone(),
    project_id: project.id.clone(),
    channel_id: plan.channel.as_ref().map(|c| c.id.clone()),
    release_notes,
    version_control_reference: options.git_ref.clone().filter(|r| !r.trim().is_empty()),
    selected_packages: plan.selected_packages(),
  };
  let created = repository
    .create_release(&release)
    .await
    .with_context(|| format!("Failed to create release {}", version))?;

  report(&options, &plan, &created.version, "created", created.id.clone(), || {
    println!(
      "✅ Created release {} ({})",
      created.version,
      created.id.as_deref().unwrap_or("no id returned")
    );
  })
}

/// Collect every version argument before any network call
fn build_resolver(options: &CreateReleaseOptions) -> ReleaseResult<PackageVersionResolver> {
  let mut resolver = PackageVersionResolver::new();

  if let Some(folder) = &options.packages_folder {
    let count = resolver
      .add_folder(folder)
      .context("Could not read package versions from --packagesFolder")?;
    info!("found {} package(s) in {}", count, folder.display());
  }
  for spec in &options.packages {
    resolver.add_spec(spec)?;
  }
  if let Some(default) = options.default_package_version.as_deref().filter(|v| !v.trim().is_empty()) {
    resolver.default_version(default)?;
  }
  if resolver.is_empty() {
    debug!("no package versions supplied, every package step resolves from its feed");
  }

  Ok(resolver)
}

fn read_release_notes(options: &CreateReleaseOptions) -> ReleaseResult<Option<String>> {
  match (&options.release_notes, &options.release_notes_file) {
    (Some(_), Some(_)) => Err(ReleaseError::with_help(
      "Both --releaseNotes and --releaseNotesFile were supplied",
      "Use only one of them.",
    )),
    (Some(notes), None) => Ok(Some(notes.clone())),
    (None, Some(path)) => fs::read_to_string(path)
      .map(Some)
      .with_context(|| format!("Failed to read release notes from {}", path.display())),
    (None, None) => Ok(None),
  }
}

async fn build_plan(
  repository: &dyn Repository,
  project: &ProjectResource,
  resolver: &PackageVersionResolver,
  options: &CreateReleaseOptions,
) -> ReleaseResult<ReleasePlan> {
  let channels = repository.project_channels(project).await?;
  let builder = ReleasePlanBuilder::new(repository).with_pre_release_tag(options.package_prerelease.clone());
  let git_ref = options.git_ref.as_deref();

  match options.channel.as_deref().filter(|c| !c.trim().is_empty()) {
    Some(wanted) => {
      let channel = find_channel(&channels, wanted).ok_or_else(|| {
        ReleaseError::not_found(format!("Could not find channel {} for project {}", wanted, project.name))
      })?;
      builder.build(project, Some(channel), resolver, git_ref).await
    }
    None if channels.is_empty() => builder.build(project, None, resolver, git_ref).await,
    None => auto_select_channel(&builder, project, &channels, resolver, git_ref).await,
  }
}

/// Channel by ID, or by name ignoring case
fn find_channel<'a>(channels: &'a [ChannelResource], wanted: &str) -> Option<&'a ChannelResource> {
  let wanted = wanted.trim();
  channels
    .iter()
    .find(|c| c.id == wanted)
    .or_else(|| channels.iter().find(|c| c.name.eq_ignore_ascii_case(wanted)))
}

/// Build a plan for every channel and keep the one that can host the release
async fn auto_select_channel(
  builder: &ReleasePlanBuilder<'_>,
  project: &ProjectResource,
  channels: &[ChannelResource],
  resolver: &PackageVersionResolver,
  git_ref: Option<&str>,
) -> ReleaseResult<ReleasePlan> {
  let mut ordered: Vec<&ChannelResource> = channels.iter().collect();
  ordered.sort_by_key(|c| !c.is_default);

  let mut plans = Vec::with_capacity(ordered.len());
  for channel in ordered {
    let plan = builder.build(project, Some(channel), resolver, git_ref).await?;
    debug!("channel {} viable: {}", channel.name, plan.is_viable_release_plan());
    plans.push(plan);
  }

  let viable: Vec<usize> = plans
    .iter()
    .enumerate()
    .filter(|(_, plan)| plan.is_viable_release_plan())
    .map(|(i, _)| i)
    .collect();

  let selected = match viable.as_slice() {
    [] => {
      let listing: Vec<String> = plans
        .iter()
        .map(|plan| format!("Channel {}:\n{}", plan.channel_name(), plan.format_as_table()))
        .collect();
      return Err(
        ValidationError::UnviablePlan {
          reason: format!(
            "no channel of project {} has a viable release plan\n\n{}",
            project.name,
            listing.join("\n")
          ),
        }
        .into(),
      );
    }
    [only] => *only,
    several => match several
      .iter()
      .copied()
      .find(|i| plans[*i].channel.as_ref().is_some_and(|c| c.is_default))
    {
      Some(default) => default,
      None => {
        return Err(
          ValidationError::AmbiguousChannel {
            channels: several.iter().map(|i| plans[*i].channel_name().to_string()).collect(),
          }
          .into(),
        );
      }
    },
  };

  let plan = plans.swap_remove(selected);
  info!("selected channel {}", plan.channel_name());
  Ok(plan)
}

/// Release number, first source that has one wins
fn release_version(options: &CreateReleaseOptions, plan: &ReleasePlan) -> ReleaseResult<String> {
  if let Some(version) = options.version.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
    return Ok(version.to_string());
  }

  let template = &plan.release_template;
  if let Some(step) = template.versioning_package_step_name.as_deref().filter(|s| !s.is_empty()) {
    let reference = template.versioning_package_reference_name.as_deref();
    let version = plan.version_for_step(step, reference).ok_or_else(|| ValidationError::InvalidVersion {
      version: String::new(),
      context: format!("step {} sets the release number but has no package version", step),
    })?;
    return Ok(version.to_string());
  }

  if let Some(next) = template.next_version_increment.as_deref().filter(|v| !v.is_empty()) {
    return Ok(next.to_string());
  }

  plan.highest_version_number()
}

fn report(
  options: &CreateReleaseOptions,
  plan: &ReleasePlan,
  version: &str,
  outcome: &'static str,
  release_id: Option<String>,
  text: impl FnOnce(),
) -> ReleaseResult<()> {
  if options.json {
    let report = CreateReleaseReport {
      plan_id: plan.id().short().to_string(),
      version: version.to_string(),
      outcome,
      release_id,
      plan,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    text();
  }
  Ok(())
}
