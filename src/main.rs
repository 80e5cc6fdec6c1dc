mod client;
mod commands;
mod core;
mod release;
mod utils;
mod versions;

use clap::{Parser, Subcommand};
use crate::core::config::ConfigOverrides;
use crate::core::context::ClientContext;
use crate::core::error::{ReleaseError, ReleaseResult, print_error};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Build release plans and create releases on a deployment server
#[derive(Parser)]
#[command(name = "octo-release")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Log resolution decisions and requests
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Server URL (overrides OCTOPUS_URL and octo.toml)
  #[arg(long, global = true)]
  server: Option<String>,

  /// API key (overrides OCTOPUS_API_KEY and octo.toml)
  #[arg(long = "apiKey", visible_alias = "api-key", global = true)]
  api_key: Option<String>,

  /// Space ID (overrides OCTOPUS_SPACE and octo.toml)
  #[arg(long, global = true)]
  space: Option<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a release plan and create the release
  CreateRelease {
    /// Project name or ID
    #[arg(long)]
    project: String,
    /// Channel name or ID (default: pick the channel whose rules fit)
    #[arg(long)]
    channel: Option<String>,
    /// StepName:Version, PackageId:Version or StepName:PackageReferenceName:Version (repeatable)
    #[arg(long = "package")]
    packages: Vec<String>,
    /// Version for every package step not set otherwise
    #[arg(long = "defaultPackageVersion", visible_alias = "packageVersion")]
    default_package_version: Option<String>,
    /// Folder of package archives to take versions from
    #[arg(long = "packagesFolder")]
    packages_folder: Option<PathBuf>,
    /// Pre-release tag used when searching feeds for the latest version
    #[arg(long = "packagePrerelease")]
    package_prerelease: Option<String>,
    /// Create the release even if package versions break the channel rules
    #[arg(long = "ignoreChannelRules")]
    ignore_channel_rules: bool,
    /// Git reference for version-controlled projects
    #[arg(long = "gitRef")]
    git_ref: Option<String>,
    /// Release number (default: derived from the release template or packages)
    #[arg(long, visible_alias = "releaseNumber")]
    version: Option<String>,
    /// Print the plan without creating the release
    #[arg(long)]
    whatif: bool,
    /// Do nothing if a release with this number already exists
    #[arg(long = "ignoreExisting")]
    ignore_existing: bool,
    /// Release notes text
    #[arg(long = "releaseNotes", conflicts_with = "release_notes_file")]
    release_notes: Option<String>,
    /// File to read release notes from
    #[arg(long = "releaseNotesFile")]
    release_notes_file: Option<PathBuf>,
    /// Output the plan and outcome as JSON
    #[arg(long)]
    json: bool,
  },

  /// List the packages found in a folder
  ScanFolder {
    /// Folder to scan recursively
    path: PathBuf,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: bool) {
  let filter = if verbose { "debug" } else { "info" };
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
    .with(
      tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr),
    )
    .init();
}

#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let overrides = ConfigOverrides {
    server: cli.server,
    api_key: cli.api_key,
    space: cli.space,
  };

  let result = match cli.command {
    Commands::CreateRelease {
      project,
      channel,
      packages,
      default_package_version,
      packages_folder,
      package_prerelease,
      ignore_channel_rules,
      git_ref,
      version,
      whatif,
      ignore_existing,
      release_notes,
      release_notes_file,
      json,
    } => {
      let options = commands::CreateReleaseOptions {
        project,
        channel,
        packages,
        default_package_version,
        packages_folder,
        package_prerelease,
        ignore_channel_rules,
        git_ref,
        version,
        whatif,
        ignore_existing,
        release_notes,
        release_notes_file,
        json,
      };
      // The server is only needed here; scan-folder runs offline
      match build_context(&overrides) {
        Ok(ctx) => commands::run_create_release(&ctx, options).await,
        Err(err) => Err(err),
      }
    }
    Commands::ScanFolder { path, json } => commands::run_scan_folder(&path, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn build_context(overrides: &ConfigOverrides) -> ReleaseResult<ClientContext> {
  let root = std::env::current_dir()?;
  ClientContext::build(&root, overrides)
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
