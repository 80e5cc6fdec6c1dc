//! Error types for octo-release with contextual messages and exit codes
//!
//! Every failure the user can hit is categorized so the binary can pick an exit
//! code and, where one exists, print a hint on how to fix the invocation.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for octo-release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing resources)
  User = 1,
  /// System error (network, I/O)
  System = 2,
  /// Validation failure (malformed specifiers, unviable plans)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for octo-release
#[derive(Debug)]
pub enum ReleaseError {
  /// Configuration errors
  Config(ConfigError),

  /// Deployment server errors
  Api(ApiError),

  /// Validation errors (arguments, plans)
  Validation(ValidationError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Shorthand for a missing server-side resource
  pub fn not_found(resource: impl Into<String>) -> Self {
    ReleaseError::Api(ApiError::NotFound {
      resource: resource.into(),
    })
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ReleaseError::Io(e) => ReleaseError::Message {
        message: format!("I/O error: {}", e),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ReleaseError::Config(_) => ExitCode::User,
      ReleaseError::Api(ApiError::NotFound { .. }) => ExitCode::User,
      ReleaseError::Api(_) => ExitCode::System,
      ReleaseError::Validation(_) => ExitCode::Validation,
      ReleaseError::Io(_) => ExitCode::System,
      ReleaseError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Api(e) => e.help_message(),
      ReleaseError::Validation(e) => e.help_message(),
      ReleaseError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Api(e) => write!(f, "{}", e),
      ReleaseError::Validation(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<String> for ReleaseError {
  fn from(msg: String) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<&str> for ReleaseError {
  fn from(msg: &str) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<ValidationError> for ReleaseError {
  fn from(err: ValidationError) -> Self {
    ReleaseError::Validation(err)
  }
}

impl From<ApiError> for ReleaseError {
  fn from(err: ApiError) -> Self {
    ReleaseError::Api(err)
  }
}

impl From<ConfigError> for ReleaseError {
  fn from(err: ConfigError) -> Self {
    ReleaseError::Config(err)
  }
}

impl From<toml_edit::de::Error> for ReleaseError {
  fn from(err: toml_edit::de::Error) -> Self {
    ReleaseError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

impl From<reqwest::Error> for ReleaseError {
  fn from(err: reqwest::Error) -> Self {
    let url = err.url().map(|u| u.to_string()).unwrap_or_default();
    if err.is_decode() {
      ReleaseError::Api(ApiError::Decode {
        url,
        reason: err.to_string(),
      })
    } else {
      ReleaseError::Api(ApiError::Request {
        url,
        reason: err.to_string(),
      })
    }
  }
}

impl From<zip::result::ZipError> for ReleaseError {
  fn from(err: zip::result::ZipError) -> Self {
    ReleaseError::message(format!("Package archive error: {}", err))
  }
}

impl From<quick_xml::DeError> for ReleaseError {
  fn from(err: quick_xml::DeError) -> Self {
    ReleaseError::message(format!("Package manifest error: {}", err))
  }
}

impl From<walkdir::Error> for ReleaseError {
  fn from(err: walkdir::Error) -> Self {
    ReleaseError::message(format!("Directory scan error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// No server URL from any source
  MissingServer { searched: PathBuf },

  /// Server URL is not http(s)
  InvalidServer { server: String },

  /// Config file exists but could not be parsed
  Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::MissingServer { .. } => Some(
        "Pass --server, set OCTOPUS_URL, or add `server = \"https://...\"` to octo.toml.".to_string(),
      ),
      ConfigError::InvalidServer { .. } => Some("The server URL must start with http:// or https://".to_string()),
      ConfigError::Invalid { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::MissingServer { searched } => {
        write!(
          f,
          "No deployment server configured.\nSearched for octo.toml in: {}",
          searched.display()
        )
      }
      ConfigError::InvalidServer { server } => write!(f, "Invalid server URL: {}", server),
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
    }
  }
}

/// Deployment server errors
#[derive(Debug)]
pub enum ApiError {
  /// Request could not be sent or completed
  Request { url: String, reason: String },

  /// Server answered with a non-success status
  Status { url: String, status: u16, body: String },

  /// Response body did not match the expected resource
  Decode { url: String, reason: String },

  /// Resource lookup came back empty
  NotFound { resource: String },
}

impl ApiError {
  fn help_message(&self) -> Option<String> {
    match self {
      ApiError::Status { status: 401, .. } | ApiError::Status { status: 403, .. } => {
        Some("Check the API key (--apiKey or OCTOPUS_API_KEY) and its permissions.".to_string())
      }
      ApiError::Request { .. } => Some("Check that the server URL is reachable.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ApiError::Request { url, reason } => write!(f, "Request to {} failed: {}", url, reason),
      ApiError::Status { url, status, body } => {
        write!(f, "Server returned {} for {}", status, url)?;
        if !body.is_empty() {
          write!(f, "\n{}", body)?;
        }
        Ok(())
      }
      ApiError::Decode { url, reason } => write!(f, "Unexpected response from {}: {}", url, reason),
      ApiError::NotFound { resource } => write!(f, "{}", resource),
    }
  }
}

/// Validation errors
#[derive(Debug)]
pub enum ValidationError {
  /// A --package value that does not split into identifier and version
  InvalidPackageSpec { spec: String, reason: String },

  /// A default version that looks like a keyed package spec
  InvalidDefaultVersion { version: String },

  /// Version-controlled project built without a git reference
  GitReferenceMissing,

  /// Git reference supplied for a database-backed project
  GitReferenceNotSupported { git_ref: String },

  /// Highest version requested from a plan with no package steps
  NoPackageSteps,

  /// A version string that must be structured but is not
  InvalidVersion { version: String, context: String },

  /// Plan cannot be turned into a release
  UnviablePlan { reason: String },

  /// More than one channel could host the release
  AmbiguousChannel { channels: Vec<String> },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::InvalidPackageSpec { .. } => Some(
        "Use StepName:Version, PackageId:Version or StepName:PackageReferenceName:Version (':', '=' and '/' are interchangeable)."
          .to_string(),
      ),
      ValidationError::InvalidDefaultVersion { .. } => {
        Some("Did you mean --package? --defaultPackageVersion takes a bare version such as 1.2.3.".to_string())
      }
      ValidationError::UnviablePlan { .. } => {
        Some("Pass --package or --defaultPackageVersion for unresolved steps, or --ignoreChannelRules to accept rule violations.".to_string())
      }
      ValidationError::AmbiguousChannel { .. } => Some("Pick one with --channel.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::InvalidPackageSpec { spec, reason } => {
        write!(f, "The package argument '{}' is invalid: {}", spec, reason)
      }
      ValidationError::InvalidDefaultVersion { version } => write!(
        f,
        "The default package version '{}' is not a valid version and contains a package separator",
        version
      ),
      ValidationError::GitReferenceMissing => write!(
        f,
        "Cannot build a release plan from the database for a version controlled project. Supply a git reference with --gitRef."
      ),
      ValidationError::GitReferenceNotSupported { git_ref } => write!(
        f,
        "A git reference ({}) was supplied but the project is not version controlled. Remove --gitRef to build from the database.",
        git_ref
      ),
      ValidationError::NoPackageSteps => write!(
        f,
        "Cannot determine the highest package version because the release plan has no package steps"
      ),
      ValidationError::InvalidVersion { version, context } => {
        write!(f, "'{}' is not a valid version ({})", version, context)
      }
      ValidationError::UnviablePlan { reason } => write!(f, "The release plan is not viable: {}", reason),
      ValidationError::AmbiguousChannel { channels } => write!(
        f,
        "More than one channel can host this release: {}",
        channels.join(", ")
      ),
    }
  }
}

/// Result type alias for octo-release
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ReleaseError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

/// Convert anyhow::Error to ReleaseError
impl From<anyhow::Error> for ReleaseError {
  fn from(err: anyhow::Error) -> Self {
    ReleaseError::message(err.to_string())
  }
}
