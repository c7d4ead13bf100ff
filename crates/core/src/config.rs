//! Run configuration for assetsync.
//!
//! Values come from an optional TOML file, then command-line flags (which in
//! a workflow are fed from `INPUT_*` and `GITHUB_*` variables). The access
//! token is never stored in the file: it is either passed explicitly or
//! resolved from the variable named by `github.token_env` via
//! [`ActionConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{ConfigError, CoreError};
use crate::trigger::Trigger;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration, optionally loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Which local files to upload.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// GitHub repository and API settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Where the triggering release event comes from.
    #[serde(default)]
    pub event: EventConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Local file selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Glob patterns joined by `;`.
    #[serde(default)]
    pub files: String,

    /// Directory patterns are resolved against (default: current directory).
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

/// GitHub repository and API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API base URL (default `https://api.github.com`).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Repository in `owner/repo` format.
    #[serde(default)]
    pub repo: String,

    /// Environment variable holding the fallback token (default `GITHUB_TOKEN`).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Resolved token: the explicit `repo-token`, or the `token_env` value.
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            repo: String::new(),
            token_env: default_token_env(),
            token: None,
        }
    }
}

/// Triggering event source.
///
/// `action` and `release_id` override what the payload file says.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventConfig {
    /// Path to the event payload JSON (`$GITHUB_EVENT_PATH` in a workflow).
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub release_id: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// Everything a single reconciliation run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub trigger: Trigger,
    pub credential: String,
    pub glob_spec: String,
    pub repo: String,
    pub api_url: String,
    pub root: PathBuf,
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl ActionConfig {
    /// Load an [`ActionConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ActionConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Fill `github.token` from `github.token_env` unless a token was given.
    ///
    /// A missing variable only logs a warning; [`validate`](Self::validate)
    /// reports the missing credential.
    pub fn resolve_env_vars(&mut self) {
        if self.github.token.as_deref().is_some_and(|t| !t.is_empty()) {
            debug!("using explicit repo-token");
            return;
        }
        self.github.token = resolve_optional_env(&self.github.token_env, "github.token_env");
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assets.files.trim().is_empty() {
            return Err(ConfigError::MissingInput("files".into()));
        }
        if self.github.repo.is_empty() {
            return Err(ConfigError::MissingInput("repository".into()));
        }
        let valid_repo = self
            .github
            .repo
            .split_once('/')
            .is_some_and(|(owner, name)| {
                !owner.is_empty() && !name.is_empty() && !name.contains('/')
            });
        if !valid_repo {
            return Err(ConfigError::InvalidValue {
                field: "github.repo".into(),
                detail: "GitHub repo must be in 'owner/repo' format".into(),
            });
        }
        if self.github.token.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingInput(format!(
                "repo-token (or ${})",
                self.github.token_env
            )));
        }
        if self.event.path.is_none() && self.event.action.is_none() {
            return Err(ConfigError::MissingInput("event path or action".into()));
        }
        Ok(())
    }

    /// Build the trigger from the explicit action or the event payload file.
    pub fn trigger(&self) -> Result<Trigger, CoreError> {
        let mut trigger = match (&self.event.action, &self.event.path) {
            (Some(action), _) => Trigger::new(action, None),
            (None, Some(path)) => Trigger::from_event_file(path)?,
            (None, None) => {
                return Err(ConfigError::MissingInput("event path or action".into()).into())
            }
        };
        if self.event.release_id.is_some() {
            trigger.release_id = self.event.release_id;
        } else if self.event.action.is_some() {
            if let Some(path) = &self.event.path {
                trigger.release_id = Trigger::from_event_file(path)?.release_id;
            }
        }
        Ok(trigger)
    }

    /// Resolve the trigger and working directory into a [`RunContext`].
    pub fn run_context(&self) -> Result<RunContext, CoreError> {
        let root = match &self.assets.working_directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(ConfigError::IoError)?,
        };
        Ok(RunContext {
            trigger: self.trigger()?,
            credential: self.github.token.clone().unwrap_or_default(),
            glob_spec: self.assets.files.clone(),
            repo: self.github.repo.clone(),
            api_url: self.github.api_url.clone(),
            root,
        })
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
