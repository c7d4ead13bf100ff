//! Error types for the assetsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required input was not supplied by the file, the flags, or the environment.
    #[error("input required and not supplied: {0}")]
    MissingInput(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Glob errors
// ---------------------------------------------------------------------------

/// Errors from expanding the `files` pattern specification.
#[derive(Debug, Error)]
pub enum GlobError {
    /// The combined match set of every pattern was empty.
    #[error("No files found")]
    NoFilesFound,

    /// A pattern could not be parsed.
    #[error("invalid file pattern '{pattern}': {detail}")]
    InvalidPattern {
        pattern: String,
        detail: String,
    },

    /// Walking the file system failed.
    #[error("failed to expand pattern '{pattern}': {source}")]
    WalkFailed {
        pattern: String,
        #[source]
        source: walkdir::Error,
    },
}

// ---------------------------------------------------------------------------
// Trigger errors
// ---------------------------------------------------------------------------

/// Errors from reading or validating the triggering release event.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The event payload did not reference a release.
    #[error("Could not find release")]
    MissingRelease,

    /// The event payload file could not be read.
    #[error("failed to read event payload '{path}': {source}")]
    PayloadIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The event payload was not valid JSON.
    #[error("failed to parse event payload: {0}")]
    PayloadParse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from GitHub REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError {
        status: u16,
        body: String,
    },

    /// Authentication token is missing or invalid.
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited {
        reset_at: String,
    },

    /// The release upload URL could not be turned into a request URL.
    #[error("invalid upload URL '{0}'")]
    InvalidUploadUrl(String),

    /// A local file could not be opened or inspected for upload.
    #[error("failed to read '{path}': {source}")]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// Errors from the asset reconciliation pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The release or its asset list could not be fetched.
    #[error("failed to fetch release {release_id}: {source}")]
    FetchFailed {
        release_id: u64,
        #[source]
        source: GitHubError,
    },

    /// Uploading a file failed; files after it were not processed.
    #[error("failed to upload '{name}': {source}")]
    UploadFailed {
        name: String,
        #[source]
        source: GitHubError,
    },

    /// A resolved path could not be inspected before upload.
    #[error("failed to inspect '{path}': {source}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
