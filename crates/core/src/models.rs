//! Domain model types used throughout assetsync.
//!
//! Remote types mirror the subset of the GitHub release API that the
//! synchronizer reads; local types are built fresh on every run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::content_type;

// ---------------------------------------------------------------------------
// Remote release state
// ---------------------------------------------------------------------------

/// A release as returned by `GET /repos/{owner}/{repo}/releases/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    /// RFC 6570 template, e.g. `https://uploads.github.com/.../assets{?name,label}`.
    pub upload_url: String,
    #[serde(default)]
    pub tag_name: Option<String>,
}

/// An asset already attached to a release at the time it was listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingAsset {
    /// Deletion handle.
    pub id: u64,
    pub name: String,
}

/// The asset created by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub browser_download_url: String,
}

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

/// A matched local file, ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    /// Final path segment; the key matched against [`ExistingAsset::name`].
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

impl LocalFile {
    /// Stat `path` and derive the display name and content type.
    pub fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path)?.len();
        Ok(Self {
            name: display_name(&path),
            content_type: content_type::resolve(&path),
            path,
            size,
        })
    }
}

/// Final path segment of `path`, falling back to the whole path when it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Sync result
// ---------------------------------------------------------------------------

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    /// Uploaded assets, in upload order.
    pub uploaded: Vec<AssetRecord>,
    /// Stale assets that were deleted before their replacement was uploaded.
    pub deleted: usize,
    /// Deletes that failed and were ignored.
    pub delete_failures: usize,
}

impl SyncResult {
    /// Download URL of the last uploaded asset, if any.
    pub fn last_download_url(&self) -> Option<&str> {
        self.uploaded
            .last()
            .map(|a| a.browser_download_url.as_str())
            .filter(|url| !url.is_empty())
    }
}
