//! Asset reconciliation.
//!
//! The [`AssetSynchronizer`] takes one snapshot of the release's assets, then
//! for each local file deletes any asset with the same name and uploads the
//! file in its place. Files are processed strictly one after another: a
//! stale asset's delete completes before its replacement is uploaded, and an
//! upload completes before the next file starts.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RunContext;
use crate::errors::{CoreError, SyncError};
use crate::github::ReleaseApi;
use crate::glob::GlobResolver;
use crate::models::{ExistingAsset, LocalFile, SyncResult};
use crate::trigger::{Gate, TriggerValidator};

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Terminal outcome of a run that did not fail.
#[derive(Debug)]
pub enum RunOutcome {
    /// The trigger's action does not allow uploads; nothing was changed.
    Skipped { action: String },
    Synced(SyncResult),
}

/// Gate on the trigger, resolve files, then reconcile.
///
/// Every validation happens before the first remote call.
pub async fn run(ctx: &RunContext, api: Arc<dyn ReleaseApi>) -> Result<RunOutcome, CoreError> {
    let release_id = match TriggerValidator::validate(&ctx.trigger)? {
        Gate::Skip { action } => return Ok(RunOutcome::Skipped { action }),
        Gate::Proceed { release_id } => release_id,
    };

    let paths = GlobResolver::new(&ctx.root).resolve(&ctx.glob_spec)?;
    let files = AssetSynchronizer::prepare(&paths)?;

    let result = AssetSynchronizer::new(api, ctx.repo.clone())
        .synchronize(release_id, &files)
        .await?;
    Ok(RunOutcome::Synced(result))
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Reconciles local files with a single repository's release assets.
pub struct AssetSynchronizer {
    api: Arc<dyn ReleaseApi>,
    repo: String,
}

impl AssetSynchronizer {
    pub fn new(api: Arc<dyn ReleaseApi>, repo: impl Into<String>) -> Self {
        Self {
            api,
            repo: repo.into(),
        }
    }

    /// Stat every path and build the upload list, preserving order.
    pub fn prepare(paths: &[PathBuf]) -> Result<Vec<LocalFile>, SyncError> {
        paths
            .iter()
            .map(|path| {
                LocalFile::from_path(path).map_err(|source| SyncError::LocalFile {
                    path: path.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Replace the release's assets with `files`.
    ///
    /// A failed delete is logged and skipped. A failed fetch or upload aborts
    /// the pass; assets uploaded before the failure stay in place.
    pub async fn synchronize(
        &self,
        release_id: u64,
        files: &[LocalFile],
    ) -> Result<SyncResult, SyncError> {
        let release = self
            .api
            .get_release(&self.repo, release_id)
            .await
            .map_err(|source| SyncError::FetchFailed { release_id, source })?;
        let existing = self
            .api
            .list_assets(&self.repo, release_id)
            .await
            .map_err(|source| SyncError::FetchFailed { release_id, source })?;
        debug!(
            release_id,
            existing = existing.len(),
            files = files.len(),
            "starting asset sync"
        );

        let mut result = SyncResult::default();
        for file in files {
            // The snapshot is not refreshed, so a repeated name sees the same stale entry.
            if let Some(stale) = find_asset(&existing, &file.name) {
                debug!(
                    "Removing existing asset '{}' with ID {}...",
                    stale.name, stale.id
                );
                match self.api.delete_asset(&self.repo, stale.id).await {
                    Ok(()) => result.deleted += 1,
                    Err(e) => {
                        warn!(asset_id = stale.id, name = %stale.name, error = %e, "failed to delete existing asset");
                        result.delete_failures += 1;
                    }
                }
            }

            info!("Uploading {}...", file.path.display());
            debug!("Content-Type = '{}'", file.content_type);
            let asset = self
                .api
                .upload_asset(&release, file)
                .await
                .map_err(|source| SyncError::UploadFailed {
                    name: file.name.clone(),
                    source,
                })?;
            result.uploaded.push(asset);
        }

        info!(
            uploaded = result.uploaded.len(),
            deleted = result.deleted,
            delete_failures = result.delete_failures,
            "asset sync complete"
        );
        Ok(result)
    }
}

fn find_asset<'a>(assets: &'a [ExistingAsset], name: &str) -> Option<&'a ExistingAsset> {
    assets.iter().find(|a| a.name == name)
}
