//! End-to-end tests for a reconciliation run.
//!
//! These tests drive the real trigger gate, glob expansion, and
//! `AssetSynchronizer` against an in-memory release that behaves like the
//! GitHub API: asset names are unique, and uploading a name that is still
//! present is rejected.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use assetsync_core::config::RunContext;
use assetsync_core::errors::{CoreError, GitHubError, GlobError, SyncError, TriggerError};
use assetsync_core::github::ReleaseApi;
use assetsync_core::models::{AssetRecord, ExistingAsset, LocalFile, Release};
use assetsync_core::sync_engine::{run, AssetSynchronizer, RunOutcome};
use assetsync_core::trigger::Trigger;

const REPO: &str = "acme/app";
const RELEASE_ID: u64 = 42;

// ===========================================================================
// In-memory release
// ===========================================================================

#[derive(Debug, Default)]
struct ReleaseState {
    assets: Vec<AssetRecord>,
    next_id: u64,
    calls: Vec<String>,
}

#[derive(Default)]
struct FakeRelease {
    state: Mutex<ReleaseState>,
    /// Reject uploads whose name is already present (GitHub's `already_exists`).
    reject_existing_names: bool,
    fail_upload_of: Option<String>,
    fail_deletes: bool,
}

impl FakeRelease {
    fn strict() -> Self {
        Self {
            reject_existing_names: true,
            ..Default::default()
        }
    }

    fn seed(&self, name: &str, size: u64) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = 1000 + state.next_id;
        state.assets.push(AssetRecord {
            id,
            name: name.to_string(),
            size,
            content_type: "application/octet-stream".into(),
            browser_download_url: String::new(),
        });
        id
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .assets
            .iter()
            .map(|a| a.name.clone())
            .collect();
        names.sort();
        names
    }

    fn asset(&self, name: &str) -> Option<AssetRecord> {
        self.state
            .lock()
            .unwrap()
            .assets
            .iter()
            .find(|a| a.name == name)
            .cloned()
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl ReleaseApi for FakeRelease {
    async fn get_release(&self, repo: &str, release_id: u64) -> Result<Release, GitHubError> {
        self.state.lock().unwrap().calls.push("get_release".into());
        if repo != REPO || release_id != RELEASE_ID {
            return Err(GitHubError::ApiError {
                status: 404,
                body: "Not Found".into(),
            });
        }
        Ok(Release {
            id: release_id,
            upload_url: format!(
                "https://uploads.github.com/repos/{repo}/releases/{release_id}/assets{{?name,label}}"
            ),
            tag_name: Some("v1.0.0".into()),
        })
    }

    async fn list_assets(
        &self,
        _repo: &str,
        _release_id: u64,
    ) -> Result<Vec<ExistingAsset>, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_assets".into());
        Ok(state
            .assets
            .iter()
            .map(|a| ExistingAsset {
                id: a.id,
                name: a.name.clone(),
            })
            .collect())
    }

    async fn delete_asset(&self, _repo: &str, asset_id: u64) -> Result<(), GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete {asset_id}"));
        if self.fail_deletes {
            return Err(GitHubError::ApiError {
                status: 500,
                body: "boom".into(),
            });
        }
        let before = state.assets.len();
        state.assets.retain(|a| a.id != asset_id);
        if state.assets.len() == before {
            return Err(GitHubError::ApiError {
                status: 404,
                body: "Not Found".into(),
            });
        }
        Ok(())
    }

    async fn upload_asset(
        &self,
        release: &Release,
        file: &LocalFile,
    ) -> Result<AssetRecord, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("upload {}", file.name));
        assert_eq!(release.id, RELEASE_ID);
        if self.fail_upload_of.as_deref() == Some(file.name.as_str()) {
            return Err(GitHubError::ApiError {
                status: 502,
                body: "Bad Gateway".into(),
            });
        }
        if state.assets.iter().any(|a| a.name == file.name) {
            if self.reject_existing_names {
                return Err(GitHubError::ApiError {
                    status: 422,
                    body: "already_exists".into(),
                });
            }
            state.assets.retain(|a| a.name != file.name);
        }
        let size = std::fs::metadata(&file.path).unwrap().len();
        assert_eq!(size, file.size);
        state.next_id += 1;
        let record = AssetRecord {
            id: 2000 + state.next_id,
            name: file.name.clone(),
            size,
            content_type: file.content_type.clone(),
            browser_download_url: format!(
                "https://github.com/{REPO}/releases/download/v1.0.0/{}",
                file.name
            ),
        };
        state.assets.push(record.clone());
        Ok(record)
    }
}

// ===========================================================================
// Helpers
// ===========================================================================

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn context(root: &TempDir, action: &str, spec: &str) -> RunContext {
    RunContext {
        trigger: Trigger::new(action, Some(RELEASE_ID)),
        credential: "ghp_test".into(),
        glob_spec: spec.into(),
        repo: REPO.into(),
        api_url: "https://api.github.com".into(),
        root: root.path().to_path_buf(),
    }
}

async fn run_synced(ctx: &RunContext, api: Arc<FakeRelease>) -> Vec<AssetRecord> {
    match run(ctx, api).await.expect("run failed") {
        RunOutcome::Synced(result) => result.uploaded,
        other => panic!("expected a sync, got {other:?}"),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_uploads_every_file_to_empty_release() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "dist/app.zip", "zip");
    write(dir.path(), "dist/report.json", "{}");
    write(dir.path(), "dist/app.unknownext", "??");

    let api = Arc::new(FakeRelease::strict());
    let uploaded = run_synced(&context(&dir, "published", "dist/*"), api.clone()).await;

    assert_eq!(uploaded.len(), 3);
    assert_eq!(
        api.names(),
        vec!["app.unknownext", "app.zip", "report.json"]
    );
    assert_eq!(api.asset("report.json").unwrap().content_type, "application/json");
    assert_eq!(api.asset("app.zip").unwrap().content_type, "application/zip");
    assert_eq!(
        api.asset("app.unknownext").unwrap().content_type,
        "application/zip"
    );
    assert_eq!(
        api.calls().iter().filter(|c| c.starts_with("get_release")).count(),
        1
    );
    assert_eq!(
        api.calls().iter().filter(|c| c.starts_with("list_assets")).count(),
        1
    );
}

#[tokio::test]
async fn test_replaces_existing_asset_with_same_name() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "dist/app.zip", "new build");

    let api = Arc::new(FakeRelease::strict());
    let stale_id = api.seed("app.zip", 3);
    api.seed("notes.txt", 5);

    run_synced(&context(&dir, "created", "dist/app.zip"), api.clone()).await;

    assert_eq!(api.names(), vec!["app.zip", "notes.txt"]);
    let replaced = api.asset("app.zip").unwrap();
    assert_ne!(replaced.id, stale_id);
    assert_eq!(replaced.size, "new build".len() as u64);
    let calls = api.calls();
    let delete = calls
        .iter()
        .position(|c| c == &format!("delete {stale_id}"))
        .unwrap();
    let upload = calls.iter().position(|c| c == "upload app.zip").unwrap();
    assert!(delete < upload, "delete must finish before upload: {calls:?}");
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a/x.zip", "x1");
    write(dir.path(), "b/z.tar", "z1");

    let api = Arc::new(FakeRelease::strict());
    let ctx = context(&dir, "prereleased", "a/*.zip;b/*.tar");
    run_synced(&ctx, api.clone()).await;
    let first = api.names();

    write(dir.path(), "a/x.zip", "x2-longer");
    run_synced(&ctx, api.clone()).await;

    assert_eq!(api.names(), first);
    assert_eq!(api.names(), vec!["x.zip", "z.tar"]);
    assert_eq!(api.asset("x.zip").unwrap().size, "x2-longer".len() as u64);
}

#[tokio::test]
async fn test_duplicate_display_names_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "linux/app.tar.gz", "linux");
    write(dir.path(), "macos/app.tar.gz", "macos-build");

    let api = Arc::new(FakeRelease::default());
    let stale_id = api.seed("app.tar.gz", 1);
    let uploaded = run_synced(
        &context(&dir, "published", "linux/*.tar.gz;macos/*.tar.gz"),
        api.clone(),
    )
    .await;

    assert_eq!(uploaded.len(), 2);
    assert_eq!(api.names(), vec!["app.tar.gz"]);
    assert_eq!(
        api.asset("app.tar.gz").unwrap().size,
        "macos-build".len() as u64
    );
    // The stale snapshot entry is deleted twice; the second delete fails and is ignored.
    let deletes = api
        .calls()
        .iter()
        .filter(|c| **c == format!("delete {stale_id}"))
        .count();
    assert_eq!(deletes, 2);
}

#[tokio::test]
async fn test_delete_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app.zip", "zip");

    let api = Arc::new(FakeRelease {
        fail_deletes: true,
        ..Default::default()
    });
    api.seed("app.zip", 1);

    let files = AssetSynchronizer::prepare(&[dir.path().join("app.zip")]).unwrap();
    let result = AssetSynchronizer::new(api.clone(), REPO)
        .synchronize(RELEASE_ID, &files)
        .await
        .unwrap();

    assert_eq!(result.deleted, 0);
    assert_eq!(result.delete_failures, 1);
    assert_eq!(result.uploaded.len(), 1);
}

#[tokio::test]
async fn test_upload_failure_aborts_without_rollback() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "dist/a.zip", "a");
    write(dir.path(), "dist/b.zip", "b");
    write(dir.path(), "dist/c.zip", "c");

    let api = Arc::new(FakeRelease {
        fail_upload_of: Some("b.zip".into()),
        ..FakeRelease::strict()
    });
    let err = run(&context(&dir, "published", "dist/*.zip"), api.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Sync(SyncError::UploadFailed { ref name, .. }) if name == "b.zip"
    ));
    assert!(err.to_string().contains("Bad Gateway"));
    assert_eq!(api.names(), vec!["a.zip"]);
    assert!(!api.calls().contains(&"upload c.zip".to_string()));
}

#[tokio::test]
async fn test_release_fetch_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app.zip", "zip");

    let api = Arc::new(FakeRelease::strict());
    let mut ctx = context(&dir, "published", "app.zip");
    ctx.trigger = Trigger::new("published", Some(7));

    let err = run(&ctx, api.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Sync(SyncError::FetchFailed { release_id: 7, .. })
    ));
    assert!(api.names().is_empty());
}

#[tokio::test]
async fn test_unsupported_action_makes_no_remote_calls() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app.zip", "zip");

    let api = Arc::new(FakeRelease::strict());
    let outcome = run(&context(&dir, "edited", "app.zip"), api.clone())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Skipped { ref action } if action == "edited"));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_missing_release_fails_before_remote_calls() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app.zip", "zip");

    let api = Arc::new(FakeRelease::strict());
    let mut ctx = context(&dir, "published", "app.zip");
    ctx.trigger = Trigger::new("published", None);

    let err = run(&ctx, api.clone()).await.unwrap_err();
    assert!(matches!(err, CoreError::Trigger(TriggerError::MissingRelease)));
    assert_eq!(err.to_string(), "Could not find release");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_no_matching_files_fails_before_remote_calls() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app.zip", "zip");

    let api = Arc::new(FakeRelease::strict());
    let err = run(&context(&dir, "published", "dist/*.tar.gz"), api.clone())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Glob(GlobError::NoFilesFound)));
    assert_eq!(err.to_string(), "No files found");
    assert!(api.calls().is_empty());
}
