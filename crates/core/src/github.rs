//! GitHub release API client.
//!
//! [`ReleaseApi`] is the seam the synchronizer talks to; [`GitHubClient`] is
//! the REST implementation used in production.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use reqwest::Url;
use tracing::{debug, info, instrument};

use crate::errors::GitHubError;
use crate::models::{AssetRecord, ExistingAsset, LocalFile, Release};

/// Page size used when listing release assets.
const ASSETS_PER_PAGE: usize = 100;

/// Release operations needed to reconcile assets.
#[async_trait]
pub trait ReleaseApi: Send + Sync {
    async fn get_release(&self, repo: &str, release_id: u64) -> Result<Release, GitHubError>;

    async fn list_assets(
        &self,
        repo: &str,
        release_id: u64,
    ) -> Result<Vec<ExistingAsset>, GitHubError>;

    async fn delete_asset(&self, repo: &str, asset_id: u64) -> Result<(), GitHubError>;

    /// Stream `file` to the release's upload endpoint under `file.name`.
    async fn upload_asset(
        &self,
        release: &Release,
        file: &LocalFile,
    ) -> Result<AssetRecord, GitHubError>;
}

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let token = token.into();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("assetsync/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        info!(api_url = %api_url, "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status.as_u16() == 429
            || (status.as_u16() == 403
                && resp
                    .headers()
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    == Some("0"))
        {
            let reset = resp
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            return Err(GitHubError::RateLimited { reset_at: reset });
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GitHubError::AuthenticationFailed(format!(
                "HTTP {}",
                status
            )));
        }
        let body = resp.text().await.unwrap_or_default();
        Err(GitHubError::ApiError {
            status: status.as_u16(),
            body: if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body
            },
        })
    }
}

#[async_trait]
impl ReleaseApi for GitHubClient {
    #[instrument(skip(self))]
    async fn get_release(&self, repo: &str, release_id: u64) -> Result<Release, GitHubError> {
        let url = format!("{}/repos/{}/releases/{}", self.api_url, repo, release_id);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let release: Release = Self::check_response(resp).await?.json().await?;
        debug!(release_id, upload_url = %release.upload_url, "fetched release");
        Ok(release)
    }

    #[instrument(skip(self))]
    async fn list_assets(
        &self,
        repo: &str,
        release_id: u64,
    ) -> Result<Vec<ExistingAsset>, GitHubError> {
        let url = format!(
            "{}/repos/{}/releases/{}/assets",
            self.api_url, repo, release_id
        );
        let per_page = ASSETS_PER_PAGE.to_string();
        let assets = collect_pages(ASSETS_PER_PAGE, |page| {
            let page = page.to_string();
            let req = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[("per_page", per_page.as_str()), ("page", page.as_str())]);
            async move {
                let resp = req.send().await?;
                let batch: Vec<ExistingAsset> = Self::check_response(resp).await?.json().await?;
                Ok::<_, GitHubError>(batch)
            }
        })
        .await?;
        debug!(count = assets.len(), "fetched release assets");
        Ok(assets)
    }

    #[instrument(skip(self))]
    async fn delete_asset(&self, repo: &str, asset_id: u64) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/releases/assets/{}",
            self.api_url, repo, asset_id
        );
        let resp = self
            .http
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check_response(resp).await?;
        debug!(asset_id, "deleted release asset");
        Ok(())
    }

    #[instrument(skip(self, release), fields(release_id = release.id, name = %file.name))]
    async fn upload_asset(
        &self,
        release: &Release,
        file: &LocalFile,
    ) -> Result<AssetRecord, GitHubError> {
        let url = upload_endpoint(&release.upload_url, &file.name)?;
        let body = tokio::fs::File::open(&file.path)
            .await
            .map_err(|source| GitHubError::FileError {
                path: file.path.clone(),
                source,
            })?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, file.content_type.as_str())
            .header(CONTENT_LENGTH, file.size)
            .body(reqwest::Body::from(body))
            .send()
            .await?;
        let asset: AssetRecord = Self::check_response(resp).await?.json().await?;
        info!(asset_id = asset.id, size = asset.size, "uploaded release asset");
        Ok(asset)
    }
}

/// Fetch 1-based pages until one comes back with fewer than `per_page` items.
///
/// A page that is exactly full is followed by one more request.
async fn collect_pages<T, F, Fut>(per_page: usize, mut fetch: F) -> Result<Vec<T>, GitHubError>
where
    F: FnMut(usize) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<T>, GitHubError>>,
{
    let mut items = Vec::new();
    for page in 1.. {
        let batch = fetch(page).await?;
        let last_page = batch.len() < per_page;
        items.extend(batch);
        if last_page {
            break;
        }
    }
    Ok(items)
}

/// Expand a release `upload_url` template into the request URL for `name`.
///
/// The API returns `https://uploads.github.com/.../assets{?name,label}`; the
/// `{...}` suffix is dropped and `name` is added as a query parameter.
pub fn upload_endpoint(template: &str, name: &str) -> Result<Url, GitHubError> {
    let base = template
        .split_once('{')
        .map(|(base, _)| base)
        .unwrap_or(template);
    let mut url =
        Url::parse(base).map_err(|_| GitHubError::InvalidUploadUrl(template.to_string()))?;
    url.query_pairs_mut().append_pair("name", name);
    Ok(url)
}
