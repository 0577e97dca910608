//! GitHub REST adapter for the rotation core: lists, deletes, and uploads
//! assets on one release through the `releases` API.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_LENGTH;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::USER_AGENT;
use rotor_core::classify::RemoteAsset;
use rotor_core::rotate::ReleaseHost;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_UPLOAD_BASE: &str = "https://uploads.github.com";

/// Page size for asset listings; pages are followed until a short one.
const PER_PAGE: usize = 100;

/// How much of an error response body is kept in the error message.
const BODY_EXCERPT: usize = 200;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("github request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("github returned {status} while {context}: {body}")]
    Status {
        status: StatusCode,
        context: String,
        body: String,
    },
    #[error("upload response carries no `browser_download_url`")]
    MissingDownloadUrl,
    #[error("invalid base url `{url}`: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Asset endpoints of a single release, bound to owner/repo/release id.
#[derive(Debug, Clone)]
pub struct GitHubReleaseClient {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
    owner: String,
    repo: String,
    release_id: u64,
    token: String,
}

#[derive(Debug, serde::Deserialize)]
struct UploadResponse {
    browser_download_url: Option<String>,
}

impl GitHubReleaseClient {
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        release_id: u64,
    ) -> Result<Self, GitHubError> {
        Self::with_bases(
            token,
            owner,
            repo,
            release_id,
            DEFAULT_API_BASE,
            DEFAULT_UPLOAD_BASE,
        )
    }

    /// Build a client against non-default API hosts. Tests point both bases
    /// at a local mock server.
    pub fn with_bases(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        release_id: u64,
        api_base: &str,
        upload_base: &str,
    ) -> Result<Self, GitHubError> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_base: checked_base(api_base)?,
            upload_base: checked_base(upload_base)?,
            owner: owner.into(),
            repo: repo.into(),
            release_id,
            token: token.into(),
        })
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "rotor")
    }

    async fn list_all(&self) -> Result<Vec<RemoteAsset>, GitHubError> {
        let mut assets: Vec<RemoteAsset> = Vec::new();
        for page in 1usize.. {
            let url = format!(
                "{}/repos/{}/{}/releases/{}/assets?per_page={PER_PAGE}&page={page}",
                self.api_base, self.owner, self.repo, self.release_id
            );
            tracing::debug!("listing release assets, page {page}");
            let resp = self.request(Method::GET, url).send().await?;
            let resp = checked(resp, "listing assets").await?;
            let rows: Vec<RemoteAsset> = resp.json().await?;
            let short_page = rows.len() < PER_PAGE;
            assets.extend(rows);
            if short_page {
                break;
            }
        }
        // The classifier requires ascending creation order.
        assets.sort_by_key(|asset| asset.created_at);
        Ok(assets)
    }

    async fn delete(&self, id: u64) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/releases/assets/{id}",
            self.api_base, self.owner, self.repo
        );
        tracing::debug!("deleting release asset {id}");
        let resp = self.request(Method::DELETE, url).send().await?;
        checked(resp, "deleting an asset").await?;
        Ok(())
    }

    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/releases/{}/assets?name={}",
            self.upload_base,
            self.owner,
            self.repo,
            self.release_id,
            urlencoding::encode(name)
        );
        tracing::debug!("uploading {} bytes as {name}", bytes.len());
        let resp = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, bytes.len())
            .body(bytes)
            .send()
            .await?;
        let resp = checked(resp, "uploading an asset").await?;
        let parsed: UploadResponse = resp.json().await?;
        parsed
            .browser_download_url
            .ok_or(GitHubError::MissingDownloadUrl)
    }
}

#[async_trait]
impl ReleaseHost for GitHubReleaseClient {
    async fn list_assets(&self) -> anyhow::Result<Vec<RemoteAsset>> {
        Ok(self.list_all().await?)
    }

    async fn delete_asset(&self, id: u64) -> anyhow::Result<()> {
        Ok(self.delete(id).await?)
    }

    async fn upload_asset(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<String> {
        Ok(self.upload(name, content_type, bytes).await?)
    }
}

fn checked_base(base: &str) -> Result<String, GitHubError> {
    Url::parse(base).map_err(|source| GitHubError::BaseUrl {
        url: base.to_string(),
        source,
    })?;
    Ok(base.trim_end_matches('/').to_string())
}

async fn checked(
    resp: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, GitHubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: String = resp
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(BODY_EXCERPT)
        .collect();
    Err(GitHubError::Status {
        status,
        context: context.to_string(),
        body,
    })
}
