//! WordPress REST backend: taxonomy terms, media uploads, and post creation.
//!
//! Everything goes through the standard `wp-json/wp/v2` routes with an
//! application password over basic auth. Term resolution is lookup-first:
//! an existing category or tag is reused, otherwise it is created. The SEO
//! plugin's meta keys (`rank_math_*`) ride along in the post payload.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::media::MediaAsset;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const POST_TIMEOUT: Duration = Duration::from_secs(30);

/// WordPress taxonomy a term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Categories,
    Tags,
}

impl Taxonomy {
    fn as_path(self) -> &'static str {
        match self {
            Taxonomy::Categories => "categories",
            Taxonomy::Tags => "tags",
        }
    }
}

/// SEO metadata block attached to every post.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeoMeta {
    pub rank_math_description: String,
    pub rank_math_focus_keyword: String,
}

/// Full post payload as submitted to the backend.
///
/// `featured_media` is always present in the JSON, serialized as `null` when
/// there is no featured image, so the backend never sees a zero id.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PostPayload {
    pub title: String,
    pub content: String,
    pub status: &'static str,
    pub categories: Vec<u64>,
    pub tags: Vec<u64>,
    pub featured_media: Option<u64>,
    pub meta: SeoMeta,
}

/// Reference to a created post.
#[derive(Debug, Clone, Deserialize)]
pub struct PostRef {
    pub id: u64,
    pub link: Option<String>,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Capability surface of the content-management backend.
pub trait Backend {
    /// Look a term up by name, creating it if absent; returns its id.
    async fn resolve_term(&self, name: &str, taxonomy: Taxonomy) -> Result<u64, BackendError>;
    /// Upload a compressed image; returns the media id.
    async fn upload_media(&self, asset: &MediaAsset) -> Result<u64, BackendError>;
    /// Submit a post; the pipeline commits its cursor only after this succeeds.
    async fn create_post(&self, post: &PostPayload) -> Result<PostRef, BackendError>;
}

#[derive(Debug, Deserialize)]
struct Term {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct MediaRef {
    id: u64,
}

/// WordPress REST client.
#[derive(Debug, Clone)]
pub struct WpClient {
    http: reqwest::Client,
    site_url: String,
    username: String,
    app_password: String,
}

impl WpClient {
    pub fn new(
        http: reqwest::Client,
        site_url: String,
        username: String,
        app_password: String,
    ) -> Self {
        Self { http, site_url, username, app_password }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/wp-json/wp/v2/{path}", self.site_url)
    }
}

impl Backend for WpClient {
    #[instrument(level = "info", skip_all, fields(%name, taxonomy = taxonomy.as_path()))]
    async fn resolve_term(&self, name: &str, taxonomy: Taxonomy) -> Result<u64, BackendError> {
        let url = self.endpoint(taxonomy.as_path());

        let matches: Vec<Term> = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.app_password))
            .query(&[("search", name)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(term) = matches.first() {
            debug!(id = term.id, "Term already exists");
            return Ok(term.id);
        }

        let created: Term = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.app_password))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(id = created.id, "Created term");
        Ok(created.id)
    }

    #[instrument(level = "info", skip_all, fields(file_name = %asset.file_name, bytes = asset.bytes.len()))]
    async fn upload_media(&self, asset: &MediaAsset) -> Result<u64, BackendError> {
        let uploaded: MediaRef = self
            .http
            .post(self.endpoint("media"))
            .basic_auth(&self.username, Some(&self.app_password))
            .header(
                reqwest::header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", asset.file_name),
            )
            .header(reqwest::header::CONTENT_TYPE, asset.content_type)
            .timeout(UPLOAD_TIMEOUT)
            .body(asset.bytes.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(id = uploaded.id, "Uploaded media");
        Ok(uploaded.id)
    }

    #[instrument(level = "info", skip_all, fields(title = %post.title))]
    async fn create_post(&self, post: &PostPayload) -> Result<PostRef, BackendError> {
        let created: PostRef = self
            .http
            .post(self.endpoint("posts"))
            .basic_auth(&self.username, Some(&self.app_password))
            .timeout(POST_TIMEOUT)
            .json(post)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(id = created.id, link = ?created.link, "Post created");
        Ok(created)
    }
}
