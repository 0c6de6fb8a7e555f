//! Feed-reading capability.
//!
//! The pipeline only ever looks at the newest entry of a single feed, so the
//! [`FeedSource`] trait exposes exactly that: `latest()`. The production
//! implementation fetches the feed over HTTP and parses it with `feed-rs`,
//! which accepts both RSS and Atom.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// The newest entry of the feed, as far as the pipeline cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Stable unique link of the source article; doubles as the dedup key.
    pub link: String,
    /// Original title, kept as the fallback when title rewriting fails.
    pub title: String,
    /// Publication timestamp, when the feed provides one.
    pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed could not be parsed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
    #[error("feed entry has no link")]
    MissingLink,
}

/// Capability of producing the newest feed entry.
pub trait FeedSource {
    /// Return the newest entry, or `None` when the feed is empty.
    async fn latest(&self) -> Result<Option<FeedItem>, FeedError>;
}

/// HTTP-backed RSS/Atom feed reader.
#[derive(Debug, Clone)]
pub struct RssFeed {
    client: reqwest::Client,
    url: String,
}

impl RssFeed {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

impl FeedSource for RssFeed {
    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn latest(&self) -> Result<Option<FeedItem>, FeedError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let feed = feed_rs::parser::parse(bytes.as_ref())?;
        debug!(entries = feed.entries.len(), "Parsed feed");

        let Some(entry) = feed.entries.into_iter().next() else {
            info!("Feed has no entries");
            return Ok(None);
        };

        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .filter(|href| !href.is_empty())
            .ok_or(FeedError::MissingLink)?;
        let title = entry.title.map(|t| t.content).unwrap_or_default();

        info!(%link, %title, "Latest feed entry");
        Ok(Some(FeedItem {
            link,
            title,
            published: entry.published,
        }))
    }
}
