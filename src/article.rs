//! Article-fetch capability.
//!
//! Downloads the article page behind a feed link and extracts the readable
//! text plus the page's top image. The extraction is deliberately simple:
//! paragraph elements inside the usual content containers, falling back to
//! every `<p>` on the page, and the Open Graph image for the thumbnail.

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Raw article content as fetched from the source site.
#[derive(Debug, Clone)]
pub struct RawArticle {
    /// Newline-delimited paragraphs of body text.
    pub text: String,
    /// Absolute URL of the article's top image, when the page declares one.
    pub top_image: Option<String>,
}

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("article fetch failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Capability of fetching the article behind a feed link.
pub trait ArticleFetcher {
    async fn fetch(&self, link: &str) -> Result<RawArticle, ArticleError>;
}

/// HTTP + CSS-selector article fetcher.
#[derive(Debug, Clone)]
pub struct HtmlArticleFetcher {
    client: reqwest::Client,
}

impl HtmlArticleFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ArticleFetcher for HtmlArticleFetcher {
    #[instrument(level = "info", skip_all, fields(%link))]
    async fn fetch(&self, link: &str) -> Result<RawArticle, ArticleError> {
        let body = self
            .client
            .get(link)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let article = extract(&body, link);
        info!(
            bytes = article.text.len(),
            has_top_image = article.top_image.is_some(),
            "Parsed article"
        );
        Ok(article)
    }
}

/// Extract body paragraphs and the Open Graph image from an article page.
fn extract(html: &str, base: &str) -> RawArticle {
    let document = Html::parse_document(html);

    let content_selector =
        Selector::parse("article p, .entry-content p, main p").unwrap();
    let any_p = Selector::parse("p").unwrap();

    let mut paragraphs: Vec<String> = document
        .select(&content_selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.is_empty() {
        debug!("No content container matched; falling back to all <p> elements");
        paragraphs = document
            .select(&any_p)
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }

    let og_selector = Selector::parse(r#"meta[property="og:image"]"#).unwrap();
    let top_image = document
        .select(&og_selector)
        .find_map(|el| el.value().attr("content"))
        .and_then(|src| resolve(base, src));

    RawArticle {
        text: paragraphs.join("\n"),
        top_image,
    }
}

/// Resolve a possibly relative image URL against the article URL.
fn resolve(base: &str, src: &str) -> Option<String> {
    match Url::parse(src) {
        Ok(url) => Some(url.to_string()),
        Err(_) => match Url::parse(base).and_then(|b| b.join(src)) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!(%src, error = %e, "Could not resolve image URL");
                None
            }
        },
    }
}
