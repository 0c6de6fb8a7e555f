//! # noticiero
//!
//! Republishes the newest article from a sports-news RSS feed as a
//! Spanish-language WordPress post. One invocation is one run: fetch the
//! feed, skip if the newest article was already published, otherwise clean
//! the article text, rewrite body and title through an LLM, extract
//! keywords, attach a recompressed thumbnail, publish, and record the
//! article link so no run ever republishes it.
//!
//! ## Usage
//!
//! ```sh
//! OPENROUTER_API_KEY=... WP_SITE_URL=https://example.com \
//! WP_USERNAME=editor WP_APP_PASSWORD=... noticiero
//! ```
//!
//! ## Architecture
//!
//! A strictly sequential pipeline with a persisted cursor:
//! 1. **Dedup**: compare the newest feed link against the cursor file
//! 2. **Fetch & clean**: scrape the article, normalize the text
//! 3. **Rewrite**: Spanish body and title with quality-gated single retries
//! 4. **Enrich**: keyword tags, SEO metadata, featured image (best effort)
//! 5. **Publish & commit**: create the post, then — and only then — advance
//!    the cursor

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod article;
mod cli;
mod config;
mod cursor;
mod feed;
mod keywords;
mod media;
mod normalize;
mod pipeline;
mod rewrite;
mod wordpress;

use article::HtmlArticleFetcher;
use cli::Cli;
use config::Config;
use cursor::CursorStore;
use feed::RssFeed;
use media::WebImagePipeline;
use pipeline::{AbortReason, Pipeline, RunOutcome};
use rewrite::OpenRouterClient;
use wordpress::WpClient;

/// Default timeout for feed, article, term, and media-fetch requests.
/// Rewrite calls and uploads carry their own longer per-request timeouts.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("noticiero starting up");

    let args = Cli::parse();
    let config = Config::from_cli(&args);
    info!(feed_url = %config.feed_url, cursor_file = %config.cursor_file.display(), "Loaded configuration");

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("noticiero/", env!("CARGO_PKG_VERSION")))
        .build()?;
    // Rewrite calls set per-request timeouts well above the default.
    let rewrite_http = reqwest::Client::builder()
        .user_agent(concat!("noticiero/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let feed = RssFeed::new(http.clone(), config.feed_url.clone());
    let articles = HtmlArticleFetcher::new(http.clone());
    let rewriter = OpenRouterClient::new(
        rewrite_http,
        config.openrouter_api_key.clone(),
        config.model.clone(),
    );
    let images = WebImagePipeline::new(http.clone());
    let backend = WpClient::new(
        http,
        config.wp_site_url.clone(),
        config.wp_username.clone(),
        config.wp_app_password.clone(),
    );
    let cursor = CursorStore::new(config.cursor_file.clone());

    let pipeline = Pipeline {
        feed: &feed,
        articles: &articles,
        rewriter: &rewriter,
        images: &images,
        backend: &backend,
        cursor: &cursor,
        default_image_url: config.default_image_url.clone(),
    };

    let outcome = match pipeline.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Run failed; cursor left untouched");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    match outcome {
        RunOutcome::Published { link } => {
            info!(%link, ?elapsed, "Run complete: article published");
        }
        RunOutcome::NoNewArticle => {
            info!(?elapsed, "Run complete: no new article");
        }
        RunOutcome::Aborted(AbortReason::ArticleTooShort { chars }) => {
            warn!(chars, ?elapsed, "Run aborted: article too short to publish");
        }
        RunOutcome::Aborted(AbortReason::BodyBelowThreshold) => {
            warn!(?elapsed, "Run aborted: rewritten body below quality threshold");
        }
    }

    Ok(())
}
