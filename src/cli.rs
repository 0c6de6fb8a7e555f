//! Command-line interface definitions for noticiero.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and URLs can be provided via command-line flags or environment
//! variables, so the binary works both interactively and under a scheduler
//! with a plain environment file.

use clap::Parser;

/// Command-line arguments for the noticiero pipeline.
///
/// All secrets default to environment variables so they never have to appear
/// in shell history. The feed URL, cursor file, and model carry defaults that
/// match the production deployment.
///
/// # Examples
///
/// ```sh
/// # Everything from the environment
/// OPENROUTER_API_KEY=... WP_SITE_URL=https://example.com \
/// WP_USERNAME=editor WP_APP_PASSWORD=... noticiero
///
/// # Overriding the feed and cursor location
/// noticiero --feed-url https://example.com/feed/ --cursor-file /var/lib/noticiero/cursor
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// RSS feed to poll for the latest article
    #[arg(long, env = "FEED_URL", default_value = "https://jeinzmaciass.com/feed/")]
    pub feed_url: String,

    /// File holding the link of the last published article
    #[arg(long, env = "CURSOR_FILE", default_value = "last_published.txt")]
    pub cursor_file: String,

    /// OpenRouter API key for the rewriting endpoint
    #[arg(long, env = "OPENROUTER_API_KEY")]
    pub openrouter_api_key: String,

    /// Chat-completion model used for body and title rewriting
    #[arg(long, env = "REWRITE_MODEL", default_value = "meta-llama/llama-3-8b-instruct")]
    pub model: String,

    /// Base URL of the WordPress site (no trailing slash needed)
    #[arg(long, env = "WP_SITE_URL")]
    pub wp_site_url: String,

    /// WordPress username the posts are published as
    #[arg(long, env = "WP_USERNAME")]
    pub wp_username: String,

    /// WordPress application password for REST authentication
    #[arg(long, env = "WP_APP_PASSWORD")]
    pub wp_app_password: String,

    /// Fallback image when the article has no top image; when absent and the
    /// article carries no image, the post is published without a featured image
    #[arg(long, env = "DEFAULT_IMAGE_URL")]
    pub default_image_url: Option<String>,
}
