//! Immutable runtime configuration.
//!
//! All mutable-looking state (API keys, site URLs, file paths) is collected
//! into a single [`Config`] constructed once at process entry and passed
//! explicitly to each component constructor. Nothing reads the environment
//! after startup, which keeps the components trivial to instantiate with
//! fakes in tests.

use std::path::PathBuf;

use crate::cli::Cli;

/// Runtime configuration for a single pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// RSS feed polled for the latest article.
    pub feed_url: String,
    /// Path of the plain-text cursor file.
    pub cursor_file: PathBuf,
    /// Bearer token for the OpenRouter chat-completion endpoint.
    pub openrouter_api_key: String,
    /// Model identifier sent with every rewrite request.
    pub model: String,
    /// WordPress site base URL, without a trailing slash.
    pub wp_site_url: String,
    /// WordPress REST username.
    pub wp_username: String,
    /// WordPress application password.
    pub wp_app_password: String,
    /// Fallback image used when the article has no top image.
    pub default_image_url: Option<String>,
}

impl Config {
    /// Build the configuration from parsed CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            feed_url: cli.feed_url.clone(),
            cursor_file: PathBuf::from(&cli.cursor_file),
            openrouter_api_key: cli.openrouter_api_key.clone(),
            model: cli.model.clone(),
            wp_site_url: cli.wp_site_url.trim_end_matches('/').to_string(),
            wp_username: cli.wp_username.clone(),
            wp_app_password: cli.wp_app_password.clone(),
            default_image_url: cli.default_image_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_site_url_trailing_slash_is_trimmed() {
        let cli = Cli::parse_from([
            "noticiero",
            "--openrouter-api-key",
            "k",
            "--wp-site-url",
            "https://example.com/",
            "--wp-username",
            "u",
            "--wp-app-password",
            "p",
        ]);
        let config = Config::from_cli(&cli);
        assert_eq!(config.wp_site_url, "https://example.com");
    }
}
