//! Persistent cursor over the feed: the link of the last published article.
//!
//! The cursor is a single plain-text file. It is read once at run start and
//! rewritten exactly once, after a confirmed publish. The write goes through
//! a temp file and rename so a crash mid-write can never leave a partially
//! written cursor behind. The single-runner model means no locking is needed.

use std::io;
use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info, instrument};

/// File-backed store for the last-published article link.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the last-published link.
    ///
    /// Returns an empty string when no cursor file exists yet, which makes
    /// the first run publish unconditionally.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let link = contents.trim().to_string();
                debug!(%link, "Loaded cursor");
                Ok(link)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cursor file; treating as first run");
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Persist `link` as the last-published article.
    ///
    /// Written via a sibling temp file and an atomic rename; callers only
    /// invoke this after the backend confirmed the post.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), %link))]
    pub async fn commit(&self, link: &str) -> io::Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, link).await?;
        fs::rename(&tmp, &self.path).await?;
        info!("Cursor committed");
        Ok(())
    }
}
