//! Pipeline orchestrator: one idempotent publish run.
//!
//! Sequences the stages strictly in order — cursor load, feed fetch, dedup,
//! article fetch, length gate, normalize, body rewrite, title rewrite,
//! keyword extraction, image transform, publish, cursor commit — and decides
//! at each gate whether the run proceeds, degrades, or ends. No stage is ever
//! revisited; the only loops are the single bounded rewrite retries.
//!
//! The orchestrator is generic over the capability traits so tests can drive
//! it entirely with in-memory doubles. Every external failure is converted to
//! a typed outcome at its call site; nothing panics across this boundary.
//!
//! The one invariant that matters: the cursor is committed if and only if the
//! backend confirmed the post.

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::article::{ArticleError, ArticleFetcher};
use crate::cursor::CursorStore;
use crate::feed::{FeedError, FeedSource};
use crate::keywords::{self, MAX_KEYWORDS};
use crate::media::ImageTransformer;
use crate::normalize::{normalize, word_count};
use crate::rewrite::{with_retry, Attempted, Rewriter};
use crate::wordpress::{Backend, BackendError, PostPayload, SeoMeta, Taxonomy};

/// Articles shorter than this are considered scraping failures, not news.
const MIN_ARTICLE_CHARS: usize = 300;
/// Minimum words for an accepted rewritten body.
const MIN_BODY_WORDS: usize = 80;
/// Minimum words for an accepted rewritten title.
const MIN_TITLE_WORDS: usize = 3;
/// Initial attempt plus one retry, same input.
const REWRITE_ATTEMPTS: usize = 2;
/// Upper bound for the SEO meta description.
const META_DESCRIPTION_LIMIT: usize = 155;
/// Every post lands in this category.
const CATEGORY_NAME: &str = "Noticias";
/// Published title when both the rewrite and the feed title are empty.
const UNTITLED: &str = "Sin título";

/// Why a run ended without publishing, without being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Raw article text below [`MIN_ARTICLE_CHARS`].
    ArticleTooShort { chars: usize },
    /// Rewritten body below [`MIN_BODY_WORDS`] even after the retry.
    BodyBelowThreshold,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Post confirmed and cursor committed.
    Published { link: String },
    /// Feed empty, or its newest entry was already published.
    NoNewArticle,
    /// A quality gate ended the run; the cursor was not touched.
    Aborted(AbortReason),
}

/// A failure that ends the run in error. The cursor is never advanced on any
/// of these paths.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cursor store error: {0}")]
    Cursor(#[from] std::io::Error),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Article(#[from] ArticleError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// SEO meta description: first words of the body, flattened and bounded.
fn meta_description(body: &str) -> String {
    body.replace('\n', " ")
        .chars()
        .take(META_DESCRIPTION_LIMIT)
        .collect::<String>()
        .trim()
        .to_string()
}

/// One pipeline run wired to concrete capability implementations.
pub struct Pipeline<'a, F, A, R, I, B> {
    pub feed: &'a F,
    pub articles: &'a A,
    pub rewriter: &'a R,
    pub images: &'a I,
    pub backend: &'a B,
    pub cursor: &'a CursorStore,
    /// Fallback image when the article has none; `None` means a missing
    /// article image publishes without a featured image.
    pub default_image_url: Option<String>,
}

impl<F, A, R, I, B> Pipeline<'_, F, A, R, I, B>
where
    F: FeedSource,
    A: ArticleFetcher,
    R: Rewriter,
    I: ImageTransformer,
    B: Backend,
{
    /// Execute a single run to its terminal state.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let last_published = self.cursor.load().await?;

        let Some(item) = self.feed.latest().await? else {
            info!("Feed is empty; nothing to do");
            return Ok(RunOutcome::NoNewArticle);
        };
        if item.link == last_published {
            info!(link = %item.link, "Latest article already published; skipping");
            return Ok(RunOutcome::NoNewArticle);
        }

        info!(link = %item.link, published = ?item.published, "New article detected");

        let article = self.articles.fetch(&item.link).await?;
        let chars = article.text.chars().count();
        if chars < MIN_ARTICLE_CHARS {
            warn!(chars, min = MIN_ARTICLE_CHARS, "Article too short; aborting run");
            return Ok(RunOutcome::Aborted(AbortReason::ArticleTooShort { chars }));
        }

        let normalized = normalize(&article.text);
        info!(words = word_count(&normalized), "Normalized article text");

        let body = match with_retry(
            REWRITE_ATTEMPTS,
            || self.rewriter.rewrite_body(&normalized),
            |text: &String| word_count(text) >= MIN_BODY_WORDS,
        )
        .await
        {
            Attempted::Accepted(body) => body,
            Attempted::Rejected(_) => {
                warn!(min_words = MIN_BODY_WORDS, "Body rewrite below threshold after retry; aborting run");
                return Ok(RunOutcome::Aborted(AbortReason::BodyBelowThreshold));
            }
        };

        let title = match with_retry(
            REWRITE_ATTEMPTS,
            || self.rewriter.rewrite_title(&item.title),
            |text: &String| word_count(text) >= MIN_TITLE_WORDS,
        )
        .await
        {
            Attempted::Accepted(title) => title,
            Attempted::Rejected(_) => {
                warn!(original = %item.title, "Title rewrite below threshold after retry; keeping original");
                item.title.clone()
            }
        };
        let title = if title.trim().is_empty() { UNTITLED.to_string() } else { title };

        // Keywords come from the source text, not the model's rewrite.
        let tags = keywords::extract(&normalized, MAX_KEYWORDS);
        let focus_keyword = tags.first().cloned().unwrap_or_default();
        info!(?tags, "Extracted keywords");

        let featured_media = self.featured_media(&article.top_image, &title).await;

        let category = self.backend.resolve_term(CATEGORY_NAME, Taxonomy::Categories).await?;
        let mut tag_ids = Vec::with_capacity(tags.len());
        for tag in &tags {
            tag_ids.push(self.backend.resolve_term(tag, Taxonomy::Tags).await?);
        }

        let payload = PostPayload {
            title,
            content: body.clone(),
            status: "publish",
            categories: vec![category],
            tags: tag_ids,
            featured_media,
            meta: SeoMeta {
                rank_math_description: meta_description(&body),
                rank_math_focus_keyword: focus_keyword,
            },
        };

        let post = self.backend.create_post(&payload).await?;
        self.cursor.commit(&item.link).await?;
        info!(post_id = post.id, link = %item.link, "Published and cursor committed");

        Ok(RunOutcome::Published { link: item.link })
    }

    /// Transform and upload the featured image; every failure degrades to
    /// "no featured image" rather than ending the run.
    async fn featured_media(&self, top_image: &Option<String>, title: &str) -> Option<u64> {
        let url = top_image.as_deref().or(self.default_image_url.as_deref())?;

        let asset = match self.images.transform(url, title).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!(%url, error = %e, "Image transform failed; publishing without featured image");
                return None;
            }
        };
        match self.backend.upload_media(&asset).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Media upload failed; publishing without featured image");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::RawArticle;
    use crate::feed::FeedItem;
    use crate::media::{MediaAsset, MediaError};
    use crate::rewrite::RewriteError;
    use crate::wordpress::PostRef;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubFeed(Option<FeedItem>);

    impl FeedSource for StubFeed {
        async fn latest(&self) -> Result<Option<FeedItem>, FeedError> {
            Ok(self.0.clone())
        }
    }

    struct StubArticles {
        article: RawArticle,
        calls: AtomicUsize,
    }

    impl ArticleFetcher for StubArticles {
        async fn fetch(&self, _link: &str) -> Result<RawArticle, ArticleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.article.clone())
        }
    }

    /// `None` simulates a capability that errors on every call.
    struct StubRewriter {
        body: Option<String>,
        title: Option<String>,
    }

    impl Rewriter for StubRewriter {
        async fn rewrite_body(&self, _text: &str) -> Result<String, RewriteError> {
            self.body.clone().ok_or(RewriteError::NoChoices)
        }

        async fn rewrite_title(&self, _title: &str) -> Result<String, RewriteError> {
            self.title.clone().ok_or(RewriteError::NoChoices)
        }
    }

    struct BrokenImages;

    impl ImageTransformer for BrokenImages {
        async fn transform(&self, _url: &str, _hint: &str) -> Result<MediaAsset, MediaError> {
            Err(MediaError::Io(std::io::Error::other("image host down")))
        }
    }

    struct WorkingImages;

    impl ImageTransformer for WorkingImages {
        async fn transform(&self, _url: &str, hint: &str) -> Result<MediaAsset, MediaError> {
            Ok(MediaAsset {
                bytes: vec![0xFF, 0xD8],
                content_type: "image/jpeg",
                file_name: format!("{hint}.jpg"),
            })
        }
    }

    struct StubBackend {
        fail_post: bool,
        posts: Mutex<Vec<PostPayload>>,
    }

    impl StubBackend {
        fn new(fail_post: bool) -> Self {
            Self { fail_post, posts: Mutex::new(Vec::new()) }
        }

        fn submitted(&self) -> Vec<PostPayload> {
            self.posts.lock().unwrap().clone()
        }
    }

    fn transport_error() -> BackendError {
        BackendError::Http(reqwest::Client::new().get("http://[bad").build().unwrap_err())
    }

    impl Backend for StubBackend {
        async fn resolve_term(&self, _name: &str, taxonomy: Taxonomy) -> Result<u64, BackendError> {
            Ok(match taxonomy {
                Taxonomy::Categories => 1,
                Taxonomy::Tags => 2,
            })
        }

        async fn upload_media(&self, _asset: &MediaAsset) -> Result<u64, BackendError> {
            Ok(99)
        }

        async fn create_post(&self, post: &PostPayload) -> Result<PostRef, BackendError> {
            self.posts.lock().unwrap().push(post.clone());
            if self.fail_post {
                Err(transport_error())
            } else {
                Ok(PostRef { id: 10, link: Some("https://example.com/?p=10".into()) })
            }
        }
    }

    fn words(n: usize) -> String {
        vec!["palabra"; n].join(" ")
    }

    fn feed_item(link: &str, title: &str) -> FeedItem {
        FeedItem { link: link.into(), title: title.into(), published: None }
    }

    fn long_article(top_image: Option<String>) -> RawArticle {
        RawArticle {
            text: "El equipo local dominó el partido desde el primer minuto de juego. ".repeat(7),
            top_image,
        }
    }

    fn good_rewriter() -> StubRewriter {
        StubRewriter {
            body: Some(words(90)),
            title: Some("Victoria clave en la liga".into()),
        }
    }

    #[tokio::test]
    async fn test_dedup_skips_without_fetching_the_article() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        cursor.commit("https://example.com/a").await.unwrap();

        let feed = StubFeed(Some(feed_item("https://example.com/a", "T")));
        let articles = StubArticles { article: long_article(None), calls: AtomicUsize::new(0) };
        let rewriter = good_rewriter();
        let backend = StubBackend::new(false);
        let pipeline = Pipeline {
            feed: &feed,
            articles: &articles,
            rewriter: &rewriter,
            images: &BrokenImages,
            backend: &backend,
            cursor: &cursor,
            default_image_url: None,
        };

        let outcome = pipeline.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::NoNewArticle);
        assert_eq!(articles.calls.load(Ordering::SeqCst), 0);
        assert!(backend.submitted().is_empty());
        assert_eq!(cursor.load().await.unwrap(), "https://example.com/a");
    }

    #[tokio::test]
    async fn test_cursor_advances_only_on_confirmed_publish() {
        for fail_post in [false, true] {
            let dir = tempfile::tempdir().unwrap();
            let cursor = CursorStore::new(dir.path().join("cursor"));
            let feed = StubFeed(Some(feed_item("https://example.com/a", "Título original")));
            let articles =
                StubArticles { article: long_article(None), calls: AtomicUsize::new(0) };
            let rewriter = good_rewriter();
            let backend = StubBackend::new(fail_post);
            let pipeline = Pipeline {
                feed: &feed,
                articles: &articles,
                rewriter: &rewriter,
                images: &BrokenImages,
                backend: &backend,
                cursor: &cursor,
                default_image_url: None,
            };

            let result = pipeline.run().await;
            if fail_post {
                assert!(result.is_err());
                assert_eq!(cursor.load().await.unwrap(), "");
            } else {
                assert_eq!(
                    result.unwrap(),
                    RunOutcome::Published { link: "https://example.com/a".into() }
                );
                assert_eq!(cursor.load().await.unwrap(), "https://example.com/a");
            }
        }
    }

    #[tokio::test]
    async fn test_title_falls_back_to_feed_title() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let feed = StubFeed(Some(feed_item("https://example.com/a", "Título original del feed")));
        let articles = StubArticles { article: long_article(None), calls: AtomicUsize::new(0) };
        let rewriter = StubRewriter { body: Some(words(90)), title: None };
        let backend = StubBackend::new(false);
        let pipeline = Pipeline {
            feed: &feed,
            articles: &articles,
            rewriter: &rewriter,
            images: &BrokenImages,
            backend: &backend,
            cursor: &cursor,
            default_image_url: None,
        };

        let outcome = pipeline.run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Published { .. }));
        let posts = backend.submitted();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Título original del feed");
    }

    #[tokio::test]
    async fn test_image_failure_publishes_without_featured_media() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let feed = StubFeed(Some(feed_item("https://example.com/a", "T")));
        let articles = StubArticles {
            article: long_article(Some("https://example.com/img.jpg".into())),
            calls: AtomicUsize::new(0),
        };
        let rewriter = good_rewriter();
        let backend = StubBackend::new(false);
        let pipeline = Pipeline {
            feed: &feed,
            articles: &articles,
            rewriter: &rewriter,
            images: &BrokenImages,
            backend: &backend,
            cursor: &cursor,
            default_image_url: None,
        };

        let outcome = pipeline.run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Published { .. }));
        assert_eq!(backend.submitted()[0].featured_media, None);
    }

    #[tokio::test]
    async fn test_working_image_sets_featured_media() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let feed = StubFeed(Some(feed_item("https://example.com/a", "T")));
        let articles = StubArticles {
            article: long_article(Some("https://example.com/img.jpg".into())),
            calls: AtomicUsize::new(0),
        };
        let rewriter = good_rewriter();
        let backend = StubBackend::new(false);
        let pipeline = Pipeline {
            feed: &feed,
            articles: &articles,
            rewriter: &rewriter,
            images: &WorkingImages,
            backend: &backend,
            cursor: &cursor,
            default_image_url: None,
        };

        pipeline.run().await.unwrap();
        assert_eq!(backend.submitted()[0].featured_media, Some(99));
    }

    #[tokio::test]
    async fn test_short_article_aborts_before_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let feed = StubFeed(Some(feed_item("https://example.com/a", "T")));
        let articles = StubArticles {
            article: RawArticle { text: "Demasiado corto para publicar.".into(), top_image: None },
            calls: AtomicUsize::new(0),
        };
        let rewriter = good_rewriter();
        let backend = StubBackend::new(false);
        let pipeline = Pipeline {
            feed: &feed,
            articles: &articles,
            rewriter: &rewriter,
            images: &BrokenImages,
            backend: &backend,
            cursor: &cursor,
            default_image_url: None,
        };

        let outcome = pipeline.run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Aborted(AbortReason::ArticleTooShort { .. })));
        assert!(backend.submitted().is_empty());
        assert_eq!(cursor.load().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_body_below_threshold_aborts_without_publishing() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let feed = StubFeed(Some(feed_item("https://example.com/a", "T")));
        let articles = StubArticles { article: long_article(None), calls: AtomicUsize::new(0) };
        let rewriter = StubRewriter {
            body: Some(words(79)),
            title: Some("Un título cualquiera".into()),
        };
        let backend = StubBackend::new(false);
        let pipeline = Pipeline {
            feed: &feed,
            articles: &articles,
            rewriter: &rewriter,
            images: &BrokenImages,
            backend: &backend,
            cursor: &cursor,
            default_image_url: None,
        };

        let outcome = pipeline.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Aborted(AbortReason::BodyBelowThreshold));
        assert!(backend.submitted().is_empty());
        assert_eq!(cursor.load().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_published_payload_carries_bounded_meta_description() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let feed = StubFeed(Some(feed_item("https://example.com/a", "T")));
        let articles = StubArticles { article: long_article(None), calls: AtomicUsize::new(0) };
        let body = format!("{}\n\n{}", words(45), words(45));
        let rewriter = StubRewriter { body: Some(body), title: Some("Victoria en la liga".into()) };
        let backend = StubBackend::new(false);
        let pipeline = Pipeline {
            feed: &feed,
            articles: &articles,
            rewriter: &rewriter,
            images: &BrokenImages,
            backend: &backend,
            cursor: &cursor,
            default_image_url: None,
        };

        pipeline.run().await.unwrap();
        let desc = backend.submitted()[0].meta.rank_math_description.clone();
        assert!(desc.chars().count() <= META_DESCRIPTION_LIMIT);
        assert!(!desc.contains('\n'));
    }

    #[test]
    fn test_meta_description_flattens_and_truncates() {
        let body = format!("línea uno\nlínea dos\n{}", "a".repeat(300));
        let desc = meta_description(&body);
        assert!(desc.chars().count() <= META_DESCRIPTION_LIMIT);
        assert!(!desc.contains('\n'));
        assert!(desc.starts_with("línea uno línea dos"));
    }

    /// The end-to-end scenario: new article, 90-word body, 5-word title,
    /// keywords from the source text, image fetch fails, publish succeeds,
    /// cursor lands on the new link.
    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let cursor = CursorStore::new(dir.path().join("cursor"));
        let feed = StubFeed(Some(feed_item("A", "T")));
        let articles = StubArticles { article: long_article(None), calls: AtomicUsize::new(0) };
        let rewriter = StubRewriter {
            body: Some(words(90)),
            title: Some("Victoria liga gol partido equipo".into()),
        };
        let backend = StubBackend::new(false);
        let pipeline = Pipeline {
            feed: &feed,
            articles: &articles,
            rewriter: &rewriter,
            images: &BrokenImages,
            backend: &backend,
            cursor: &cursor,
            default_image_url: Some("https://cdn.example/default.jpg".into()),
        };

        let outcome = pipeline.run().await.unwrap();
        assert_eq!(outcome, RunOutcome::Published { link: "A".into() });
        assert_eq!(cursor.load().await.unwrap(), "A");

        let posts = backend.submitted();
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.status, "publish");
        assert_eq!(post.categories, vec![1]);
        assert_eq!(post.featured_media, None);
        assert!(!post.tags.is_empty());
        assert!(!post.meta.rank_math_focus_keyword.is_empty());
    }
}
