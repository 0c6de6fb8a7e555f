//! Featured-image pipeline: fetch, reorient, recompress.
//!
//! The source article's top image (or the configured fallback) is downloaded,
//! orientation-corrected from embedded metadata when possible, and re-encoded
//! as a lossy JPEG stepped down in quality until it fits the byte budget.
//! Every failure in this module is non-fatal upstream: the orchestrator
//! publishes without a featured image instead of aborting the run.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Target upper bound for the compressed image. A tuning knob, not a hard
/// contract: if the lowest quality step still exceeds it, that result ships.
const MAX_IMAGE_KB: usize = 120;

/// Quality steps tried in order until the encoded size fits the budget.
const QUALITY_STEPS: &[u8] = &[85, 70, 55];

const FILE_NAME_LIMIT: usize = 40;

/// A compressed image ready for upload.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image format not recognized: {0}")]
    Io(#[from] std::io::Error),
    #[error("image could not be processed: {0}")]
    Image(#[from] image::ImageError),
}

/// Capability of turning an image URL into an upload-ready asset.
pub trait ImageTransformer {
    async fn transform(&self, url: &str, name_hint: &str) -> Result<MediaAsset, MediaError>;
}

/// HTTP-backed image pipeline.
#[derive(Debug, Clone)]
pub struct WebImagePipeline {
    client: reqwest::Client,
}

impl WebImagePipeline {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ImageTransformer for WebImagePipeline {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn transform(&self, url: &str, name_hint: &str) -> Result<MediaAsset, MediaError> {
        let raw = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!(bytes = raw.len(), "Fetched image");

        let bytes = compress_to_target(&raw, MAX_IMAGE_KB)?;
        info!(bytes = bytes.len(), "Compressed image");
        Ok(MediaAsset {
            bytes,
            content_type: "image/jpeg",
            file_name: file_name_for(name_hint),
        })
    }
}

/// Decode `raw`, fix its orientation, and re-encode as JPEG within `max_kb`.
///
/// Orientation metadata that cannot be read is skipped rather than treated as
/// an error; a sideways-looking thumbnail beats no thumbnail.
pub fn compress_to_target(raw: &[u8], max_kb: usize) -> Result<Vec<u8>, MediaError> {
    let mut decoder = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation().unwrap_or_else(|e| {
        warn!(error = %e, "Could not read orientation metadata; skipping correction");
        Orientation::NoTransforms
    });

    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    let img = DynamicImage::ImageRgb8(img.into_rgb8());

    let mut encoded = Vec::new();
    for &quality in QUALITY_STEPS {
        encoded = Vec::new();
        img.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality))?;
        if encoded.len() <= max_kb * 1024 {
            debug!(quality, bytes = encoded.len(), "Image fits byte budget");
            return Ok(encoded);
        }
        warn!(quality, bytes = encoded.len(), "Image over byte budget; lowering quality");
    }
    Ok(encoded)
}

/// Derive an upload filename from the post title.
fn file_name_for(hint: &str) -> String {
    let joined = hint
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .take(FILE_NAME_LIMIT)
        .collect::<String>();
    let base = joined.trim_matches('_');
    if base.is_empty() {
        "imagen.jpg".to_string()
    } else {
        format!("{base}.jpg")
    }
}
