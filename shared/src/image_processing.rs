//! Turns a picked file into a small displayable preview.
//!
//! The core side only tracks which selection is current
//! ([`ImagePreviewPipeline`]); decoding itself is a shell concern and runs in
//! [`ImageProcessor`] on the blocking pool under hard limits, so a hostile or
//! huge file can only cost a bounded amount of memory and time.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageReader, Limits};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::model::{ImageSelection, PreviewRef, ProfileImage};
use crate::shell::ImageDecoder;

pub const PREVIEW_MEDIA_TYPE: &str = "image/webp";

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageProcessingError {
    #[error("{media_type} is not an image")]
    UnsupportedMediaType { media_type: String },

    #[error("image could not be decoded: {reason}")]
    Decode { reason: String },

    #[error("preview encoding failed for {width}x{height}: {reason}")]
    WebpEncode {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("{width}x{height} exceeds the {max_pixels} pixel limit")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    #[error("file is {size} bytes, limit is {limit}")]
    InputTooLarge { size: usize, limit: usize },

    #[error("file is empty")]
    EmptyInput,

    #[error("file format not recognised")]
    UnsupportedFormat,

    #[error("preview task panicked or was cancelled")]
    TaskFailed,

    #[error("too many previews in progress")]
    Overloaded,
}

impl From<image::ImageError> for ImageProcessingError {
    fn from(e: image::ImageError) -> Self {
        ImageProcessingError::Decode { reason: e.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingConfig {
    pub max_image_pixels: u64,
    pub max_input_bytes: usize,
    pub max_alloc_bytes: u64,
    pub max_dimension: u32,
    /// Previews are scaled down to fit a square of this size.
    pub preview_size: u32,
    pub max_concurrent_ops: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_image_pixels: 100_000_000,
            max_input_bytes: 20 * 1024 * 1024,
            max_alloc_bytes: 512 * 1024 * 1024,
            max_dimension: 15_000,
            preview_size: 512,
            max_concurrent_ops: 2,
        }
    }
}

impl ProcessingConfig {
    fn decoder_limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        limits.max_alloc = Some(self.max_alloc_bytes);
        limits
    }

    fn check_input(&self, raw: &[u8]) -> Result<(), ImageProcessingError> {
        match raw.len() {
            0 => Err(ImageProcessingError::EmptyInput),
            size if size > self.max_input_bytes => Err(ImageProcessingError::InputTooLarge {
                size,
                limit: self.max_input_bytes,
            }),
            _ => Ok(()),
        }
    }

    fn check_pixels(&self, width: u32, height: u32) -> Result<(), ImageProcessingError> {
        if u64::from(width) * u64::from(height) > self.max_image_pixels {
            return Err(ImageProcessingError::ImageTooLarge {
                width,
                height,
                max_pixels: self.max_image_pixels,
            });
        }
        Ok(())
    }
}

/// Default [`ImageDecoder`]: bounded decode plus a lossless WebP thumbnail.
pub struct ImageProcessor {
    config: ProcessingConfig,
    semaphore: Arc<Semaphore>,
}

impl ImageProcessor {
    pub fn new(config: ProcessingConfig) -> Self {
        let permits = config.max_concurrent_ops.max(1);
        Self {
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ProcessingConfig::default())
    }

    /// Refuses instead of queueing when all slots are busy.
    #[instrument(skip_all, fields(input_size = raw.len()))]
    pub async fn make_preview(&self, raw: Bytes) -> Result<PreviewRef, ImageProcessingError> {
        let started = Instant::now();
        counter!("image.preview.requests").increment(1);

        let _slot = self.semaphore.try_acquire().map_err(|_| {
            counter!("image.preview.rejected").increment(1);
            ImageProcessingError::Overloaded
        })?;

        let config = self.config.clone();
        let outcome = tokio::task::spawn_blocking(move || Self::make_preview_sync(&config, &raw))
            .await
            .map_err(|_| ImageProcessingError::TaskFailed)?;

        histogram!("image.preview.duration_ms").record(started.elapsed().as_millis() as f64);

        match &outcome {
            Ok(preview) => {
                histogram!("image.preview.output_size").record(preview.encoded.len() as f64);
                debug!(
                    preview_id = %preview.id,
                    width = preview.width,
                    height = preview.height,
                    "preview ready"
                );
            }
            Err(e) => {
                counter!("image.preview.errors").increment(1);
                warn!(error = %e, "preview failed");
            }
        }
        outcome
    }

    fn make_preview_sync(config: &ProcessingConfig, raw: &[u8]) -> Result<PreviewRef, ImageProcessingError> {
        let decoded = decode(config, raw)?;

        let bound = config.preview_size.max(1);
        let (w, h) = decoded.dimensions();
        // Only ever shrink.
        let thumb = if w.max(h) > bound {
            decoded.resize(bound, bound, FilterType::Triangle)
        } else {
            decoded
        };

        let (width, height) = thumb.dimensions();
        Ok(PreviewRef {
            id: Uuid::new_v4(),
            media_type: PREVIEW_MEDIA_TYPE.to_string(),
            width,
            height,
            encoded: encode_preview(&thumb)?,
        })
    }
}

#[async_trait]
impl ImageDecoder for ImageProcessor {
    async fn decode(&self, image: &ImageSelection) -> Result<PreviewRef, ImageProcessingError> {
        self.make_preview(image.bytes.clone()).await
    }
}

/// Decode work the shell has to do for the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub seq: u64,
    pub selection: ImageSelection,
}

#[derive(Debug)]
struct PendingDecode {
    seq: u64,
    source: ImageSelection,
}

/// Core-side gate for image selection.
///
/// Every accepted selection gets a sequence number. A decode result is only
/// applied while its number is still the pending one; a newer selection, a
/// removal or a reset cancels it.
#[derive(Debug, Default)]
pub struct ImagePreviewPipeline {
    last_seq: u64,
    pending: Option<PendingDecode>,
}

impl ImagePreviewPipeline {
    /// `Ok(None)` for a removal, which needs no decode. Non-image files are
    /// refused without touching whatever is pending.
    pub fn select(
        &mut self,
        selection: Option<ImageSelection>,
    ) -> Result<Option<DecodeRequest>, ImageProcessingError> {
        let Some(source) = selection else {
            self.cancel();
            return Ok(None);
        };

        if !source.is_image() {
            return Err(ImageProcessingError::UnsupportedMediaType {
                media_type: source.media_type,
            });
        }

        self.last_seq += 1;
        let seq = self.last_seq;
        if let Some(superseded) = self.pending.replace(PendingDecode {
            seq,
            source: source.clone(),
        }) {
            debug!(superseded = superseded.seq, seq, "newer image selected");
        }
        Ok(Some(DecodeRequest { seq, selection: source }))
    }

    pub fn cancel(&mut self) {
        if let Some(dropped) = self.pending.take() {
            debug!(seq = dropped.seq, "pending image decode cancelled");
        }
    }

    #[must_use]
    pub fn is_decoding(&self) -> bool {
        self.pending.is_some()
    }

    /// `None` when `seq` is no longer the pending selection.
    pub fn finish(
        &mut self,
        seq: u64,
        result: Result<PreviewRef, ImageProcessingError>,
    ) -> Option<Result<ProfileImage, ImageProcessingError>> {
        if self.pending.as_ref().map(|p| p.seq) != Some(seq) {
            return None;
        }
        let source = self.pending.take()?.source;
        Some(result.map(|preview| ProfileImage { source, preview }))
    }
}

fn decode(config: &ProcessingConfig, raw: &[u8]) -> Result<DynamicImage, ImageProcessingError> {
    config.check_input(raw)?;

    let mut reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| ImageProcessingError::Decode { reason: e.to_string() })?;
    if reader.format().is_none() {
        return Err(ImageProcessingError::UnsupportedFormat);
    }
    reader.limits(config.decoder_limits());

    let img = reader.decode()?;
    config.check_pixels(img.width(), img.height())?;
    Ok(img)
}

fn encode_preview(img: &DynamicImage) -> Result<Bytes, ImageProcessingError> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let fail = |reason: String| ImageProcessingError::WebpEncode { width, height, reason };

    if width == 0 || height == 0 {
        return Err(fail("zero dimension".into()));
    }

    let mut out = Vec::new();
    WebPEncoder::new_lossless(&mut out)
        .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
        .map_err(|e| fail(e.to_string()))?;

    let is_webp = out.len() >= 12 && out.starts_with(b"RIFF") && &out[8..12] == b"WEBP";
    if !is_webp {
        return Err(fail("encoder produced no RIFF/WEBP header".into()));
    }
    Ok(Bytes::from(out))
}
