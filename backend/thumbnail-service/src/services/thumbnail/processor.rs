//! Thumbnail processor - fits images inside a bounding box
//!
//! Decodes the original, shrinks it with a nearest-neighbour filter so that it
//! fits inside `max_width` x `max_height` while keeping its aspect ratio, and
//! re-encodes it in the format it arrived in.
//!
//! Uses `spawn_blocking` for CPU-intensive operations to avoid blocking the async runtime.

use crate::error::{AppError, Result};
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

const ICO_MAX_SIDE: u32 = 256;

/// Configuration for thumbnail generation
#[derive(Clone, Debug)]
pub struct ThumbnailConfig {
    /// Maximum width in pixels
    pub max_width: u32,
    /// Maximum height in pixels
    pub max_height: u32,
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: 640,
            max_height: 480,
            quality: 75,
        }
    }
}

/// A decoded original together with the format it was stored in
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

/// Result of thumbnail generation
#[derive(Debug)]
pub struct ThumbnailResult {
    /// Encoded thumbnail, same format as the original
    pub data: Bytes,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ThumbnailResult {
    pub fn content_type(&self) -> &'static str {
        content_type_for(self.format)
    }
}

/// MIME type written alongside the stored thumbnail
pub fn content_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Largest size with the same aspect ratio that fits inside the bounds.
///
/// Images already inside the bounds keep their size; nothing is upscaled.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );

    let new_w = ((width as f64) * ratio).round() as u32;
    let new_h = ((height as f64) * ratio).round() as u32;

    (new_w.clamp(1, max_width), new_h.clamp(1, max_height))
}

/// Thumbnail processor
pub struct ThumbnailProcessor {
    config: ThumbnailConfig,
}

impl ThumbnailProcessor {
    /// Create a new processor with the given configuration
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// Bounds for a given output format
    ///
    /// ICO images cannot exceed 256 pixels on either side.
    fn bounds_for(&self, format: ImageFormat) -> (u32, u32) {
        match format {
            ImageFormat::Ico => (
                self.config.max_width.min(ICO_MAX_SIDE),
                self.config.max_height.min(ICO_MAX_SIDE),
            ),
            _ => (self.config.max_width, self.config.max_height),
        }
    }

    /// Sniff the format and decode the original bytes
    pub fn decode(&self, original_data: &[u8]) -> Result<DecodedImage> {
        let format = image::guess_format(original_data)
            .map_err(|e| AppError::Decode(format!("Unrecognised image format: {e}")))?;

        let image = image::load_from_memory_with_format(original_data, format)
            .map_err(|e| AppError::Decode(format!("Failed to decode image: {e}")))?;

        let (width, height) = image.dimensions();
        debug!(?format, width, height, "Decoded original image");

        Ok(DecodedImage { image, format })
    }

    /// Shrink a decoded image into the bounds for the format it will be written in
    pub fn resize(&self, image: &DynamicImage, format: ImageFormat) -> DynamicImage {
        let (orig_w, orig_h) = image.dimensions();
        let (max_w, max_h) = self.bounds_for(format);
        let (new_w, new_h) = fit_within(orig_w, orig_h, max_w, max_h);

        if (new_w, new_h) == (orig_w, orig_h) {
            debug!("Image already within bounds, keeping dimensions");
            return image.clone();
        }

        image.resize_exact(new_w, new_h, FilterType::Nearest)
    }

    /// Encode a raster in the given format
    pub fn encode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Bytes> {
        let output = match format {
            ImageFormat::Jpeg => ImageOutputFormat::Jpeg(self.config.quality),
            other => ImageOutputFormat::from(other),
        };

        if let ImageOutputFormat::Unsupported(name) = &output {
            return Err(AppError::Internal(format!(
                "Encoding to {name} is not supported"
            )));
        }

        // JPEG has no alpha channel
        let image = match (format, image) {
            (ImageFormat::Jpeg, DynamicImage::ImageRgba8(_) | DynamicImage::ImageLumaA8(_)) => {
                DynamicImage::ImageRgb8(image.to_rgb8())
            }
            _ => image.clone(),
        };

        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), output)
            .map_err(|e| AppError::Internal(format!("Failed to encode {format:?}: {e}")))?;

        Ok(Bytes::from(buf))
    }

    /// Decode on the blocking thread pool
    pub async fn decode_async(self: Arc<Self>, original_data: Bytes) -> Result<DecodedImage> {
        tokio::task::spawn_blocking(move || self.decode(&original_data))
            .await
            .map_err(|e| AppError::Internal(format!("Decode task panicked: {e}")))?
    }

    /// Resize on the blocking thread pool
    pub async fn resize_async(self: Arc<Self>, decoded: DecodedImage) -> Result<DecodedImage> {
        tokio::task::spawn_blocking(move || DecodedImage {
            image: self.resize(&decoded.image, decoded.format),
            format: decoded.format,
        })
        .await
        .map_err(|e| AppError::Internal(format!("Resize task panicked: {e}")))
    }

    /// Encode on the blocking thread pool
    pub async fn encode_async(self: Arc<Self>, resized: DecodedImage) -> Result<ThumbnailResult> {
        tokio::task::spawn_blocking(move || {
            let (width, height) = resized.image.dimensions();
            let data = self.encode(&resized.image, resized.format)?;
            Ok(ThumbnailResult {
                data,
                format: resized.format,
                width,
                height,
            })
        })
        .await
        .map_err(|e| AppError::Internal(format!("Encode task panicked: {e}")))?
    }
}
