//! Thumbnail generation service
//!
//! - Object store seam for reading originals and writing thumbnails
//! - Image processor for decoding, resizing and re-encoding
//! - Pipeline driving one notified key from fetch to broadcast

pub mod processor;
pub mod service;
pub mod storage;

pub use processor::{ThumbnailConfig, ThumbnailProcessor, ThumbnailResult};
pub use service::{PipelineError, PipelineStage, ThumbnailPipeline};
pub use storage::{ObjectStore, S3ObjectStore};
