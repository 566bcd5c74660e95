//! Thumbnail pipeline - drives one notified object key end to end
//!
//! 1. Fetch the original from the source bucket
//! 2. Decode it
//! 3. Resize within the configured bounds
//! 4. Re-encode in the original format and store under the same key in the
//!    destination bucket
//! 5. Announce the thumbnail URL to live listeners
//!
//! A failure at any stage ends the run for that key only. Nothing is retried.

use super::processor::{ThumbnailConfig, ThumbnailProcessor};
use super::storage::ObjectStore;
use crate::config::Config;
use crate::error::AppError;
use crate::events::ConnectionManager;
use crate::metrics;
use crate::models::CompletionEvent;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetching,
    Decoding,
    Resizing,
    Storing,
    Broadcasting,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Fetching => "fetching",
            PipelineStage::Decoding => "decoding",
            PipelineStage::Resizing => "resizing",
            PipelineStage::Storing => "storing",
            PipelineStage::Broadcasting => "broadcasting",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one pipeline run
#[derive(Debug, Error)]
#[error("{stage} failed for {key}: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub key: String,
    #[source]
    pub source: AppError,
}

/// Per-key transform pipeline shared by all units of work
pub struct ThumbnailPipeline {
    store: Arc<dyn ObjectStore>,
    processor: Arc<ThumbnailProcessor>,
    connections: ConnectionManager,
    config: Config,
}

impl ThumbnailPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        connections: ConnectionManager,
        config: Config,
    ) -> Self {
        let processor = ThumbnailProcessor::new(ThumbnailConfig {
            max_width: config.max_width,
            max_height: config.max_height,
            quality: config.jpeg_quality,
        });

        info!(
            source = %config.source_bucket,
            destination = %config.destination_bucket,
            max_width = config.max_width,
            max_height = config.max_height,
            "Thumbnail pipeline initialized"
        );

        Self {
            store,
            processor: Arc::new(processor),
            connections,
            config,
        }
    }

    /// Run the pipeline for one key, logging and counting the outcome
    pub async fn process_key(&self, key: &str) -> Result<CompletionEvent, PipelineError> {
        info!(key = %key, "Generating thumbnail");

        match self.run(key).await {
            Ok(event) => {
                metrics::record_pipeline_run("success");
                Ok(event)
            }
            Err(e) => {
                metrics::record_pipeline_run("failure");
                metrics::record_pipeline_failure(e.stage.as_str());
                error!(
                    stage = %e.stage,
                    key = %e.key,
                    error = %e.source,
                    "Thumbnail pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn run(&self, key: &str) -> Result<CompletionEvent, PipelineError> {
        let fail = |stage: PipelineStage| {
            move |source: AppError| PipelineError {
                stage,
                key: key.to_string(),
                source,
            }
        };

        let original = self
            .store
            .fetch(&self.config.source_bucket, key)
            .await
            .map_err(fail(PipelineStage::Fetching))?;
        debug!(key = %key, size = original.len(), "Fetched original");

        let decoded = self
            .processor
            .clone()
            .decode_async(original)
            .await
            .map_err(fail(PipelineStage::Decoding))?;

        let resized = self
            .processor
            .clone()
            .resize_async(decoded)
            .await
            .map_err(fail(PipelineStage::Resizing))?;

        // Encoding belongs to the store step: its output is what gets written
        let thumbnail = self
            .processor
            .clone()
            .encode_async(resized)
            .await
            .map_err(fail(PipelineStage::Storing))?;
        let content_type = thumbnail.content_type();
        let (width, height, size) = (thumbnail.width, thumbnail.height, thumbnail.data.len());

        self.store
            .store(
                &self.config.destination_bucket,
                key,
                thumbnail.data,
                content_type,
            )
            .await
            .map_err(fail(PipelineStage::Storing))?;

        let event = CompletionEvent::new(self.config.thumbnail_url(key));
        let delivered = self.connections.publish(event.clone()).await;

        info!(
            key = %key,
            width,
            height,
            size,
            listeners = delivered,
            url = %event.url,
            "Thumbnail created successfully"
        );

        Ok(event)
    }
}
