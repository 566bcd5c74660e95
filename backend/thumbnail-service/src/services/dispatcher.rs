//! Background dispatch of webhook deliveries
//!
//! The webhook answers before any work happens; each delivery is handed here
//! and turned into independent tasks. A semaphore bounds how many pipeline
//! runs hold decode/resize buffers at once.

use super::subscription::{self, NotificationBroker};
use super::thumbnail::ThumbnailPipeline;
use crate::models::{MessageType, NotificationEnvelope};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct JobDispatcher {
    pipeline: Arc<ThumbnailPipeline>,
    broker: Arc<dyn NotificationBroker>,
    semaphore: Arc<Semaphore>,
}

impl JobDispatcher {
    pub fn new(
        pipeline: Arc<ThumbnailPipeline>,
        broker: Arc<dyn NotificationBroker>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            pipeline,
            broker,
            semaphore: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Spawn the work a delivery calls for and return the task handles.
    ///
    /// Callers on the request path drop the handles; tests await them.
    pub fn dispatch(&self, envelope: NotificationEnvelope) -> Vec<JoinHandle<()>> {
        match &envelope.message_type {
            MessageType::SubscriptionConfirmation => {
                match envelope.subscription_confirmation() {
                    Ok(confirmation) => {
                        info!(topic_arn = %confirmation.topic_arn, "Confirming subscription");
                        let broker = self.broker.clone();
                        vec![tokio::spawn(async move {
                            subscription::confirm(broker.as_ref(), &confirmation).await;
                        })]
                    }
                    Err(e) => {
                        warn!(error = %e, "Discarding malformed subscription confirmation");
                        Vec::new()
                    }
                }
            }
            MessageType::Notification => {
                let keys = match envelope
                    .content_notification()
                    .and_then(|notification| notification.object_keys())
                {
                    Ok(keys) => keys,
                    Err(e) => {
                        warn!(error = %e, "Discarding malformed notification");
                        return Vec::new();
                    }
                };

                if keys.is_empty() {
                    debug!("Notification carried no object keys");
                }

                keys.into_iter().map(|key| self.spawn_job(key)).collect()
            }
            other => {
                debug!(message_type = %other, "Ignoring delivery");
                Vec::new()
            }
        }
    }

    fn spawn_job(&self, key: String) -> JoinHandle<()> {
        let pipeline = self.pipeline.clone();
        let semaphore = self.semaphore.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!(key = %key, error = %e, "Job queue closed, dropping key");
                    return;
                }
            };
            // Failures are logged and counted inside the pipeline
            let _ = pipeline.process_key(&key).await;
        })
    }
}
