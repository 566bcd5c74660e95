//! Shared fakes and fixtures for thumbnail-service integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thumbnail_service::services::{JobDispatcher, NotificationBroker, ObjectStore, ThumbnailPipeline};
use thumbnail_service::{AppError, Config, ConnectionManager, Result};

pub const SOURCE: &str = "photos-in";
pub const DESTINATION: &str = "photos-out";

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        source_bucket: SOURCE.to_string(),
        destination_bucket: DESTINATION.to_string(),
        region: "eu-west-1".to_string(),
        access_key: None,
        secret_key: None,
        endpoint: None,
        max_width: 640,
        max_height: 480,
        jpeg_quality: 75,
        max_concurrent_jobs: 4,
        listener_buffer: 16,
        heartbeat_interval_secs: 15,
    }
}

/// In-memory object store keyed by (bucket, key)
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), (Bytes, String)>>,
    pub store_calls: AtomicUsize,
    pub fail_fetch: AtomicBool,
    pub fail_store: AtomicBool,
    pub fail_list: AtomicBool,
    /// Milliseconds each fetch holds before returning
    pub fetch_delay_ms: AtomicU64,
    fetches_in_flight: AtomicUsize,
    pub peak_fetches: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn put(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (Bytes::from(data), "application/octet-stream".to_string()),
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<(Bytes, String)> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn count(&self, bucket: &str) -> usize {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AppError::Transport("connection refused".into()));
        }

        let running = self.fetches_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_fetches.fetch_max(running, Ordering::SeqCst);
        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.fetches_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.get(bucket, key)
            .map(|(data, _)| data)
            .ok_or_else(|| AppError::NotFound(format!("s3://{bucket}/{key}")))
    }

    async fn store(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(AppError::Transport("access denied".into()));
        }
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (data, content_type.to_string()),
        );
        Ok(())
    }

    async fn list(&self, bucket: &str) -> Result<Vec<String>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::Transport("bucket unreachable".into()));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect())
    }
}

/// Broker that records every confirmation call
#[derive(Default)]
pub struct RecordingBroker {
    pub calls: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl NotificationBroker for RecordingBroker {
    async fn confirm_subscription(&self, token: &str, topic_arn: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((token.to_string(), topic_arn.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Transport("throttled".into()));
        }
        Ok(())
    }
}

/// Everything a test needs, wired the way main wires it
pub struct Harness {
    pub config: Config,
    pub store: Arc<MemoryObjectStore>,
    pub broker: Arc<RecordingBroker>,
    pub connections: ConnectionManager,
    pub dispatcher: JobDispatcher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryObjectStore::default());
        let broker = Arc::new(RecordingBroker::default());
        let connections = ConnectionManager::new(config.listener_buffer);
        let pipeline = Arc::new(ThumbnailPipeline::new(
            store.clone(),
            connections.clone(),
            config.clone(),
        ));
        let dispatcher = JobDispatcher::new(pipeline, broker.clone(), config.max_concurrent_jobs);

        Self {
            config,
            store,
            broker,
            connections,
            dispatcher,
        }
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }
}

pub fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

/// SNS notification body whose inner message lists the given keys
pub fn notification_body(keys: &[&str]) -> String {
    let records: Vec<_> = keys
        .iter()
        .map(|key| json!({ "eventName": "ObjectCreated:Put", "s3": { "object": { "key": key } } }))
        .collect();
    let inner = json!({ "Records": records }).to_string();
    json!({
        "Type": "Notification",
        "MessageId": "5f2c7a4e-0000-0000-0000-000000000001",
        "TopicArn": "arn:aws:sns:eu-west-1:123456789012:uploads",
        "Message": inner,
    })
    .to_string()
}

pub fn confirmation_body(token: &str, topic_arn: &str) -> String {
    json!({
        "Type": "SubscriptionConfirmation",
        "Token": token,
        "TopicArn": topic_arn,
        "SubscribeURL": "https://sns.eu-west-1.amazonaws.com/?Action=ConfirmSubscription",
    })
    .to_string()
}
