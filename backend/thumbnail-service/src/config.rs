/// Configuration management for thumbnail-service
///
/// Loaded once at startup: built-in defaults, then an optional `config.yml`,
/// then environment variables. Invalid configuration is fatal.
use crate::error::{AppError, Result};
use serde::Deserialize;

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "config.yml";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,

    // Object storage
    #[serde(alias = "input_bucket")]
    pub source_bucket: String,
    #[serde(alias = "output_bucket")]
    pub destination_bucket: String,
    pub region: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// S3-compatible endpoint override (MinIO, localstack)
    #[serde(default)]
    pub endpoint: Option<String>,

    // Thumbnail bounds
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,

    // Workers and listeners
    pub max_concurrent_jobs: usize,
    pub listener_buffer: usize,
    pub heartbeat_interval_secs: u64,
}

impl Config {
    /// Load configuration from `config.yml` (optional) and the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = std::env::var("THUMBNAIL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());

        // Environment keys map one-to-one (PORT -> port, SOURCE_BUCKET -> source_bucket)
        let config: Config = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("max_width", 640)?
            .set_default("max_height", 480)?
            .set_default("jpeg_quality", 75)?
            .set_default("max_concurrent_jobs", 16)?
            .set_default("listener_buffer", 32)?
            .set_default("heartbeat_interval_secs", 15)?
            .add_source(config::File::with_name(&file).required(false))
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(AppError::Config("port must be greater than 0".into()));
        }

        if self.source_bucket.trim().is_empty() {
            return Err(AppError::Config("source bucket is required".into()));
        }

        if self.destination_bucket.trim().is_empty() {
            return Err(AppError::Config("destination bucket is required".into()));
        }

        if self.source_bucket == self.destination_bucket {
            return Err(AppError::Config(
                "source and destination buckets must differ".into(),
            ));
        }

        if self.region.trim().is_empty() {
            return Err(AppError::Config("region is required".into()));
        }

        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(AppError::Config(
                "access key and secret key must be set together".into(),
            ));
        }

        if self.max_width == 0 || self.max_height == 0 {
            return Err(AppError::Config("thumbnail bounds must be non-zero".into()));
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(AppError::Config("jpeg quality must be between 1 and 100".into()));
        }

        if self.max_concurrent_jobs == 0 {
            return Err(AppError::Config("max concurrent jobs must be non-zero".into()));
        }

        if self.listener_buffer == 0 {
            return Err(AppError::Config("listener buffer must be non-zero".into()));
        }

        Ok(())
    }

    /// Public URL of an object, `https://s3.<region>.amazonaws.com/<bucket>/<key>`
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://s3.{}.amazonaws.com", self.region),
        };

        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!("{}/{}/{}", base, bucket, encoded_key)
    }

    pub fn thumbnail_url(&self, key: &str) -> String {
        self.object_url(&self.destination_bucket, key)
    }

    pub fn upload_url(&self, key: &str) -> String {
        self.object_url(&self.source_bucket, key)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        source_bucket: "photos-in".to_string(),
        destination_bucket: "photos-out".to_string(),
        region: "eu-west-1".to_string(),
        access_key: None,
        secret_key: None,
        endpoint: None,
        max_width: 640,
        max_height: 480,
        jpeg_quality: 75,
        max_concurrent_jobs: 4,
        listener_buffer: 8,
        heartbeat_interval_secs: 15,
    }
}
