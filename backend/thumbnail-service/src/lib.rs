//! Thumbnail Service
//!
//! Receives "object stored" notifications from SNS, turns the new S3 object
//! into a bounded thumbnail in a second bucket, and announces the thumbnail
//! URL to browsers listening on a server-sent event stream.

pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
pub use events::ConnectionManager;
