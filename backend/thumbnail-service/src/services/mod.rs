/// Service layer
///
/// - Thumbnail pipeline: fetch, resize, store, announce
/// - Subscription handshake with the notification broker
/// - Dispatcher turning webhook deliveries into background tasks
pub mod dispatcher;
pub mod subscription;
pub mod thumbnail;

pub use dispatcher::JobDispatcher;
pub use subscription::{NotificationBroker, SnsBroker};
pub use thumbnail::{ObjectStore, S3ObjectStore, ThumbnailPipeline};
