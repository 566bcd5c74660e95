/// HTTP handlers for thumbnail-service
///
/// - Notify: webhook for broker deliveries
/// - Uploads: fresh upload URL into the source bucket
/// - Images: gallery of stored thumbnails
/// - Stream: live completion events over server-sent events
pub mod images;
pub mod notify;
pub mod stream;
pub mod uploads;

use actix_web::web;

pub use images::list_images;
pub use notify::new_image_notify;
pub use stream::image_uploaded;
pub use uploads::upload_url;

/// Register every public route
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    notify::register_routes(cfg);
    uploads::register_routes(cfg);
    images::register_routes(cfg);
    stream::register_routes(cfg);
}
