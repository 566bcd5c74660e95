/// Gallery handler
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::error;

use crate::config::Config;
use crate::services::ObjectStore;

/// List the public URL of every thumbnail in the destination bucket
///
/// Endpoint: GET /images
///
/// Storage failures surface as 500 with the error text.
pub async fn list_images(
    config: web::Data<Config>,
    store: web::Data<Arc<dyn ObjectStore>>,
) -> HttpResponse {
    match store.list(&config.destination_bucket).await {
        Ok(keys) => {
            let urls: Vec<String> = keys.iter().map(|key| config.thumbnail_url(key)).collect();
            HttpResponse::Ok().json(urls)
        }
        Err(e) => {
            error!(bucket = %config.destination_bucket, error = %e, "Failed to list thumbnails");
            HttpResponse::InternalServerError()
                .content_type("text/plain")
                .body(e.to_string())
        }
    }
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/images", web::get().to(list_images));
}
