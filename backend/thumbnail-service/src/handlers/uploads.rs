/// Upload URL handler
use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::config::Config;

/// Hand out a fresh, unique object URL in the source bucket
///
/// Endpoint: GET /upload_url
pub async fn upload_url(config: web::Data<Config>) -> HttpResponse {
    let key = format!("{}.jpg", Uuid::new_v4());
    HttpResponse::Ok()
        .content_type("text/plain")
        .body(config.upload_url(&key))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload_url", web::get().to(upload_url));
}
