/// Broker webhook
///
/// Endpoint: POST /new_image_notify
///
/// Always answers `200 OK` / `"OK"`; the confirmation handshake or the
/// thumbnail pipeline runs in the background after the delivery is handed off.
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::debug;

use crate::models::{NotificationEnvelope, MESSAGE_TYPE_HEADER};
use crate::services::JobDispatcher;

/// Largest accepted webhook body. An SNS message alone may reach 256 KiB
/// before the JSON envelope and signature fields are added.
pub const MAX_DELIVERY_BYTES: usize = 1 << 20;

pub async fn new_image_notify(
    req: HttpRequest,
    body: web::Bytes,
    dispatcher: web::Data<JobDispatcher>,
) -> HttpResponse {
    let header = req
        .headers()
        .get(MESSAGE_TYPE_HEADER)
        .and_then(|value| value.to_str().ok());

    let envelope = NotificationEnvelope::new(header, body);
    debug!(message_type = %envelope.message_type, size = envelope.body.len(), "Webhook delivery");

    let jobs = dispatcher.dispatch(envelope);
    debug!(jobs = jobs.len(), "Delivery dispatched");

    HttpResponse::Ok().content_type("text/plain").body("OK")
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/new_image_notify")
            .app_data(web::PayloadConfig::new(MAX_DELIVERY_BYTES))
            .route(web::post().to(new_image_notify)),
    );
}
