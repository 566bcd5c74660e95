/// Server-sent event stream of completed thumbnails
///
/// Endpoint: GET /image_uploaded
///
/// Each client gets the thumbnail URLs published while it is connected, one
/// `data:` frame per event, plus periodic comment pings. Nothing is replayed.
use actix_web::{http::header, web, HttpResponse};
use futures::StreamExt;
use tracing::info;

use crate::events::ConnectionManager;

pub async fn image_uploaded(connections: web::Data<ConnectionManager>) -> HttpResponse {
    let listener = connections.subscribe().await;
    info!(connection_id = %listener.id(), "Stream listener connected");

    let frames = listener
        .into_stream()
        .map(|message| Ok::<_, actix_web::Error>(message.to_sse_frame()));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(frames)
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/image_uploaded", web::get().to(image_uploaded));
}
