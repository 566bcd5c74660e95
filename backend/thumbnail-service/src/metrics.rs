use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "thumbnail_service_http_requests_total",
            "Total HTTP requests handled by thumbnail-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create thumbnail_service_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register thumbnail_service_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "thumbnail_service_http_request_duration_seconds",
            "HTTP request latency for thumbnail-service",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["method", "path", "status"],
    )
    .expect("failed to create thumbnail_service_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register thumbnail_service_http_request_duration_seconds");
    histogram
});

static PIPELINE_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "thumbnail_service_pipeline_runs_total",
            "Thumbnail pipeline runs by outcome",
        ),
        &["outcome"],
    )
    .expect("failed to create thumbnail_service_pipeline_runs_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register thumbnail_service_pipeline_runs_total");
    counter
});

static PIPELINE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "thumbnail_service_pipeline_failures_total",
            "Thumbnail pipeline failures by stage",
        ),
        &["stage"],
    )
    .expect("failed to create thumbnail_service_pipeline_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register thumbnail_service_pipeline_failures_total");
    counter
});

static SUBSCRIPTION_CONFIRMATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "thumbnail_service_subscription_confirmations_total",
            "Subscription handshakes by outcome",
        ),
        &["outcome"],
    )
    .expect("failed to create thumbnail_service_subscription_confirmations_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register thumbnail_service_subscription_confirmations_total");
    counter
});

static STREAM_LISTENERS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "thumbnail_service_stream_listeners",
        "Currently connected completion-stream listeners",
    )
    .expect("failed to create thumbnail_service_stream_listeners");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register thumbnail_service_stream_listeners");
    gauge
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

/// `outcome` is "success" or "failure"
pub fn record_pipeline_run(outcome: &str) {
    PIPELINE_RUNS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_pipeline_failure(stage: &str) {
    PIPELINE_FAILURES_TOTAL.with_label_values(&[stage]).inc();
}

pub fn record_confirmation(outcome: &str) {
    SUBSCRIPTION_CONFIRMATIONS_TOTAL
        .with_label_values(&[outcome])
        .inc();
}

pub fn set_stream_listeners(count: usize) {
    STREAM_LISTENERS.set(count as i64);
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::Instant;

/// Records request count and latency per route pattern
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        // Route pattern keeps label cardinality bounded
        let path = req
            .match_pattern()
            .unwrap_or_else(|| "unmatched".to_string());
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(response) => {
                    observe_http_request(&method, &path, response.status().as_u16(), elapsed);
                }
                Err(_) => {
                    observe_http_request(&method, &path, 500, elapsed);
                }
            }
            result
        })
    }
}
