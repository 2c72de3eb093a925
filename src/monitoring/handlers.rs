//! HTTP handlers for monitoring endpoints
//!
//! Endpoints:
//! - GET /monitoring/metrics - Prometheus format metrics

use actix_web::{web, HttpResponse, Result as ActixResult};

/// Metrics endpoint (Prometheus format)
pub async fn metrics_handler() -> ActixResult<HttpResponse> {
    let metrics_text = crate::monitoring::metrics::export_prometheus();
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(metrics_text))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/monitoring").route("/metrics", web::get().to(metrics_handler)));
}
