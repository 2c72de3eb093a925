// src/api/mod.rs
// HTTP surface: optimization, history management, health and metrics.

pub mod optimize_routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::optimizer::OptimizerService;

pub use optimize_routes::configure_optimizer_routes;

/// Shared handler state
pub struct AppState {
    pub optimizer: OptimizerService,
}

impl AppState {
    pub fn new(optimizer: OptimizerService) -> Self {
        Self { optimizer }
    }
}

/// Short request ID for log correlation
pub(crate) fn generate_request_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

pub async fn health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "mode": state.optimizer.mode(),
        "model": state.optimizer.model_name(),
        "similarity_threshold": state.optimizer.policy().threshold,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

async fn root_handler() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("sqltune backend is running\n\nPOST /api/optimize, GET /api/history, GET /health\n"))
}

/// All routes; shared by the server and integration tests
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root_handler))
        .route("/health", web::get().to(health_check))
        .configure(crate::monitoring::handlers::register_routes)
        .configure(configure_optimizer_routes)
        .default_service(web::route().to(optimize_routes::not_found));
}

pub fn start_api_server(
    config: &ApiConfig,
    state: web::Data<AppState>,
) -> std::io::Result<actix_web::dev::Server> {
    let bind_addr = config.bind_addr();

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::AUTHORIZATION,
            ])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .configure(configure_app)
    })
    .bind(&bind_addr)?
    .run();

    info!(addr = %bind_addr, "API server listening");
    Ok(server)
}
