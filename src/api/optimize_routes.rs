// src/api/optimize_routes.rs
// Optimization and history endpoints

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{generate_request_id, AppState};
use crate::error::OptimizerError;
use crate::history::Feedback;
use crate::optimizer::OptimizeRequest;

// ============ Request/Response Types ============

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub id: i64,
    pub feedback: Feedback,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub id: i64,
    pub updated: bool,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub id: i64,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

// ============ Handlers ============

/// POST /api/optimize
pub async fn optimize_query(
    state: web::Data<AppState>,
    req: web::Json<OptimizeRequest>,
) -> Result<HttpResponse, OptimizerError> {
    let request_id = generate_request_id();
    info!(
        request_id = %request_id,
        query_len = req.sql_query.as_deref().map(str::len).unwrap_or(0),
        "Optimize request"
    );

    let result = state.optimizer.optimize(&req).await?;
    info!(request_id = %request_id, id = result.id, source = ?result.source, "Optimize request served");
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/history
pub async fn list_history(state: web::Data<AppState>) -> Result<HttpResponse, OptimizerError> {
    let records = state.optimizer.history()?;
    Ok(HttpResponse::Ok().json(records))
}

/// POST /api/history/feedback
pub async fn record_feedback(
    state: web::Data<AppState>,
    req: web::Json<FeedbackRequest>,
) -> Result<HttpResponse, OptimizerError> {
    let updated = state.optimizer.record_feedback(req.id, req.feedback)?;
    Ok(HttpResponse::Ok().json(FeedbackResponse { id: req.id, updated }))
}

/// DELETE /api/history/{id}
pub async fn remove_history_entry(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, OptimizerError> {
    let id = path.into_inner();
    let removed = state.optimizer.remove_history(id)?;
    info!(id, removed, "History entry delete requested");
    Ok(HttpResponse::Ok().json(RemoveResponse { id, removed }))
}

/// DELETE /api/history
pub async fn clear_history(state: web::Data<AppState>) -> Result<HttpResponse, OptimizerError> {
    let cleared = state.optimizer.clear_history()?;
    info!(cleared, "History cleared");
    Ok(HttpResponse::Ok().json(ClearResponse { cleared }))
}

/// Malformed JSON bodies get the same `{ "error": ... }` shape as other failures
fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    let body = serde_json::json!({ "error": format!("Invalid request body: {}", err) });
    actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

pub async fn not_found() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::NotFound().json(serde_json::json!({ "error": "Not found" })))
}

// ============ Route Configuration ============

pub fn configure_optimizer_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .route("/optimize", web::post().to(optimize_query))
            .route("/history", web::get().to(list_history))
            .route("/history", web::delete().to(clear_history))
            .route("/history/feedback", web::post().to(record_feedback))
            .route("/history/{id}", web::delete().to(remove_history_entry)),
    );
}
