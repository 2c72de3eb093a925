// src/error.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::history::HistoryError;
use crate::llm::LLMError;

pub type OptimizerResult<T> = Result<T, OptimizerError>;

#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Request rejected before any work was done
    #[error("{0}")]
    Validation(String),

    #[error("optimization service error: {0}")]
    Llm(#[from] LLMError),

    #[error("history store error: {0}")]
    History(#[from] HistoryError),
}

impl ResponseError for OptimizerError {
    fn status_code(&self) -> StatusCode {
        match self {
            OptimizerError::Validation(_) => StatusCode::BAD_REQUEST,
            OptimizerError::Llm(_) => StatusCode::BAD_GATEWAY,
            OptimizerError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
