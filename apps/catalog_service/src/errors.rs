// apps/catalog_service/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use larder::CatalogError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Catalog Error: {0}")]
  Catalog(#[from] CatalogError),
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Catalog(err) => catalog_error_response(err),
    }
  }
}

fn catalog_error_response(err: &CatalogError) -> HttpResponse {
  let detail = err.to_string();
  match err {
    CatalogError::Decode { .. } => HttpResponse::BadRequest().json(json!({"error": "Invalid CSV", "detail": detail})),
    CatalogError::Persistence { .. } => {
      HttpResponse::InternalServerError().json(json!({"error": "Failed to persist products", "detail": detail}))
    }
    CatalogError::Cancelled => {
      HttpResponse::ServiceUnavailable().json(json!({"error": "Request timed out", "detail": detail}))
    }
    e if e.is_unavailable() => {
      HttpResponse::ServiceUnavailable().json(json!({"error": "Service unavailable", "detail": detail}))
    }
    _ => HttpResponse::InternalServerError().json(json!({"error": "Catalog operation failed", "detail": detail})),
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
