// apps/catalog_service/src/web/handlers/upload_handlers.rs

use actix_web::{web, HttpResponse};
use larder::{IngestReport, IngestionPipeline, RowRejected};
use serde::Serialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub message: String,
  pub count: usize,
  pub rejected: usize,
  pub failed: usize,
  pub rejections: Vec<RowRejected>,
}

impl From<IngestReport> for UploadResponse {
  fn from(report: IngestReport) -> Self {
    Self {
      message: report.message,
      count: report.count,
      rejected: report.rejected.len(),
      failed: report.failed,
      rejections: report.rejected,
    }
  }
}

async fn ingest_body(
  app_state: &AppState,
  pipeline: &IngestionPipeline,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let report = pipeline.ingest(body.to_vec(), app_state.invocation()).await?;
  info!(count = report.count, rejected = report.rejected.len(), "Upload processed.");
  Ok(HttpResponse::Ok().json(UploadResponse::from(report)))
}

/// Initial load: `name,image,price,qty`, all-or-nothing.
#[instrument(name = "handler::import_products", skip(app_state, body), fields(bytes = body.len()))]
pub async fn import_products_handler(
  app_state: web::Data<AppState>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  ingest_body(&app_state, &app_state.bulk_ingest, body).await
}

/// Incremental upload: `id,name,image,price,qty`, row by row.
#[instrument(name = "handler::upload_products", skip(app_state, body), fields(bytes = body.len()))]
pub async fn upload_products_handler(
  app_state: web::Data<AppState>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  ingest_body(&app_state, &app_state.incremental_ingest, body).await
}
