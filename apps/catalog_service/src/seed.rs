// apps/catalog_service/src/seed.rs

//! Startup seeding from a local CSV file through the bulk ingestion path.

use anyhow::Context;
use larder::{IngestReport, IngestionPipeline, Invocation};
use std::path::Path;
use tracing::{info, instrument};

#[instrument(name = "seed::from_file", skip(pipeline, invocation), fields(path = %path.display()))]
pub async fn seed_from_file(
  path: &Path,
  pipeline: &IngestionPipeline,
  invocation: Invocation,
) -> anyhow::Result<IngestReport> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("Failed to read seed file {}", path.display()))?;

  let report = pipeline
    .ingest(bytes, invocation)
    .await
    .with_context(|| format!("Failed to ingest seed file {}", path.display()))?;

  info!(
    count = report.count,
    rejected = report.rejected.len(),
    message = %report.message,
    "Seed file ingested."
  );
  Ok(report)
}
