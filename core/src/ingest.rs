// larder/src/ingest.rs

//! The ingestion pipeline: `decode -> validate -> persist -> refresh_cache`.
//!
//! An unreadable table fails the run. A table without a single valid row
//! stops after `validate` and reports a zero count. Everything else runs to
//! the end, with per-row rejections and (in tolerant mode) per-record store
//! failures collected into the report.

use crate::cache::CacheStrategy;
use crate::error::{CatalogError, CatalogResult, RowRejected};
use crate::invocation::Invocation;
use crate::model::{NewProduct, ProductRecord};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult, SkipCondition};
use crate::store::{BatchMode, CatalogStore};
use crate::validator::{decode_table, ColumnLayout, RecordValidator, SourceRow};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const SUCCESS_MESSAGE: &str = "Products uploaded successfully";
pub const NO_VALID_RECORDS_MESSAGE: &str = "No valid products in CSV";

/// Dialect plus failure policy of one ingestion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
  pub layout: ColumnLayout,
  pub mode: BatchMode,
}

impl IngestSettings {
  /// Initial load: `name,image,price,qty`, all-or-nothing.
  pub const BULK_LOAD: IngestSettings = IngestSettings {
    layout: ColumnLayout::NAME_FIRST,
    mode: BatchMode::Atomic,
  };

  /// Incremental upload: `id,name,image,price,qty`, row-by-row.
  pub const INCREMENTAL: IngestSettings = IngestSettings {
    layout: ColumnLayout::ID_FIRST,
    mode: BatchMode::Tolerant,
  };
}

/// Per-run state threaded through the steps.
#[derive(Debug, Default)]
pub struct IngestContext {
  pub raw: Vec<u8>,
  pub rows: Vec<SourceRow>,
  pub records: Vec<NewProduct>,
  pub rejected: Vec<RowRejected>,
  pub persisted: Vec<ProductRecord>,
  pub failed: usize,
  pub cached: usize,
}

/// What an ingestion run reports back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
  pub message: String,
  /// Records durably persisted by this run.
  pub count: usize,
  pub rejected: Vec<RowRejected>,
  /// Valid records the store refused (tolerant mode only).
  pub failed: usize,
}

impl IngestReport {
  pub fn has_records(&self) -> bool {
    self.count > 0
  }
}

pub struct IngestionPipeline {
  settings: IngestSettings,
  pipeline: Pipeline<IngestContext, CatalogError>,
}

impl IngestionPipeline {
  pub fn new(settings: IngestSettings, store: Arc<dyn CatalogStore>, strategy: Arc<dyn CacheStrategy>) -> Self {
    let nothing_persisted: SkipCondition<IngestContext> =
      Arc::new(|ctx: &ContextData<IngestContext>| ctx.read().persisted.is_empty());
    let mut pipeline: Pipeline<IngestContext, CatalogError> = Pipeline::new(&[
      ("decode", false, None),
      ("validate", false, None),
      ("persist", false, None),
      ("refresh_cache", false, Some(nothing_persisted)),
    ]);

    pipeline.on_step("decode", |ctx, _inv| decode_step(ctx));

    let validator = RecordValidator::new(settings.layout);
    pipeline.on_step("validate", move |ctx, _inv| validate_step(ctx, validator));

    let persist_store = store.clone();
    pipeline.on_step("persist", move |ctx, inv| {
      persist_step(ctx, inv, persist_store.clone(), settings.mode)
    });

    pipeline.on_step("refresh_cache", move |ctx, inv| {
      refresh_step(ctx, inv, store.clone(), strategy.clone())
    });

    Self { settings, pipeline }
  }

  pub fn settings(&self) -> IngestSettings {
    self.settings
  }

  /// Runs one ingestion over `bytes`, bounded by `invocation`.
  #[instrument(
    name = "IngestionPipeline::ingest",
    skip(self, bytes, invocation),
    fields(bytes = bytes.len(), mode = ?self.settings.mode),
    err(Display)
  )]
  pub async fn ingest(&self, bytes: Vec<u8>, invocation: Invocation) -> CatalogResult<IngestReport> {
    let ctx = ContextData::new(IngestContext {
      raw: bytes,
      ..Default::default()
    });

    let result = self.pipeline.run(ctx.clone(), invocation).await?;

    let guard = ctx.read();
    let count = guard.persisted.len();
    let message = match result {
      PipelineResult::Stopped { .. } => NO_VALID_RECORDS_MESSAGE,
      PipelineResult::Completed if count == 0 => NO_VALID_RECORDS_MESSAGE,
      PipelineResult::Completed => SUCCESS_MESSAGE,
    };
    info!(
      count,
      rejected = guard.rejected.len(),
      failed = guard.failed,
      cached = guard.cached,
      "Ingestion finished."
    );

    Ok(IngestReport {
      message: message.to_string(),
      count,
      rejected: guard.rejected.clone(),
      failed: guard.failed,
    })
  }
}

async fn decode_step(ctx: ContextData<IngestContext>) -> CatalogResult<PipelineControl> {
  let raw = std::mem::take(&mut ctx.write().raw);
  let rows = decode_table(&raw)?;
  ctx.write().rows = rows;
  Ok(PipelineControl::Continue)
}

async fn validate_step(ctx: ContextData<IngestContext>, validator: RecordValidator) -> CatalogResult<PipelineControl> {
  let mut guard = ctx.write();
  let rows = std::mem::take(&mut guard.rows);
  let validated = validator.validate_rows(&rows);
  guard.records = validated.records;
  guard.rejected = validated.rejected;

  if guard.records.is_empty() {
    info!(rejected = guard.rejected.len(), "No valid records in input.");
    return Ok(PipelineControl::Stop);
  }
  Ok(PipelineControl::Continue)
}

async fn persist_step(
  ctx: ContextData<IngestContext>,
  invocation: Invocation,
  store: Arc<dyn CatalogStore>,
  mode: BatchMode,
) -> CatalogResult<PipelineControl> {
  let records = std::mem::take(&mut ctx.write().records);
  let outcome = store.upsert_batch(records, mode, &invocation).await?;

  let mut guard = ctx.write();
  guard.persisted = outcome.persisted;
  guard.failed = outcome.failed;
  Ok(PipelineControl::Continue)
}

async fn refresh_step(
  ctx: ContextData<IngestContext>,
  invocation: Invocation,
  store: Arc<dyn CatalogStore>,
  strategy: Arc<dyn CacheStrategy>,
) -> CatalogResult<PipelineControl> {
  let persisted = ctx.read().persisted.clone();

  // The records are already durable; only cancellation is allowed to fail the run from here.
  match strategy
    .refresh_after_ingest(&persisted, store.as_ref(), &invocation)
    .await
  {
    Ok(cached) => ctx.write().cached = cached,
    Err(CatalogError::Cancelled) => return Err(CatalogError::Cancelled),
    Err(e) => warn!(strategy = strategy.name(), error = %e, "Cache refresh failed after ingestion."),
  }
  Ok(PipelineControl::Continue)
}
