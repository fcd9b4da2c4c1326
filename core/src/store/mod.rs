// larder/src/store/mod.rs

//! Durable product storage.
//!
//! `CatalogStore` is the seam between the ingestion/query services and the
//! database. `PgCatalogStore` is the production implementation,
//! `MemoryCatalogStore` the in-process one used by tests and benchmarks.

pub mod memory;
pub mod postgres;

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

use crate::error::{CatalogError, CatalogResult, StoreError, StoreResult};
use crate::invocation::Invocation;
use crate::model::{NewProduct, ProductRecord};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// How a batch reacts to a failing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
  /// One transaction: any failure rolls back every record of the batch.
  Atomic,
  /// Record by record: a failing record is logged and skipped.
  Tolerant,
}

/// What a batch upsert actually made durable.
#[derive(Debug, Default, Clone)]
pub struct BatchOutcome {
  /// Persisted rows as returned by the store, in input order.
  pub persisted: Vec<ProductRecord>,
  /// Records skipped in tolerant mode.
  pub failed: usize,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  /// Inserts `record`, or overwrites the row sharing its id. A record without
  /// an id gets a freshly generated one. `created_at` is never touched on update.
  async fn upsert(&self, record: NewProduct) -> StoreResult<ProductRecord>;

  /// Upserts every record inside one transaction. Either all commit or none do.
  async fn upsert_atomic(&self, records: Vec<NewProduct>) -> StoreResult<Vec<ProductRecord>>;

  /// Every stored record. Callers must not rely on the order.
  async fn read_all(&self) -> StoreResult<Vec<ProductRecord>>;

  /// Applies `records` under `mode`, bounded by `invocation`.
  ///
  /// Connection-level failures abort the batch in both modes. Cancellation
  /// abandons whatever has not been acknowledged yet.
  #[instrument(name = "CatalogStore::upsert_batch", skip(self, records, invocation), fields(records = records.len(), ?mode))]
  async fn upsert_batch(
    &self,
    records: Vec<NewProduct>,
    mode: BatchMode,
    invocation: &Invocation,
  ) -> CatalogResult<BatchOutcome> {
    match mode {
      BatchMode::Atomic => {
        let persisted = invocation
          .run(self.upsert_atomic(records))
          .await?
          .map_err(|source| persistence_failure(None, source))?;
        debug!(persisted = persisted.len(), "Atomic batch committed.");
        Ok(BatchOutcome { persisted, failed: 0 })
      }
      BatchMode::Tolerant => {
        let mut outcome = BatchOutcome::default();
        for record in records {
          let id = record.id.clone();
          match invocation.run(self.upsert(record)).await? {
            Ok(row) => outcome.persisted.push(row),
            Err(source) if source.is_connection_failure() => {
              return Err(CatalogError::StoreUnavailable(source));
            }
            Err(source) => {
              warn!(id = id.as_deref().unwrap_or("<new>"), error = %source, "Skipping product that failed to persist.");
              outcome.failed += 1;
            }
          }
        }
        debug!(
          persisted = outcome.persisted.len(),
          failed = outcome.failed,
          "Tolerant batch finished."
        );
        Ok(outcome)
      }
    }
  }
}

fn persistence_failure(id: Option<String>, source: StoreError) -> CatalogError {
  if source.is_connection_failure() {
    return CatalogError::StoreUnavailable(source);
  }
  let id = id.or_else(|| match &source {
    StoreError::Rejected { id, .. } => Some(id.clone()),
    _ => None,
  });
  CatalogError::Persistence { id, source }
}
