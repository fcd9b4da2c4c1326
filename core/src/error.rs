// larder/src/error.rs

//! Error taxonomy shared by the store, the cache, the pipeline engine and
//! the ingestion/query services.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure raised by a `CatalogStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  /// The store refused a single record (constraint violation, injected failure).
  #[error("Store rejected product '{id}': {reason}")]
  Rejected { id: String, reason: String },

  /// The store could not be reached at all.
  #[error("Store unreachable: {0}")]
  Unreachable(String),
}

impl StoreError {
  /// True when the failure is about reaching the store at all, as opposed to
  /// the store refusing one particular record.
  pub fn is_connection_failure(&self) -> bool {
    match self {
      StoreError::Unreachable(_) => true,
      StoreError::Database(e) => matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Tls(_)
      ),
      StoreError::Rejected { .. } => false,
    }
  }
}

/// Failure raised by a `CacheBackend` implementation.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("Redis error: {0}")]
  Redis(#[from] redis::RedisError),

  #[error("Cache unreachable: {0}")]
  Unreachable(String),
}

/// Framework-level failures of the step pipeline engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Run cancelled before step '{step_name}'")]
  Cancelled { step_name: String },
}

/// Why a single source row was not turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
  MalformedRow,
  MissingName,
  InvalidPrice,
  InvalidQuantity,
}

impl fmt::Display for RejectReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      RejectReason::MalformedRow => "malformed row",
      RejectReason::MissingName => "missing name",
      RejectReason::InvalidPrice => "invalid price",
      RejectReason::InvalidQuantity => "invalid quantity",
    };
    f.write_str(label)
  }
}

/// A per-row rejection. Never fatal to a batch; collected and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Row rejected at line {line}: {reason}")]
pub struct RowRejected {
  pub reason: RejectReason,
  /// 1-based line number in the source table (the header is line 1).
  pub line: u64,
}

/// Top-level error returned by ingestion runs and queries.
#[derive(Debug, Error)]
pub enum CatalogError {
  /// Input bytes are not a parseable table. Fatal to the run.
  #[error("Input is not a readable CSV table: {source}")]
  Decode {
    #[source]
    source: csv::Error,
  },

  /// A store write failed. Fatal in atomic mode, skipped in tolerant mode.
  #[error("Failed to persist product {}: {source}", id.as_deref().unwrap_or("<new>"))]
  Persistence {
    id: Option<String>,
    #[source]
    source: StoreError,
  },

  /// A cache write failed. Logged; never fails an ingestion run.
  #[error("Failed to write cache key '{key}': {source}")]
  CacheWrite {
    key: String,
    #[source]
    source: CacheError,
  },

  #[error("Cache unavailable: {0}")]
  CacheUnavailable(#[source] CacheError),

  #[error("Store unavailable: {0}")]
  StoreUnavailable(#[source] StoreError),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Operation cancelled or deadline exceeded")]
  Cancelled,

  #[error("Pipeline error: {0}")]
  Pipeline(PipelineError),
}

impl From<PipelineError> for CatalogError {
  fn from(err: PipelineError) -> Self {
    match err {
      // Cancellation surfaces the same way whether it is noticed between steps or inside one.
      PipelineError::Cancelled { .. } => CatalogError::Cancelled,
      other => CatalogError::Pipeline(other),
    }
  }
}

impl CatalogError {
  /// True for failures the caller should report as "service unavailable"
  /// rather than as a problem with its request.
  pub fn is_unavailable(&self) -> bool {
    matches!(
      self,
      CatalogError::CacheUnavailable(_) | CatalogError::StoreUnavailable(_) | CatalogError::Cancelled
    )
  }
}

pub type CatalogResult<T, E = CatalogError> = std::result::Result<T, E>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type CacheResult<T> = std::result::Result<T, CacheError>;
