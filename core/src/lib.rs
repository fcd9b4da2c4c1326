// larder/src/lib.rs

//! Larder: a cache-aside product catalog engine.
//!
//! - CSV tables are decoded and validated row by row (`validator`).
//! - Valid records are upserted into a durable store (`store`), atomically or
//!   record by record.
//! - The cache (`cache`) is refreshed with exactly what was persisted, either
//!   as one collection entry or as one entry per record.
//! - Reads go through the cache and fall back to the store on a miss (`query`).
//!
//! Ingestion runs on a small step-pipeline engine (`pipeline`). Every store
//! and cache call is bounded by an `Invocation` (deadline and cancellation).

pub mod cache;
pub mod error;
pub mod ingest;
pub mod invocation;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod validator;

pub use crate::cache::{
  CacheBackend, CacheOrigin, CacheStrategy, CollectionCache, ItemCache, Lookup, MemoryCache, RedisCache, Served,
};
pub use crate::error::{
  CacheError, CatalogError, CatalogResult, PipelineError, RejectReason, RowRejected, StoreError,
};
pub use crate::ingest::{IngestReport, IngestSettings, IngestionPipeline};
pub use crate::invocation::{CancelHandle, Invocation};
pub use crate::model::{NewProduct, ProductRecord, COLLECTION_KEY, ITEM_KEY_PATTERN, ITEM_KEY_PREFIX};
pub use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult};
pub use crate::query::QueryService;
pub use crate::store::{BatchMode, BatchOutcome, CatalogStore, MemoryCatalogStore, PgCatalogStore};
pub use crate::validator::{ColumnLayout, IdColumn, RecordValidator};
