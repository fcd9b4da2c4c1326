// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper

use larder::{
  CacheBackend, CatalogStore, ContextData, Invocation, MemoryCache, MemoryCatalogStore, NewProduct,
  PipelineControl, PipelineError,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Catalog fixtures ---
pub const KEYED_HEADER: &str = "id,name,image,price,qty";
pub const BULK_HEADER: &str = "name,image,price,qty";

/// Joins a header and data lines into CSV bytes.
pub fn csv(header: &str, rows: &[&str]) -> Vec<u8> {
  let mut out = String::from(header);
  for row in rows {
    out.push('\n');
    out.push_str(row);
  }
  out.into_bytes()
}

pub fn product(id: Option<&str>, name: &str, price: f64, qty: i32) -> NewProduct {
  NewProduct {
    id: id.map(str::to_string),
    name: name.to_string(),
    image: None,
    price,
    qty,
  }
}

pub struct Backends {
  pub store: Arc<MemoryCatalogStore>,
  pub cache: Arc<MemoryCache>,
}

impl Backends {
  pub fn new() -> Self {
    Self {
      store: Arc::new(MemoryCatalogStore::new()),
      cache: Arc::new(MemoryCache::new()),
    }
  }

  pub fn with_records(records: Vec<NewProduct>) -> Self {
    Self {
      store: Arc::new(MemoryCatalogStore::with_records(records)),
      cache: Arc::new(MemoryCache::new()),
    }
  }

  pub fn store_dyn(&self) -> Arc<dyn CatalogStore> {
    self.store.clone()
  }

  pub fn cache_dyn(&self) -> Arc<dyn CacheBackend> {
    self.cache.clone()
  }
}

// --- Pipeline engine fixtures ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Pipeline error: {0}")]
  Pipeline(#[from] PipelineError),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> larder::pipeline::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>, _inv: Invocation| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> larder::pipeline::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>, _inv: Invocation| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}
