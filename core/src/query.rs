// larder/src/query.rs

//! Cache-aside reads of the whole catalog.

use crate::cache::{CacheBackend, CacheStrategy, CollectionCache, ItemCache, Served};
use crate::error::CatalogResult;
use crate::invocation::Invocation;
use crate::store::CatalogStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Serves the catalog through a `CacheStrategy`, falling back to the store on a miss.
///
/// Cache and store failures surface as errors (`CacheUnavailable`,
/// `StoreUnavailable`, `Cancelled`). An empty catalog is an empty array.
#[derive(Clone)]
pub struct QueryService {
  store: Arc<dyn CatalogStore>,
  strategy: Arc<dyn CacheStrategy>,
}

impl QueryService {
  pub fn new(store: Arc<dyn CatalogStore>, strategy: Arc<dyn CacheStrategy>) -> Self {
    Self { store, strategy }
  }

  /// Reads through the single `products:all` entry.
  pub fn collection(store: Arc<dyn CatalogStore>, backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
    Self::new(store, Arc::new(CollectionCache::new(backend, ttl)))
  }

  /// Reads by scanning `product:*` entries.
  pub fn via_items(store: Arc<dyn CatalogStore>, backend: Arc<dyn CacheBackend>) -> Self {
    Self::new(store, Arc::new(ItemCache::new(backend)))
  }

  pub fn strategy(&self) -> &Arc<dyn CacheStrategy> {
    &self.strategy
  }

  #[instrument(name = "QueryService::fetch_all", skip(self, invocation), fields(strategy = self.strategy.name()), err(Display))]
  pub async fn fetch_all(&self, invocation: &Invocation) -> CatalogResult<Served> {
    let served = self.strategy.fetch_all(self.store.as_ref(), invocation).await?;
    info!(origin = served.origin.as_str(), bytes = served.body.len(), "Catalog served.");
    Ok(served)
  }

  /// Rebuilds the cache from the store, regardless of what it currently holds.
  #[instrument(name = "QueryService::warm", skip(self, invocation), fields(strategy = self.strategy.name()), err(Display))]
  pub async fn warm(&self, invocation: &Invocation) -> CatalogResult<usize> {
    let cached = self.strategy.refresh_all(self.store.as_ref(), invocation).await?;
    info!(cached, "Cache warmed from store.");
    Ok(cached)
  }
}
