// apps/catalog_service/src/state.rs

use crate::config::AppConfig;
use larder::{CacheBackend, CatalogStore, IngestSettings, IngestionPipeline, Invocation, QueryService};
use larder::{CollectionCache, ItemCache};
use std::sync::Arc;

/// Everything a handler needs, built once at startup from the process-wide
/// store and cache handles.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  /// `POST /products/import`: bulk dialect, atomic, collection refresh.
  pub bulk_ingest: Arc<IngestionPipeline>,
  /// `POST /products/upload`: keyed dialect, tolerant, item refresh.
  pub incremental_ingest: Arc<IngestionPipeline>,
  pub collection_query: QueryService,
  pub item_query: QueryService,
}

impl AppState {
  pub fn build(config: Arc<AppConfig>, store: Arc<dyn CatalogStore>, cache: Arc<dyn CacheBackend>) -> Self {
    let collection = Arc::new(CollectionCache::new(cache.clone(), config.collection_cache_ttl));
    let items = Arc::new(ItemCache::new(cache));

    Self {
      bulk_ingest: Arc::new(IngestionPipeline::new(
        IngestSettings::BULK_LOAD,
        store.clone(),
        collection.clone(),
      )),
      incremental_ingest: Arc::new(IngestionPipeline::new(
        IngestSettings::INCREMENTAL,
        store.clone(),
        items.clone(),
      )),
      collection_query: QueryService::new(store.clone(), collection),
      item_query: QueryService::new(store, items),
      config,
    }
  }

  /// Fresh deadline for one request.
  pub fn invocation(&self) -> Invocation {
    Invocation::with_timeout(self.config.request_timeout)
  }
}
