// tests/query_service_tests.rs
mod common;

use common::*;
use larder::{
  CacheOrigin, CatalogError, CollectionCache, IngestSettings, IngestionPipeline, Invocation, ProductRecord,
  QueryService, COLLECTION_KEY,
};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(3600);

#[tokio::test]
#[serial]
async fn fetch_all_miss_then_hit_is_byte_identical() {
  setup_tracing();
  let backends = Backends::with_records(vec![
    product(Some("1"), "One", 1.0, 1),
    product(Some("2"), "Two", 2.0, 2),
    product(Some("3"), "Three", 3.0, 0),
  ]);
  let service = QueryService::collection(backends.store_dyn(), backends.cache_dyn(), TTL);
  let inv = Invocation::unbounded();

  let miss = service.fetch_all(&inv).await.unwrap();
  let hit = service.fetch_all(&inv).await.unwrap();

  assert_eq!(miss.origin, CacheOrigin::Miss);
  assert_eq!(hit.origin, CacheOrigin::Hit);
  assert_eq!(miss.body, hit.body);
  assert_eq!(serde_json::from_str::<Vec<ProductRecord>>(&hit.body).unwrap().len(), 3);
  assert_eq!(backends.cache.ttl_of(COLLECTION_KEY), Some(TTL));
}

#[tokio::test(start_paused = true)]
#[serial]
async fn expired_collection_is_rebuilt_from_store() {
  setup_tracing();
  let backends = Backends::with_records(vec![product(Some("1"), "One", 1.0, 1)]);
  let service = QueryService::collection(backends.store_dyn(), backends.cache_dyn(), TTL);
  let inv = Invocation::unbounded();

  service.fetch_all(&inv).await.unwrap();
  tokio::time::advance(TTL + Duration::from_secs(1)).await;
  let after_expiry = service.fetch_all(&inv).await.unwrap();

  assert_eq!(after_expiry.origin, CacheOrigin::Miss);
  assert_eq!(backends.store.read_all_calls(), 2);
}

#[tokio::test]
#[serial]
async fn via_items_falls_back_then_serves_from_items() {
  setup_tracing();
  let backends = Backends::with_records(vec![product(Some("a"), "A", 1.0, 1), product(Some("b"), "B", 1.0, 1)]);
  let service = QueryService::via_items(backends.store_dyn(), backends.cache_dyn());
  let inv = Invocation::unbounded();

  assert_eq!(service.fetch_all(&inv).await.unwrap().origin, CacheOrigin::Miss);
  assert_eq!(service.fetch_all(&inv).await.unwrap().origin, CacheOrigin::Hit);
  assert_eq!(service.strategy().name(), "item");
}

#[tokio::test]
#[serial]
async fn unreachable_cache_is_an_error_not_an_empty_catalog() {
  setup_tracing();
  let backends = Backends::new();
  backends.cache.set_unavailable(true);
  let service = QueryService::via_items(backends.store_dyn(), backends.cache_dyn());

  let err = service.fetch_all(&Invocation::unbounded()).await.unwrap_err();
  assert!(matches!(err, CatalogError::CacheUnavailable(_)));
}

#[tokio::test(start_paused = true)]
#[serial]
async fn slow_store_hits_the_deadline() {
  let backends = Backends::new();
  backends.store.set_latency(Some(Duration::from_secs(10)));
  let service = QueryService::collection(backends.store_dyn(), backends.cache_dyn(), TTL);

  let err = service
    .fetch_all(&Invocation::with_timeout(Duration::from_secs(1)))
    .await
    .unwrap_err();
  assert!(matches!(err, CatalogError::Cancelled));
  assert!(!backends.cache.contains(COLLECTION_KEY));
}

#[tokio::test]
#[serial]
async fn warm_rebuilds_collection_regardless_of_current_entry() {
  let backends = Backends::with_records(vec![product(Some("1"), "One", 1.0, 1)]);
  backends.cache.insert(COLLECTION_KEY, "[]", Some(TTL));
  let service = QueryService::collection(backends.store_dyn(), backends.cache_dyn(), TTL);

  assert_eq!(service.warm(&Invocation::unbounded()).await.unwrap(), 1);
  let cached: Vec<ProductRecord> = serde_json::from_str(&backends.cache.peek(COLLECTION_KEY).unwrap()).unwrap();
  assert_eq!(cached.len(), 1);
}

#[tokio::test]
#[serial]
async fn strategies_may_disagree_until_next_refresh() {
  setup_tracing();
  let backends = Backends::new();
  let collection = Arc::new(CollectionCache::new(backends.cache_dyn(), TTL));
  let reader = QueryService::new(backends.store_dyn(), collection.clone());
  let inv = Invocation::unbounded();

  // Warm the collection with an empty catalog.
  assert_eq!(reader.fetch_all(&inv).await.unwrap().body, "[]");

  // The keyed path refreshes items only; the collection entry keeps its old view.
  let items = IngestionPipeline::new(
    IngestSettings::INCREMENTAL,
    backends.store_dyn(),
    Arc::new(larder::ItemCache::new(backends.cache_dyn())),
  );
  items
    .ingest(csv(KEYED_HEADER, &["1,One,,1,1"]), Invocation::unbounded())
    .await
    .unwrap();
  assert_eq!(reader.fetch_all(&inv).await.unwrap().body, "[]");

  // A bulk load through the collection strategy brings the entry up to date.
  let bulk = IngestionPipeline::new(IngestSettings::BULK_LOAD, backends.store_dyn(), collection);
  bulk
    .ingest(csv(BULK_HEADER, &["Two,,2,2"]), Invocation::unbounded())
    .await
    .unwrap();
  let served = reader.fetch_all(&inv).await.unwrap();
  assert_eq!(serde_json::from_str::<Vec<ProductRecord>>(&served.body).unwrap().len(), 2);
}
