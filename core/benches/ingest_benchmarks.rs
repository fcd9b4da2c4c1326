use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use larder::validator::decode_table;
use larder::{
  CollectionCache, ColumnLayout, IngestSettings, IngestionPipeline, Invocation, ItemCache, MemoryCache,
  MemoryCatalogStore, QueryService, RecordValidator,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const TTL: Duration = Duration::from_secs(3600);

/// Keyed CSV with `rows` data lines; every tenth row is rejected for a negative price.
fn keyed_csv(rows: usize) -> Vec<u8> {
  let mut out = String::from("id,name,image,price,qty\n");
  for i in 0..rows {
    let price = if i % 10 == 9 { "-1" } else { "19.99" };
    out.push_str(&format!("sku-{},Product {},http://img/{}.jpg,{},{}\n", i, i, i, price, i % 7));
  }
  out.into_bytes()
}

fn bench_validation(c: &mut Criterion) {
  let mut group = c.benchmark_group("RecordValidation");
  let validator = RecordValidator::new(ColumnLayout::ID_FIRST);

  for rows in [100usize, 1_000, 10_000].iter() {
    let bytes = keyed_csv(*rows);
    group.throughput(Throughput::Elements(*rows as u64));
    group.bench_with_input(BenchmarkId::new("decode_and_validate", rows), &bytes, |b, bytes| {
      b.iter(|| {
        let decoded = decode_table(bytes).unwrap();
        validator.validate_rows(&decoded)
      });
    });
  }
  group.finish();
}

fn bench_ingestion(c: &mut Criterion) {
  let mut group = c.benchmark_group("IngestionPipeline");
  let rt = Runtime::new().unwrap();

  for rows in [100usize, 1_000].iter() {
    let bytes = keyed_csv(*rows);
    group.throughput(Throughput::Elements(*rows as u64));

    group.bench_with_input(BenchmarkId::new("incremental_item_cache", rows), &bytes, |b, bytes| {
      b.to_async(&rt).iter_batched(
        || {
          let store = Arc::new(MemoryCatalogStore::new());
          let cache = Arc::new(MemoryCache::new());
          IngestionPipeline::new(IngestSettings::INCREMENTAL, store, Arc::new(ItemCache::new(cache)))
        },
        |pipeline| {
          let input = bytes.clone();
          async move { pipeline.ingest(input, Invocation::unbounded()).await.unwrap() }
        },
        criterion::BatchSize::SmallInput,
      );
    });

    group.bench_with_input(BenchmarkId::new("bulk_collection_cache", rows), &bytes, |b, bytes| {
      // Bulk dialect: drop the id column.
      let bulk: Vec<u8> = String::from_utf8_lossy(bytes)
        .lines()
        .map(|line| line.splitn(2, ',').nth(1).unwrap_or_default().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes();
      b.to_async(&rt).iter_batched(
        || {
          let store = Arc::new(MemoryCatalogStore::new());
          let cache = Arc::new(MemoryCache::new());
          IngestionPipeline::new(IngestSettings::BULK_LOAD, store, Arc::new(CollectionCache::new(cache, TTL)))
        },
        |pipeline| {
          let input = bulk.clone();
          async move { pipeline.ingest(input, Invocation::unbounded()).await.unwrap() }
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

fn bench_collection_hit(c: &mut Criterion) {
  let mut group = c.benchmark_group("QueryService");
  let rt = Runtime::new().unwrap();

  let store = Arc::new(MemoryCatalogStore::new());
  let cache = Arc::new(MemoryCache::new());
  let pipeline = IngestionPipeline::new(IngestSettings::INCREMENTAL, store.clone(), Arc::new(ItemCache::new(cache.clone())));
  rt.block_on(pipeline.ingest(keyed_csv(1_000), Invocation::unbounded())).unwrap();

  let collection = QueryService::collection(store.clone(), cache.clone(), TTL);
  rt.block_on(collection.warm(&Invocation::unbounded())).unwrap();
  let collection = &collection;
  group.bench_function("collection_hit_1000", |b| {
    b.to_async(&rt)
      .iter(|| async move { collection.fetch_all(&Invocation::unbounded()).await.unwrap() });
  });

  let items = QueryService::via_items(store, cache);
  let items = &items;
  group.bench_function("item_scan_1000", |b| {
    b.to_async(&rt)
      .iter(|| async move { items.fetch_all(&Invocation::unbounded()).await.unwrap() });
  });
  group.finish();
}

criterion_group!(benches, bench_validation, bench_ingestion, bench_collection_hit);
criterion_main!(benches);
