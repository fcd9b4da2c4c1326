// larder/src/cache/strategy.rs

//! Collection-mode and item-mode caching behind one `CacheStrategy` trait.
//!
//! The ingestion pipeline and the query service only ever see the trait, so
//! either strategy can back either path. The two strategies may disagree
//! between an ingestion run and the next read; that window is expected.

use crate::cache::{CacheBackend, Lookup};
use crate::error::{CatalogError, CatalogResult};
use crate::invocation::Invocation;
use crate::model::{ProductRecord, COLLECTION_KEY, ITEM_KEY_PATTERN};
use crate::store::CatalogStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Observed TTL of the collection entry.
pub const DEFAULT_COLLECTION_TTL: Duration = Duration::from_secs(3600);

/// Whether a served body came from the cache or from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOrigin {
  Hit,
  Miss,
}

impl CacheOrigin {
  pub fn as_str(&self) -> &'static str {
    match self {
      CacheOrigin::Hit => "HIT",
      CacheOrigin::Miss => "MISS",
    }
  }
}

/// A serialized JSON array of products, ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
  pub body: String,
  pub origin: CacheOrigin,
}

#[async_trait]
pub trait CacheStrategy: Send + Sync {
  fn name(&self) -> &'static str;

  /// Brings the cached view of a single record up to date.
  async fn refresh_one(&self, record: &ProductRecord, invocation: &Invocation) -> CatalogResult<()>;

  /// Rebuilds the cache from a full store read. Returns how many records were cached.
  async fn refresh_all(&self, store: &dyn CatalogStore, invocation: &Invocation) -> CatalogResult<usize>;

  /// Cache-aside read of the whole catalog.
  async fn fetch_all(&self, store: &dyn CatalogStore, invocation: &Invocation) -> CatalogResult<Served>;

  /// Called once per ingestion run with exactly the rows that run persisted.
  async fn refresh_after_ingest(
    &self,
    persisted: &[ProductRecord],
    store: &dyn CatalogStore,
    invocation: &Invocation,
  ) -> CatalogResult<usize>;
}

async fn read_store(store: &dyn CatalogStore, invocation: &Invocation) -> CatalogResult<Vec<ProductRecord>> {
  invocation
    .run(store.read_all())
    .await?
    .map_err(CatalogError::StoreUnavailable)
}

async fn write(
  backend: &dyn CacheBackend,
  key: &str,
  value: &str,
  ttl: Option<Duration>,
  invocation: &Invocation,
) -> CatalogResult<()> {
  invocation
    .run(backend.set(key, value, ttl))
    .await?
    .map_err(|source| CatalogError::CacheWrite {
      key: key.to_string(),
      source,
    })
}

async fn lookup(backend: &dyn CacheBackend, key: &str, invocation: &Invocation) -> CatalogResult<Lookup> {
  invocation
    .run(backend.get(key))
    .await?
    .map_err(CatalogError::CacheUnavailable)
}

/// One key (`products:all`) holding the serialized full list, with a TTL.
pub struct CollectionCache {
  backend: Arc<dyn CacheBackend>,
  ttl: Duration,
}

impl CollectionCache {
  pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
    Self { backend, ttl }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  async fn store_collection(&self, records: &[ProductRecord], invocation: &Invocation) -> CatalogResult<String> {
    let body = serde_json::to_string(records)?;
    write(self.backend.as_ref(), COLLECTION_KEY, &body, Some(self.ttl), invocation).await?;
    Ok(body)
  }
}

#[async_trait]
impl CacheStrategy for CollectionCache {
  fn name(&self) -> &'static str {
    "collection"
  }

  /// Patches the record into the cached list if one is present. A missing
  /// list is left missing: the next read rebuilds it from the store.
  async fn refresh_one(&self, record: &ProductRecord, invocation: &Invocation) -> CatalogResult<()> {
    let cached = match lookup(self.backend.as_ref(), COLLECTION_KEY, invocation).await? {
      Lookup::Hit(body) => body,
      Lookup::Miss => return Ok(()),
    };
    let mut records: Vec<ProductRecord> = serde_json::from_str(&cached)?;
    match records.iter_mut().find(|r| r.id == record.id) {
      Some(existing) => *existing = record.clone(),
      None => records.push(record.clone()),
    }
    self.store_collection(&records, invocation).await?;
    Ok(())
  }

  async fn refresh_all(&self, store: &dyn CatalogStore, invocation: &Invocation) -> CatalogResult<usize> {
    let records = read_store(store, invocation).await?;
    self.store_collection(&records, invocation).await?;
    Ok(records.len())
  }

  #[instrument(name = "CollectionCache::fetch_all", skip_all, fields(key = COLLECTION_KEY))]
  async fn fetch_all(&self, store: &dyn CatalogStore, invocation: &Invocation) -> CatalogResult<Served> {
    if let Lookup::Hit(body) = lookup(self.backend.as_ref(), COLLECTION_KEY, invocation).await? {
      debug!("Collection cache hit.");
      return Ok(Served {
        body,
        origin: CacheOrigin::Hit,
      });
    }

    debug!("Collection cache miss; reading store.");
    let records = read_store(store, invocation).await?;
    let body = serde_json::to_string(&records)?;
    match write(self.backend.as_ref(), COLLECTION_KEY, &body, Some(self.ttl), invocation).await {
      Ok(()) => {}
      Err(CatalogError::Cancelled) => return Err(CatalogError::Cancelled),
      Err(e) => warn!(key = COLLECTION_KEY, error = %e, "Could not repopulate collection cache."),
    }
    Ok(Served {
      body,
      origin: CacheOrigin::Miss,
    })
  }

  /// Re-reads the store after the batch so the entry holds the full catalog,
  /// not just this run's records.
  async fn refresh_after_ingest(
    &self,
    _persisted: &[ProductRecord],
    store: &dyn CatalogStore,
    invocation: &Invocation,
  ) -> CatalogResult<usize> {
    self.refresh_all(store, invocation).await
  }
}

/// One key per record (`product:<id>`), no expiry.
pub struct ItemCache {
  backend: Arc<dyn CacheBackend>,
}

impl ItemCache {
  pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
    Self { backend }
  }

  /// Writes every record, logging and skipping individual write failures.
  async fn write_each(&self, records: &[ProductRecord], invocation: &Invocation) -> CatalogResult<usize> {
    let mut written = 0;
    for record in records {
      match self.refresh_one(record, invocation).await {
        Ok(()) => written += 1,
        Err(CatalogError::Cancelled) => return Err(CatalogError::Cancelled),
        Err(e) => warn!(key = %record.item_key(), error = %e, "Skipping item cache write."),
      }
    }
    Ok(written)
  }

  /// Reads the catalog from the store and writes every record back as an item.
  async fn fill_from_store(&self, store: &dyn CatalogStore, invocation: &Invocation) -> CatalogResult<Served> {
    let records = read_store(store, invocation).await?;
    self.write_each(&records, invocation).await?;
    Ok(Served {
      body: serde_json::to_string(&records)?,
      origin: CacheOrigin::Miss,
    })
  }
}

#[async_trait]
impl CacheStrategy for ItemCache {
  fn name(&self) -> &'static str {
    "item"
  }

  async fn refresh_one(&self, record: &ProductRecord, invocation: &Invocation) -> CatalogResult<()> {
    let body = serde_json::to_string(record)?;
    write(self.backend.as_ref(), &record.item_key(), &body, None, invocation).await
  }

  async fn refresh_all(&self, store: &dyn CatalogStore, invocation: &Invocation) -> CatalogResult<usize> {
    let records = read_store(store, invocation).await?;
    self.write_each(&records, invocation).await
  }

  #[instrument(name = "ItemCache::fetch_all", skip_all, fields(pattern = ITEM_KEY_PATTERN))]
  async fn fetch_all(&self, store: &dyn CatalogStore, invocation: &Invocation) -> CatalogResult<Served> {
    let keys = invocation
      .run(self.backend.scan_keys(ITEM_KEY_PATTERN))
      .await?
      .map_err(CatalogError::CacheUnavailable)?;

    if keys.is_empty() {
      debug!("No item keys cached; reading store.");
      return self.fill_from_store(store, invocation).await;
    }

    let mut records = Vec::with_capacity(keys.len());
    for key in &keys {
      let body = match lookup(self.backend.as_ref(), key, invocation).await? {
        Lookup::Hit(body) => body,
        // Expired between the scan and the read.
        Lookup::Miss => continue,
      };
      match serde_json::from_str::<ProductRecord>(&body) {
        Ok(record) => records.push(record),
        Err(e) => warn!(key = %key, error = %e, "Skipping unreadable item cache entry."),
      }
    }
    if records.is_empty() {
      debug!(keys = keys.len(), "No usable item entries; reading store.");
      return self.fill_from_store(store, invocation).await;
    }
    debug!(keys = keys.len(), records = records.len(), "Assembled catalog from item cache.");
    Ok(Served {
      body: serde_json::to_string(&records)?,
      origin: CacheOrigin::Hit,
    })
  }

  async fn refresh_after_ingest(
    &self,
    persisted: &[ProductRecord],
    _store: &dyn CatalogStore,
    invocation: &Invocation,
  ) -> CatalogResult<usize> {
    self.write_each(persisted, invocation).await
  }
}
