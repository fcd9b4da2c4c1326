// larder/src/store/memory.rs

//! In-process `CatalogStore` with the same upsert contract as Postgres, plus
//! knobs for injecting failures and latency.

use crate::error::{StoreError, StoreResult};
use crate::model::{NewProduct, ProductRecord};
use crate::store::CatalogStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type FailurePredicate = Arc<dyn Fn(&NewProduct) -> bool + Send + Sync>;

#[derive(Default)]
struct Tables {
  rows: HashMap<String, ProductRecord>,
  last_stamp: Option<DateTime<Utc>>,
}

impl Tables {
  /// Wall-clock time, nudged forward so two writes never share a timestamp.
  fn next_stamp(&mut self) -> DateTime<Utc> {
    let now = Utc::now();
    let stamp = match self.last_stamp {
      Some(last) if now <= last => last + ChronoDuration::microseconds(1),
      _ => now,
    };
    self.last_stamp = Some(stamp);
    stamp
  }

  fn apply(&mut self, record: &NewProduct) -> ProductRecord {
    let id = record
      .id
      .clone()
      .unwrap_or_else(|| Uuid::new_v4().to_string());
    let stamp = self.next_stamp();
    let created_at = self.rows.get(&id).map(|existing| existing.created_at).unwrap_or(stamp);

    let row = ProductRecord {
      id: id.clone(),
      name: record.name.clone(),
      image: record.image.clone(),
      price: record.price,
      qty: record.qty,
      out_of_stock: record.out_of_stock(),
      created_at,
      updated_at: stamp,
    };
    self.rows.insert(id, row.clone());
    row
  }
}

#[derive(Default)]
pub struct MemoryCatalogStore {
  tables: Mutex<Tables>,
  fail_when: Mutex<Option<FailurePredicate>>,
  unreachable: AtomicBool,
  latency: Mutex<Option<Duration>>,
  upsert_calls: AtomicUsize,
  read_all_calls: AtomicUsize,
}

impl MemoryCatalogStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store pre-populated with `records`, bypassing the call counters.
  pub fn with_records(records: impl IntoIterator<Item = NewProduct>) -> Self {
    let store = Self::new();
    {
      let mut tables = store.tables.lock();
      for record in records {
        tables.apply(&record);
      }
    }
    store
  }

  /// Every record matching `predicate` is refused with `StoreError::Rejected`.
  pub fn fail_when(&self, predicate: impl Fn(&NewProduct) -> bool + Send + Sync + 'static) {
    *self.fail_when.lock() = Some(Arc::new(predicate));
  }

  /// While set, every call fails with `StoreError::Unreachable`.
  pub fn set_unreachable(&self, unreachable: bool) {
    self.unreachable.store(unreachable, Ordering::SeqCst);
  }

  /// Delay applied before each call does any work.
  pub fn set_latency(&self, latency: Option<Duration>) {
    *self.latency.lock() = latency;
  }

  pub fn get(&self, id: &str) -> Option<ProductRecord> {
    self.tables.lock().rows.get(id).cloned()
  }

  pub fn len(&self) -> usize {
    self.tables.lock().rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn upsert_calls(&self) -> usize {
    self.upsert_calls.load(Ordering::SeqCst)
  }

  pub fn read_all_calls(&self) -> usize {
    self.read_all_calls.load(Ordering::SeqCst)
  }

  async fn enter(&self) -> StoreResult<()> {
    let latency = *self.latency.lock();
    if let Some(delay) = latency {
      tokio::time::sleep(delay).await;
    }
    if self.unreachable.load(Ordering::SeqCst) {
      return Err(StoreError::Unreachable("memory store marked unreachable".to_string()));
    }
    Ok(())
  }

  fn check(&self, record: &NewProduct) -> StoreResult<()> {
    let predicate = self.fail_when.lock().clone();
    match predicate {
      Some(refuse) if refuse(record) => Err(StoreError::Rejected {
        id: record.id.clone().unwrap_or_else(|| record.name.clone()),
        reason: "injected failure".to_string(),
      }),
      _ => Ok(()),
    }
  }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
  async fn upsert(&self, record: NewProduct) -> StoreResult<ProductRecord> {
    self.upsert_calls.fetch_add(1, Ordering::SeqCst);
    self.enter().await?;
    self.check(&record)?;
    Ok(self.tables.lock().apply(&record))
  }

  async fn upsert_atomic(&self, records: Vec<NewProduct>) -> StoreResult<Vec<ProductRecord>> {
    self.upsert_calls.fetch_add(records.len(), Ordering::SeqCst);
    self.enter().await?;
    for record in &records {
      self.check(record)?;
    }
    let mut tables = self.tables.lock();
    Ok(records.iter().map(|record| tables.apply(record)).collect())
  }

  async fn read_all(&self) -> StoreResult<Vec<ProductRecord>> {
    self.read_all_calls.fetch_add(1, Ordering::SeqCst);
    self.enter().await?;
    Ok(self.tables.lock().rows.values().cloned().collect())
  }
}
