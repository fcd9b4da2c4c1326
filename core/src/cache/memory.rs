// larder/src/cache/memory.rs

use crate::cache::{effective_ttl, CacheBackend, Lookup};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
  value: String,
  expires_at: Option<Instant>,
  ttl: Option<Duration>,
}

impl Entry {
  fn is_live(&self, now: Instant) -> bool {
    self.expires_at.map_or(true, |at| now < at)
  }
}

/// In-process `CacheBackend`. Expiry follows tokio's clock, so tests can
/// advance time with `tokio::time::advance`.
#[derive(Debug, Default)]
pub struct MemoryCache {
  entries: Mutex<HashMap<String, Entry>>,
  unavailable: AtomicBool,
  reject_writes: AtomicBool,
  gets: AtomicUsize,
  sets: AtomicUsize,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// While set, every call fails as if the server were down.
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  /// While set, reads work but every write fails.
  pub fn set_reject_writes(&self, reject: bool) {
    self.reject_writes.store(reject, Ordering::SeqCst);
  }

  /// Reads a live entry without touching the counters.
  pub fn peek(&self, key: &str) -> Option<String> {
    let now = Instant::now();
    self
      .entries
      .lock()
      .get(key)
      .filter(|e| e.is_live(now))
      .map(|e| e.value.clone())
  }

  /// TTL the live entry under `key` was stored with; `None` for no expiry or no entry.
  pub fn ttl_of(&self, key: &str) -> Option<Duration> {
    let now = Instant::now();
    self
      .entries
      .lock()
      .get(key)
      .filter(|e| e.is_live(now))
      .and_then(|e| e.ttl)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.peek(key).is_some()
  }

  /// Writes an entry directly, without counting it as a `set`.
  pub fn insert(&self, key: &str, value: &str, ttl: Option<Duration>) {
    self.store(key, value, ttl);
  }

  pub fn get_count(&self) -> usize {
    self.gets.load(Ordering::SeqCst)
  }

  pub fn set_count(&self) -> usize {
    self.sets.load(Ordering::SeqCst)
  }

  fn store(&self, key: &str, value: &str, ttl: Option<Duration>) {
    let ttl = effective_ttl(ttl);
    let entry = Entry {
      value: value.to_string(),
      expires_at: ttl.map(|t| Instant::now() + t),
      ttl,
    };
    self.entries.lock().insert(key.to_string(), entry);
  }

  fn ensure_available(&self) -> CacheResult<()> {
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(CacheError::Unreachable("memory cache marked unavailable".to_string()));
    }
    Ok(())
  }
}

fn glob_matches(pattern: &str, key: &str) -> bool {
  match pattern.strip_suffix('*') {
    Some(prefix) => key.starts_with(prefix),
    None => key == pattern,
  }
}

#[async_trait]
impl CacheBackend for MemoryCache {
  async fn get(&self, key: &str) -> CacheResult<Lookup> {
    self.gets.fetch_add(1, Ordering::SeqCst);
    self.ensure_available()?;
    Ok(self.peek(key).map_or(Lookup::Miss, Lookup::Hit))
  }

  async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
    self.sets.fetch_add(1, Ordering::SeqCst);
    self.ensure_available()?;
    if self.reject_writes.load(Ordering::SeqCst) {
      return Err(CacheError::Unreachable(format!("write to '{}' rejected", key)));
    }
    self.store(key, value, ttl);
    Ok(())
  }

  async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
    self.ensure_available()?;
    let now = Instant::now();
    let mut keys: Vec<String> = self
      .entries
      .lock()
      .iter()
      .filter(|(key, entry)| entry.is_live(now) && glob_matches(pattern, key))
      .map(|(key, _)| key.clone())
      .collect();
    keys.sort();
    Ok(keys)
  }

  async fn ping(&self) -> CacheResult<()> {
    self.ensure_available()
  }
}
