// larder/src/cache/mod.rs

//! Key-value cache of serialized products and the two strategies that sit
//! on top of it.

pub mod memory;
pub mod redis;
pub mod strategy;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;
pub use strategy::{CacheOrigin, CacheStrategy, CollectionCache, ItemCache, Served};

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Result of a cache read. A miss is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
  Hit(String),
  Miss,
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
  async fn get(&self, key: &str) -> CacheResult<Lookup>;

  /// `ttl` of `None` (or zero) stores the value without expiry.
  async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

  /// Keys matching a glob `pattern` such as `product:*`.
  async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

  async fn ping(&self) -> CacheResult<()>;
}

/// Normalizes a TTL: zero means "no expiry".
pub(crate) fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
  ttl.filter(|t| !t.is_zero())
}
