// larder/src/cache/redis.rs

use crate::cache::{effective_ttl, CacheBackend, Lookup};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// `CacheBackend` over a multiplexed, auto-reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisCache {
  manager: ConnectionManager,
}

impl RedisCache {
  /// Opens the connection and verifies it with `PING`. Callers treat a failure
  /// here as fatal.
  #[instrument(name = "RedisCache::connect", skip(url), err(Display))]
  pub async fn connect(url: &str) -> CacheResult<Self> {
    let client = redis::Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    let cache = Self { manager };
    cache.ping().await?;
    info!("Connected to Redis.");
    Ok(cache)
  }
}

impl std::fmt::Debug for RedisCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RedisCache").finish_non_exhaustive()
  }
}

#[async_trait]
impl CacheBackend for RedisCache {
  async fn get(&self, key: &str) -> CacheResult<Lookup> {
    let mut con = self.manager.clone();
    let value: Option<String> = con.get(key).await?;
    Ok(value.map_or(Lookup::Miss, Lookup::Hit))
  }

  async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
    let mut con = self.manager.clone();
    match effective_ttl(ttl) {
      Some(ttl) => {
        // SET EX takes whole seconds; round sub-second TTLs up rather than to "no expiry".
        let secs = ttl.as_secs().max(1);
        con.set_ex::<_, _, ()>(key, value, secs).await?;
      }
      None => con.set::<_, _, ()>(key, value).await?,
    }
    Ok(())
  }

  async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
    let mut con = self.manager.clone();
    let mut keys = Vec::new();
    {
      let mut iter: redis::AsyncIter<String> = con.scan_match(pattern).await?;
      while let Some(key) = iter.next_item().await {
        keys.push(key);
      }
    }
    // SCAN may return a key more than once.
    keys.sort();
    keys.dedup();
    debug!(pattern, keys = keys.len(), "Scanned cache keys.");
    Ok(keys)
  }

  async fn ping(&self) -> CacheResult<()> {
    let mut con = self.manager.clone();
    let pong: String = redis::cmd("PING").query_async(&mut con).await?;
    if pong != "PONG" {
      return Err(CacheError::Unreachable(format!("unexpected PING reply: {}", pong)));
    }
    Ok(())
  }
}
