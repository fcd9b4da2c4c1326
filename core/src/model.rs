// larder/src/model.rs

//! Product entities: the validated input of an upsert and the persisted row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Cache key holding the serialized full collection.
pub const COLLECTION_KEY: &str = "products:all";

/// Prefix of per-record cache keys (`product:<id>`).
pub const ITEM_KEY_PREFIX: &str = "product:";

/// Scan pattern matching every per-record cache key.
pub const ITEM_KEY_PATTERN: &str = "product:*";

/// A validated product ready to be upserted.
///
/// `out_of_stock` is not a field: it is always derived from `qty` by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
  /// Conflict key. `None` means the store assigns a fresh identifier.
  pub id: Option<String>,
  pub name: String,
  pub image: Option<String>,
  pub price: f64,
  pub qty: i32,
}

impl NewProduct {
  pub fn out_of_stock(&self) -> bool {
    self.qty == 0
  }
}

/// A product as persisted in the `products` table.
///
/// This is also the cached and served representation. An absent image is
/// omitted from JSON, never written as an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProductRecord {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  pub price: f64,
  pub qty: i32,
  pub out_of_stock: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProductRecord {
  pub fn item_key(&self) -> String {
    item_key(&self.id)
  }
}

pub fn item_key(id: &str) -> String {
  format!("{}{}", ITEM_KEY_PREFIX, id)
}
