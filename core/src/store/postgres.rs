// larder/src/store/postgres.rs

use crate::error::StoreResult;
use crate::model::{NewProduct, ProductRecord};
use crate::store::CatalogStore;
use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
  id           TEXT PRIMARY KEY,
  name         TEXT NOT NULL,
  image        TEXT,
  price        DOUBLE PRECISION NOT NULL CHECK (price >= 0),
  qty          INTEGER NOT NULL CHECK (qty >= 0),
  out_of_stock BOOLEAN NOT NULL,
  created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
  updated_at   TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

// clock_timestamp() rather than now(): every row of one transaction gets its own instant.
const UPSERT_SQL: &str = r#"
INSERT INTO products (id, name, image, price, qty, out_of_stock, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, clock_timestamp(), clock_timestamp())
ON CONFLICT (id) DO UPDATE SET
  name = EXCLUDED.name,
  image = EXCLUDED.image,
  price = EXCLUDED.price,
  qty = EXCLUDED.qty,
  out_of_stock = EXCLUDED.out_of_stock,
  updated_at = clock_timestamp()
RETURNING id, name, image, price, qty, out_of_stock, created_at, updated_at
"#;

const READ_ALL_SQL: &str =
  "SELECT id, name, image, price, qty, out_of_stock, created_at, updated_at FROM products";

/// `CatalogStore` over a Postgres pool. The pool is acquired once per process
/// and shared by every clone.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
  pool: PgPool,
}

impl PgCatalogStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  /// Creates the `products` table if it does not exist yet.
  #[instrument(name = "PgCatalogStore::ensure_schema", skip(self), err(Display))]
  pub async fn ensure_schema(&self) -> StoreResult<()> {
    sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
    info!("Products table is present.");
    Ok(())
  }
}

async fn upsert_with<'e, E>(executor: E, record: &NewProduct) -> Result<ProductRecord, sqlx::Error>
where
  E: PgExecutor<'e>,
{
  let id = record
    .id
    .clone()
    .unwrap_or_else(|| Uuid::new_v4().to_string());

  sqlx::query_as::<_, ProductRecord>(UPSERT_SQL)
    .bind(id)
    .bind(record.name.clone())
    .bind(record.image.clone())
    .bind(record.price)
    .bind(record.qty)
    .bind(record.out_of_stock())
    .fetch_one(executor)
    .await
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
  #[instrument(name = "PgCatalogStore::upsert", skip(self, record), fields(id = ?record.id))]
  async fn upsert(&self, record: NewProduct) -> StoreResult<ProductRecord> {
    let row = upsert_with(&self.pool, &record).await?;
    debug!(id = %row.id, "Product upserted.");
    Ok(row)
  }

  #[instrument(name = "PgCatalogStore::upsert_atomic", skip(self, records), fields(records = records.len()))]
  async fn upsert_atomic(&self, records: Vec<NewProduct>) -> StoreResult<Vec<ProductRecord>> {
    // Dropping `tx` on an early return rolls the whole batch back.
    let mut tx = self.pool.begin().await?;
    let mut persisted = Vec::with_capacity(records.len());
    for record in &records {
      persisted.push(upsert_with(&mut *tx, record).await?);
    }
    tx.commit().await?;
    debug!(persisted = persisted.len(), "Transaction committed.");
    Ok(persisted)
  }

  #[instrument(name = "PgCatalogStore::read_all", skip(self))]
  async fn read_all(&self) -> StoreResult<Vec<ProductRecord>> {
    let rows = sqlx::query_as::<_, ProductRecord>(READ_ALL_SQL)
      .fetch_all(&self.pool)
      .await?;
    debug!(rows = rows.len(), "Read all products.");
    Ok(rows)
  }
}
