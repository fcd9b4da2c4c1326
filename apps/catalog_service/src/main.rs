// apps/catalog_service/src/main.rs

mod config;
mod errors;
mod seed;
mod state;
mod web;

use crate::config::AppConfig;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use larder::{PgCatalogStore, RedisCache};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting catalog service...");

  let app_config = Arc::new(AppConfig::from_env().context("Failed to load application configuration")?);

  // The store and the cache are acquired once here; failing to reach either is fatal.
  let db_pool = PgPoolOptions::new()
    .max_connections(app_config.db_max_connections)
    .connect(&app_config.database_url)
    .await
    .context("Failed to connect to the database")?;
  tracing::info!("Successfully connected to the database.");

  let store = PgCatalogStore::new(db_pool.clone());
  if app_config.ensure_schema {
    store.ensure_schema().await.context("Failed to ensure the products table")?;
  }

  let cache = RedisCache::connect(&app_config.redis_url)
    .await
    .context("Failed to connect to Redis")?;

  let app_state = AppState::build(app_config.clone(), Arc::new(store), Arc::new(cache));

  if let Some(path) = &app_config.seed_csv_path {
    seed::seed_from_file(path, &app_state.bulk_ingest, app_state.invocation()).await?;
  }

  let server_address = app_config.server_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  let server_state = app_state.clone();
  let served = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(server_state.clone()))
      .app_data(actix_data::PayloadConfig::new(server_state.config.max_upload_bytes))
      .configure(web::configure_app_routes)
      .wrap(tracing_actix_web::TracingLogger::default())
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await;

  tracing::info!("Server stopped; closing database pool.");
  db_pool.close().await;

  served.context("HTTP server failed")
}
