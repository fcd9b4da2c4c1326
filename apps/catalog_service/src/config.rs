// apps/catalog_service/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub db_max_connections: u32,
  pub redis_url: String,

  pub collection_cache_ttl: Duration,
  /// `max-age` advertised to HTTP clients on catalog reads.
  pub public_cache_max_age: u32,
  pub request_timeout: Duration,
  pub max_upload_bytes: usize,

  pub ensure_schema: bool,
  /// When set, this file is ingested through the bulk path at startup.
  pub seed_csv_path: Option<PathBuf>,
}

// Connection URLs carry credentials; keep them out of logs.
impl fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("db_max_connections", &self.db_max_connections)
      .field("redis_url", &"[REDACTED]")
      .field("collection_cache_ttl", &self.collection_cache_ttl)
      .field("public_cache_max_age", &self.public_cache_max_age)
      .field("request_timeout", &self.request_timeout)
      .field("max_upload_bytes", &self.max_upload_bytes)
      .field("ensure_schema", &self.ensure_schema)
      .field("seed_csv_path", &self.seed_csv_path)
      .finish()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Builds the configuration from any variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());
    let or_default = |var_name: &str, default: &str| get_env(var_name).unwrap_or_else(|| default.to_string());

    let server_host = or_default("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var::<u16>("SERVER_PORT", &or_default("SERVER_PORT", "8080"))?;

    let database_url = match get_env("DATABASE_URL") {
      Some(url) => url,
      None => {
        let missing = |name: &str| AppError::Config(format!("Set DATABASE_URL or '{}'", name));
        let host = get_env("DB_HOST").ok_or_else(|| missing("DB_HOST"))?;
        let port = parse_var::<u16>("DB_PORT", &or_default("DB_PORT", "5432"))?;
        let user = get_env("DB_USER").ok_or_else(|| missing("DB_USER"))?;
        let password = get_env("DB_PASSWORD").unwrap_or_default();
        let name = get_env("DB_NAME").ok_or_else(|| missing("DB_NAME"))?;
        let sslmode = or_default("DB_SSLMODE", "disable");
        format!(
          "postgres://{}:{}@{}:{}/{}?sslmode={}",
          user, password, host, port, name, sslmode
        )
      }
    };
    let db_max_connections = parse_var::<u32>("DB_MAX_CONNECTIONS", &or_default("DB_MAX_CONNECTIONS", "5"))?;

    let redis_url = match get_env("REDIS_URL") {
      Some(url) => url,
      None => {
        let host = or_default("REDIS_HOST", "127.0.0.1");
        let port = parse_var::<u16>("REDIS_PORT", &or_default("REDIS_PORT", "6379"))?;
        match get_env("REDIS_PASSWORD") {
          Some(password) => format!("redis://:{}@{}:{}", password, host, port),
          None => format!("redis://{}:{}", host, port),
        }
      }
    };

    let collection_cache_ttl = Duration::from_secs(parse_var::<u64>(
      "COLLECTION_CACHE_TTL_SECS",
      &or_default("COLLECTION_CACHE_TTL_SECS", "3600"),
    )?);
    let public_cache_max_age =
      parse_var::<u32>("PUBLIC_CACHE_MAX_AGE_SECS", &or_default("PUBLIC_CACHE_MAX_AGE_SECS", "300"))?;
    let request_timeout = Duration::from_secs(parse_var::<u64>(
      "REQUEST_TIMEOUT_SECS",
      &or_default("REQUEST_TIMEOUT_SECS", "30"),
    )?);
    let max_upload_bytes = parse_var::<usize>("MAX_UPLOAD_BYTES", &or_default("MAX_UPLOAD_BYTES", "10485760"))?;

    let ensure_schema = parse_var::<bool>("ENSURE_SCHEMA", &or_default("ENSURE_SCHEMA", "true"))?;
    let seed_csv_path = get_env("SEED_CSV_PATH").map(PathBuf::from);

    if request_timeout.is_zero() {
      return Err(AppError::Config("REQUEST_TIMEOUT_SECS must be greater than zero".to_string()));
    }

    tracing::info!(
      server_host = %server_host,
      server_port,
      db_max_connections,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      redis_url,
      collection_cache_ttl,
      public_cache_max_age,
      request_timeout,
      max_upload_bytes,
      ensure_schema,
      seed_csv_path,
    })
  }

  pub fn server_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_var<T>(var_name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e)))
}
