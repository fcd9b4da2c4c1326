// apps/catalog_service/src/web/handlers/mod.rs

pub mod product_handlers;
pub mod upload_handlers;
