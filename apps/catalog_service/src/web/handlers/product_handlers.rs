// apps/catalog_service/src/web/handlers/product_handlers.rs

use actix_web::http::header::{self, CacheControl, CacheDirective, ContentType};
use actix_web::{web, HttpResponse};
use larder::Served;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

/// Wraps a served catalog body with the public caching and CORS headers.
fn catalog_response(served: Served, max_age: u32) -> HttpResponse {
  HttpResponse::Ok()
    .content_type(ContentType::json())
    .insert_header(CacheControl(vec![CacheDirective::Public, CacheDirective::MaxAge(max_age)]))
    .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
    .insert_header(("X-Cache", served.origin.as_str()))
    .body(served.body)
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let served = app_state.collection_query.fetch_all(&app_state.invocation()).await?;
  info!(origin = served.origin.as_str(), "Listed products from collection cache path.");
  Ok(catalog_response(served, app_state.config.public_cache_max_age))
}

#[instrument(name = "handler::list_product_items", skip(app_state))]
pub async fn list_product_items_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let served = app_state.item_query.fetch_all(&app_state.invocation()).await?;
  info!(origin = served.origin.as_str(), "Listed products from item cache path.");
  Ok(catalog_response(served, app_state.config.public_cache_max_age))
}
