// apps/catalog_service/src/web/routes.rs

use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/products")
          .route(
            "",
            web::get().to(crate::web::handlers::product_handlers::list_products_handler),
          )
          .route(
            "/items",
            web::get().to(crate::web::handlers::product_handlers::list_product_items_handler),
          )
          .route(
            "/import",
            web::post().to(crate::web::handlers::upload_handlers::import_products_handler),
          )
          .route(
            "/upload",
            web::post().to(crate::web::handlers::upload_handlers::upload_products_handler),
          ),
      ),
  );
}
