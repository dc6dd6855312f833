pub mod admin;
pub mod auth;
pub mod businesses;
pub mod deals;
pub mod reviews;

use actix_web::{get, web, HttpResponse, Responder};

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "directory-service",
        "timestamp": chrono::Utc::now()
    }))
}

/// Every route under `/api/v1`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .configure(auth::routes)
        .configure(businesses::routes)
        .configure(deals::routes)
        .configure(reviews::routes)
        .configure(admin::routes);
}
