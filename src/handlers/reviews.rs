use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::ServiceError;
use crate::models::{ApiResponse, ModerationRequest, SubmitReviewRequest, SuccessFlag};
use crate::services::AppState;
use crate::session::SessionContext;

/// Photo metadata travels in the query string; the body is the raw image.
#[derive(Deserialize)]
pub struct PhotoUploadQuery {
    pub file_name: String,
    pub content_type: Option<String>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_business_reviews)
        .service(business_review_stats)
        .service(submit_review)
        .service(upload_review_photo)
        .service(list_my_reviews)
        .service(delete_review)
        .service(list_pending_reviews)
        .service(set_review_status);
}

#[get("/businesses/{business_id}/reviews")]
pub async fn list_business_reviews(
    state: web::Data<AppState>,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let reviews = state
        .reviews
        .list_for_business(business_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(reviews)))
}

#[get("/businesses/{business_id}/reviews/stats")]
pub async fn business_review_stats(
    state: web::Data<AppState>,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let stats = state.reviews.stats(business_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}

#[post("/businesses/{business_id}/reviews")]
pub async fn submit_review(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
    payload: web::Json<SubmitReviewRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let review = state
        .reviews
        .submit(&session, business_id.into_inner(), body)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(review)))
}

#[post("/reviews/photos")]
pub async fn upload_review_photo(
    state: web::Data<AppState>,
    session: SessionContext,
    query: web::Query<PhotoUploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let query = query.into_inner();
    let content_type = query
        .content_type
        .unwrap_or_else(|| "image/jpeg".to_string());

    let photo = state
        .reviews
        .upload_photo(&session, &query.file_name, body.to_vec(), &content_type)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(photo)))
}

#[get("/reviews/mine")]
pub async fn list_my_reviews(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let reviews = state.reviews.list_for_user(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(reviews)))
}

#[delete("/reviews/{review_id}")]
pub async fn delete_review(
    state: web::Data<AppState>,
    session: SessionContext,
    review_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    state.reviews.delete(&session, review_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SuccessFlag { success: true })))
}

// ============================================================================
// ADMIN MODERATION
// ============================================================================

#[get("/admin/reviews/pending")]
pub async fn list_pending_reviews(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let reviews = state.reviews.list_pending(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(reviews)))
}

#[put("/admin/reviews/{review_id}/status")]
pub async fn set_review_status(
    state: web::Data<AppState>,
    session: SessionContext,
    review_id: web::Path<Uuid>,
    payload: web::Json<ModerationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let review = state
        .reviews
        .set_status(&session, review_id.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(review)))
}
