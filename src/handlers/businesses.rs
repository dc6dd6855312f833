use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ServiceError;
use crate::models::{
    ApiResponse, BusinessRequest, FeatureRequest, FeaturedOrderRequest, ModerationRequest,
    ModerationStatus, SearchQuery, SuccessFlag,
};
use crate::services::AppState;
use crate::session::SessionContext;

#[derive(Deserialize)]
pub struct VerificationQuery {
    pub status: Option<ModerationStatus>,
}

#[derive(Serialize)]
struct BookmarkState {
    bookmarked: bool,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    // Literal segments before `{business_id}`.
    cfg.service(list_businesses)
        .service(search_businesses)
        .service(list_featured_businesses)
        .service(list_my_businesses)
        .service(owner_dashboard)
        .service(list_categories)
        .service(list_bookmarks)
        .service(create_business)
        .service(get_business)
        .service(update_business)
        .service(add_bookmark)
        .service(remove_bookmark)
        .service(bookmark_state)
        .service(list_pending_businesses)
        .service(list_verification_requests)
        .service(set_business_status)
        .service(toggle_business_featured)
        .service(set_business_featured_order);
}

// ============================================================================
// PUBLIC DIRECTORY
// ============================================================================

#[get("/businesses")]
pub async fn list_businesses(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let listings = state.businesses.list_approved().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(listings)))
}

#[get("/businesses/search")]
pub async fn search_businesses(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ServiceError> {
    let listings = state.businesses.search(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(listings)))
}

#[get("/businesses/featured")]
pub async fn list_featured_businesses(
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let listings = state.businesses.list_featured().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(listings)))
}

#[get("/businesses/{business_id}")]
pub async fn get_business(
    state: web::Data<AppState>,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let detail = state
        .businesses
        .get_approved(business_id.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

#[get("/categories")]
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let categories = state.businesses.categories().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(categories)))
}

// ============================================================================
// OWNER
// ============================================================================

#[post("/businesses")]
pub async fn create_business(
    state: web::Data<AppState>,
    session: SessionContext,
    payload: web::Json<BusinessRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let business = state.businesses.create(&session, body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(business)))
}

#[put("/businesses/{business_id}")]
pub async fn update_business(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
    payload: web::Json<BusinessRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let business = state
        .businesses
        .update(&session, business_id.into_inner(), body)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(business)))
}

#[get("/businesses/mine")]
pub async fn list_my_businesses(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let listings = state.businesses.list_for_owner(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(listings)))
}

#[get("/businesses/mine/dashboard")]
pub async fn owner_dashboard(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let dashboard = state
        .businesses
        .owner_dashboard(&session, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(dashboard)))
}

// ============================================================================
// BOOKMARKS
// ============================================================================

#[get("/bookmarks")]
pub async fn list_bookmarks(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let bookmarks = state.businesses.list_bookmarks(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(bookmarks)))
}

#[post("/businesses/{business_id}/bookmark")]
pub async fn add_bookmark(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let bookmark = state
        .businesses
        .add_bookmark(&session, business_id.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(bookmark)))
}

#[delete("/businesses/{business_id}/bookmark")]
pub async fn remove_bookmark(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    state
        .businesses
        .remove_bookmark(&session, business_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SuccessFlag { success: true })))
}

#[get("/businesses/{business_id}/bookmark")]
pub async fn bookmark_state(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let bookmarked = state
        .businesses
        .is_bookmarked(&session, business_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(BookmarkState { bookmarked })))
}

// ============================================================================
// ADMIN MODERATION
// ============================================================================

#[get("/admin/businesses/pending")]
pub async fn list_pending_businesses(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let pending = state.businesses.list_pending(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(pending)))
}

#[get("/admin/businesses/verification")]
pub async fn list_verification_requests(
    state: web::Data<AppState>,
    session: SessionContext,
    query: web::Query<VerificationQuery>,
) -> Result<HttpResponse, ServiceError> {
    let status = query.status.unwrap_or(ModerationStatus::Pending);
    let requests = state
        .businesses
        .verification_requests(&session, status)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

#[put("/admin/businesses/{business_id}/status")]
pub async fn set_business_status(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
    payload: web::Json<ModerationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let business = state
        .businesses
        .set_status(&session, business_id.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(business)))
}

#[put("/admin/businesses/{business_id}/featured")]
pub async fn toggle_business_featured(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
    payload: web::Json<FeatureRequest>,
) -> Result<HttpResponse, ServiceError> {
    let business = state
        .businesses
        .toggle_featured(&session, business_id.into_inner(), payload.is_featured)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(business)))
}

#[put("/admin/businesses/{business_id}/featured-order")]
pub async fn set_business_featured_order(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
    payload: web::Json<FeaturedOrderRequest>,
) -> Result<HttpResponse, ServiceError> {
    let business = state
        .businesses
        .set_featured_order(&session, business_id.into_inner(), payload.featured_order)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(business)))
}
