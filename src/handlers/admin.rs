use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ServiceError;
use crate::models::{
    ApiResponse, ChangeRoleRequest, CreateCategoryRequest, LogActivityRequest, PaginationQuery,
    ReportQuery, StatsQuery, SuccessFlag, UpdateCategoryRequest, UserFilters, UserStatusRequest,
};
use crate::services::admin::BusinessReport;
use crate::services::AppState;
use crate::session::SessionContext;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard)
        .service(list_users)
        .service(set_user_status)
        .service(change_user_role)
        .service(list_categories)
        .service(create_category)
        .service(update_category)
        .service(delete_category)
        .service(list_activity_logs)
        .service(log_activity)
        .service(business_report)
        .service(system_stats);
}

#[get("/admin/dashboard")]
pub async fn dashboard(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let analytics = state.admin.dashboard(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(analytics)))
}

// ============================================================================
// USERS
// ============================================================================

#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<AppState>,
    session: SessionContext,
    filters: web::Query<UserFilters>,
    pagination: web::Query<PaginationQuery>,
) -> Result<HttpResponse, ServiceError> {
    let page = state
        .admin
        .list_users(&session, filters.into_inner(), pagination.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

#[put("/admin/users/{user_id}/status")]
pub async fn set_user_status(
    state: web::Data<AppState>,
    session: SessionContext,
    user_id: web::Path<Uuid>,
    payload: web::Json<UserStatusRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let profile = state
        .admin
        .set_user_active(&session, user_id.into_inner(), body)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

#[put("/admin/users/{user_id}/role")]
pub async fn change_user_role(
    state: web::Data<AppState>,
    session: SessionContext,
    user_id: web::Path<Uuid>,
    payload: web::Json<ChangeRoleRequest>,
) -> Result<HttpResponse, ServiceError> {
    let flag = state
        .auth
        .change_user_role(&session, user_id.into_inner(), payload.role)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(flag)))
}

// ============================================================================
// CATEGORIES
// ============================================================================

#[get("/admin/categories")]
pub async fn list_categories(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let categories = state.admin.list_categories(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(categories)))
}

#[post("/admin/categories")]
pub async fn create_category(
    state: web::Data<AppState>,
    session: SessionContext,
    payload: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse, ServiceError> {
    let category = state
        .admin
        .create_category(&session, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(category)))
}

#[put("/admin/categories/{category_id}")]
pub async fn update_category(
    state: web::Data<AppState>,
    session: SessionContext,
    category_id: web::Path<Uuid>,
    payload: web::Json<UpdateCategoryRequest>,
) -> Result<HttpResponse, ServiceError> {
    let category = state
        .admin
        .update_category(&session, category_id.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(category)))
}

#[delete("/admin/categories/{category_id}")]
pub async fn delete_category(
    state: web::Data<AppState>,
    session: SessionContext,
    category_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    state
        .admin
        .delete_category(&session, category_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SuccessFlag { success: true })))
}

// ============================================================================
// AUDIT, REPORTS, STATS
// ============================================================================

#[get("/admin/activity-logs")]
pub async fn list_activity_logs(
    state: web::Data<AppState>,
    session: SessionContext,
    pagination: web::Query<PaginationQuery>,
) -> Result<HttpResponse, ServiceError> {
    let page = state
        .admin
        .activity_logs(&session, pagination.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

#[post("/admin/activity-logs")]
pub async fn log_activity(
    state: web::Data<AppState>,
    session: SessionContext,
    payload: web::Json<LogActivityRequest>,
) -> Result<HttpResponse, ServiceError> {
    let flag = state
        .admin
        .log_activity(&session, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(flag)))
}

#[get("/admin/reports/businesses")]
pub async fn business_report(
    state: web::Data<AppState>,
    session: SessionContext,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, ServiceError> {
    match state
        .admin
        .business_report(&session, query.into_inner())
        .await?
    {
        BusinessReport::Rows(rows) => Ok(HttpResponse::Ok().json(ApiResponse::success(rows))),
        BusinessReport::Csv(text) => Ok(HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                "Content-Disposition",
                "attachment; filename=\"business-report.csv\"",
            ))
            .body(text)),
    }
}

#[get("/admin/stats")]
pub async fn system_stats(
    state: web::Data<AppState>,
    session: SessionContext,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, ServiceError> {
    let stats = state
        .admin
        .system_stats(&session, &query.period, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}
