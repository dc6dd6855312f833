use actix_web::{get, post, put, web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::ServiceError;
use crate::models::{
    ApiResponse, ResetPasswordRequest, SignInRequest, SignUpRequest, SuccessFlag,
    UpdateProfileRequest,
};
use crate::services::AppState;
use crate::session::SessionContext;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(sign_up)
        .service(sign_in)
        .service(sign_out)
        .service(reset_password)
        .service(session_overview)
        .service(get_my_profile)
        .service(update_my_profile)
        .service(get_profile);
}

#[post("/auth/sign-up")]
pub async fn sign_up(
    state: web::Data<AppState>,
    payload: web::Json<SignUpRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let result = state.auth.sign_up(body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(result)))
}

#[post("/auth/sign-in")]
pub async fn sign_in(
    state: web::Data<AppState>,
    payload: web::Json<SignInRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let session = state.auth.sign_in(body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(session)))
}

#[post("/auth/sign-out")]
pub async fn sign_out(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    state.auth.sign_out(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SuccessFlag { success: true })))
}

#[post("/auth/reset-password")]
pub async fn reset_password(
    state: web::Data<AppState>,
    payload: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let flag = state.auth.reset_password(body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(flag)))
}

/// Profile, role and the client sections that role gets.
#[get("/auth/session")]
pub async fn session_overview(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let overview = state.auth.overview(&session).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(overview)))
}

#[get("/profiles/me")]
pub async fn get_my_profile(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let profile = state.auth.get_profile(session.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

#[put("/profiles/me")]
pub async fn update_my_profile(
    state: web::Data<AppState>,
    session: SessionContext,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let profile = state.auth.update_profile(&session, body).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

#[get("/profiles/{user_id}")]
pub async fn get_profile(
    state: web::Data<AppState>,
    _session: SessionContext,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let profile = state.auth.get_profile(user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}
