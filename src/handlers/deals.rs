use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::ServiceError;
use crate::models::{ApiResponse, DealRequest, FeatureRequest, ModerationRequest, SuccessFlag};
use crate::services::AppState;
use crate::session::SessionContext;

#[derive(Deserialize)]
pub struct FeaturedDealsQuery {
    pub limit: Option<i64>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_active_deals)
        .service(list_featured_deals)
        .service(list_my_deals)
        .service(get_deal)
        .service(update_deal)
        .service(delete_deal)
        .service(list_business_deals)
        .service(create_deal)
        .service(list_pending_deals)
        .service(set_deal_status)
        .service(toggle_deal_featured);
}

#[get("/deals")]
pub async fn list_active_deals(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let deals = state.deals.list_active(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deals)))
}

#[get("/deals/featured")]
pub async fn list_featured_deals(
    state: web::Data<AppState>,
    query: web::Query<FeaturedDealsQuery>,
) -> Result<HttpResponse, ServiceError> {
    let deals = state.deals.list_featured(query.limit, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deals)))
}

#[get("/deals/mine")]
pub async fn list_my_deals(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let deals = state.deals.list_for_owner(&session, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deals)))
}

#[get("/deals/{deal_id}")]
pub async fn get_deal(
    state: web::Data<AppState>,
    deal_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let deal = state.deals.get(deal_id.into_inner(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deal)))
}

#[put("/deals/{deal_id}")]
pub async fn update_deal(
    state: web::Data<AppState>,
    session: SessionContext,
    deal_id: web::Path<Uuid>,
    payload: web::Json<DealRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let deal = state
        .deals
        .update(&session, deal_id.into_inner(), body, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deal)))
}

#[delete("/deals/{deal_id}")]
pub async fn delete_deal(
    state: web::Data<AppState>,
    session: SessionContext,
    deal_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    state.deals.delete(&session, deal_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SuccessFlag { success: true })))
}

#[get("/businesses/{business_id}/deals")]
pub async fn list_business_deals(
    state: web::Data<AppState>,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let deals = state
        .deals
        .list_active_for_business(business_id.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deals)))
}

#[post("/businesses/{business_id}/deals")]
pub async fn create_deal(
    state: web::Data<AppState>,
    session: SessionContext,
    business_id: web::Path<Uuid>,
    payload: web::Json<DealRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.into_inner();
    body.validate()?;

    let deal = state
        .deals
        .create(&session, business_id.into_inner(), body, Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(deal)))
}

// ============================================================================
// ADMIN MODERATION
// ============================================================================

#[get("/admin/deals/pending")]
pub async fn list_pending_deals(
    state: web::Data<AppState>,
    session: SessionContext,
) -> Result<HttpResponse, ServiceError> {
    let deals = state.deals.list_pending(&session, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deals)))
}

#[put("/admin/deals/{deal_id}/status")]
pub async fn set_deal_status(
    state: web::Data<AppState>,
    session: SessionContext,
    deal_id: web::Path<Uuid>,
    payload: web::Json<ModerationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let deal = state
        .deals
        .set_status(&session, deal_id.into_inner(), payload.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deal)))
}

#[put("/admin/deals/{deal_id}/featured")]
pub async fn toggle_deal_featured(
    state: web::Data<AppState>,
    session: SessionContext,
    deal_id: web::Path<Uuid>,
    payload: web::Json<FeatureRequest>,
) -> Result<HttpResponse, ServiceError> {
    let deal = state
        .deals
        .toggle_featured(&session, deal_id.into_inner(), payload.is_featured, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(deal)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use chrono::Duration;

    use crate::models::{DealStatus, ModerationStatus, Role};
    use crate::services::testing::{
        app_state, deal_request, new_store, seed_business, seed_deal, FakeBackend,
    };

    #[actix_rt::test]
    async fn featured_deals_default_to_five() {
        let store = new_store();
        let owner = store.add_profile("owner@example.com", Role::BusinessOwner);
        let business = seed_business(&store, &owner, "Corner Cafe", ModerationStatus::Approved);
        let now = Utc::now();
        for _ in 0..7 {
            let mut deal = seed_deal(
                &store,
                &business,
                deal_request(now - Duration::days(1), now + Duration::days(1)),
                DealStatus::Approved,
            );
            deal.is_featured = true;
            store.put_deal(deal);
        }
        let state = web::Data::new(app_state(store, FakeBackend::new()));
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/deals/featured").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 5);
    }

    #[actix_rt::test]
    async fn unknown_deal_is_not_found() {
        let store = new_store();
        let state = web::Data::new(app_state(store, FakeBackend::new()));
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/deals/{}", Uuid::new_v4()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }
}
