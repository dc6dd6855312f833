// Services layer: ownership checks, moderation transitions and reshaping on top of the store
pub mod activity;
pub mod admin;
pub mod auth;
pub mod business;
pub mod deal;
pub mod review;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use uuid::Uuid;

pub use activity::ActivityLogger;
pub use admin::AdminService;
pub use auth::AuthService;
pub use business::BusinessService;
pub use deal::DealService;
pub use review::ReviewService;

use crate::clients::{AuthApi, FunctionInvoker, ObjectStorage};
use crate::config::AppConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::models::Business;
use crate::session::{AuthEvents, SessionContext};
use crate::store::Store;

/// Everything the handlers reach through `web::Data`.
pub struct AppState {
    pub auth: AuthService,
    pub businesses: BusinessService,
    pub deals: DealService,
    pub reviews: ReviewService,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        auth_api: Arc<dyn AuthApi>,
        storage: Arc<dyn ObjectStorage>,
        functions: Arc<dyn FunctionInvoker>,
        events: AuthEvents,
        config: &AppConfig,
    ) -> Self {
        let activity = ActivityLogger::new(store.clone());
        Self {
            auth: AuthService::new(
                store.clone(),
                auth_api,
                functions,
                events,
                config.password_reset_redirect.clone(),
            ),
            businesses: BusinessService::new(store.clone(), activity.clone()),
            deals: DealService::new(store.clone(), activity.clone()),
            reviews: ReviewService::new(
                store.clone(),
                storage,
                activity.clone(),
                config.review_photo_bucket.clone(),
            ),
            admin: AdminService::new(store, activity),
        }
    }
}

/// Wraps a store failure, logging it with `context` first.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> ServiceError {
    move |err| {
        log::error!("{context}: {err:?}");
        ServiceError::Database(err)
    }
}

/// Loads a business and checks the caller owns it. A foreign business is
/// `Forbidden`, a missing one `NotFound`.
pub(crate) async fn load_owned_business(
    store: &dyn Store,
    session: &SessionContext,
    business_id: Uuid,
) -> ServiceResult<Business> {
    let business = store
        .get_business(business_id)
        .await
        .map_err(db_error("Failed to load business"))?
        .ok_or(ServiceError::NotFound("Business"))?;

    if business.owner_id != session.user_id {
        log::warn!(
            "User {} attempted to modify business {} owned by {}",
            session.user_id,
            business.id,
            business.owner_id
        );
        return Err(ServiceError::forbidden(
            "You do not have permission to modify this business",
        ));
    }

    Ok(business)
}
