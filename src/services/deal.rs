use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{db_error, load_owned_business, ActivityLogger};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{BusinessSummary, Deal, DealRequest, DealStatus, DealView, ModerationRequest};
use crate::moderation::{deal_effective_status, resubmit_deal, ModerationDecision};
use crate::session::SessionContext;
use crate::store::{BusinessQuery, DealQuery, Store};

const DEFAULT_FEATURED_LIMIT: i64 = 5;

pub struct DealService {
    store: Arc<dyn Store>,
    activity: ActivityLogger,
}

impl DealService {
    pub fn new(store: Arc<dyn Store>, activity: ActivityLogger) -> Self {
        Self { store, activity }
    }

    /// Approved deals whose date range contains `now`, newest first.
    pub async fn list_active(&self, now: DateTime<Utc>) -> ServiceResult<Vec<DealView>> {
        let deals = self
            .store
            .list_deals(&DealQuery {
                status: Some(DealStatus::Approved),
                active_at: Some(now),
                ..DealQuery::default()
            })
            .await
            .map_err(db_error("Error fetching active deals"))?;

        self.with_businesses(deals, now).await
    }

    pub async fn get(&self, id: Uuid, now: DateTime<Utc>) -> ServiceResult<DealView> {
        let deal = self.load(id).await?;
        let mut views = self.with_businesses(vec![deal], now).await?;
        views.pop().ok_or(ServiceError::NotFound("Deal"))
    }

    pub async fn list_active_for_business(
        &self,
        business_id: Uuid,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<DealView>> {
        let deals = self
            .store
            .list_deals(&DealQuery {
                business_ids: Some(vec![business_id]),
                status: Some(DealStatus::Approved),
                active_at: Some(now),
                ..DealQuery::default()
            })
            .await
            .map_err(db_error("Error fetching business deals"))?;

        Ok(deals.into_iter().map(|deal| view(deal, None, now)).collect())
    }

    pub async fn list_featured(
        &self,
        limit: Option<i64>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<DealView>> {
        let deals = self
            .store
            .list_deals(&DealQuery {
                status: Some(DealStatus::Approved),
                active_at: Some(now),
                featured: Some(true),
                limit: Some(limit.unwrap_or(DEFAULT_FEATURED_LIMIT).max(0)),
                ..DealQuery::default()
            })
            .await
            .map_err(db_error("Error fetching featured deals"))?;

        self.with_businesses(deals, now).await
    }

    // ------------------------------------------------------------------------
    // Owner operations; ownership goes through the parent business
    // ------------------------------------------------------------------------

    pub async fn create(
        &self,
        session: &SessionContext,
        business_id: Uuid,
        request: DealRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<DealView> {
        request
            .validate_business_rules()
            .map_err(ServiceError::Validation)?;
        let business = load_owned_business(self.store.as_ref(), session, business_id).await?;

        let deal = self
            .store
            .insert_deal(request.into_new_deal(business.id))
            .await
            .map_err(db_error("Error creating deal"))?;

        log::info!("Deal {} submitted for business {}", deal.id, business.id);
        Ok(view(deal, Some(business.summary()), now))
    }

    /// Any edit sends the deal back to moderation.
    pub async fn update(
        &self,
        session: &SessionContext,
        deal_id: Uuid,
        request: DealRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<DealView> {
        request
            .validate_business_rules()
            .map_err(ServiceError::Validation)?;
        let mut deal = self.load(deal_id).await?;
        let business = load_owned_business(self.store.as_ref(), session, deal.business_id).await?;

        request.apply_to_existing(&mut deal, now);
        resubmit_deal(&mut deal);

        let deal = self
            .store
            .update_deal(deal)
            .await
            .map_err(db_error("Error updating deal"))?;
        Ok(view(deal, Some(business.summary()), now))
    }

    pub async fn delete(&self, session: &SessionContext, deal_id: Uuid) -> ServiceResult<()> {
        let deal = self.load(deal_id).await?;
        load_owned_business(self.store.as_ref(), session, deal.business_id).await?;

        let removed = self
            .store
            .delete_deal(deal.id)
            .await
            .map_err(db_error("Error deleting deal"))?;
        if !removed {
            return Err(ServiceError::NotFound("Deal"));
        }
        Ok(())
    }

    /// Deals across all of the caller's businesses, newest first.
    pub async fn list_for_owner(
        &self,
        session: &SessionContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<DealView>> {
        let businesses = self
            .store
            .list_businesses(&BusinessQuery {
                owner_id: Some(session.user_id),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching owner businesses"))?;

        if businesses.is_empty() {
            return Ok(Vec::new());
        }

        let summaries: HashMap<Uuid, BusinessSummary> =
            businesses.iter().map(|b| (b.id, b.summary())).collect();

        let deals = self
            .store
            .list_deals(&DealQuery {
                business_ids: Some(summaries.keys().copied().collect()),
                ..DealQuery::default()
            })
            .await
            .map_err(db_error("Error fetching deals by business owner"))?;

        Ok(deals
            .into_iter()
            .map(|deal| {
                let business = summaries.get(&deal.business_id).cloned();
                view(deal, business, now)
            })
            .collect())
    }

    // ------------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------------

    pub async fn list_pending(
        &self,
        admin: &SessionContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<DealView>> {
        admin.require_admin()?;
        let deals = self
            .store
            .list_deals(&DealQuery {
                status: Some(DealStatus::Pending),
                ..DealQuery::default()
            })
            .await
            .map_err(db_error("Error fetching pending deals"))?;

        self.with_businesses(deals, now).await
    }

    pub async fn set_status(
        &self,
        admin: &SessionContext,
        id: Uuid,
        request: ModerationRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<DealView> {
        admin.require_admin()?;
        let decision = ModerationDecision::from_request(request.status, request.rejection_reason)?;

        let mut deal = self.load(id).await?;
        decision.apply_to_deal(&mut deal, now);
        let deal = self
            .store
            .update_deal(deal)
            .await
            .map_err(db_error("Error updating deal status"))?;

        log::info!("Admin {} set deal {} to {:?}", admin.user_id, deal.id, deal.status);
        self.activity
            .log(
                admin,
                &decision.action_name("deal"),
                decision.rejection_reason().map(str::to_string),
                "deal",
                Some(deal.id),
            )
            .await;

        Ok(view(deal, None, now))
    }

    pub async fn toggle_featured(
        &self,
        admin: &SessionContext,
        id: Uuid,
        is_featured: bool,
        now: DateTime<Utc>,
    ) -> ServiceResult<DealView> {
        admin.require_admin()?;
        let mut deal = self.load(id).await?;
        deal.is_featured = is_featured;

        let deal = self
            .store
            .update_deal(deal)
            .await
            .map_err(db_error("Error toggling deal feature status"))?;
        Ok(view(deal, None, now))
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn load(&self, id: Uuid) -> ServiceResult<Deal> {
        self.store
            .get_deal(id)
            .await
            .map_err(db_error("Error fetching deal"))?
            .ok_or(ServiceError::NotFound("Deal"))
    }

    async fn with_businesses(
        &self,
        deals: Vec<Deal>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<DealView>> {
        if deals.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<Uuid> = deals.iter().map(|d| d.business_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let summaries: HashMap<Uuid, BusinessSummary> = self
            .store
            .list_businesses(&BusinessQuery {
                ids: Some(ids),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching deal businesses"))?
            .iter()
            .map(|b| (b.id, b.summary()))
            .collect();

        Ok(deals
            .into_iter()
            .map(|deal| {
                let business = summaries.get(&deal.business_id).cloned();
                view(deal, business, now)
            })
            .collect())
    }
}

fn view(deal: Deal, business: Option<BusinessSummary>, now: DateTime<Utc>) -> DealView {
    DealView {
        effective_status: deal_effective_status(&deal, now),
        business,
        deal,
    }
}
