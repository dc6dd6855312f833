use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{db_error, load_owned_business, ActivityLogger};
use crate::analytics::{average_rating, ModerationCounts};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    Bookmark, BookmarkedBusiness, Business, BusinessDetail, BusinessListing, BusinessRequest,
    BusinessSort, Category, CategoryRef, DealStatus, DealView, ModerationRequest,
    ModerationStatus, OwnerDashboard, PendingBusiness, ReviewWithAuthor, SearchQuery,
};
use crate::moderation::{deal_effective_status, deal_is_active, ModerationDecision};
use crate::session::SessionContext;
use crate::store::{BusinessQuery, DealQuery, ReviewQuery, Store};

/// Featured businesses without an explicit position go to the end.
const DEFAULT_FEATURED_ORDER: i32 = 99;

pub struct BusinessService {
    store: Arc<dyn Store>,
    activity: ActivityLogger,
}

impl BusinessService {
    pub fn new(store: Arc<dyn Store>, activity: ActivityLogger) -> Self {
        Self { store, activity }
    }

    // ------------------------------------------------------------------------
    // Public directory
    // ------------------------------------------------------------------------

    pub async fn list_approved(&self) -> ServiceResult<Vec<BusinessListing>> {
        let businesses = self
            .store
            .list_businesses(&BusinessQuery {
                status: Some(ModerationStatus::Approved),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching businesses"))?;

        build_listings(self.store.as_ref(), businesses).await
    }

    pub async fn search(&self, query: SearchQuery) -> ServiceResult<Vec<BusinessListing>> {
        let text = query.q.filter(|q| !q.trim().is_empty());
        let location = query.location.filter(|l| !l.trim().is_empty());

        let businesses = self
            .store
            .list_businesses(&BusinessQuery {
                status: Some(ModerationStatus::Approved),
                category_id: query.category_id,
                text,
                location,
                sort: BusinessSort::parse(query.sort_by.as_deref()),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error searching businesses"))?;

        build_listings(self.store.as_ref(), businesses).await
    }

    /// Public detail page. Anything not approved reads as missing.
    pub async fn get_approved(&self, id: Uuid, now: DateTime<Utc>) -> ServiceResult<BusinessDetail> {
        let business = self
            .store
            .get_business(id)
            .await
            .map_err(db_error("Error fetching business details"))?
            .filter(|b| b.status == ModerationStatus::Approved)
            .ok_or(ServiceError::NotFound("Business"))?;

        let category = self.category_ref(business.category_id).await?;

        let reviews = self
            .store
            .list_reviews(&ReviewQuery {
                business_ids: Some(vec![business.id]),
                status: Some(ModerationStatus::Approved),
                ..ReviewQuery::default()
            })
            .await
            .map_err(db_error("Error fetching business reviews"))?;

        let author_ids: Vec<Uuid> = reviews.iter().map(|r| r.user_id).collect();
        let authors: HashMap<Uuid, _> = self
            .store
            .get_profiles(&author_ids)
            .await
            .map_err(db_error("Error fetching review authors"))?
            .into_iter()
            .map(|p| (p.id, p.summary()))
            .collect();

        let ratings: Vec<i16> = reviews.iter().map(|r| r.rating).collect();
        let (average, total) = average_rating(&ratings);

        let reviews = reviews
            .into_iter()
            .map(|review| ReviewWithAuthor {
                author: authors.get(&review.user_id).cloned(),
                review,
            })
            .collect();

        let deals = self
            .store
            .list_deals(&DealQuery {
                business_ids: Some(vec![business.id]),
                status: Some(DealStatus::Approved),
                ..DealQuery::default()
            })
            .await
            .map_err(db_error("Error fetching business deals"))?
            .into_iter()
            .map(|deal| DealView {
                effective_status: deal_effective_status(&deal, now),
                business: Some(business.summary()),
                deal,
            })
            .collect();

        Ok(BusinessDetail {
            business,
            category,
            reviews,
            deals,
            average_rating: average,
            total_reviews: total,
        })
    }

    pub async fn categories(&self) -> ServiceResult<Vec<Category>> {
        self.store
            .list_categories()
            .await
            .map_err(db_error("Error fetching business categories"))
    }

    // ------------------------------------------------------------------------
    // Owner operations
    // ------------------------------------------------------------------------

    pub async fn create(
        &self,
        session: &SessionContext,
        request: BusinessRequest,
    ) -> ServiceResult<Business> {
        let business = self
            .store
            .insert_business(request.into_new_business(session.user_id))
            .await
            .map_err(db_error("Error creating business"))?;

        log::info!("Business {} submitted by {}", business.id, session.user_id);
        Ok(business)
    }

    pub async fn update(
        &self,
        session: &SessionContext,
        id: Uuid,
        request: BusinessRequest,
    ) -> ServiceResult<Business> {
        let mut business = load_owned_business(self.store.as_ref(), session, id).await?;
        request.apply_to_existing(&mut business);

        self.store
            .update_business(business)
            .await
            .map_err(db_error("Error updating business"))
    }

    /// Every business of the caller, whatever its status.
    pub async fn list_for_owner(
        &self,
        session: &SessionContext,
    ) -> ServiceResult<Vec<BusinessListing>> {
        let businesses = self.owned_businesses(session.user_id).await?;
        build_listings(self.store.as_ref(), businesses).await
    }

    pub async fn owner_dashboard(
        &self,
        session: &SessionContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<OwnerDashboard> {
        let businesses = self.owned_businesses(session.user_id).await?;
        let counts = ModerationCounts::tally(businesses.iter().map(|b| b.status));

        let active_deals = if businesses.is_empty() {
            0
        } else {
            self.store
                .list_deals(&DealQuery {
                    business_ids: Some(businesses.iter().map(|b| b.id).collect()),
                    ..DealQuery::default()
                })
                .await
                .map_err(db_error("Error fetching owner deals"))?
                .iter()
                .filter(|deal| deal_is_active(deal, now))
                .count()
        };

        Ok(OwnerDashboard {
            total_businesses: counts.total,
            pending: counts.pending,
            approved: counts.approved,
            rejected: counts.rejected,
            active_deals,
        })
    }

    async fn owned_businesses(&self, owner_id: Uuid) -> ServiceResult<Vec<Business>> {
        self.store
            .list_businesses(&BusinessQuery {
                owner_id: Some(owner_id),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching owner businesses"))
    }

    // ------------------------------------------------------------------------
    // Moderation (admin)
    // ------------------------------------------------------------------------

    pub async fn list_pending(&self, admin: &SessionContext) -> ServiceResult<Vec<PendingBusiness>> {
        self.verification_requests(admin, ModerationStatus::Pending)
            .await
    }

    /// Businesses in `status`, newest first, with category and owner.
    pub async fn verification_requests(
        &self,
        admin: &SessionContext,
        status: ModerationStatus,
    ) -> ServiceResult<Vec<PendingBusiness>> {
        admin.require_admin()?;

        let businesses = self
            .store
            .list_businesses(&BusinessQuery {
                status: Some(status),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching business verification requests"))?;

        let categories = self.category_refs().await?;
        let owner_ids: Vec<Uuid> = businesses.iter().map(|b| b.owner_id).collect();
        let owners: HashMap<Uuid, _> = self
            .store
            .get_profiles(&owner_ids)
            .await
            .map_err(db_error("Error fetching business owners"))?
            .into_iter()
            .map(|p| (p.id, p.summary()))
            .collect();

        Ok(businesses
            .into_iter()
            .map(|business| PendingBusiness {
                category: business
                    .category_id
                    .and_then(|id| categories.get(&id).cloned()),
                owner: owners.get(&business.owner_id).cloned(),
                business,
            })
            .collect())
    }

    pub async fn set_status(
        &self,
        admin: &SessionContext,
        id: Uuid,
        request: ModerationRequest,
    ) -> ServiceResult<Business> {
        admin.require_admin()?;
        let decision = ModerationDecision::from_request(request.status, request.rejection_reason)?;

        let mut business = self
            .store
            .get_business(id)
            .await
            .map_err(db_error("Error loading business for moderation"))?
            .ok_or(ServiceError::NotFound("Business"))?;

        decision.apply_to_business(&mut business, Utc::now());
        let business = self
            .store
            .update_business(business)
            .await
            .map_err(db_error("Error updating business status"))?;

        log::info!(
            "Admin {} set business {} to {:?}",
            admin.user_id,
            business.id,
            business.status
        );
        self.activity
            .log(
                admin,
                &decision.action_name("business"),
                decision.rejection_reason().map(str::to_string),
                "business",
                Some(business.id),
            )
            .await;

        Ok(business)
    }

    // ------------------------------------------------------------------------
    // Featured businesses
    // ------------------------------------------------------------------------

    pub async fn list_featured(&self) -> ServiceResult<Vec<BusinessListing>> {
        let businesses = self
            .store
            .list_businesses(&BusinessQuery {
                status: Some(ModerationStatus::Approved),
                featured: Some(true),
                sort: BusinessSort::FeaturedOrder,
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching featured businesses"))?;

        build_listings(self.store.as_ref(), businesses).await
    }

    pub async fn toggle_featured(
        &self,
        admin: &SessionContext,
        id: Uuid,
        is_featured: bool,
    ) -> ServiceResult<Business> {
        admin.require_admin()?;
        let mut business = self.load(id).await?;
        business.is_featured = is_featured;
        business.featured_order = is_featured.then_some(DEFAULT_FEATURED_ORDER);

        self.store
            .update_business(business)
            .await
            .map_err(db_error("Error toggling business feature status"))
    }

    pub async fn set_featured_order(
        &self,
        admin: &SessionContext,
        id: Uuid,
        featured_order: i32,
    ) -> ServiceResult<Business> {
        admin.require_admin()?;
        let mut business = self.load(id).await?;
        business.featured_order = Some(featured_order);

        self.store
            .update_business(business)
            .await
            .map_err(db_error("Error updating featured business order"))
    }

    // ------------------------------------------------------------------------
    // Bookmarks
    // ------------------------------------------------------------------------

    pub async fn add_bookmark(
        &self,
        session: &SessionContext,
        business_id: Uuid,
    ) -> ServiceResult<Bookmark> {
        self.load(business_id).await?;

        let existing = self
            .store
            .find_bookmark(session.user_id, business_id)
            .await
            .map_err(db_error("Error checking bookmark status"))?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("Business is already bookmarked".into()));
        }

        self.store
            .insert_bookmark(Bookmark {
                id: Uuid::new_v4(),
                user_id: session.user_id,
                business_id,
                created_at: Utc::now(),
            })
            .await
            .map_err(db_error("Error adding business to bookmarks"))
    }

    /// Removing a bookmark that does not exist still succeeds.
    pub async fn remove_bookmark(
        &self,
        session: &SessionContext,
        business_id: Uuid,
    ) -> ServiceResult<()> {
        self.store
            .delete_bookmark(session.user_id, business_id)
            .await
            .map_err(db_error("Error removing business from bookmarks"))?;
        Ok(())
    }

    pub async fn list_bookmarks(
        &self,
        session: &SessionContext,
    ) -> ServiceResult<Vec<BookmarkedBusiness>> {
        let bookmarks = self
            .store
            .list_bookmarks(session.user_id)
            .await
            .map_err(db_error("Error fetching bookmarked businesses"))?;

        let businesses = self
            .store
            .list_businesses(&BusinessQuery {
                ids: Some(bookmarks.iter().map(|b| b.business_id).collect()),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching bookmarked businesses"))?;

        let mut listings: HashMap<Uuid, BusinessListing> =
            build_listings(self.store.as_ref(), businesses)
                .await?
                .into_iter()
                .map(|listing| (listing.business.id, listing))
                .collect();

        // Keep bookmark order (newest first).
        Ok(bookmarks
            .into_iter()
            .filter_map(|bookmark| {
                listings
                    .remove(&bookmark.business_id)
                    .map(|listing| BookmarkedBusiness {
                        listing,
                        bookmark_id: bookmark.id,
                        bookmarked_at: bookmark.created_at,
                    })
            })
            .collect())
    }

    pub async fn is_bookmarked(
        &self,
        session: &SessionContext,
        business_id: Uuid,
    ) -> ServiceResult<bool> {
        Ok(self
            .store
            .find_bookmark(session.user_id, business_id)
            .await
            .map_err(db_error("Error checking bookmark status"))?
            .is_some())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn load(&self, id: Uuid) -> ServiceResult<Business> {
        self.store
            .get_business(id)
            .await
            .map_err(db_error("Error fetching business"))?
            .ok_or(ServiceError::NotFound("Business"))
    }

    async fn category_ref(&self, id: Option<Uuid>) -> ServiceResult<Option<CategoryRef>> {
        let Some(id) = id else {
            return Ok(None);
        };
        Ok(self
            .store
            .get_category(id)
            .await
            .map_err(db_error("Error fetching category"))?
            .as_ref()
            .map(CategoryRef::from))
    }

    async fn category_refs(&self) -> ServiceResult<HashMap<Uuid, CategoryRef>> {
        category_refs(self.store.as_ref()).await
    }
}

pub(crate) async fn category_refs(store: &dyn Store) -> ServiceResult<HashMap<Uuid, CategoryRef>> {
    Ok(store
        .list_categories()
        .await
        .map_err(db_error("Error fetching categories"))?
        .iter()
        .map(|c| (c.id, CategoryRef::from(c)))
        .collect())
}

/// Attaches category and rating aggregates. Ratings cover every review of
/// the business regardless of moderation status.
pub(crate) async fn build_listings(
    store: &dyn Store,
    businesses: Vec<Business>,
) -> ServiceResult<Vec<BusinessListing>> {
    if businesses.is_empty() {
        return Ok(Vec::new());
    }

    let categories = category_refs(store).await?;
    let reviews = store
        .list_reviews(&ReviewQuery {
            business_ids: Some(businesses.iter().map(|b| b.id).collect()),
            ..ReviewQuery::default()
        })
        .await
        .map_err(db_error("Error fetching business ratings"))?;

    let mut ratings: HashMap<Uuid, Vec<i16>> = HashMap::new();
    for review in &reviews {
        ratings
            .entry(review.business_id)
            .or_default()
            .push(review.rating);
    }

    Ok(businesses
        .into_iter()
        .map(|business| {
            let (average, total) = ratings
                .get(&business.id)
                .map(|r| average_rating(r))
                .unwrap_or((0.0, 0));
            BusinessListing {
                category: business
                    .category_id
                    .and_then(|id| categories.get(&id).cloned()),
                average_rating: average,
                total_reviews: total,
                business,
            }
        })
        .collect())
}
