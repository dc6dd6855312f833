use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{db_error, ActivityLogger};
use crate::analytics::{
    average_rating, group_by_period, report_to_csv, BusinessReportRow, DashboardAnalytics,
    DealCounts, ModerationCounts, ReportFormat, StatsPeriod, SystemStats, UserStats,
};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    ActivityLog, Category, CreateCategoryRequest, LogActivityRequest, ModerationStatus, Page,
    PaginationQuery, Profile, ReportQuery, SuccessFlag, UpdateCategoryRequest, UserFilters,
    UserStatusRequest,
};
use crate::session::SessionContext;
use crate::store::{BusinessQuery, DealQuery, ProfileQuery, ReviewQuery, Store};

const RECENT_SIGNUPS: i64 = 5;

/// Business report in the requested format
#[derive(Debug, Clone, PartialEq)]
pub enum BusinessReport {
    Rows(Vec<BusinessReportRow>),
    Csv(String),
}

pub struct AdminService {
    store: Arc<dyn Store>,
    activity: ActivityLogger,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>, activity: ActivityLogger) -> Self {
        Self { store, activity }
    }

    pub async fn dashboard(&self, admin: &SessionContext) -> ServiceResult<DashboardAnalytics> {
        admin.require_admin()?;

        let total = self
            .store
            .count_profiles()
            .await
            .map_err(db_error("Error counting users"))?;
        let recent = self
            .store
            .recent_profiles(RECENT_SIGNUPS)
            .await
            .map_err(db_error("Error fetching recent signups"))?;
        let businesses = self
            .store
            .list_businesses(&BusinessQuery::default())
            .await
            .map_err(db_error("Error fetching business statistics"))?;
        let reviews = self
            .store
            .list_reviews(&ReviewQuery::default())
            .await
            .map_err(db_error("Error fetching review statistics"))?;
        let deals = self
            .store
            .list_deals(&DealQuery::default())
            .await
            .map_err(db_error("Error fetching deal statistics"))?;

        Ok(DashboardAnalytics {
            user_stats: UserStats { total, recent },
            business_stats: ModerationCounts::tally(businesses.iter().map(|b| b.status)),
            review_stats: ModerationCounts::tally(reviews.iter().map(|r| r.status)),
            deal_stats: DealCounts::tally(deals.iter().map(|d| d.status)),
        })
    }

    pub async fn list_users(
        &self,
        admin: &SessionContext,
        filters: UserFilters,
        pagination: PaginationQuery,
    ) -> ServiceResult<Page<Profile>> {
        admin.require_admin()?;
        let (page, limit) = pagination.resolve();

        let query = ProfileQuery {
            role: filters.role,
            search: filters.search.filter(|s| !s.trim().is_empty()),
            offset: Page::<Profile>::offset(page, limit),
            limit,
            ..ProfileQuery::default()
        }
        .with_sort(filters.sort_by.as_deref());

        let (users, total) = self
            .store
            .list_profiles(&query)
            .await
            .map_err(db_error("Error fetching users"))?;

        Ok(Page::new(users, total, page, limit))
    }

    /// Activates or deactivates an account. Reactivation clears the
    /// deactivation reason and timestamp.
    pub async fn set_user_active(
        &self,
        admin: &SessionContext,
        user_id: Uuid,
        request: UserStatusRequest,
    ) -> ServiceResult<Profile> {
        admin.require_admin()?;

        let mut profile = self
            .store
            .get_profile(user_id)
            .await
            .map_err(db_error("Error loading user"))?
            .ok_or(ServiceError::NotFound("Profile"))?;

        profile.is_active = request.is_active;
        if request.is_active {
            profile.deactivation_reason = None;
            profile.deactivated_at = None;
        } else {
            profile.deactivation_reason = request.reason.clone();
            profile.deactivated_at = Some(Utc::now());
        }

        let profile = self
            .store
            .update_profile(profile)
            .await
            .map_err(db_error("Error updating user status"))?;

        let action = if request.is_active {
            "user_activated"
        } else {
            "user_deactivated"
        };
        log::info!("Admin {} {} user {}", admin.user_id, action, profile.id);
        self.activity
            .log(admin, action, request.reason, "user", Some(profile.id))
            .await;

        Ok(profile)
    }

    pub async fn list_categories(&self, admin: &SessionContext) -> ServiceResult<Vec<Category>> {
        admin.require_admin()?;
        self.store
            .list_categories()
            .await
            .map_err(db_error("Error fetching categories"))
    }

    pub async fn create_category(
        &self,
        admin: &SessionContext,
        request: CreateCategoryRequest,
    ) -> ServiceResult<Category> {
        admin.require_admin()?;
        request.validate()?;
        if let Some(parent_id) = request.parent_id {
            self.category(parent_id).await?;
        }

        self.store
            .insert_category(request.into_new_category())
            .await
            .map_err(db_error("Error creating category"))
    }

    pub async fn update_category(
        &self,
        admin: &SessionContext,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> ServiceResult<Category> {
        admin.require_admin()?;
        request.validate()?;
        if request.parent_id == Some(id) {
            return Err(ServiceError::validation("A category cannot be its own parent"));
        }

        let mut category = self.category(id).await?;
        request.apply_to_existing(&mut category);
        self.store
            .update_category(category)
            .await
            .map_err(db_error("Error updating category"))
    }

    /// Refused while any business or subcategory still points at the category.
    pub async fn delete_category(&self, admin: &SessionContext, id: Uuid) -> ServiceResult<()> {
        admin.require_admin()?;
        self.category(id).await?;

        let in_use = self
            .store
            .count_businesses_in_category(id)
            .await
            .map_err(db_error("Error checking category usage"))?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category is used by {in_use} business(es)"
            )));
        }

        let children = self
            .store
            .count_subcategories(id)
            .await
            .map_err(db_error("Error checking subcategories"))?;
        if children > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category has {children} subcategories"
            )));
        }

        self.store
            .delete_category(id)
            .await
            .map_err(db_error("Error deleting category"))?;
        Ok(())
    }

    pub async fn activity_logs(
        &self,
        admin: &SessionContext,
        pagination: PaginationQuery,
    ) -> ServiceResult<Page<ActivityLog>> {
        admin.require_admin()?;
        let (page, limit) = pagination.resolve();
        let (entries, total) = self
            .store
            .list_activity(Page::<ActivityLog>::offset(page, limit), limit)
            .await
            .map_err(db_error("Error fetching activity logs"))?;
        Ok(Page::new(entries, total, page, limit))
    }

    /// Records an audit entry on behalf of the caller. Write failures are
    /// reported as `success: false`, never as an error.
    pub async fn log_activity(
        &self,
        admin: &SessionContext,
        request: LogActivityRequest,
    ) -> ServiceResult<SuccessFlag> {
        admin.require_admin()?;
        request.validate()?;
        let success = self
            .activity
            .log(
                admin,
                &request.action,
                request.details,
                &request.target_type,
                request.target_id,
            )
            .await;
        Ok(SuccessFlag { success })
    }

    pub async fn business_report(
        &self,
        admin: &SessionContext,
        query: ReportQuery,
    ) -> ServiceResult<BusinessReport> {
        admin.require_admin()?;

        let businesses = self
            .store
            .list_businesses(&BusinessQuery {
                status: query.status,
                category_id: query.category_id,
                created_from: query.start_date,
                created_to: query.end_date,
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error generating business report"))?;

        let categories: HashMap<Uuid, String> = self
            .store
            .list_categories()
            .await
            .map_err(db_error("Error generating business report"))?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let owner_ids: Vec<Uuid> = businesses.iter().map(|b| b.owner_id).collect();
        let owners: HashMap<Uuid, Profile> = self
            .store
            .get_profiles(&owner_ids)
            .await
            .map_err(db_error("Error generating business report"))?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut ratings: HashMap<Uuid, Vec<i16>> = HashMap::new();
        if !businesses.is_empty() {
            let reviews = self
                .store
                .list_reviews(&ReviewQuery {
                    business_ids: Some(businesses.iter().map(|b| b.id).collect()),
                    ..ReviewQuery::default()
                })
                .await
                .map_err(db_error("Error generating business report"))?;
            for review in reviews {
                ratings.entry(review.business_id).or_default().push(review.rating);
            }
        }

        let rows: Vec<BusinessReportRow> = businesses
            .into_iter()
            .map(|business| {
                let (average, total) =
                    average_rating(ratings.get(&business.id).map_or(&[][..], Vec::as_slice));
                let owner = owners.get(&business.owner_id);
                BusinessReportRow {
                    id: business.id,
                    name: business.name,
                    category: business
                        .category_id
                        .and_then(|id| categories.get(&id).cloned())
                        .unwrap_or_else(|| "Uncategorized".to_string()),
                    status: business.status,
                    owner: owner
                        .and_then(|p| p.display_name.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    owner_email: owner
                        .map(|p| p.email.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    created_at: business.created_at,
                    total_reviews: total,
                    average_rating: average,
                }
            })
            .collect();

        match query.format {
            ReportFormat::Json => Ok(BusinessReport::Rows(rows)),
            ReportFormat::Csv => report_to_csv(&rows).map(BusinessReport::Csv).map_err(|err| {
                log::error!("Error writing business report CSV: {err}");
                ServiceError::from(err)
            }),
        }
    }

    /// Time series over `[now - period, now]`. Approvals are counted by the
    /// creation date of businesses that are approved now.
    pub async fn system_stats(
        &self,
        admin: &SessionContext,
        period: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<SystemStats> {
        admin.require_admin()?;
        let period = StatsPeriod::parse(period)?;
        let since = period.window_start(now);

        let signups = self
            .store
            .profile_signups_since(since)
            .await
            .map_err(db_error("Error fetching system stats"))?;
        let businesses = self
            .store
            .list_businesses(&BusinessQuery {
                created_from: Some(since),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching system stats"))?;
        let reviews = self
            .store
            .list_reviews(&ReviewQuery {
                created_from: Some(since),
                ..ReviewQuery::default()
            })
            .await
            .map_err(db_error("Error fetching system stats"))?;

        let approved = |status: ModerationStatus| status == ModerationStatus::Approved;

        Ok(SystemStats {
            period,
            since,
            user_signups: group_by_period(signups, period),
            business_registrations: group_by_period(
                businesses.iter().map(|b| b.created_at),
                period,
            ),
            business_approvals: group_by_period(
                businesses
                    .iter()
                    .filter(|b| approved(b.status))
                    .map(|b| b.created_at),
                period,
            ),
            reviews: group_by_period(reviews.iter().map(|r| r.created_at), period),
            approved_reviews: group_by_period(
                reviews
                    .iter()
                    .filter(|r| approved(r.status))
                    .map(|r| r.created_at),
                period,
            ),
        })
    }

    async fn category(&self, id: Uuid) -> ServiceResult<Category> {
        self.store
            .get_category(id)
            .await
            .map_err(db_error("Error fetching category"))?
            .ok_or(ServiceError::NotFound("Category"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::{DealStatus, Role};
    use crate::services::testing::{
        deal_request, new_store, seed_business, seed_deal, seed_review, session_for,
    };
    use crate::store::memory::MemoryStore;

    fn service(store: &Arc<MemoryStore>) -> AdminService {
        let store: Arc<dyn Store> = store.clone();
        AdminService::new(store.clone(), ActivityLogger::new(store))
    }

    fn all_pages() -> PaginationQuery {
        PaginationQuery {
            page: None,
            limit: None,
        }
    }

    #[actix_rt::test]
    async fn non_admins_are_refused() {
        let store = new_store();
        let owner = store.add_profile("owner@example.com", Role::BusinessOwner);
        let admin = service(&store);

        let err = admin.dashboard(&session_for(&owner)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = admin
            .list_users(&session_for(&owner), UserFilters::default(), all_pages())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[actix_rt::test]
    async fn dashboard_counts_by_status() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);
        let owner = store.add_profile("owner@example.com", Role::BusinessOwner);
        let user = store.add_profile("user@example.com", Role::NormalUser);
        let cafe = seed_business(&store, &owner, "Cafe", ModerationStatus::Approved);
        seed_business(&store, &owner, "Bakery", ModerationStatus::Pending);
        seed_business(&store, &owner, "Bar", ModerationStatus::Rejected);
        seed_review(&store, &user, &cafe, 5, ModerationStatus::Approved);
        let now = Utc::now();
        let window = deal_request(now - Duration::days(1), now + Duration::days(1));
        seed_deal(&store, &cafe, window.clone(), DealStatus::Expired);
        seed_deal(&store, &cafe, window, DealStatus::Pending);

        let dashboard = service(&store).dashboard(&session_for(&admin)).await.unwrap();

        assert_eq!(dashboard.user_stats.total, 3);
        assert_eq!(dashboard.user_stats.recent.len(), 3);
        assert_eq!(dashboard.business_stats.total, 3);
        assert_eq!(dashboard.business_stats.pending, 1);
        assert_eq!(dashboard.business_stats.approved, 1);
        assert_eq!(dashboard.business_stats.rejected, 1);
        assert_eq!(dashboard.review_stats.approved, 1);
        assert_eq!(dashboard.deal_stats.total, 2);
        assert_eq!(dashboard.deal_stats.expired, 1);
    }

    #[actix_rt::test]
    async fn user_listing_pages_with_exact_total() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);
        for i in 0..4 {
            store.add_profile(&format!("user{i}@example.com"), Role::NormalUser);
        }

        let page = service(&store)
            .list_users(
                &session_for(&admin),
                UserFilters {
                    role: Some(Role::NormalUser),
                    ..UserFilters::default()
                },
                PaginationQuery {
                    page: Some(2),
                    limit: Some(3),
                },
            )
            .await
            .unwrap();

        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert!(page.items.iter().all(|p| p.role == Role::NormalUser));
    }

    #[actix_rt::test]
    async fn deactivation_records_reason_and_reactivation_clears_it() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);
        let user = store.add_profile("user@example.com", Role::NormalUser);
        let admin_svc = service(&store);
        let admin = session_for(&admin);

        let deactivated = admin_svc
            .set_user_active(
                &admin,
                user.id,
                UserStatusRequest {
                    is_active: false,
                    reason: Some("Spam".into()),
                },
            )
            .await
            .unwrap();
        assert!(!deactivated.is_active);
        assert_eq!(deactivated.deactivation_reason.as_deref(), Some("Spam"));
        assert!(deactivated.deactivated_at.is_some());

        let reactivated = admin_svc
            .set_user_active(
                &admin,
                user.id,
                UserStatusRequest {
                    is_active: true,
                    reason: None,
                },
            )
            .await
            .unwrap();
        assert!(reactivated.is_active);
        assert!(reactivated.deactivation_reason.is_none());
        assert!(reactivated.deactivated_at.is_none());

        let actions: Vec<String> = store.activity().into_iter().map(|a| a.action).collect();
        assert!(actions.contains(&"user_deactivated".to_string()));
        assert!(actions.contains(&"user_activated".to_string()));
    }

    #[actix_rt::test]
    async fn status_change_survives_audit_failure() {
        let store = Arc::new(MemoryStore::with_failing_activity_log());
        let admin = store.add_profile("admin@example.com", Role::Admin);
        let user = store.add_profile("user@example.com", Role::NormalUser);

        let profile = service(&store)
            .set_user_active(
                &session_for(&admin),
                user.id,
                UserStatusRequest {
                    is_active: false,
                    reason: None,
                },
            )
            .await
            .unwrap();

        assert!(!profile.is_active);
        assert!(store.activity().is_empty());
    }

    #[actix_rt::test]
    async fn category_delete_is_refused_while_in_use() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);
        let owner = store.add_profile("owner@example.com", Role::BusinessOwner);
        let admin_svc = service(&store);
        let admin = session_for(&admin);

        let food = admin_svc
            .create_category(
                &admin,
                CreateCategoryRequest {
                    name: "Food".into(),
                    description: None,
                    parent_id: None,
                },
            )
            .await
            .unwrap();
        let bakeries = admin_svc
            .create_category(
                &admin,
                CreateCategoryRequest {
                    name: "Bakeries".into(),
                    description: None,
                    parent_id: Some(food.id),
                },
            )
            .await
            .unwrap();

        let err = admin_svc.delete_category(&admin, food.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let mut bakery = seed_business(&store, &owner, "Bakery", ModerationStatus::Approved);
        bakery.category_id = Some(bakeries.id);
        store.put_business(bakery.clone());
        let err = admin_svc
            .delete_category(&admin, bakeries.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        bakery.category_id = None;
        store.put_business(bakery);
        admin_svc.delete_category(&admin, bakeries.id).await.unwrap();
        admin_svc.delete_category(&admin, food.id).await.unwrap();
        assert!(admin_svc.list_categories(&admin).await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn category_cannot_parent_itself() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);
        let admin_svc = service(&store);
        let admin = session_for(&admin);
        let food = admin_svc
            .create_category(
                &admin,
                CreateCategoryRequest {
                    name: "Food".into(),
                    description: None,
                    parent_id: None,
                },
            )
            .await
            .unwrap();

        let err = admin_svc
            .update_category(
                &admin,
                food.id,
                UpdateCategoryRequest {
                    name: None,
                    description: None,
                    parent_id: Some(food.id),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_rt::test]
    async fn report_fills_defaults_and_averages_all_reviews() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);
        let owner = store.add_profile("owner@example.com", Role::BusinessOwner);
        let cafe = seed_business(&store, &owner, "Cafe", ModerationStatus::Approved);
        for (i, (rating, status)) in [
            (5, ModerationStatus::Approved),
            (2, ModerationStatus::Pending),
        ]
        .into_iter()
        .enumerate()
        {
            let user = store.add_profile(&format!("u{i}@example.com"), Role::NormalUser);
            seed_review(&store, &user, &cafe, rating, status);
        }

        let report = service(&store)
            .business_report(&session_for(&admin), ReportQuery::default())
            .await
            .unwrap();

        let BusinessReport::Rows(rows) = report else {
            panic!("expected JSON rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Uncategorized");
        assert_eq!(rows[0].owner, "owner");
        assert_eq!(rows[0].owner_email, "owner@example.com");
        assert_eq!(rows[0].total_reviews, 2);
        assert!((rows[0].average_rating - 3.5).abs() < f64::EPSILON);
    }

    #[actix_rt::test]
    async fn report_filters_by_status_and_renders_csv() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);
        let owner = store.add_profile("owner@example.com", Role::BusinessOwner);
        seed_business(&store, &owner, "Joe's \"Best\" Diner", ModerationStatus::Pending);
        seed_business(&store, &owner, "Approved Place", ModerationStatus::Approved);

        let report = service(&store)
            .business_report(
                &session_for(&admin),
                ReportQuery {
                    status: Some(ModerationStatus::Pending),
                    format: ReportFormat::Csv,
                    ..ReportQuery::default()
                },
            )
            .await
            .unwrap();

        let BusinessReport::Csv(text) = report else {
            panic!("expected CSV text");
        };
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"owner_email\""));
        assert!(lines[1].contains("\"Joe's \"\"Best\"\" Diner\""));
        assert!(!text.contains("Approved Place"));
    }

    #[actix_rt::test]
    async fn system_stats_window_and_buckets() {
        let store = new_store();
        let admin = store.add_profile_at(
            "admin@example.com",
            Role::Admin,
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        );
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        store.add_profile_at(
            "a@example.com",
            Role::NormalUser,
            Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap(),
        );
        store.add_profile_at(
            "b@example.com",
            Role::NormalUser,
            Utc.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap(),
        );
        store.add_profile_at(
            "c@example.com",
            Role::NormalUser,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        );

        let stats = service(&store)
            .system_stats(&session_for(&admin), "week", now)
            .await
            .unwrap();

        assert_eq!(stats.period, StatsPeriod::Week);
        assert_eq!(stats.since, now - Duration::days(7));
        assert_eq!(stats.user_signups.len(), 1);
        assert_eq!(stats.user_signups[0].date, "2024-03-09");
        assert_eq!(stats.user_signups[0].count, 2);
        assert!(stats.business_registrations.is_empty());
    }

    #[actix_rt::test]
    async fn system_stats_rejects_unknown_period() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);

        let err = service(&store)
            .system_stats(&session_for(&admin), "decade", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_rt::test]
    async fn activity_log_pages_newest_first() {
        let store = new_store();
        let admin = store.add_profile("admin@example.com", Role::Admin);
        let admin_svc = service(&store);
        let admin = session_for(&admin);

        for action in ["first", "second", "third"] {
            let logged = admin_svc
                .log_activity(
                    &admin,
                    LogActivityRequest {
                        action: action.into(),
                        details: None,
                        target_type: "system".into(),
                        target_id: None,
                    },
                )
                .await
                .unwrap();
            assert!(logged.success);
        }

        let page = admin_svc
            .activity_logs(
                &admin,
                PaginationQuery {
                    page: Some(1),
                    limit: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
    }
}
