use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::analytics::ReportFormat;

// ============================================================================
// ENUMS
// ============================================================================

/// Account role (also a Postgres enum)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    NormalUser,
    BusinessOwner,
    Admin,
}

/// Moderation status shared by businesses and reviews
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "moderation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Deal lifecycle status. `Expired` is only ever read, never written here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "deal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl From<ModerationStatus> for DealStatus {
    fn from(status: ModerationStatus) -> Self {
        match status {
            ModerationStatus::Pending => DealStatus::Pending,
            ModerationStatus::Approved => DealStatus::Approved,
            ModerationStatus::Rejected => DealStatus::Rejected,
        }
    }
}

// ============================================================================
// PROFILES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub deactivation_reason: Option<String>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Profile columns embedded in other listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 80))]
    pub display_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 1024))]
    pub avatar_url: Option<String>,
}

impl UpdateProfileRequest {
    pub fn apply_to_existing(&self, existing: &mut Profile) {
        if let Some(display_name) = &self.display_name {
            existing.display_name = Some(display_name.clone());
        }
        existing.phone = self
            .phone
            .as_ref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if let Some(avatar_url) = &self.avatar_url {
            existing.avatar_url = Some(avatar_url.clone());
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserStatusRequest {
    pub is_active: bool,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Admin user listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilters {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

/// Business report filters plus the output format
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub status: Option<ModerationStatus>,
    pub category_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_stats_period")]
    pub period: String,
}

fn default_stats_period() -> String {
    "month".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogActivityRequest {
    #[validate(length(min = 1, max = 100))]
    pub action: String,
    pub details: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub target_type: String,
    pub target_id: Option<Uuid>,
}

// ============================================================================
// CATEGORIES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&Category> for CategoryRef {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 2, max = 80))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl CreateCategoryRequest {
    pub fn into_new_category(self) -> NewCategory {
        NewCategory {
            id: Uuid::new_v4(),
            name: self.name,
            description: Some(self.description.unwrap_or_default()),
            parent_id: self.parent_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 2, max = 80))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl UpdateCategoryRequest {
    pub fn apply_to_existing(&self, existing: &mut Category) {
        if let Some(name) = &self.name {
            existing.name = name.clone();
        }
        if let Some(description) = &self.description {
            existing.description = Some(description.clone());
        }
        if self.parent_id.is_some() {
            existing.parent_id = self.parent_id;
        }
    }
}

// ============================================================================
// BUSINESSES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub category_id: Option<Uuid>,
    pub logo_url: Option<String>,
    pub cover_image: Option<String>,
    pub status: ModerationStatus,
    pub is_featured: bool,
    pub featured_order: Option<i32>,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Business {
    pub fn summary(&self) -> BusinessSummary {
        BusinessSummary {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
            logo_url: self.logo_url.clone(),
            owner_id: self.owner_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBusiness {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub category_id: Option<Uuid>,
    pub logo_url: Option<String>,
    pub cover_image: Option<String>,
    pub status: ModerationStatus,
    pub is_featured: bool,
    pub featured_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Business columns embedded in deal, review and bookmark listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessSummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub logo_url: Option<String>,
    pub owner_id: Uuid,
}

/// Payload sent by business owners to create or edit a business
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BusinessRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 5))]
    pub address: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 1024))]
    pub logo_url: Option<String>,
    #[validate(length(max = 1024))]
    pub cover_image: Option<String>,
}

impl BusinessRequest {
    pub fn into_new_business(self, owner_id: Uuid) -> NewBusiness {
        NewBusiness {
            id: Uuid::new_v4(),
            owner_id,
            name: self.name,
            description: self.description,
            address: self.address,
            phone: self.phone,
            email: self.email,
            website: self.website,
            category_id: self.category_id,
            logo_url: self.logo_url,
            cover_image: self.cover_image,
            status: ModerationStatus::Pending,
            is_featured: false,
            featured_order: None,
            created_at: Utc::now(),
        }
    }

    /// Editable columns only; status, ownership and featuring stay as stored.
    pub fn apply_to_existing(&self, existing: &mut Business) {
        existing.name = self.name.clone();
        existing.description = self.description.clone();
        existing.address = self.address.clone();
        existing.phone = self.phone.clone();
        existing.email = self.email.clone();
        existing.website = self.website.clone();
        existing.category_id = self.category_id;
        existing.logo_url = self.logo_url.clone();
        existing.cover_image = self.cover_image.clone();
    }
}

/// Business plus the aggregates every listing screen shows
#[derive(Debug, Clone, Serialize)]
pub struct BusinessListing {
    #[serde(flatten)]
    pub business: Business,
    pub category: Option<CategoryRef>,
    pub average_rating: f64,
    pub total_reviews: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BusinessDetail {
    #[serde(flatten)]
    pub business: Business,
    pub category: Option<CategoryRef>,
    pub reviews: Vec<ReviewWithAuthor>,
    pub deals: Vec<DealView>,
    pub average_rating: f64,
    pub total_reviews: usize,
}

/// Business awaiting verification, with its owner
#[derive(Debug, Clone, Serialize)]
pub struct PendingBusiness {
    #[serde(flatten)]
    pub business: Business,
    pub category: Option<CategoryRef>,
    pub owner: Option<ProfileSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerDashboard {
    pub total_businesses: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub active_deals: usize,
}

/// Ordering accepted by business search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusinessSort {
    NameAsc,
    NameDesc,
    #[default]
    CreatedAtDesc,
    FeaturedOrder,
}

impl BusinessSort {
    /// Unknown values fall back to newest first.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("name_asc") => BusinessSort::NameAsc,
            Some("name_desc") => BusinessSort::NameDesc,
            _ => BusinessSort::CreatedAtDesc,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub location: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    pub is_featured: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeaturedOrderRequest {
    pub featured_order: i32,
}

// ============================================================================
// BOOKMARKS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkedBusiness {
    #[serde(flatten)]
    pub listing: BusinessListing,
    pub bookmark_id: Uuid,
    pub bookmarked_at: DateTime<Utc>,
}

// ============================================================================
// DEALS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Deal {
    pub id: Uuid,
    pub business_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub discount_value: f64,
    pub conditions: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: DealStatus,
    pub is_featured: bool,
    pub rejection_reason: Option<String>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeal {
    pub id: Uuid,
    pub business_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub discount_value: f64,
    pub conditions: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: DealStatus,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DealRequest {
    #[validate(length(min = 3, max = 120))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub discount_value: f64,
    #[validate(length(max = 2000))]
    pub conditions: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl DealRequest {
    pub fn validate_business_rules(&self) -> Result<(), String> {
        if self.end_date <= self.start_date {
            return Err("End date must be after the start date".into());
        }
        Ok(())
    }

    pub fn into_new_deal(self, business_id: Uuid) -> NewDeal {
        NewDeal {
            id: Uuid::new_v4(),
            business_id,
            title: self.title,
            description: self.description,
            discount_value: self.discount_value,
            conditions: self
                .conditions
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            start_date: self.start_date,
            end_date: self.end_date,
            status: DealStatus::Pending,
            is_featured: false,
            created_at: Utc::now(),
        }
    }

    pub fn apply_to_existing(&self, existing: &mut Deal, now: DateTime<Utc>) {
        existing.title = self.title.clone();
        existing.description = self.description.clone();
        existing.discount_value = self.discount_value;
        existing.conditions = self
            .conditions
            .as_ref()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        existing.start_date = self.start_date;
        existing.end_date = self.end_date;
        existing.updated_at = Some(now);
    }
}

/// Deal as returned to clients, with the status derived at read time
#[derive(Debug, Clone, Serialize)]
pub struct DealView {
    #[serde(flatten)]
    pub deal: Deal,
    pub effective_status: DealStatus,
    pub business: Option<BusinessSummary>,
}

// ============================================================================
// REVIEWS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub photos: Vec<String>,
    pub status: ModerationStatus,
    pub rejection_reason: Option<String>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub photos: Vec<String>,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub author: Option<ProfileSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithBusiness {
    #[serde(flatten)]
    pub review: Review,
    pub business: Option<BusinessSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingReview {
    #[serde(flatten)]
    pub review: Review,
    pub author: Option<ProfileSummary>,
    pub business: Option<BusinessSummary>,
}

#[derive(Debug, Serialize)]
pub struct UploadedPhoto {
    pub url: String,
}

// ============================================================================
// MODERATION
// ============================================================================

/// Admin decision on a moderated row
#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub status: ModerationStatus,
    pub rejection_reason: Option<String>,
}

// ============================================================================
// ACTIVITY LOG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub details: Option<String>,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub details: Option<String>,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl NewActivityLog {
    pub fn new(
        user_id: Uuid,
        action: impl Into<String>,
        details: Option<String>,
        target_type: impl Into<String>,
        target_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            action: action.into(),
            details,
            target_type: target_type.into(),
            target_id,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// AUTH
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[validate(length(min = 1, max = 80))]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
}

// ============================================================================
// REQUEST/RESPONSE DTOs
// ============================================================================

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessFlag {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationQuery {
    /// Page is 1-based; limit is clamped to 1..=100 with a default of 20.
    pub fn resolve(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(20).clamp(1, 100);
        (page, limit)
    }
}

/// One page of an exact-count listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Saturates for huge page numbers, which then read as an empty page.
    pub fn offset(page: i64, limit: i64) -> i64 {
        (page.max(1) - 1).saturating_mul(limit.max(0))
    }
}
