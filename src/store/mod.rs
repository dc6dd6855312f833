//! Table-level data access. Each method is one independent round trip:
//! no transactions span calls and nothing is retried.

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    ActivityLog, Bookmark, Business, BusinessSort, Category, Deal, DealStatus, ModerationStatus,
    NewActivityLog, NewBusiness, NewCategory, NewDeal, NewReview, Profile, Review, Role,
};

#[derive(Debug, Clone, Default)]
pub struct BusinessQuery {
    pub ids: Option<Vec<Uuid>>,
    pub status: Option<ModerationStatus>,
    pub owner_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring of name or description.
    pub text: Option<String>,
    /// Case-insensitive substring of the address.
    pub location: Option<String>,
    pub featured: Option<bool>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub sort: BusinessSort,
}

/// Deals come back newest first.
#[derive(Debug, Clone, Default)]
pub struct DealQuery {
    pub business_ids: Option<Vec<Uuid>>,
    pub status: Option<DealStatus>,
    /// Keeps deals whose date range contains this instant.
    pub active_at: Option<DateTime<Utc>>,
    pub featured: Option<bool>,
    pub limit: Option<i64>,
}

/// Reviews come back newest first.
#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub business_ids: Option<Vec<Uuid>>,
    pub user_id: Option<Uuid>,
    pub status: Option<ModerationStatus>,
    pub created_from: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSortField {
    CreatedAt,
    Email,
    DisplayName,
    Role,
}

impl ProfileSortField {
    pub fn column(self) -> &'static str {
        match self {
            ProfileSortField::CreatedAt => "created_at",
            ProfileSortField::Email => "email",
            ProfileSortField::DisplayName => "display_name",
            ProfileSortField::Role => "role",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileQuery {
    pub role: Option<Role>,
    /// Case-insensitive substring of email or display name.
    pub search: Option<String>,
    pub sort: ProfileSortField,
    pub ascending: bool,
    pub offset: i64,
    pub limit: i64,
}

impl Default for ProfileQuery {
    fn default() -> Self {
        Self {
            role: None,
            search: None,
            sort: ProfileSortField::CreatedAt,
            ascending: false,
            offset: 0,
            limit: 20,
        }
    }
}

impl ProfileQuery {
    /// Parses `<field>_<asc|desc>`; unknown fields fall back to newest first.
    pub fn with_sort(mut self, sort_by: Option<&str>) -> Self {
        let parsed = sort_by.and_then(|value| {
            let (field, direction) = value.rsplit_once('_')?;
            let field = match field {
                "created_at" => ProfileSortField::CreatedAt,
                "email" => ProfileSortField::Email,
                "display_name" => ProfileSortField::DisplayName,
                "role" => ProfileSortField::Role,
                _ => return None,
            };
            Some((field, direction == "asc"))
        });
        let (sort, ascending) = parsed.unwrap_or((ProfileSortField::CreatedAt, false));
        self.sort = sort;
        self.ascending = ascending;
        self
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // Profiles
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error>;
    async fn get_profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, sqlx::Error>;
    /// Creates the row for a freshly registered account; an existing row with
    /// the same id is left as it is.
    async fn insert_profile(&self, profile: Profile) -> Result<Profile, sqlx::Error>;
    async fn update_profile(&self, profile: Profile) -> Result<Profile, sqlx::Error>;
    async fn list_profiles(&self, query: &ProfileQuery)
        -> Result<(Vec<Profile>, i64), sqlx::Error>;
    async fn count_profiles(&self) -> Result<i64, sqlx::Error>;
    async fn recent_profiles(&self, limit: i64) -> Result<Vec<Profile>, sqlx::Error>;
    async fn profile_signups_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, sqlx::Error>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error>;
    async fn insert_category(&self, category: NewCategory) -> Result<Category, sqlx::Error>;
    async fn update_category(&self, category: Category) -> Result<Category, sqlx::Error>;
    async fn delete_category(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn count_businesses_in_category(&self, id: Uuid) -> Result<i64, sqlx::Error>;
    async fn count_subcategories(&self, id: Uuid) -> Result<i64, sqlx::Error>;

    // Businesses
    async fn insert_business(&self, business: NewBusiness) -> Result<Business, sqlx::Error>;
    async fn get_business(&self, id: Uuid) -> Result<Option<Business>, sqlx::Error>;
    async fn update_business(&self, business: Business) -> Result<Business, sqlx::Error>;
    async fn list_businesses(&self, query: &BusinessQuery) -> Result<Vec<Business>, sqlx::Error>;

    // Deals
    async fn insert_deal(&self, deal: NewDeal) -> Result<Deal, sqlx::Error>;
    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>, sqlx::Error>;
    async fn update_deal(&self, deal: Deal) -> Result<Deal, sqlx::Error>;
    async fn delete_deal(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn list_deals(&self, query: &DealQuery) -> Result<Vec<Deal>, sqlx::Error>;

    // Reviews
    async fn insert_review(&self, review: NewReview) -> Result<Review, sqlx::Error>;
    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, sqlx::Error>;
    async fn find_review(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Review>, sqlx::Error>;
    async fn update_review(&self, review: Review) -> Result<Review, sqlx::Error>;
    async fn delete_review(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Vec<Review>, sqlx::Error>;

    // Bookmarks
    async fn insert_bookmark(&self, bookmark: Bookmark) -> Result<Bookmark, sqlx::Error>;
    async fn find_bookmark(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Bookmark>, sqlx::Error>;
    async fn delete_bookmark(&self, user_id: Uuid, business_id: Uuid)
        -> Result<bool, sqlx::Error>;
    async fn list_bookmarks(&self, user_id: Uuid) -> Result<Vec<Bookmark>, sqlx::Error>;

    // Activity log
    async fn insert_activity(&self, entry: NewActivityLog) -> Result<ActivityLog, sqlx::Error>;
    async fn list_activity(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ActivityLog>, i64), sqlx::Error>;
}
