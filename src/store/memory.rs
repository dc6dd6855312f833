//! In-process `Store` for service tests. Filtering mirrors the SQL in
//! `database.rs` closely enough for the services' behaviour to be checked.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{BusinessQuery, DealQuery, ProfileQuery, ProfileSortField, ReviewQuery, Store};
use crate::models::{
    ActivityLog, Bookmark, Business, BusinessSort, Category, Deal, NewActivityLog, NewBusiness,
    NewCategory, NewDeal, NewReview, Profile, Review, Role,
};

#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    categories: Vec<Category>,
    businesses: Vec<Business>,
    deals: Vec<Deal>,
    reviews: Vec<Review>,
    bookmarks: Vec<Bookmark>,
    activity: Vec<ActivityLog>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_activity: bool,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose activity log writes always fail.
    pub fn with_failing_activity_log() -> Self {
        Self {
            tables: Mutex::default(),
            fail_activity: true,
        }
    }

    pub fn add_profile(&self, email: &str, role: Role) -> Profile {
        self.add_profile_at(email, role, Utc::now())
    }

    pub fn add_profile_at(&self, email: &str, role: Role, created_at: DateTime<Utc>) -> Profile {
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: Some(email.split('@').next().unwrap_or(email).to_string()),
            phone: None,
            avatar_url: None,
            role,
            is_active: true,
            deactivation_reason: None,
            deactivated_at: None,
            created_at,
        };
        self.tables.lock().unwrap().profiles.push(profile.clone());
        profile
    }

    pub fn put_business(&self, business: Business) {
        let mut tables = self.tables.lock().unwrap();
        tables.businesses.retain(|b| b.id != business.id);
        tables.businesses.push(business);
    }

    pub fn put_deal(&self, deal: Deal) {
        let mut tables = self.tables.lock().unwrap();
        tables.deals.retain(|d| d.id != deal.id);
        tables.deals.push(deal);
    }

    pub fn put_review(&self, review: Review) {
        let mut tables = self.tables.lock().unwrap();
        tables.reviews.retain(|r| r.id != review.id);
        tables.reviews.push(review);
    }

    pub fn activity(&self) -> Vec<ActivityLog> {
        self.tables.lock().unwrap().activity.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn get_profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(existing) = tables.profiles.iter().find(|p| p.id == profile.id) {
            return Ok(existing.clone());
        }
        tables.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, profile: Profile) -> Result<Profile, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = profile.clone();
        Ok(profile)
    }

    async fn list_profiles(
        &self,
        query: &ProfileQuery,
    ) -> Result<(Vec<Profile>, i64), sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Profile> = tables
            .profiles
            .iter()
            .filter(|p| query.role.map_or(true, |role| p.role == role))
            .filter(|p| {
                query.search.as_deref().map_or(true, |s| {
                    contains_ci(Some(&p.email), s) || contains_ci(p.display_name.as_deref(), s)
                })
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            let ordering = match query.sort {
                ProfileSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                ProfileSortField::Email => a.email.cmp(&b.email),
                ProfileSortField::DisplayName => a.display_name.cmp(&b.display_name),
                ProfileSortField::Role => (a.role as u8).cmp(&(b.role as u8)),
            };
            if query.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_profiles(&self) -> Result<i64, sqlx::Error> {
        Ok(self.tables.lock().unwrap().profiles.len() as i64)
    }

    async fn recent_profiles(&self, limit: i64) -> Result<Vec<Profile>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows = tables.profiles.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn profile_signups_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .filter(|p| p.created_at >= since)
            .map(|p| p.created_at)
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        let mut rows = self.tables.lock().unwrap().categories.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, sqlx::Error> {
        let row: Category = category.into();
        self.tables.lock().unwrap().categories.push(row.clone());
        Ok(row)
    }

    async fn update_category(&self, category: Category) -> Result<Category, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = category.clone();
        Ok(category)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok(tables.categories.len() != before)
    }

    async fn count_businesses_in_category(&self, id: Uuid) -> Result<i64, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .businesses
            .iter()
            .filter(|b| b.category_id == Some(id))
            .count() as i64)
    }

    async fn count_subcategories(&self, id: Uuid) -> Result<i64, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .categories
            .iter()
            .filter(|c| c.parent_id == Some(id))
            .count() as i64)
    }

    async fn insert_business(&self, business: NewBusiness) -> Result<Business, sqlx::Error> {
        let row: Business = business.into();
        self.tables.lock().unwrap().businesses.push(row.clone());
        Ok(row)
    }

    async fn get_business(&self, id: Uuid) -> Result<Option<Business>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.businesses.iter().find(|b| b.id == id).cloned())
    }

    async fn update_business(&self, business: Business) -> Result<Business, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .businesses
            .iter_mut()
            .find(|b| b.id == business.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = business.clone();
        Ok(business)
    }

    async fn list_businesses(&self, query: &BusinessQuery) -> Result<Vec<Business>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Business> = tables
            .businesses
            .iter()
            .filter(|b| query.ids.as_ref().map_or(true, |ids| ids.contains(&b.id)))
            .filter(|b| query.status.map_or(true, |s| b.status == s))
            .filter(|b| query.owner_id.map_or(true, |o| b.owner_id == o))
            .filter(|b| query.category_id.map_or(true, |c| b.category_id == Some(c)))
            .filter(|b| {
                query.text.as_deref().map_or(true, |t| {
                    contains_ci(Some(&b.name), t) || contains_ci(b.description.as_deref(), t)
                })
            })
            .filter(|b| {
                query
                    .location
                    .as_deref()
                    .map_or(true, |l| contains_ci(Some(&b.address), l))
            })
            .filter(|b| query.featured.map_or(true, |f| b.is_featured == f))
            .filter(|b| query.created_from.map_or(true, |from| b.created_at >= from))
            .filter(|b| query.created_to.map_or(true, |to| b.created_at <= to))
            .cloned()
            .collect();

        match query.sort {
            BusinessSort::NameAsc => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            BusinessSort::NameDesc => rows.sort_by(|a, b| b.name.cmp(&a.name)),
            BusinessSort::CreatedAtDesc => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            // NULLS LAST, as in Postgres ascending order.
            BusinessSort::FeaturedOrder => rows.sort_by_key(|b| (b.featured_order.is_none(), b.featured_order)),
        }
        Ok(rows)
    }

    async fn insert_deal(&self, deal: NewDeal) -> Result<Deal, sqlx::Error> {
        let row: Deal = deal.into();
        self.tables.lock().unwrap().deals.push(row.clone());
        Ok(row)
    }

    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.deals.iter().find(|d| d.id == id).cloned())
    }

    async fn update_deal(&self, deal: Deal) -> Result<Deal, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .deals
            .iter_mut()
            .find(|d| d.id == deal.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = deal.clone();
        Ok(deal)
    }

    async fn delete_deal(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.deals.len();
        tables.deals.retain(|d| d.id != id);
        Ok(tables.deals.len() != before)
    }

    async fn list_deals(&self, query: &DealQuery) -> Result<Vec<Deal>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Deal> = tables
            .deals
            .iter()
            .filter(|d| {
                query
                    .business_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&d.business_id))
            })
            .filter(|d| query.status.map_or(true, |s| d.status == s))
            .filter(|d| {
                query
                    .active_at
                    .map_or(true, |at| d.start_date <= at && d.end_date >= at)
            })
            .filter(|d| query.featured.map_or(true, |f| d.is_featured == f))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, sqlx::Error> {
        let row: Review = review.into();
        self.tables.lock().unwrap().reviews.push(row.clone());
        Ok(row)
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn find_review(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Review>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reviews
            .iter()
            .find(|r| r.user_id == user_id && r.business_id == business_id)
            .cloned())
    }

    async fn update_review(&self, review: Review) -> Result<Review, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .reviews
            .iter_mut()
            .find(|r| r.id == review.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *slot = review.clone();
        Ok(review)
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() != before)
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Vec<Review>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| {
                query
                    .business_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&r.business_id))
            })
            .filter(|r| query.user_id.map_or(true, |u| r.user_id == u))
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .filter(|r| query.created_from.map_or(true, |from| r.created_at >= from))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_bookmark(&self, bookmark: Bookmark) -> Result<Bookmark, sqlx::Error> {
        self.tables.lock().unwrap().bookmarks.push(bookmark.clone());
        Ok(bookmark)
    }

    async fn find_bookmark(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Bookmark>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .bookmarks
            .iter()
            .find(|b| b.user_id == user_id && b.business_id == business_id)
            .cloned())
    }

    async fn delete_bookmark(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.bookmarks.len();
        tables
            .bookmarks
            .retain(|b| !(b.user_id == user_id && b.business_id == business_id));
        Ok(tables.bookmarks.len() != before)
    }

    async fn list_bookmarks(&self, user_id: Uuid) -> Result<Vec<Bookmark>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Bookmark> = tables
            .bookmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_activity(&self, entry: NewActivityLog) -> Result<ActivityLog, sqlx::Error> {
        if self.fail_activity {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let row: ActivityLog = entry.into();
        self.tables.lock().unwrap().activity.push(row.clone());
        Ok(row)
    }

    async fn list_activity(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ActivityLog>, i64), sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows = tables.activity.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

impl From<NewCategory> for Category {
    fn from(category: NewCategory) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            parent_id: category.parent_id,
            created_at: category.created_at,
        }
    }
}

impl From<NewBusiness> for Business {
    fn from(business: NewBusiness) -> Self {
        Self {
            id: business.id,
            owner_id: business.owner_id,
            name: business.name,
            description: business.description,
            address: business.address,
            phone: business.phone,
            email: business.email,
            website: business.website,
            category_id: business.category_id,
            logo_url: business.logo_url,
            cover_image: business.cover_image,
            status: business.status,
            is_featured: business.is_featured,
            featured_order: business.featured_order,
            rejection_reason: None,
            reviewed_at: None,
            created_at: business.created_at,
        }
    }
}

impl From<NewDeal> for Deal {
    fn from(deal: NewDeal) -> Self {
        Self {
            id: deal.id,
            business_id: deal.business_id,
            title: deal.title,
            description: deal.description,
            discount_value: deal.discount_value,
            conditions: deal.conditions,
            start_date: deal.start_date,
            end_date: deal.end_date,
            status: deal.status,
            is_featured: deal.is_featured,
            rejection_reason: None,
            moderated_at: None,
            created_at: deal.created_at,
            updated_at: None,
        }
    }
}

impl From<NewReview> for Review {
    fn from(review: NewReview) -> Self {
        Self {
            id: review.id,
            business_id: review.business_id,
            user_id: review.user_id,
            rating: review.rating,
            comment: review.comment,
            photos: review.photos,
            status: review.status,
            rejection_reason: None,
            moderated_at: None,
            created_at: review.created_at,
            updated_at: None,
        }
    }
}

impl From<NewActivityLog> for ActivityLog {
    fn from(entry: NewActivityLog) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            action: entry.action,
            details: entry.details,
            target_type: entry.target_type,
            target_id: entry.target_id,
            created_at: entry.created_at,
        }
    }
}
