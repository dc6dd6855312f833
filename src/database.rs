use std::{borrow::Cow, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, Executor, PgPool, Postgres, QueryBuilder,
};
use uuid::Uuid;

use crate::models::{
    ActivityLog, Bookmark, Business, BusinessSort, Category, Deal, NewActivityLog, NewBusiness,
    NewCategory, NewDeal, NewReview, Profile, Review,
};
use crate::store::{BusinessQuery, DealQuery, ProfileQuery, ReviewQuery, Store};

const PROFILE_COLUMNS: &str = "id, email, display_name, phone, avatar_url, role, is_active, \
     deactivation_reason, deactivated_at, created_at";

const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, created_at";

const BUSINESS_COLUMNS: &str = "id, owner_id, name, description, address, phone, email, website, \
     category_id, logo_url, cover_image, status, is_featured, featured_order, rejection_reason, \
     reviewed_at, created_at";

const DEAL_COLUMNS: &str = "id, business_id, title, description, discount_value, conditions, \
     start_date, end_date, status, is_featured, rejection_reason, moderated_at, created_at, \
     updated_at";

const REVIEW_COLUMNS: &str = "id, business_id, user_id, rating, comment, photos, status, \
     rejection_reason, moderated_at, created_at, updated_at";

const ACTIVITY_COLUMNS: &str = "id, user_id, action, details, target_type, target_id, created_at";

fn like_pattern(value: &str) -> String {
    format!("%{}%", value.trim())
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = match Self::pool_options().connect(database_url).await {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(database_url).await?;
                Self::pool_options().connect(database_url).await?
            }
            Err(err) => return Err(err),
        };

        // Run embedded migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    fn pool_options() -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .test_before_acquire(true)
    }
}

#[async_trait]
impl Store for Database {
    // ------------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------------

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_profiles(&self, ids: &[Uuid]) -> Result<Vec<Profile>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (id, email, display_name, role, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET id = profiles.id
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(profile.role)
        .bind(profile.is_active)
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_profile(&self, profile: Profile) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET display_name = $2,
                phone = $3,
                avatar_url = $4,
                role = $5,
                is_active = $6,
                deactivation_reason = $7,
                deactivated_at = $8
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.id)
        .bind(&profile.display_name)
        .bind(&profile.phone)
        .bind(&profile.avatar_url)
        .bind(profile.role)
        .bind(profile.is_active)
        .bind(&profile.deactivation_reason)
        .bind(profile.deactivated_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_profiles(
        &self,
        query: &ProfileQuery,
    ) -> Result<(Vec<Profile>, i64), sqlx::Error> {
        fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProfileQuery) {
            if let Some(role) = query.role {
                builder.push(" AND role = ").push_bind(role);
            }
            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = like_pattern(search);
                builder
                    .push(" AND (email ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR display_name ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles WHERE TRUE");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE TRUE"
        ));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY ")
            .push(query.sort.column())
            .push(if query.ascending { " ASC" } else { " DESC" })
            .push(" OFFSET ")
            .push_bind(query.offset)
            .push(" LIMIT ")
            .push_bind(query.limit);

        let rows = select
            .build_query_as::<Profile>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn count_profiles(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await
    }

    async fn recent_profiles(&self, limit: i64) -> Result<Vec<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn profile_signups_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
        sqlx::query_scalar("SELECT created_at FROM profiles WHERE created_at >= $1")
            .bind(since)
            .fetch_all(&self.pool)
            .await
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (id, name, description, parent_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_category(&self, category: Category) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
            SET name = $2, description = $3, parent_id = $4
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_businesses_in_category(&self, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM businesses WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_subcategories(&self, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE parent_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    // ------------------------------------------------------------------------
    // Businesses
    // ------------------------------------------------------------------------

    async fn insert_business(&self, business: NewBusiness) -> Result<Business, sqlx::Error> {
        let NewBusiness {
            id,
            owner_id,
            name,
            description,
            address,
            phone,
            email,
            website,
            category_id,
            logo_url,
            cover_image,
            status,
            is_featured,
            featured_order,
            created_at,
        } = business;

        sqlx::query_as::<_, Business>(&format!(
            r#"
            INSERT INTO businesses (
                id,
                owner_id,
                name,
                description,
                address,
                phone,
                email,
                website,
                category_id,
                logo_url,
                cover_image,
                status,
                is_featured,
                featured_order,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {BUSINESS_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .bind(address)
        .bind(phone)
        .bind(email)
        .bind(website)
        .bind(category_id)
        .bind(logo_url)
        .bind(cover_image)
        .bind(status)
        .bind(is_featured)
        .bind(featured_order)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_business(&self, id: Uuid) -> Result<Option<Business>, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_business(&self, business: Business) -> Result<Business, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            r#"
            UPDATE businesses
            SET name = $2,
                description = $3,
                address = $4,
                phone = $5,
                email = $6,
                website = $7,
                category_id = $8,
                logo_url = $9,
                cover_image = $10,
                status = $11,
                is_featured = $12,
                featured_order = $13,
                rejection_reason = $14,
                reviewed_at = $15
            WHERE id = $1
            RETURNING {BUSINESS_COLUMNS}
            "#
        ))
        .bind(business.id)
        .bind(&business.name)
        .bind(&business.description)
        .bind(&business.address)
        .bind(&business.phone)
        .bind(&business.email)
        .bind(&business.website)
        .bind(business.category_id)
        .bind(&business.logo_url)
        .bind(&business.cover_image)
        .bind(business.status)
        .bind(business.is_featured)
        .bind(business.featured_order)
        .bind(&business.rejection_reason)
        .bind(business.reviewed_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_businesses(&self, query: &BusinessQuery) -> Result<Vec<Business>, sqlx::Error> {
        if matches!(&query.ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE TRUE"
        ));

        if let Some(ids) = &query.ids {
            builder.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(owner_id) = query.owner_id {
            builder.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(category_id) = query.category_id {
            builder.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
            let pattern = like_pattern(text);
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(location) = query.location.as_deref().filter(|l| !l.trim().is_empty()) {
            builder
                .push(" AND address ILIKE ")
                .push_bind(like_pattern(location));
        }
        if let Some(featured) = query.featured {
            builder.push(" AND is_featured = ").push_bind(featured);
        }
        if let Some(from) = query.created_from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = query.created_to {
            builder.push(" AND created_at <= ").push_bind(to);
        }

        builder.push(match query.sort {
            BusinessSort::NameAsc => " ORDER BY name ASC",
            BusinessSort::NameDesc => " ORDER BY name DESC",
            BusinessSort::CreatedAtDesc => " ORDER BY created_at DESC",
            BusinessSort::FeaturedOrder => " ORDER BY featured_order ASC NULLS LAST",
        });

        builder
            .build_query_as::<Business>()
            .fetch_all(&self.pool)
            .await
    }

    // ------------------------------------------------------------------------
    // Deals
    // ------------------------------------------------------------------------

    async fn insert_deal(&self, deal: NewDeal) -> Result<Deal, sqlx::Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            INSERT INTO deals (
                id,
                business_id,
                title,
                description,
                discount_value,
                conditions,
                start_date,
                end_date,
                status,
                is_featured,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(deal.id)
        .bind(deal.business_id)
        .bind(&deal.title)
        .bind(&deal.description)
        .bind(deal.discount_value)
        .bind(&deal.conditions)
        .bind(deal.start_date)
        .bind(deal.end_date)
        .bind(deal.status)
        .bind(deal.is_featured)
        .bind(deal.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>, sqlx::Error> {
        sqlx::query_as::<_, Deal>(&format!("SELECT {DEAL_COLUMNS} FROM deals WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_deal(&self, deal: Deal) -> Result<Deal, sqlx::Error> {
        sqlx::query_as::<_, Deal>(&format!(
            r#"
            UPDATE deals
            SET title = $2,
                description = $3,
                discount_value = $4,
                conditions = $5,
                start_date = $6,
                end_date = $7,
                status = $8,
                is_featured = $9,
                rejection_reason = $10,
                moderated_at = $11,
                updated_at = $12
            WHERE id = $1
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(deal.id)
        .bind(&deal.title)
        .bind(&deal.description)
        .bind(deal.discount_value)
        .bind(&deal.conditions)
        .bind(deal.start_date)
        .bind(deal.end_date)
        .bind(deal.status)
        .bind(deal.is_featured)
        .bind(&deal.rejection_reason)
        .bind(deal.moderated_at)
        .bind(deal.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_deal(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_deals(&self, query: &DealQuery) -> Result<Vec<Deal>, sqlx::Error> {
        if matches!(&query.business_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {DEAL_COLUMNS} FROM deals WHERE TRUE"));

        if let Some(ids) = &query.business_ids {
            builder
                .push(" AND business_id = ANY(")
                .push_bind(ids.clone())
                .push(")");
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(at) = query.active_at {
            builder
                .push(" AND start_date <= ")
                .push_bind(at)
                .push(" AND end_date >= ")
                .push_bind(at);
        }
        if let Some(featured) = query.featured {
            builder.push(" AND is_featured = ").push_bind(featured);
        }

        builder.push(" ORDER BY created_at DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        builder.build_query_as::<Deal>().fetch_all(&self.pool).await
    }

    // ------------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------------

    async fn insert_review(&self, review: NewReview) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (id, business_id, user_id, rating, comment, photos, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.id)
        .bind(review.business_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(&review.photos)
        .bind(review.status)
        .bind(review.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_review(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 AND business_id = $2"
        ))
        .bind(user_id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_review(&self, review: Review) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews
            SET rating = $2,
                comment = $3,
                photos = $4,
                status = $5,
                rejection_reason = $6,
                moderated_at = $7,
                updated_at = $8
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(&review.photos)
        .bind(review.status)
        .bind(&review.rejection_reason)
        .bind(review.moderated_at)
        .bind(review.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_review(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Vec<Review>, sqlx::Error> {
        if matches!(&query.business_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE TRUE"
        ));

        if let Some(ids) = &query.business_ids {
            builder
                .push(" AND business_id = ANY(")
                .push_bind(ids.clone())
                .push(")");
        }
        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = query.created_from {
            builder.push(" AND created_at >= ").push_bind(from);
        }

        builder.push(" ORDER BY created_at DESC");

        builder
            .build_query_as::<Review>()
            .fetch_all(&self.pool)
            .await
    }

    // ------------------------------------------------------------------------
    // Bookmarks
    // ------------------------------------------------------------------------

    async fn insert_bookmark(&self, bookmark: Bookmark) -> Result<Bookmark, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            INSERT INTO bookmarks (id, user_id, business_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, business_id, created_at
            "#,
        )
        .bind(bookmark.id)
        .bind(bookmark.user_id)
        .bind(bookmark.business_id)
        .bind(bookmark.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_bookmark(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Bookmark>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            SELECT id, user_id, business_id, created_at
            FROM bookmarks
            WHERE user_id = $1 AND business_id = $2
            "#,
        )
        .bind(user_id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_bookmark(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND business_id = $2")
            .bind(user_id)
            .bind(business_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_bookmarks(&self, user_id: Uuid) -> Result<Vec<Bookmark>, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            SELECT id, user_id, business_id, created_at
            FROM bookmarks
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    // ------------------------------------------------------------------------
    // Activity log
    // ------------------------------------------------------------------------

    async fn insert_activity(&self, entry: NewActivityLog) -> Result<ActivityLog, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(&format!(
            r#"
            INSERT INTO activity_logs (id, user_id, action, details, target_type, target_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.details)
        .bind(&entry.target_type)
        .bind(entry.target_id)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_activity(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ActivityLog>, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, ActivityLog>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activity_logs
            ORDER BY created_at DESC
            OFFSET $1
            LIMIT $2
            "#
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }
}

async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    let options: PgConnectOptions = database_url.parse()?;
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    // Already on the maintenance database.
    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");
    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let escaped_name = database_name.replace('"', "\"\"");
    let create_stmt = format!("CREATE DATABASE \"{}\"", escaped_name);

    match connection.execute(create_stmt.as_str()).await {
        Ok(_) => {
            log::info!("Created database '{}'", database_name);
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            log::info!("Database '{}' already exists", database_name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}
