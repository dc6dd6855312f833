use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{db_error, ActivityLogger};
use crate::analytics::{rating_summary, RatingSummary};
use crate::clients::ObjectStorage;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    BusinessSummary, ModerationRequest, ModerationStatus, NewReview, PendingReview,
    ProfileSummary, Review, ReviewWithAuthor, ReviewWithBusiness, SubmitReviewRequest,
    UploadedPhoto,
};
use crate::moderation::{resubmit_review, ModerationDecision};
use crate::session::SessionContext;
use crate::store::{BusinessQuery, ReviewQuery, Store};

/// Folder inside the bucket that holds review photos.
const PHOTO_FOLDER: &str = "review-photos";

pub struct ReviewService {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
    activity: ActivityLogger,
    bucket: String,
}

impl ReviewService {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        activity: ActivityLogger,
        bucket: String,
    ) -> Self {
        Self {
            store,
            storage,
            activity,
            bucket,
        }
    }

    /// Approved reviews of a business with their authors, newest first.
    pub async fn list_for_business(&self, business_id: Uuid) -> ServiceResult<Vec<ReviewWithAuthor>> {
        let reviews = self
            .store
            .list_reviews(&ReviewQuery {
                business_ids: Some(vec![business_id]),
                status: Some(ModerationStatus::Approved),
                ..ReviewQuery::default()
            })
            .await
            .map_err(db_error("Error fetching business reviews"))?;

        let authors = self.authors(&reviews).await?;
        Ok(reviews
            .into_iter()
            .map(|review| ReviewWithAuthor {
                author: authors.get(&review.user_id).cloned(),
                review,
            })
            .collect())
    }

    /// One review per user and business: a second submission replaces the
    /// first and sends it back to moderation.
    pub async fn submit(
        &self,
        session: &SessionContext,
        business_id: Uuid,
        request: SubmitReviewRequest,
    ) -> ServiceResult<Review> {
        request.validate()?;

        self.store
            .get_business(business_id)
            .await
            .map_err(db_error("Error loading business for review"))?
            .ok_or(ServiceError::NotFound("Business"))?;

        let existing = self
            .store
            .find_review(session.user_id, business_id)
            .await
            .map_err(db_error("Error checking for an existing review"))?;

        match existing {
            Some(mut review) => {
                review.rating = request.rating;
                review.comment = request.comment;
                review.photos = request.photos;
                review.updated_at = Some(Utc::now());
                resubmit_review(&mut review);

                self.store
                    .update_review(review)
                    .await
                    .map_err(db_error("Error submitting review"))
            }
            None => self
                .store
                .insert_review(NewReview {
                    id: Uuid::new_v4(),
                    business_id,
                    user_id: session.user_id,
                    rating: request.rating,
                    comment: request.comment,
                    photos: request.photos,
                    status: ModerationStatus::Pending,
                    created_at: Utc::now(),
                })
                .await
                .map_err(db_error("Error submitting review")),
        }
    }

    pub async fn upload_photo(
        &self,
        session: &SessionContext,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ServiceResult<UploadedPhoto> {
        if bytes.is_empty() {
            return Err(ServiceError::validation("Photo upload is empty"));
        }

        let path = photo_path(session.user_id, file_name, Utc::now().timestamp_millis());
        self.storage
            .upload(
                &session.access_token,
                &self.bucket,
                &path,
                bytes,
                content_type,
            )
            .await
            .map_err(|err| {
                log::error!("Error uploading review photo: {err}");
                ServiceError::from(err)
            })?;

        Ok(UploadedPhoto {
            url: self.storage.public_url(&self.bucket, &path),
        })
    }

    pub async fn list_for_user(
        &self,
        session: &SessionContext,
    ) -> ServiceResult<Vec<ReviewWithBusiness>> {
        let reviews = self
            .store
            .list_reviews(&ReviewQuery {
                user_id: Some(session.user_id),
                ..ReviewQuery::default()
            })
            .await
            .map_err(db_error("Error fetching user reviews"))?;

        let businesses = self.businesses(&reviews).await?;
        Ok(reviews
            .into_iter()
            .map(|review| ReviewWithBusiness {
                business: businesses.get(&review.business_id).cloned(),
                review,
            })
            .collect())
    }

    /// Only the author may delete a review.
    pub async fn delete(&self, session: &SessionContext, review_id: Uuid) -> ServiceResult<()> {
        let review = self.load(review_id).await?;
        if review.user_id != session.user_id {
            return Err(ServiceError::forbidden(
                "You are not authorized to delete this review",
            ));
        }

        self.store
            .delete_review(review.id)
            .await
            .map_err(db_error("Error deleting review"))?;
        Ok(())
    }

    pub async fn list_pending(&self, admin: &SessionContext) -> ServiceResult<Vec<PendingReview>> {
        admin.require_admin()?;
        let reviews = self
            .store
            .list_reviews(&ReviewQuery {
                status: Some(ModerationStatus::Pending),
                ..ReviewQuery::default()
            })
            .await
            .map_err(db_error("Error fetching pending reviews"))?;

        let authors = self.authors(&reviews).await?;
        let businesses = self.businesses(&reviews).await?;
        Ok(reviews
            .into_iter()
            .map(|review| PendingReview {
                author: authors.get(&review.user_id).cloned(),
                business: businesses.get(&review.business_id).cloned(),
                review,
            })
            .collect())
    }

    pub async fn set_status(
        &self,
        admin: &SessionContext,
        id: Uuid,
        request: ModerationRequest,
    ) -> ServiceResult<Review> {
        admin.require_admin()?;
        let decision = ModerationDecision::from_request(request.status, request.rejection_reason)?;

        let mut review = self.load(id).await?;
        decision.apply_to_review(&mut review, Utc::now());
        let review = self
            .store
            .update_review(review)
            .await
            .map_err(db_error("Error updating review status"))?;

        log::info!(
            "Admin {} set review {} to {:?}",
            admin.user_id,
            review.id,
            review.status
        );
        self.activity
            .log(
                admin,
                &decision.action_name("review"),
                decision.rejection_reason().map(str::to_string),
                "review",
                Some(review.id),
            )
            .await;

        Ok(review)
    }

    /// Histogram and mean over the approved reviews of a business.
    pub async fn stats(&self, business_id: Uuid) -> ServiceResult<RatingSummary> {
        let reviews = self
            .store
            .list_reviews(&ReviewQuery {
                business_ids: Some(vec![business_id]),
                status: Some(ModerationStatus::Approved),
                ..ReviewQuery::default()
            })
            .await
            .map_err(db_error("Error fetching review statistics"))?;

        Ok(rating_summary(reviews.iter().map(|r| r.rating)))
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Review> {
        self.store
            .get_review(id)
            .await
            .map_err(db_error("Error fetching review"))?
            .ok_or(ServiceError::NotFound("Review"))
    }

    async fn authors(&self, reviews: &[Review]) -> ServiceResult<HashMap<Uuid, ProfileSummary>> {
        let ids: Vec<Uuid> = reviews.iter().map(|r| r.user_id).collect();
        Ok(self
            .store
            .get_profiles(&ids)
            .await
            .map_err(db_error("Error fetching review authors"))?
            .into_iter()
            .map(|p| (p.id, p.summary()))
            .collect())
    }

    async fn businesses(
        &self,
        reviews: &[Review],
    ) -> ServiceResult<HashMap<Uuid, BusinessSummary>> {
        if reviews.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .store
            .list_businesses(&BusinessQuery {
                ids: Some(reviews.iter().map(|r| r.business_id).collect()),
                ..BusinessQuery::default()
            })
            .await
            .map_err(db_error("Error fetching reviewed businesses"))?
            .iter()
            .map(|b| (b.id, b.summary()))
            .collect())
    }
}

/// `review-photos/{user}/{millis}.{ext}`; the extension is whatever follows
/// the last dot of the uploaded file name.
fn photo_path(user_id: Uuid, file_name: &str, millis: i64) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    format!("{PHOTO_FOLDER}/{user_id}/{millis}.{ext}")
}
