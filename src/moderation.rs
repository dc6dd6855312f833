//! Moderation state transitions for businesses, deals and reviews.
//!
//! Rows are created `pending`; only an admin decision moves them to
//! `approved` or `rejected`. Edits to deals and reviews send them back to
//! `pending`. Deal expiry is derived from the date range and never stored.

use chrono::{DateTime, Utc};

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Business, Deal, DealStatus, ModerationStatus, Review};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationDecision {
    Approve,
    Reject { reason: String },
}

impl ModerationDecision {
    /// Rejections need a non-blank reason; `pending` is not a decision.
    pub fn from_request(
        status: ModerationStatus,
        rejection_reason: Option<String>,
    ) -> ServiceResult<Self> {
        match status {
            ModerationStatus::Approved => Ok(ModerationDecision::Approve),
            ModerationStatus::Rejected => {
                let reason = rejection_reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| {
                        ServiceError::validation("A rejection reason is required when rejecting")
                    })?;
                Ok(ModerationDecision::Reject { reason })
            }
            ModerationStatus::Pending => Err(ServiceError::validation(
                "Moderation status must be approved or rejected",
            )),
        }
    }

    pub fn status(&self) -> ModerationStatus {
        match self {
            ModerationDecision::Approve => ModerationStatus::Approved,
            ModerationDecision::Reject { .. } => ModerationStatus::Rejected,
        }
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ModerationDecision::Approve => None,
            ModerationDecision::Reject { reason } => Some(reason),
        }
    }

    /// Activity log action name, e.g. `business_approved`.
    pub fn action_name(&self, target_type: &str) -> String {
        match self {
            ModerationDecision::Approve => format!("{target_type}_approved"),
            ModerationDecision::Reject { .. } => format!("{target_type}_rejected"),
        }
    }

    pub fn apply_to_business(&self, business: &mut Business, now: DateTime<Utc>) {
        business.status = self.status();
        business.reviewed_at = Some(now);
        if let Some(reason) = self.rejection_reason() {
            business.rejection_reason = Some(reason.to_string());
        }
    }

    pub fn apply_to_deal(&self, deal: &mut Deal, now: DateTime<Utc>) {
        deal.status = self.status().into();
        deal.moderated_at = Some(now);
        if let Some(reason) = self.rejection_reason() {
            deal.rejection_reason = Some(reason.to_string());
        }
    }

    pub fn apply_to_review(&self, review: &mut Review, now: DateTime<Utc>) {
        review.status = self.status();
        review.moderated_at = Some(now);
        if let Some(reason) = self.rejection_reason() {
            review.rejection_reason = Some(reason.to_string());
        }
    }
}

/// Any content change to a deal re-enters moderation.
pub fn resubmit_deal(deal: &mut Deal) {
    deal.status = DealStatus::Pending;
}

/// Any content change to a review re-enters moderation.
pub fn resubmit_review(review: &mut Review) {
    review.status = ModerationStatus::Pending;
}

pub fn deal_is_active(deal: &Deal, now: DateTime<Utc>) -> bool {
    deal.status == DealStatus::Approved && deal.start_date <= now && deal.end_date >= now
}

/// Status shown to clients: approved deals past their end date read as expired.
pub fn deal_effective_status(deal: &Deal, now: DateTime<Utc>) -> DealStatus {
    match deal.status {
        DealStatus::Approved if deal.end_date < now => DealStatus::Expired,
        stored => stored,
    }
}
