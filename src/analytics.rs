//! Aggregations behind the dashboards and reports. Everything here works on
//! rows that were already fetched; nothing touches the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{DealStatus, ModerationStatus, Profile};

// ============================================================================
// RATINGS
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingSummary {
    pub total_reviews: usize,
    pub average_rating: f64,
    /// Always holds the keys 1 through 5.
    pub rating_distribution: BTreeMap<u8, usize>,
}

/// Mean and histogram over 1..=5 star ratings. Values outside that range are
/// ignored.
pub fn rating_summary<I>(ratings: I) -> RatingSummary
where
    I: IntoIterator<Item = i16>,
{
    let mut distribution: BTreeMap<u8, usize> = (1..=5).map(|star| (star, 0)).collect();
    let mut total = 0usize;
    let mut sum = 0i64;

    for rating in ratings {
        if !(1..=5).contains(&rating) {
            continue;
        }
        *distribution.entry(rating as u8).or_default() += 1;
        total += 1;
        sum += i64::from(rating);
    }

    let average_rating = if total == 0 {
        0.0
    } else {
        sum as f64 / total as f64
    };

    RatingSummary {
        total_reviews: total,
        average_rating,
        rating_distribution: distribution,
    }
}

/// `(average, count)` as shown on business listings.
pub fn average_rating(ratings: &[i16]) -> (f64, usize) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    (sum as f64 / ratings.len() as f64, ratings.len())
}

// ============================================================================
// STATUS COUNTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModerationCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl ModerationCounts {
    pub fn tally<I: IntoIterator<Item = ModerationStatus>>(statuses: I) -> Self {
        statuses
            .into_iter()
            .fold(Self::default(), |mut counts, status| {
                counts.total += 1;
                match status {
                    ModerationStatus::Pending => counts.pending += 1,
                    ModerationStatus::Approved => counts.approved += 1,
                    ModerationStatus::Rejected => counts.rejected += 1,
                }
                counts
            })
    }
}

/// Counts by stored deal status; `expired` only counts rows stored that way.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DealCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub expired: usize,
}

impl DealCounts {
    pub fn tally<I: IntoIterator<Item = DealStatus>>(statuses: I) -> Self {
        statuses
            .into_iter()
            .fold(Self::default(), |mut counts, status| {
                counts.total += 1;
                match status {
                    DealStatus::Pending => counts.pending += 1,
                    DealStatus::Approved => counts.approved += 1,
                    DealStatus::Rejected => counts.rejected += 1,
                    DealStatus::Expired => counts.expired += 1,
                }
                counts
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub recent: Vec<Profile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardAnalytics {
    pub user_stats: UserStats,
    pub business_stats: ModerationCounts,
    pub review_stats: ModerationCounts,
    pub deal_stats: DealCounts,
}

// ============================================================================
// TIME SERIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Week,
    Month,
    Year,
}

impl StatsPeriod {
    pub fn parse(value: &str) -> ServiceResult<Self> {
        match value {
            "week" => Ok(StatsPeriod::Week),
            "month" => Ok(StatsPeriod::Month),
            "year" => Ok(StatsPeriod::Year),
            _ => Err(ServiceError::validation(
                "Invalid period. Use \"week\", \"month\", or \"year\"",
            )),
        }
    }

    /// Start of the look-back window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let months_back = match self {
            StatsPeriod::Week => return now - Duration::days(7),
            StatsPeriod::Month => 1,
            StatsPeriod::Year => 12,
        };
        now.checked_sub_months(Months::new(months_back))
            .unwrap_or(now)
    }

    /// Day buckets (`YYYY-MM-DD`) for week/month, month buckets (`YYYY-MM`) for year.
    pub fn bucket_key(&self, at: DateTime<Utc>) -> String {
        match self {
            StatsPeriod::Week | StatsPeriod::Month => at.format("%Y-%m-%d").to_string(),
            StatsPeriod::Year => at.format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBucket {
    pub date: String,
    pub count: usize,
}

/// Counts per bucket, ascending by key. Only buckets with at least one row
/// are emitted; empty days or months are not filled in.
pub fn group_by_period<I>(timestamps: I, period: StatsPeriod) -> Vec<TimeBucket>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut grouped: BTreeMap<String, usize> = BTreeMap::new();
    for at in timestamps {
        *grouped.entry(period.bucket_key(at)).or_default() += 1;
    }
    grouped
        .into_iter()
        .map(|(date, count)| TimeBucket { date, count })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SystemStats {
    pub period: StatsPeriod,
    pub since: DateTime<Utc>,
    pub user_signups: Vec<TimeBucket>,
    pub business_registrations: Vec<TimeBucket>,
    pub business_approvals: Vec<TimeBucket>,
    pub reviews: Vec<TimeBucket>,
    pub approved_reviews: Vec<TimeBucket>,
}

// ============================================================================
// BUSINESS REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BusinessReportRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub status: ModerationStatus,
    pub owner: String,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
    pub total_reviews: usize,
    pub average_rating: f64,
}

const REPORT_HEADERS: [&str; 9] = [
    "id",
    "name",
    "category",
    "status",
    "owner",
    "owner_email",
    "created_at",
    "total_reviews",
    "average_rating",
];

/// Text fields are quoted, numbers are not; the header row is always written.
pub fn report_to_csv(rows: &[BusinessReportRow]) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(Vec::new());

    writer.write_record(REPORT_HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
