use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// Bucket size: `day` (default), `week` or `month`.
    #[param(example = "week")]
    pub period: Option<String>,
    /// Number of most recent buckets to return (1-366, default 30).
    #[param(example = 12)]
    pub limit: Option<u64>,
}

/// Bucket width accepted by Postgres `date_trunc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

pub fn parse_analytics_query(query: &AnalyticsQuery) -> Result<(Period, u64), AppError> {
    let period = match query.period.as_deref().unwrap_or("day") {
        "day" => Period::Day,
        "week" => Period::Week,
        "month" => Period::Month,
        _ => {
            return Err(AppError::Validation(
                "period doit valoir day, week ou month".into(),
            ));
        }
    };
    Ok((period, query.limit.unwrap_or(30).clamp(1, 366)))
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsBucket {
    /// Start of the bucket.
    pub period_start: DateTime<Utc>,
    pub created: u64,
    pub updated: u64,
    /// Soft and permanent deletions together.
    pub deleted: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AnalyticsResponse {
    #[schema(example = "week")]
    pub period: String,
    /// Newest bucket first. Buckets without activity are omitted.
    pub buckets: Vec<AnalyticsBucket>,
}
