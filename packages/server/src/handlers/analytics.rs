use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use common::HistoryAction;
use sea_orm::*;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::analytics::*;
use crate::state::AppState;

#[derive(Debug, FromQueryResult)]
struct ActivityRow {
    bucket: DateTime<Utc>,
    action: HistoryAction,
    count: i64,
}

/// Newest `$2` buckets of width `$1`, counted per action.
const ACTIVITY_SQL: &str = r#"
WITH recent AS (
    SELECT date_trunc($1, created_at) AS bucket
    FROM client_history
    GROUP BY 1
    ORDER BY 1 DESC
    LIMIT $2
)
SELECT date_trunc($1, h.created_at) AS bucket, h.action, COUNT(*) AS count
FROM client_history h
WHERE date_trunc($1, h.created_at) IN (SELECT bucket FROM recent)
GROUP BY 1, 2
"#;

#[utoipa::path(
    get,
    path = "",
    tag = "Analytics",
    operation_id = "getAnalytics",
    summary = "Client activity over time",
    description = "Admin only. Counts history actions per day, week or month, newest bucket first.",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Activity buckets", body = AnalyticsResponse),
        (status = 400, description = "Unknown period (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn get_analytics(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    auth_user.require_admin()?;
    let (period, limit) = parse_analytics_query(&query)?;

    let rows = ActivityRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        ACTIVITY_SQL,
        [period.as_str().into(), (limit as i64).into()],
    ))
    .all(&state.db)
    .await?;

    let mut buckets: BTreeMap<DateTime<Utc>, AnalyticsBucket> = BTreeMap::new();
    for row in rows {
        let bucket = buckets.entry(row.bucket).or_insert(AnalyticsBucket {
            period_start: row.bucket,
            created: 0,
            updated: 0,
            deleted: 0,
        });
        let count = std::cmp::Ord::max(row.count, 0) as u64;
        match row.action {
            HistoryAction::Create => bucket.created += count,
            HistoryAction::Update => bucket.updated += count,
            HistoryAction::Delete | HistoryAction::DeletePermanent => bucket.deleted += count,
        }
    }

    Ok(Json(AnalyticsResponse {
        period: period.as_str().to_string(),
        buckets: buckets.into_values().rev().collect(),
    }))
}
