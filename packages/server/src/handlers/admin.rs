use std::collections::HashMap;

use axum::{Json, extract::State};
use common::Priority;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{client, client_history, contact_identifier, search, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::admin::{PriorityCount, StatsResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Admin",
    operation_id = "getStats",
    summary = "Dashboard counters",
    description = "Admin only. Row counts for the main tables and active clients per priority.",
    responses(
        (status = 200, description = "Counters", body = StatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    auth_user.require_admin()?;
    let db = &state.db;

    let active_clients = client::Entity::find()
        .filter(client::Column::DeletedAt.is_null())
        .count(db)
        .await?;
    let deleted_clients = client::Entity::find()
        .filter(client::Column::DeletedAt.is_not_null())
        .count(db)
        .await?;

    let by_priority: HashMap<Priority, i64> = client::Entity::find()
        .filter(client::Column::DeletedAt.is_null())
        .select_only()
        .column(client::Column::Priority)
        .column_as(client::Column::Id.count(), "count")
        .group_by(client::Column::Priority)
        .into_tuple::<(Priority, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    Ok(Json(StatsResponse {
        users: user::Entity::find().count(db).await?,
        active_clients,
        deleted_clients,
        contact_identifiers: contact_identifier::Entity::find().count(db).await?,
        searches: search::Entity::find().count(db).await?,
        history_entries: client_history::Entity::find().count(db).await?,
        clients_by_priority: Priority::ALL
            .iter()
            .map(|&priority| PriorityCount {
                priority,
                count: std::cmp::Ord::max(by_priority.get(&priority).copied().unwrap_or(0), 0) as u64,
            })
            .collect(),
    }))
}
