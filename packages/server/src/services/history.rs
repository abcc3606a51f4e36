use std::collections::HashMap;

use chrono::Utc;
use common::HistoryAction;
use sea_orm::*;

use crate::entity::{client_history, user};

/// Append one audit row. Rows are never updated or deleted afterwards.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    client_id: i32,
    user_id: i32,
    action: HistoryAction,
    changes: serde_json::Value,
) -> Result<client_history::Model, DbErr> {
    tracing::debug!(client_id, user_id, action = %action, "Recording client history");
    client_history::ActiveModel {
        client_id: Set(client_id),
        user_id: Set(user_id),
        action: Set(action),
        changes: Set(changes),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

/// History of a client, newest first, with the actor's username when the account still exists.
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    client_id: i32,
) -> Result<Vec<(client_history::Model, Option<String>)>, DbErr> {
    let rows = client_history::Entity::find()
        .filter(client_history::Column::ClientId.eq(client_id))
        .order_by_desc(client_history::Column::CreatedAt)
        .order_by_desc(client_history::Column::Id)
        .all(conn)
        .await?;

    let user_ids: Vec<i32> = rows.iter().map(|r| r.user_id).collect();
    let usernames: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Username)
        .into_tuple::<(i32, String)>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    Ok(rows
        .into_iter()
        .map(|row| {
            let username = usernames.get(&row.user_id).cloned();
            (row, username)
        })
        .collect())
}
