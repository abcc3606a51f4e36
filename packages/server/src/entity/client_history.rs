use common::HistoryAction;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only audit row. `client_id` has no foreign key so rows outlive the client.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "client_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub client_id: i32,
    pub user_id: i32,
    #[sea_orm(indexed)]
    pub action: HistoryAction,

    /// Change set for `UPDATE`, full snapshot otherwise.
    #[sea_orm(column_type = "JsonBinary")]
    pub changes: serde_json::Value,

    #[sea_orm(indexed)]
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
