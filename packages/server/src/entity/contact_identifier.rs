use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A contact channel of a client. Rewritten as a whole on every client update.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contact_identifier")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub client_id: i32,
    #[sea_orm(belongs_to, from = "client_id", to = "id")]
    pub client: HasOne<super::client::Entity>,

    #[sea_orm(unique_key = "account")]
    pub account_number: String,
    #[sea_orm(unique_key = "account")]
    pub account_type: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub info: Option<String>,

    /// 1-based, follows submission order.
    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
