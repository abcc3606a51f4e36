use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A reference and time window that one or more clients can be attached to.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "search")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "reference")]
    pub general_reference: String,
    /// Empty string when the search has no detailed reference.
    #[sea_orm(unique_key = "reference")]
    pub detailed_reference: String,

    pub start_date: Option<Date>,
    pub end_date: Option<Date>,

    #[sea_orm(has_many, via = "search_client")]
    pub clients: HasMany<super::client::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
