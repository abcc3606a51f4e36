use common::Priority;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "client")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// URL-safe name. Soft-deleted rows carry a `_deleted_<id>` suffix.
    #[sea_orm(unique)]
    pub slug: String,

    pub nickname: Option<String>,
    pub surname: Option<String>,
    pub first_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub requestor: Option<String>,
    pub priority: Priority,
    #[sea_orm(default_value = false)]
    pub external_help: bool,

    /// Set when the client is soft-deleted.
    #[sea_orm(indexed)]
    pub deleted_at: Option<DateTimeUtc>,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub contact_identifiers: HasMany<super::contact_identifier::Entity>,

    #[sea_orm(has_many, via = "search_client")]
    pub searches: HasMany<super::search::Entity>,

    #[sea_orm(has_many, via = "client_category")]
    pub categories: HasMany<super::category::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
