use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grouping used to scope which clients a non-admin user can see.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(has_many, via = "user_category")]
    pub users: HasMany<super::user::Entity>,

    #[sea_orm(has_many, via = "client_category")]
    pub clients: HasMany<super::client::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
