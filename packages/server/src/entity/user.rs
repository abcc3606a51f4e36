use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role with unrestricted access, including permanent deletion.
pub const ADMIN_ROLE: &str = "admin";
/// Role assigned to accounts created without an explicit role.
pub const DEFAULT_ROLE: &str = "user";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,

    #[sea_orm(has_many)]
    pub clients: HasMany<super::client::Entity>,

    #[sea_orm(has_many, via = "user_category")]
    pub categories: HasMany<super::category::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
