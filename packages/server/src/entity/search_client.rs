use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "search_client")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub search_id: i32,
    #[sea_orm(primary_key)]
    pub client_id: i32,
    #[sea_orm(belongs_to, from = "search_id", to = "id")]
    pub search: BelongsTo<super::search::Entity>,
    #[sea_orm(belongs_to, from = "client_id", to = "id")]
    pub client: BelongsTo<super::client::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
