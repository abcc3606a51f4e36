#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation recorded in a client history row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    /// Record created. Changes hold the full snapshot.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CREATE"))]
    Create,
    /// Record updated. Changes hold the field-level change set.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "UPDATE"))]
    Update,
    /// Record soft-deleted.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DELETE"))]
    Delete,
    /// Record removed from the database. Written before the row goes away.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DELETE_PERMANENT"))]
    DeletePermanent,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::DeletePermanent => "DELETE_PERMANENT",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
