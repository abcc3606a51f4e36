#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Urgency of a client record.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Priority {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Immediate"))]
    Immediate,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "High"))]
    High,
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Medium"))]
    Medium,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Low"))]
    Low,
}

impl Priority {
    /// All priorities, most urgent first.
    pub const ALL: &'static [Priority] = &[Self::Immediate, Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "Immediate",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid priority string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid priority '{invalid}'. Valid values: Immediate, High, Medium, Low")]
pub struct ParsePriorityError {
    invalid: String,
}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParsePriorityError {
                invalid: s.to_string(),
            })
    }
}
