use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::user::{ADMIN_ROLE, DEFAULT_ROLE};
use crate::error::AppError;

/// Request body for creating an account (admin only).
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "alice")]
    pub username: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// `admin` or `user`. Defaults to `user`.
    #[schema(example = "user")]
    pub role: Option<String>,
}

pub fn validate_create_user(payload: &CreateUserRequest) -> Result<(), AppError> {
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Le nom d'utilisateur doit contenir entre 1 et 32 caractères".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Le nom d'utilisateur ne peut contenir que des lettres, des chiffres et des tirets bas".into(),
        ));
    }
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Le mot de passe doit contenir entre 8 et 128 caractères".into(),
        ));
    }
    if let Some(role) = payload.role.as_deref()
        && role != ADMIN_ROLE
        && role != DEFAULT_ROLE
    {
        return Err(AppError::Validation(format!(
            "Le rôle doit être {ADMIN_ROLE} ou {DEFAULT_ROLE}"
        )));
    }
    Ok(())
}

/// Replaces the full set of categories a user belongs to.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetUserCategoriesRequest {
    #[schema(example = json!([1, 3]))]
    pub category_ids: Vec<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "user")]
    pub role: String,
    #[schema(example = json!([1, 3]))]
    pub category_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: crate::entity::user::Model, category_ids: Vec<i32>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            category_ids,
            created_at: user.created_at,
        }
    }
}
