use std::collections::{BTreeSet, HashMap};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::user::DEFAULT_ROLE;
use crate::entity::{category, user, user_category};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::user::*;
use crate::state::AppState;
use crate::utils::hash;

#[utoipa::path(
    post,
    path = "",
    tag = "Users",
    operation_id = "createUser",
    summary = "Create an account",
    description = "Admin only. The role defaults to `user`.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Username taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(username = %payload.username))]
pub async fn create_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    validate_create_user(&payload)?;

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        username: Set(payload.username.trim().to_string()),
        password: Set(hash),
        role: Set(payload.role.unwrap_or_else(|| DEFAULT_ROLE.to_string())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Ce nom d'utilisateur est déjà pris".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(UserResponse::new(user, Vec::new()))))
}

#[utoipa::path(
    get,
    path = "",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List accounts",
    description = "Admin only. Ordered by username.",
    responses(
        (status = 200, description = "All accounts", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth_user.require_admin()?;

    let users = user::Entity::find()
        .order_by_asc(user::Column::Username)
        .all(&state.db)
        .await?;

    let mut memberships: HashMap<i32, Vec<i32>> = HashMap::new();
    for (user_id, category_id) in user_category::Entity::find()
        .select_only()
        .column(user_category::Column::UserId)
        .column(user_category::Column::CategoryId)
        .order_by_asc(user_category::Column::CategoryId)
        .into_tuple::<(i32, i32)>()
        .all(&state.db)
        .await?
    {
        memberships.entry(user_id).or_default().push(category_id);
    }

    Ok(Json(
        users
            .into_iter()
            .map(|u| {
                let ids = memberships.remove(&u.id).unwrap_or_default();
                UserResponse::new(u, ids)
            })
            .collect(),
    ))
}

#[utoipa::path(
    put,
    path = "/{id}/categories",
    tag = "Users",
    operation_id = "setUserCategories",
    summary = "Replace a user's categories",
    description = "Admin only. Category membership decides which clients a non-admin user can see.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetUserCategoriesRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Unknown category (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn set_user_categories(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SetUserCategoriesRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_admin()?;

    let wanted: BTreeSet<i32> = payload.category_ids.into_iter().collect();

    let txn = state.db.begin().await?;
    let target = user::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Utilisateur introuvable".into()))?;

    if !wanted.is_empty() {
        let found = category::Entity::find()
            .filter(category::Column::Id.is_in(wanted.iter().copied()))
            .count(&txn)
            .await?;
        if found != wanted.len() as u64 {
            return Err(AppError::Validation(
                "Une ou plusieurs catégories n'existent pas".into(),
            ));
        }
    }

    user_category::Entity::delete_many()
        .filter(user_category::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    for &category_id in &wanted {
        user_category::ActiveModel {
            user_id: Set(id),
            category_id: Set(category_id),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    Ok(Json(UserResponse::new(target, wanted.into_iter().collect())))
}
