use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{TimeZone, Utc};
use common::{ClientRef, CompositeId};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{client, contact_identifier};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::client::*;
use crate::models::shared::{Pagination, escape_like, page_bounds};
use crate::services::access::{find_active_client, find_client_including_deleted, visibility_condition};
use crate::services::clients::{ClientService, MutationOutcome};
use crate::services::history;
use crate::services::view::{client_response, client_responses};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "",
    tag = "Clients",
    operation_id = "listClients",
    summary = "List clients",
    description = "Returns non-deleted clients visible to the caller, newest first. Admins see every client; other users see the clients they own or that share a category with them. `search` matches names, description and account numbers case-insensitively, or a composite identifier `YY-ClientId-Position`.",
    params(ClientListQuery),
    responses(
        (status = 200, description = "Page of clients", body = ClientListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_clients(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ClientListQuery>,
) -> Result<Json<ClientListResponse>, AppError> {
    let (page, per_page) = page_bounds(query.page, query.per_page);

    let mut select = client::Entity::find().filter(client::Column::DeletedAt.is_null());
    if let Some(cond) = visibility_condition(&auth_user) {
        select = select.filter(cond);
    }
    if let Some(ref search) = query.search {
        let term = search.trim();
        if !term.is_empty() {
            select = select.filter(search_condition(term));
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let clients = select
        .order_by_desc(client::Column::CreatedAt)
        .order_by_desc(client::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    Ok(Json(ClientListResponse {
        data: client_responses(&state.db, clients).await?,
        pagination: Pagination::new(page, per_page, total),
    }))
}

/// Free-text match over names, description and account numbers, plus the composite id form.
fn search_condition(term: &str) -> Condition {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    let contains = |col: client::Column| {
        Expr::expr(Func::lower(Expr::col(col))).like(LikeExpr::new(&pattern).escape('\\'))
    };

    // Account numbers are stored without whitespace.
    let compact: String = term.chars().filter(|c| !c.is_whitespace()).collect();
    let number_pattern = format!("%{}%", escape_like(&compact.to_lowercase()));

    let mut cond = Condition::any()
        .add(contains(client::Column::Nickname))
        .add(contains(client::Column::Surname))
        .add(contains(client::Column::FirstName))
        .add(contains(client::Column::Description))
        .add(
            client::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(contact_identifier::Column::ClientId)
                    .from(contact_identifier::Entity)
                    .and_where(
                        Expr::expr(Func::lower(Expr::col(
                            contact_identifier::Column::AccountNumber,
                        )))
                        .like(LikeExpr::new(number_pattern).escape('\\')),
                    )
                    .to_owned(),
            ),
        );

    if let Ok(composite) = term.parse::<CompositeId>() {
        let year = 2000 + i32::from(composite.year);
        if let (Some(start), Some(end)) = (
            Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single(),
            Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single(),
        ) {
            cond = cond.add(
                Condition::all()
                    .add(client::Column::Id.eq(composite.client_id))
                    .add(client::Column::CreatedAt.gte(start))
                    .add(client::Column::CreatedAt.lt(end))
                    .add(
                        client::Column::Id.in_subquery(
                            SeaQuery::select()
                                .column(contact_identifier::Column::ClientId)
                                .from(contact_identifier::Entity)
                                .and_where(
                                    contact_identifier::Column::ClientId.eq(composite.client_id),
                                )
                                .and_where(
                                    contact_identifier::Column::Position.eq(composite.position),
                                )
                                .to_owned(),
                        ),
                    ),
            );
        }
    }

    cond
}

#[utoipa::path(
    post,
    path = "",
    tag = "Clients",
    operation_id = "createClient",
    summary = "Create a client",
    description = "Creates a client with its contact identifiers, search link and categories in one transaction. When the search reference pair already exists and `linkExistingSearch` is not set, nothing is written and a `requiresValidation` body is returned with status 200.",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created, with `warnings` when an account number is shared", body = ClientResponse),
        (status = 200, description = "Search reference already exists; confirm with `linkExistingSearch`", body = RequiresValidationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Identifier held by another client (DUPLICATE_IDENTIFIER)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_client(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateClientRequest>,
) -> Result<Response, AppError> {
    validate_create_client(&payload)?;

    let txn = state.db.begin().await?;
    let outcome = ClientService::new(&txn).create(&auth_user, &payload).await?;

    match outcome {
        MutationOutcome::Saved { client, warnings } => {
            let response = client_response(&txn, client).await?;
            txn.commit().await?;
            Ok((StatusCode::CREATED, Json(response.with_warnings(warnings))).into_response())
        }
        MutationOutcome::RequiresValidation { existing_search } => {
            txn.rollback().await?;
            requires_validation(existing_search, &payload)
        }
    }
}

#[utoipa::path(
    get,
    path = "/{idOrSlug}",
    tag = "Clients",
    operation_id = "getClient",
    summary = "Get a client by id or slug",
    params(("idOrSlug" = String, Path, description = "Numeric id or slug")),
    responses(
        (status = 200, description = "Client details", body = ClientResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Missing, deleted or not visible (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(client = %reference))]
pub async fn get_client(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<ClientRef>,
) -> Result<Json<ClientResponse>, AppError> {
    let model = find_active_client(&state.db, &auth_user, &reference).await?;
    Ok(Json(client_response(&state.db, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{idOrSlug}",
    tag = "Clients",
    operation_id = "updateClient",
    summary = "Update a client",
    description = "PATCH semantics: absent fields are kept, `null` clears a nullable field. Contact identifiers are always rewritten with positions restarting at 1; when omitted, the current list is written back. A `search` member replaces every search link (`null` removes them). A history row is written only when something changed.",
    params(("idOrSlug" = String, Path, description = "Numeric id or slug")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Updated client, or a `requiresValidation` body", body = ClientResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Client not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Identifier held by another client (DUPLICATE_IDENTIFIER)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(client = %reference))]
pub async fn update_client(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<ClientRef>,
    AppJson(payload): AppJson<UpdateClientRequest>,
) -> Result<Response, AppError> {
    validate_update_client(&payload)?;

    let txn = state.db.begin().await?;
    let outcome = ClientService::new(&txn)
        .update(&auth_user, &reference, &payload)
        .await?;

    match outcome {
        MutationOutcome::Saved { client, warnings } => {
            let response = client_response(&txn, client).await?;
            txn.commit().await?;
            Ok(Json(response.with_warnings(warnings)).into_response())
        }
        MutationOutcome::RequiresValidation { existing_search } => {
            txn.rollback().await?;
            requires_validation(existing_search, &payload)
        }
    }
}

#[utoipa::path(
    delete,
    path = "/{idOrSlug}",
    tag = "Clients",
    operation_id = "deleteClient",
    summary = "Delete a client",
    description = "Soft delete by default: the client disappears from reads and its slug is released. With `permanent=true` (admins only) the row and its identifiers, search links and category links are removed; the history survives.",
    params(
        ("idOrSlug" = String, Path, description = "Numeric id or slug"),
        DeleteClientQuery,
    ),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Permanent delete by a non-admin (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Client not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(client = %reference))]
pub async fn delete_client(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<ClientRef>,
    Query(query): Query<DeleteClientQuery>,
) -> Result<StatusCode, AppError> {
    let txn = state.db.begin().await?;
    let service = ClientService::new(&txn);
    if query.permanent.unwrap_or(false) {
        service.delete_permanently(&auth_user, &reference).await?;
    } else {
        service.soft_delete(&auth_user, &reference).await?;
    }
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{idOrSlug}/history",
    tag = "Clients",
    operation_id = "getClientHistory",
    summary = "Audit history of a client",
    description = "Newest first. Admins can also read the history of soft-deleted clients by id.",
    params(("idOrSlug" = String, Path, description = "Numeric id or slug")),
    responses(
        (status = 200, description = "History entries", body = Vec<HistoryEntryResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Client not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(client = %reference))]
pub async fn get_client_history(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<ClientRef>,
) -> Result<Json<Vec<HistoryEntryResponse>>, AppError> {
    let model = find_client_including_deleted(&state.db, &auth_user, &reference).await?;
    let entries = history::list(&state.db, model.id)
        .await?
        .into_iter()
        .map(|(row, username)| HistoryEntryResponse {
            id: row.id,
            client_id: row.client_id,
            user_id: row.user_id,
            username,
            action: row.action,
            changes: row.changes,
            created_at: row.created_at,
        })
        .collect();
    Ok(Json(entries))
}

fn requires_validation<T: serde::Serialize>(
    existing_search: crate::entity::search::Model,
    payload: &T,
) -> Result<Response, AppError> {
    let form_data =
        serde_json::to_value(payload).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(RequiresValidationResponse {
        requires_validation: true,
        existing_search: existing_search.into(),
        form_data,
    })
    .into_response())
}
