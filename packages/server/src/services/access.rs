use common::ClientRef;
use sea_orm::sea_query::{LockType, Query as SeaQuery};
use sea_orm::*;

use crate::entity::{client, client_category, user_category};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

fn not_found() -> AppError {
    AppError::NotFound("Client introuvable".into())
}

/// Clients a non-admin user may see: the ones they own, plus the ones sharing a category with
/// them. `None` for admins.
pub fn visibility_condition(auth_user: &AuthUser) -> Option<Condition> {
    if auth_user.is_admin() {
        return None;
    }
    Some(
        Condition::any()
            .add(client::Column::OwnerId.eq(auth_user.user_id))
            .add(
                client::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(client_category::Column::ClientId)
                        .from(client_category::Entity)
                        .and_where(
                            client_category::Column::CategoryId.in_subquery(
                                SeaQuery::select()
                                    .column(user_category::Column::CategoryId)
                                    .from(user_category::Entity)
                                    .and_where(
                                        user_category::Column::UserId.eq(auth_user.user_id),
                                    )
                                    .to_owned(),
                            ),
                        )
                        .to_owned(),
                ),
            ),
    )
}

fn by_ref(reference: &ClientRef) -> Select<client::Entity> {
    match reference {
        ClientRef::Id(id) => client::Entity::find_by_id(*id),
        ClientRef::Slug(slug) => client::Entity::find().filter(client::Column::Slug.eq(slug)),
    }
}

fn scoped(
    reference: &ClientRef,
    auth_user: &AuthUser,
    include_deleted: bool,
) -> Select<client::Entity> {
    let mut select = by_ref(reference);
    if !include_deleted {
        select = select.filter(client::Column::DeletedAt.is_null());
    }
    if let Some(cond) = visibility_condition(auth_user) {
        select = select.filter(cond);
    }
    select
}

/// A client that is not soft-deleted and is visible to the caller.
pub async fn find_active_client<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    reference: &ClientRef,
) -> Result<client::Model, AppError> {
    scoped(reference, auth_user, false)
        .one(db)
        .await?
        .ok_or_else(not_found)
}

/// Same as [`find_active_client`], holding a row lock until the transaction ends.
pub async fn find_active_client_for_update<C: ConnectionTrait>(
    txn: &C,
    auth_user: &AuthUser,
    reference: &ClientRef,
) -> Result<client::Model, AppError> {
    scoped(reference, auth_user, false)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(not_found)
}

/// Admins also reach soft-deleted clients; other users only reach active ones.
pub async fn find_client_including_deleted<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    reference: &ClientRef,
) -> Result<client::Model, AppError> {
    scoped(reference, auth_user, auth_user.is_admin())
        .one(db)
        .await?
        .ok_or_else(not_found)
}

pub async fn find_client_including_deleted_for_update<C: ConnectionTrait>(
    txn: &C,
    auth_user: &AuthUser,
    reference: &ClientRef,
) -> Result<client::Model, AppError> {
    scoped(reference, auth_user, auth_user.is_admin())
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(not_found)
}
