use sea_orm::sea_query::{Index, IndexCreateStatement, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::BootstrapConfig;
use crate::entity::user::ADMIN_ROLE;
use crate::entity::{client, client_history, contact_identifier, user};
use crate::utils::hash;

/// Create the bootstrap administrator when configured and missing.
///
/// An existing account with the same username is left untouched, password included.
pub async fn seed_admin(db: &DatabaseConnection, bootstrap: &BootstrapConfig) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (
        bootstrap.admin_username.as_deref(),
        bootstrap.admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    let hash = hash::hash_password(password)
        .map_err(|e| anyhow::anyhow!("Password hash error: {}", e))?;
    let model = user::ActiveModel {
        username: Set(username.to_string()),
        password: Set(hash),
        role: Set(ADMIN_ROLE.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => info!(%username, "Seeded bootstrap admin"),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn ensure_index(db: &DatabaseConnection, name: &str, stmt: IndexCreateStatement) {
    let sql = stmt.to_string(PostgresQueryBuilder);
    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Default client listing: WHERE deleted_at IS NULL ORDER BY created_at DESC
    ensure_index(
        db,
        "idx_client_deleted_created",
        Index::create()
            .if_not_exists()
            .name("idx_client_deleted_created")
            .table(client::Entity)
            .col(client::Column::DeletedAt)
            .col(client::Column::CreatedAt)
            .to_owned(),
    )
    .await;

    // Per-client history, newest first.
    ensure_index(
        db,
        "idx_client_history_client_created",
        Index::create()
            .if_not_exists()
            .name("idx_client_history_client_created")
            .table(client_history::Entity)
            .col(client_history::Column::ClientId)
            .col(client_history::Column::CreatedAt)
            .to_owned(),
    )
    .await;

    // Number-only lookups by the identifier uniqueness check.
    ensure_index(
        db,
        "idx_contact_identifier_number",
        Index::create()
            .if_not_exists()
            .name("idx_contact_identifier_number")
            .table(contact_identifier::Entity)
            .col(contact_identifier::Column::AccountNumber)
            .to_owned(),
    )
    .await;

    Ok(())
}
