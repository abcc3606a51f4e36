use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use common::diff::diff;
use common::slug::{client_base_slug, deleted_slug, is_slug_variant, next_free_slug};
use common::{ClientRef, ContactIdentifierInput, HistoryAction, SearchSnapshot};
use sea_orm::sea_query::{LikeExpr, OnConflict};
use sea_orm::*;

use super::access::{find_active_client_for_update, find_client_including_deleted_for_update};
use super::history;
use super::snapshot::{full_record, load_snapshot};
use super::uniqueness::{check_identifiers, duplicates_after_conflict};
use crate::entity::{category, client, client_category, contact_identifier, search, search_client};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::client::{
    CreateClientRequest, IdentifierWarning, SearchInput, UpdateClientRequest,
};
use crate::models::shared::{clean_text, escape_like};

/// Result of a create or update.
#[derive(Debug)]
pub enum MutationOutcome {
    Saved {
        client: client::Model,
        warnings: Vec<IdentifierWarning>,
    },
    /// The submitted search reference belongs to an existing search the caller has not
    /// confirmed linking to. Nothing was written.
    RequiresValidation { existing_search: search::Model },
}

/// Writes client records together with their identifiers, search links, categories and
/// history. Every method expects to run inside a transaction owned by the caller.
pub struct ClientService<'a, C: ConnectionTrait + TransactionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait + TransactionTrait> ClientService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        actor: &AuthUser,
        req: &CreateClientRequest,
    ) -> Result<MutationOutcome, AppError> {
        let checked = check_identifiers(self.conn, &req.contact_identifiers, None).await?;

        let search = req.search.as_ref().map(SearchInput::to_snapshot);
        let existing_search = match search {
            Some(ref s) => self.find_search(s).await?,
            None => None,
        };
        if let Some(ref existing) = existing_search
            && !req.link_existing_search
        {
            return Ok(MutationOutcome::RequiresValidation {
                existing_search: existing.clone(),
            });
        }

        let category_ids = self.known_categories(&req.category_ids).await?;

        let nickname = clean_text(req.nickname.as_deref());
        let surname = clean_text(req.surname.as_deref());
        let first_name = clean_text(req.first_name.as_deref());
        let base = client_base_slug(
            first_name.as_deref(),
            surname.as_deref(),
            nickname.as_deref(),
        );
        let slug = self.allocate_slug(&base, None).await?;

        let now = Utc::now();
        let model = client::ActiveModel {
            slug: Set(slug),
            nickname: Set(nickname),
            surname: Set(surname),
            first_name: Set(first_name),
            description: Set(clean_text(req.description.as_deref())),
            requestor: Set(clean_text(req.requestor.as_deref())),
            priority: Set(req.priority.unwrap_or_default()),
            external_help: Set(req.external_help),
            deleted_at: Set(None),
            owner_id: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await?;

        self.write_identifiers(model.id, &checked.identifiers).await?;
        if let Some(ref s) = search {
            self.link_search(model.id, s, existing_search, false).await?;
        }
        self.write_categories(model.id, &category_ids).await?;

        let snapshot = load_snapshot(self.conn, &model).await?;
        history::record(
            self.conn,
            model.id,
            actor.user_id,
            HistoryAction::Create,
            full_record(&model, &snapshot),
        )
        .await?;

        tracing::info!(client_id = model.id, slug = %model.slug, "Client created");
        Ok(MutationOutcome::Saved {
            client: model,
            warnings: checked.warnings,
        })
    }

    pub async fn update(
        &self,
        actor: &AuthUser,
        reference: &ClientRef,
        req: &UpdateClientRequest,
    ) -> Result<MutationOutcome, AppError> {
        let current = find_active_client_for_update(self.conn, actor, reference).await?;
        let old = load_snapshot(self.conn, &current).await?;

        let submitted = match req.contact_identifiers {
            Some(ref list) => list.as_slice(),
            None => old.contact_identifiers.as_slice(),
        };
        let checked = check_identifiers(self.conn, submitted, Some(current.id)).await?;

        // Outer `Some` means the payload carried a `search` member.
        let search_change: Option<Option<SearchSnapshot>> = req
            .search
            .as_ref()
            .map(|s| s.as_ref().map(SearchInput::to_snapshot));
        let mut existing_search = None;
        let mut already_linked = false;
        if let Some(Some(ref s)) = search_change {
            existing_search = self.find_search(s).await?;
            if let Some(ref existing) = existing_search {
                already_linked = self.is_linked(existing.id, current.id).await?;
                if !already_linked && !req.link_existing_search {
                    return Ok(MutationOutcome::RequiresValidation {
                        existing_search: existing.clone(),
                    });
                }
            }
        }

        let category_ids = match req.category_ids {
            Some(ref ids) => Some(self.known_categories(ids).await?),
            None => None,
        };

        let mut next = current.clone();
        next.nickname = patch_text(&req.nickname, &current.nickname);
        next.surname = patch_text(&req.surname, &current.surname);
        next.first_name = patch_text(&req.first_name, &current.first_name);
        next.description = patch_text(&req.description, &current.description);
        next.requestor = patch_text(&req.requestor, &current.requestor);
        if let Some(priority) = req.priority {
            next.priority = priority;
        }
        if let Some(external_help) = req.external_help {
            next.external_help = external_help;
        }
        let base = client_base_slug(
            next.first_name.as_deref(),
            next.surname.as_deref(),
            next.nickname.as_deref(),
        );
        if !is_slug_variant(&current.slug, &base) {
            next.slug = self.allocate_slug(&base, Some(current.id)).await?;
        }

        contact_identifier::Entity::delete_many()
            .filter(contact_identifier::Column::ClientId.eq(current.id))
            .exec(self.conn)
            .await?;
        self.write_identifiers(current.id, &checked.identifiers).await?;

        if let Some(ref change) = search_change {
            search_client::Entity::delete_many()
                .filter(search_client::Column::ClientId.eq(current.id))
                .exec(self.conn)
                .await?;
            if let Some(s) = change {
                self.link_search(current.id, s, existing_search, already_linked)
                    .await?;
            }
        }

        if let Some(ref ids) = category_ids {
            client_category::Entity::delete_many()
                .filter(client_category::Column::ClientId.eq(current.id))
                .exec(self.conn)
                .await?;
            self.write_categories(current.id, ids).await?;
        }

        let new = load_snapshot(self.conn, &next).await?;
        let changes = diff(&old, &new);
        if changes.is_empty() {
            tracing::debug!(client_id = current.id, "Update changed nothing");
            return Ok(MutationOutcome::Saved {
                client: current,
                warnings: checked.warnings,
            });
        }

        let mut active: client::ActiveModel = current.into();
        active.slug = Set(next.slug);
        active.nickname = Set(next.nickname);
        active.surname = Set(next.surname);
        active.first_name = Set(next.first_name);
        active.description = Set(next.description);
        active.requestor = Set(next.requestor);
        active.priority = Set(next.priority);
        active.external_help = Set(next.external_help);
        active.updated_at = Set(Utc::now());
        let updated = active.update(self.conn).await?;

        let changes =
            serde_json::to_value(&changes).map_err(|e| AppError::Internal(e.to_string()))?;
        history::record(
            self.conn,
            updated.id,
            actor.user_id,
            HistoryAction::Update,
            changes,
        )
        .await?;

        tracing::info!(client_id = updated.id, "Client updated");
        Ok(MutationOutcome::Saved {
            client: updated,
            warnings: checked.warnings,
        })
    }

    /// Mark the client deleted and free its slug. Its identifiers stay reserved.
    pub async fn soft_delete(
        &self,
        actor: &AuthUser,
        reference: &ClientRef,
    ) -> Result<client::Model, AppError> {
        let current = find_active_client_for_update(self.conn, actor, reference).await?;
        let snapshot = load_snapshot(self.conn, &current).await?;
        let record = full_record(&current, &snapshot);

        let now = Utc::now();
        let mut active: client::ActiveModel = current.clone().into();
        active.slug = Set(deleted_slug(&current.slug, current.id));
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        let deleted = active.update(self.conn).await?;

        history::record(
            self.conn,
            deleted.id,
            actor.user_id,
            HistoryAction::Delete,
            record,
        )
        .await?;

        tracing::info!(client_id = deleted.id, "Client soft-deleted");
        Ok(deleted)
    }

    /// Remove the client row and everything it owns. The history row is written first and
    /// survives the delete.
    pub async fn delete_permanently(
        &self,
        actor: &AuthUser,
        reference: &ClientRef,
    ) -> Result<(), AppError> {
        actor.require_admin()?;
        let current = find_client_including_deleted_for_update(self.conn, actor, reference).await?;
        let snapshot = load_snapshot(self.conn, &current).await?;

        history::record(
            self.conn,
            current.id,
            actor.user_id,
            HistoryAction::DeletePermanent,
            full_record(&current, &snapshot),
        )
        .await?;

        contact_identifier::Entity::delete_many()
            .filter(contact_identifier::Column::ClientId.eq(current.id))
            .exec(self.conn)
            .await?;
        search_client::Entity::delete_many()
            .filter(search_client::Column::ClientId.eq(current.id))
            .exec(self.conn)
            .await?;
        client_category::Entity::delete_many()
            .filter(client_category::Column::ClientId.eq(current.id))
            .exec(self.conn)
            .await?;
        client::Entity::delete_by_id(current.id)
            .exec(self.conn)
            .await?;

        tracing::info!(
            client_id = current.id,
            identifiers = snapshot.contact_identifiers.len(),
            "Client permanently deleted"
        );
        Ok(())
    }

    /// First free slug among `base`, `base-2`, ... ignoring the client's own row.
    async fn allocate_slug(&self, base: &str, own_id: Option<i32>) -> Result<String, DbErr> {
        let mut select = client::Entity::find()
            .select_only()
            .column(client::Column::Slug)
            .filter(
                Condition::any()
                    .add(client::Column::Slug.eq(base))
                    .add(
                        client::Column::Slug
                            .like(LikeExpr::new(format!("{}-%", escape_like(base))).escape('\\')),
                    ),
            );
        if let Some(id) = own_id {
            select = select.filter(client::Column::Id.ne(id));
        }
        let taken: HashSet<String> = select
            .into_tuple::<String>()
            .all(self.conn)
            .await?
            .into_iter()
            .collect();
        Ok(next_free_slug(base, |candidate| taken.contains(candidate)))
    }

    /// Insert identifiers with positions `1..=N` in submission order.
    ///
    /// Runs in a savepoint so a unique violation can be rolled back and reported as the same
    /// duplicate error the pre-check produces.
    async fn write_identifiers(
        &self,
        client_id: i32,
        identifiers: &[ContactIdentifierInput],
    ) -> Result<(), AppError> {
        if identifiers.is_empty() {
            return Ok(());
        }

        let savepoint = self.conn.begin().await?;
        for (i, ident) in identifiers.iter().enumerate() {
            let row = contact_identifier::ActiveModel {
                client_id: Set(client_id),
                account_number: Set(ident.account_number.clone()),
                account_type: Set(ident.account_type.clone()),
                info: Set(ident.info.clone()),
                position: Set(i as i32 + 1),
                ..Default::default()
            };
            match row.insert(&savepoint).await {
                Ok(_) => {}
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    savepoint.rollback().await?;
                    tracing::warn!(client_id, error = %e, "Identifier insert lost a uniqueness race");
                    return Err(
                        duplicates_after_conflict(self.conn, identifiers, Some(client_id), &e)
                            .await,
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        savepoint.commit().await?;
        Ok(())
    }

    async fn find_search(&self, s: &SearchSnapshot) -> Result<Option<search::Model>, DbErr> {
        search::Entity::find()
            .filter(search::Column::GeneralReference.eq(&s.general_reference))
            .filter(
                search::Column::DetailedReference.eq(s.detailed_reference.as_deref().unwrap_or("")),
            )
            .one(self.conn)
            .await
    }

    async fn is_linked(&self, search_id: i32, client_id: i32) -> Result<bool, DbErr> {
        Ok(search_client::Entity::find_by_id((search_id, client_id))
            .one(self.conn)
            .await?
            .is_some())
    }

    /// Link the client to `s`, creating the search when it does not exist yet.
    ///
    /// Submitted dates are applied to a new search, or to one this client was already linked
    /// to. A search confirmed through `linkExistingSearch` keeps its stored dates.
    async fn link_search(
        &self,
        client_id: i32,
        s: &SearchSnapshot,
        existing: Option<search::Model>,
        already_linked: bool,
    ) -> Result<(), AppError> {
        let search = match existing {
            Some(found) if already_linked => self.apply_search_dates(found, s).await?,
            Some(found) => found,
            None => self.create_search(s).await?,
        };

        search_client::ActiveModel {
            search_id: Set(search.id),
            client_id: Set(client_id),
        }
        .insert(self.conn)
        .await?;
        Ok(())
    }

    async fn create_search(&self, s: &SearchSnapshot) -> Result<search::Model, AppError> {
        let model = search::ActiveModel {
            general_reference: Set(s.general_reference.clone()),
            detailed_reference: Set(s.detailed_reference.clone().unwrap_or_default()),
            start_date: Set(s.start_date),
            end_date: Set(s.end_date),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        // A concurrent request may create the same pair; keep the transaction usable and
        // link to whichever row won.
        let result = search::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    search::Column::GeneralReference,
                    search::Column::DetailedReference,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await;
        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }

        self.find_search(s).await?.ok_or_else(|| {
            AppError::Internal(format!(
                "search ({}, {:?}) missing after insert",
                s.general_reference, s.detailed_reference
            ))
        })
    }

    async fn apply_search_dates(
        &self,
        found: search::Model,
        s: &SearchSnapshot,
    ) -> Result<search::Model, DbErr> {
        if found.start_date == s.start_date && found.end_date == s.end_date {
            return Ok(found);
        }
        let mut active: search::ActiveModel = found.into();
        active.start_date = Set(s.start_date);
        active.end_date = Set(s.end_date);
        active.update(self.conn).await
    }

    /// Deduplicated category ids, rejecting any that do not exist.
    async fn known_categories(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        let wanted: BTreeSet<i32> = ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let found = category::Entity::find()
            .filter(category::Column::Id.is_in(wanted.iter().copied()))
            .count(self.conn)
            .await?;
        if found != wanted.len() as u64 {
            return Err(AppError::Validation(
                "Une ou plusieurs catégories n'existent pas".into(),
            ));
        }
        Ok(wanted.into_iter().collect())
    }

    async fn write_categories(&self, client_id: i32, category_ids: &[i32]) -> Result<(), DbErr> {
        for &category_id in category_ids {
            client_category::ActiveModel {
                client_id: Set(client_id),
                category_id: Set(category_id),
            }
            .insert(self.conn)
            .await?;
        }
        Ok(())
    }
}

/// PATCH merge for a nullable text column.
fn patch_text(patch: &Option<Option<String>>, current: &Option<String>) -> Option<String> {
    match patch {
        None => current.clone(),
        Some(value) => clean_text(value.as_deref()),
    }
}
