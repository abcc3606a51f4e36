use std::collections::{HashMap, HashSet};

use common::ContactIdentifierInput;
use common::identifier::prepare_identifiers;
use sea_orm::*;

use super::snapshot::display_name;
use crate::entity::{client, contact_identifier};
use crate::error::{AppError, DuplicateIdentifier};
use crate::models::client::IdentifierWarning;

/// Identifiers that passed every check, in canonical form and submission order.
#[derive(Debug)]
pub struct CheckedIdentifiers {
    pub identifiers: Vec<ContactIdentifierInput>,
    pub warnings: Vec<IdentifierWarning>,
}

/// Validate submitted contact identifiers against each other and against other clients.
///
/// A pair repeated inside the submission is a validation error and never touches the database.
/// A pair already held by another client is rejected with the list of holders. An account
/// number held by another client under a different type only produces a warning.
///
/// Rows of `exclude_client` are ignored, since an update rewrites them.
pub async fn check_identifiers<C: ConnectionTrait>(
    conn: &C,
    submitted: &[ContactIdentifierInput],
    exclude_client: Option<i32>,
) -> Result<CheckedIdentifiers, AppError> {
    let identifiers = prepare_identifiers(submitted)?;
    if identifiers.is_empty() {
        return Ok(CheckedIdentifiers {
            identifiers,
            warnings: Vec::new(),
        });
    }

    let numbers: Vec<&str> = identifiers
        .iter()
        .map(|i| i.account_number.as_str())
        .collect();
    let mut select = contact_identifier::Entity::find()
        .filter(contact_identifier::Column::AccountNumber.is_in(numbers))
        .order_by_asc(contact_identifier::Column::ClientId)
        .order_by_asc(contact_identifier::Column::Position);
    if let Some(client_id) = exclude_client {
        select = select.filter(contact_identifier::Column::ClientId.ne(client_id));
    }
    let existing = select.all(conn).await?;
    if existing.is_empty() {
        return Ok(CheckedIdentifiers {
            identifiers,
            warnings: Vec::new(),
        });
    }

    let owner_ids: HashSet<i32> = existing.iter().map(|e| e.client_id).collect();
    let owners: HashMap<i32, client::Model> = client::Entity::find()
        .filter(client::Column::Id.is_in(owner_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let proposed_pairs: HashSet<(&str, &str)> =
        identifiers.iter().map(ContactIdentifierInput::key).collect();

    let mut duplicates = Vec::new();
    let mut warnings = Vec::new();
    for row in &existing {
        let (client_name, client_slug) = match owners.get(&row.client_id) {
            Some(owner) => (display_name(owner), owner.slug.clone()),
            None => (String::new(), String::new()),
        };
        if proposed_pairs.contains(&(row.account_number.as_str(), row.account_type.as_str())) {
            duplicates.push(DuplicateIdentifier {
                account_number: row.account_number.clone(),
                account_type: row.account_type.clone(),
                client_id: row.client_id,
                client_name,
                client_slug,
            });
        } else {
            warnings.push(IdentifierWarning {
                message: format!(
                    "Le numéro {} est déjà utilisé en tant que {} par {}",
                    row.account_number, row.account_type, client_name
                ),
                account_number: row.account_number.clone(),
                existing_account_type: row.account_type.clone(),
                client_id: row.client_id,
                client_name,
                client_slug,
            });
        }
    }

    if !duplicates.is_empty() {
        return Err(duplicate_error(duplicates));
    }

    Ok(CheckedIdentifiers {
        identifiers,
        warnings,
    })
}

/// Build the 409 error naming every client that already holds one of the pairs.
pub fn duplicate_error(duplicates: Vec<DuplicateIdentifier>) -> AppError {
    let holders: Vec<String> = duplicates
        .iter()
        .map(|d| {
            format!(
                "{} ({}) appartient déjà à {}",
                d.account_number, d.account_type, d.client_name
            )
        })
        .collect();
    AppError::DuplicateIdentifiers {
        message: format!("Identifiant déjà utilisé : {}", holders.join(", ")),
        duplicates,
    }
}

/// Resolve which pairs collided after the store rejected an identifier insert.
///
/// `conn` must be usable again, i.e. the failed insert ran in a savepoint that was rolled back.
/// `cause` is the violation reported by the store.
pub async fn duplicates_after_conflict<C: ConnectionTrait>(
    conn: &C,
    identifiers: &[ContactIdentifierInput],
    exclude_client: Option<i32>,
    cause: &DbErr,
) -> AppError {
    match check_identifiers(conn, identifiers, exclude_client).await {
        Err(err) => err,
        Ok(_) => {
            tracing::warn!(
                ?exclude_client,
                error = %cause,
                "Identifier insert conflicted but no holder was found on recheck"
            );
            AppError::DuplicateIdentifiers {
                message: "Un identifiant soumis vient d'être enregistré pour un autre client"
                    .into(),
                duplicates: Vec::new(),
            }
        }
    }
}
