use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const MAX_ACCOUNT_NUMBER_LEN: usize = 64;
pub const MAX_ACCOUNT_TYPE_LEN: usize = 32;
pub const MAX_INFO_LEN: usize = 1000;

/// A contact channel as submitted by a client, e.g. a phone number or a Telegram handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactIdentifierInput {
    #[schema(example = "+33 6 12 34 56 78")]
    pub account_number: String,
    #[schema(example = "Phone")]
    pub account_type: String,
    #[serde(default)]
    pub info: Option<String>,
}

/// Rejections raised before any identifier reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("L'identifiant n°{position} n'a pas de numéro de compte")]
    MissingAccountNumber { position: usize },
    #[error("L'identifiant n°{position} n'a pas de type de compte")]
    MissingAccountType { position: usize },
    #[error("L'identifiant n°{position} dépasse la longueur autorisée pour {field}")]
    TooLong {
        position: usize,
        field: &'static str,
    },
    #[error("Le numéro {account_number} ({account_type}) apparaît plusieurs fois dans la soumission")]
    DuplicateInSubmission {
        account_number: String,
        account_type: String,
    },
}

impl ContactIdentifierInput {
    /// Canonical form used for both the duplicate scan and storage.
    ///
    /// Whitespace is removed from the account number, the other fields are trimmed and an
    /// empty `info` becomes `None`. The account type keeps its case.
    pub fn normalized(&self) -> Self {
        Self {
            account_number: self
                .account_number
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
            account_type: self.account_type.trim().to_string(),
            info: self
                .info
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    /// `(account_number, account_type)`, the pair that must be globally unique.
    pub fn key(&self) -> (&str, &str) {
        (&self.account_number, &self.account_type)
    }
}

/// Normalize and validate a submitted identifier list.
///
/// Fails on the first invalid entry, then on the first `(account_number, account_type)` pair that
/// occurs twice. The returned list keeps submission order.
pub fn prepare_identifiers(
    submitted: &[ContactIdentifierInput],
) -> Result<Vec<ContactIdentifierInput>, IdentifierError> {
    let normalized: Vec<ContactIdentifierInput> =
        submitted.iter().map(ContactIdentifierInput::normalized).collect();

    for (i, ident) in normalized.iter().enumerate() {
        let position = i + 1;
        if ident.account_number.is_empty() {
            return Err(IdentifierError::MissingAccountNumber { position });
        }
        if ident.account_type.is_empty() {
            return Err(IdentifierError::MissingAccountType { position });
        }
        if ident.account_number.chars().count() > MAX_ACCOUNT_NUMBER_LEN {
            return Err(IdentifierError::TooLong {
                position,
                field: "accountNumber",
            });
        }
        if ident.account_type.chars().count() > MAX_ACCOUNT_TYPE_LEN {
            return Err(IdentifierError::TooLong {
                position,
                field: "accountType",
            });
        }
        if ident
            .info
            .as_ref()
            .is_some_and(|info| info.chars().count() > MAX_INFO_LEN)
        {
            return Err(IdentifierError::TooLong {
                position,
                field: "info",
            });
        }
    }

    let mut seen = HashSet::new();
    for ident in &normalized {
        if !seen.insert(ident.key()) {
            return Err(IdentifierError::DuplicateInSubmission {
                account_number: ident.account_number.clone(),
                account_type: ident.account_type.clone(),
            });
        }
    }

    Ok(normalized)
}
