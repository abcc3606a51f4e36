use chrono::{DateTime, NaiveDate, Utc};
use common::{ContactIdentifierInput, HistoryAction, Priority, SearchSnapshot};
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, clean_text, double_option, validate_text_len};
use crate::error::AppError;

const MAX_NAME_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 10_000;
const MAX_REFERENCE_LEN: usize = 255;
const MAX_CATEGORIES: usize = 50;
const MAX_IDENTIFIERS: usize = 100;

/// Search reference a client is attached to.
#[derive(Clone, Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    #[schema(example = "ENQ-2026-014")]
    pub general_reference: String,
    #[schema(example = "Lyon")]
    pub detailed_reference: Option<String>,
    #[schema(example = "2026-03-01")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-06-30")]
    pub end_date: Option<NaiveDate>,
}

impl SearchInput {
    /// Trimmed form, with a blank detailed reference dropped.
    pub fn to_snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            general_reference: self.general_reference.trim().to_string(),
            detailed_reference: clean_text(self.detailed_reference.as_deref()),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Request body for creating a client.
#[derive(Clone, Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[schema(example = "JD")]
    pub nickname: Option<String>,
    #[schema(example = "Dupont")]
    pub surname: Option<String>,
    #[schema(example = "Jean")]
    pub first_name: Option<String>,
    pub description: Option<String>,
    #[schema(example = "Service social")]
    pub requestor: Option<String>,
    /// Defaults to `Medium`.
    pub priority: Option<Priority>,
    #[serde(default)]
    pub external_help: bool,
    #[serde(default)]
    pub contact_identifiers: Vec<ContactIdentifierInput>,
    pub search: Option<SearchInput>,
    #[serde(default)]
    pub category_ids: Vec<i32>,
    /// Confirms linking to a search whose reference pair already exists.
    #[serde(default)]
    pub link_existing_search: bool,
}

/// Request body for updating a client (PATCH semantics).
///
/// Nullable fields distinguish absent (keep) from `null` (clear), and serialize back the same
/// way so an echoed payload can be resubmitted. Contact identifiers are always rewritten; when
/// omitted, the current list is written back.
#[derive(Clone, Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub nickname: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub surname: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub first_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub requestor: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_help: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_identifiers: Option<Vec<ContactIdentifierInput>>,
    /// Absent keeps the current links, `null` removes them, a value replaces them.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<SearchInput>)]
    pub search: Option<Option<SearchInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<i32>>,
    #[serde(default)]
    pub link_existing_search: bool,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClientListQuery {
    /// Matches names, description and account numbers, or a `YY-ClientId-Position` id.
    #[param(example = "dupont")]
    pub search: Option<String>,
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteClientQuery {
    /// Remove the row instead of soft-deleting it. Admin only.
    #[param(example = false)]
    pub permanent: Option<bool>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactIdentifierResponse {
    pub id: i32,
    #[schema(example = "0612345678")]
    pub account_number: String,
    #[schema(example = "Phone")]
    pub account_type: String,
    pub info: Option<String>,
    #[schema(example = 1)]
    pub position: i32,
    /// `YY-ClientId-Position`.
    #[schema(example = "26-153-1")]
    pub composite_id: String,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub id: i32,
    #[schema(example = "ENQ-2026-014")]
    pub general_reference: String,
    pub detailed_reference: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<crate::entity::search::Model> for SearchResponse {
    fn from(m: crate::entity::search::Model) -> Self {
        Self {
            id: m.id,
            general_reference: m.general_reference,
            detailed_reference: clean_text(Some(&m.detailed_reference)),
            start_date: m.start_date,
            end_date: m.end_date,
        }
    }
}

/// Non-blocking notice: the account number is already used by another client under another type.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierWarning {
    #[schema(example = "0612345678")]
    pub account_number: String,
    /// Type under which the other client uses the number.
    #[schema(example = "Phone")]
    pub existing_account_type: String,
    #[schema(example = 17)]
    pub client_id: i32,
    #[schema(example = "Jean Dupont")]
    pub client_name: String,
    #[schema(example = "jean-dupont")]
    pub client_slug: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    #[schema(example = 153)]
    pub id: i32,
    #[schema(example = "jean-dupont")]
    pub slug: String,
    pub nickname: Option<String>,
    pub surname: Option<String>,
    pub first_name: Option<String>,
    pub description: Option<String>,
    pub requestor: Option<String>,
    pub priority: Priority,
    pub external_help: bool,
    pub owner_id: i32,
    pub contact_identifiers: Vec<ContactIdentifierResponse>,
    pub searches: Vec<SearchResponse>,
    pub category_ids: Vec<i32>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present when a contact number is shared with another client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<IdentifierWarning>>,
}

impl ClientResponse {
    pub fn with_warnings(mut self, warnings: Vec<IdentifierWarning>) -> Self {
        if !warnings.is_empty() {
            self.warnings = Some(warnings);
        }
        self
    }
}

/// Returned with status 200 when the submitted search reference already exists and the caller
/// has not confirmed linking to it. Nothing was written.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequiresValidationResponse {
    #[schema(example = true)]
    pub requires_validation: bool,
    pub existing_search: SearchResponse,
    /// The submitted payload, echoed back for resubmission.
    #[schema(value_type = Object)]
    pub form_data: serde_json::Value,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClientListResponse {
    pub data: Vec<ClientResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub id: i32,
    pub client_id: i32,
    pub user_id: i32,
    /// Username of the actor, if the account still exists.
    pub username: Option<String>,
    pub action: HistoryAction,
    #[schema(value_type = Object)]
    pub changes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_search(search: &SearchInput) -> Result<(), AppError> {
    let general = search.general_reference.trim();
    if general.is_empty() {
        return Err(AppError::Validation(
            "La référence générale de la recherche est obligatoire".into(),
        ));
    }
    validate_text_len("generalReference", Some(general), MAX_REFERENCE_LEN)?;
    validate_text_len(
        "detailedReference",
        search.detailed_reference.as_deref(),
        MAX_REFERENCE_LEN,
    )?;
    if let (Some(start), Some(end)) = (search.start_date, search.end_date)
        && start > end
    {
        return Err(AppError::Validation(
            "La date de début doit précéder la date de fin".into(),
        ));
    }
    Ok(())
}

fn validate_names(
    nickname: Option<&str>,
    surname: Option<&str>,
    first_name: Option<&str>,
    description: Option<&str>,
    requestor: Option<&str>,
) -> Result<(), AppError> {
    validate_text_len("nickname", nickname, MAX_NAME_LEN)?;
    validate_text_len("surname", surname, MAX_NAME_LEN)?;
    validate_text_len("firstName", first_name, MAX_NAME_LEN)?;
    validate_text_len("description", description, MAX_DESCRIPTION_LEN)?;
    validate_text_len("requestor", requestor, MAX_NAME_LEN)
}

fn validate_lists(identifiers: Option<usize>, categories: Option<usize>) -> Result<(), AppError> {
    if identifiers.is_some_and(|n| n > MAX_IDENTIFIERS) {
        return Err(AppError::Validation(format!(
            "Un client ne peut pas avoir plus de {MAX_IDENTIFIERS} identifiants"
        )));
    }
    if categories.is_some_and(|n| n > MAX_CATEGORIES) {
        return Err(AppError::Validation(format!(
            "Un client ne peut pas avoir plus de {MAX_CATEGORIES} catégories"
        )));
    }
    Ok(())
}

pub fn validate_create_client(req: &CreateClientRequest) -> Result<(), AppError> {
    validate_names(
        req.nickname.as_deref(),
        req.surname.as_deref(),
        req.first_name.as_deref(),
        req.description.as_deref(),
        req.requestor.as_deref(),
    )?;
    validate_lists(Some(req.contact_identifiers.len()), Some(req.category_ids.len()))?;
    if let Some(ref search) = req.search {
        validate_search(search)?;
    }
    Ok(())
}

pub fn validate_update_client(req: &UpdateClientRequest) -> Result<(), AppError> {
    validate_names(
        req.nickname.as_ref().and_then(|v| v.as_deref()),
        req.surname.as_ref().and_then(|v| v.as_deref()),
        req.first_name.as_ref().and_then(|v| v.as_deref()),
        req.description.as_ref().and_then(|v| v.as_deref()),
        req.requestor.as_ref().and_then(|v| v.as_deref()),
    )?;
    validate_lists(
        req.contact_identifiers.as_ref().map(Vec::len),
        req.category_ids.as_ref().map(Vec::len),
    )?;
    if let Some(Some(ref search)) = req.search {
        validate_search(search)?;
    }
    Ok(())
}
