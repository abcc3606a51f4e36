//! Field-level comparison of two client states.
//!
//! The change set produced here is what an `UPDATE` history row stores. Keys are the camelCase
//! names the API uses for each field.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifier::ContactIdentifierInput;
use crate::priority::Priority;

/// The search a client is primarily linked to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnapshot {
    pub general_reference: String,
    pub detailed_reference: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Everything about a client that participates in diffing and full-snapshot history rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    pub nickname: Option<String>,
    pub surname: Option<String>,
    pub first_name: Option<String>,
    pub description: Option<String>,
    pub requestor: Option<String>,
    pub priority: Priority,
    pub external_help: bool,
    /// First linked search only; additional links are not compared.
    pub search: Option<SearchSnapshot>,
    pub contact_identifiers: Vec<ContactIdentifierInput>,
}

/// Old and new value of one changed field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Sparse map from field name to its change. Empty when nothing changed.
pub type ChangeSet = BTreeMap<String, FieldChange>;

/// Treat empty and whitespace-only strings like an absent value.
pub fn unset_if_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Compute the change set between the stored state and the proposed one.
pub fn diff(old: &ClientSnapshot, new: &ClientSnapshot) -> ChangeSet {
    let mut changes = ChangeSet::new();

    let text_fields: [(&str, &Option<String>, &Option<String>); 5] = [
        ("nickname", &old.nickname, &new.nickname),
        ("surname", &old.surname, &new.surname),
        ("firstName", &old.first_name, &new.first_name),
        ("description", &old.description, &new.description),
        ("requestor", &old.requestor, &new.requestor),
    ];
    for (name, before, after) in text_fields {
        compare_text(&mut changes, name, before.as_deref(), after.as_deref());
    }

    if old.priority != new.priority {
        record(&mut changes, "priority", &old.priority, &new.priority);
    }
    if old.external_help != new.external_help {
        record(
            &mut changes,
            "externalHelp",
            &old.external_help,
            &new.external_help,
        );
    }

    let (old_search, new_search) = (old.search.as_ref(), new.search.as_ref());
    compare_text(
        &mut changes,
        "generalReference",
        old_search.map(|s| s.general_reference.as_str()),
        new_search.map(|s| s.general_reference.as_str()),
    );
    compare_text(
        &mut changes,
        "detailedReference",
        old_search.and_then(|s| s.detailed_reference.as_deref()),
        new_search.and_then(|s| s.detailed_reference.as_deref()),
    );
    let old_start = old_search.and_then(|s| s.start_date);
    let new_start = new_search.and_then(|s| s.start_date);
    if old_start != new_start {
        record(&mut changes, "startDate", &old_start, &new_start);
    }
    let old_end = old_search.and_then(|s| s.end_date);
    let new_end = new_search.and_then(|s| s.end_date);
    if old_end != new_end {
        record(&mut changes, "endDate", &old_end, &new_end);
    }

    if identifier_set(&old.contact_identifiers) != identifier_set(&new.contact_identifiers) {
        record(
            &mut changes,
            "contactIdentifiers",
            &old.contact_identifiers,
            &new.contact_identifiers,
        );
    }

    changes
}

fn compare_text(changes: &mut ChangeSet, name: &str, old: Option<&str>, new: Option<&str>) {
    let (old, new) = (unset_if_blank(old), unset_if_blank(new));
    if old != new {
        record(changes, name, &old, &new);
    }
}

fn record<T: Serialize + ?Sized>(changes: &mut ChangeSet, name: &str, old: &T, new: &T) {
    changes.insert(
        name.to_string(),
        FieldChange {
            old: serde_json::to_value(old).unwrap_or(Value::Null),
            new: serde_json::to_value(new).unwrap_or(Value::Null),
        },
    );
}

/// Identifier list as a sorted set of tuples, ignoring position.
fn identifier_set(list: &[ContactIdentifierInput]) -> Vec<(&str, &str, Option<&str>)> {
    let mut set: Vec<_> = list
        .iter()
        .map(|i| {
            (
                i.account_number.as_str(),
                i.account_type.as_str(),
                unset_if_blank(i.info.as_deref()),
            )
        })
        .collect();
    set.sort_unstable();
    set
}
