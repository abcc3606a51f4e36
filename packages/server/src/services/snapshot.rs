use common::{ClientSnapshot, ContactIdentifierInput, SearchSnapshot};
use sea_orm::*;
use serde_json::Value;

use crate::entity::{client, contact_identifier, search, search_client};

/// `first_name surname` when either is set, then the nickname, then the slug.
pub fn display_name(client: &client::Model) -> String {
    let full_name = [client.first_name.as_deref(), client.surname.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        return full_name;
    }
    client
        .nickname
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| client.slug.clone(), str::to_string)
}

pub fn search_snapshot(model: &search::Model) -> SearchSnapshot {
    SearchSnapshot {
        general_reference: model.general_reference.clone(),
        detailed_reference: Some(model.detailed_reference.clone()).filter(|s| !s.is_empty()),
        start_date: model.start_date,
        end_date: model.end_date,
    }
}

/// The search with the lowest id among the client's links.
pub async fn primary_search<C: ConnectionTrait>(
    conn: &C,
    client_id: i32,
) -> Result<Option<search::Model>, DbErr> {
    search::Entity::find()
        .filter(
            search::Column::Id.in_subquery(
                sea_orm::sea_query::Query::select()
                    .column(search_client::Column::SearchId)
                    .from(search_client::Entity)
                    .and_where(search_client::Column::ClientId.eq(client_id))
                    .to_owned(),
            ),
        )
        .order_by_asc(search::Column::Id)
        .one(conn)
        .await
}

/// Current state of a client as the diff engine sees it.
pub async fn load_snapshot<C: ConnectionTrait>(
    conn: &C,
    client: &client::Model,
) -> Result<ClientSnapshot, DbErr> {
    let identifiers = contact_identifier::Entity::find()
        .filter(contact_identifier::Column::ClientId.eq(client.id))
        .order_by_asc(contact_identifier::Column::Position)
        .all(conn)
        .await?;
    let search = primary_search(conn, client.id).await?;

    Ok(ClientSnapshot {
        nickname: client.nickname.clone(),
        surname: client.surname.clone(),
        first_name: client.first_name.clone(),
        description: client.description.clone(),
        requestor: client.requestor.clone(),
        priority: client.priority,
        external_help: client.external_help,
        search: search.as_ref().map(search_snapshot),
        contact_identifiers: identifiers
            .into_iter()
            .map(|i| ContactIdentifierInput {
                account_number: i.account_number,
                account_type: i.account_type,
                info: i.info,
            })
            .collect(),
    })
}

/// Full-record payload stored by `CREATE`, `DELETE` and `DELETE_PERMANENT` history rows.
pub fn full_record(client: &client::Model, snapshot: &ClientSnapshot) -> Value {
    let mut value = serde_json::to_value(snapshot).unwrap_or(Value::Null);
    if let Value::Object(ref mut map) = value {
        map.insert("id".into(), client.id.into());
        map.insert("slug".into(), client.slug.clone().into());
        map.insert("ownerId".into(), client.owner_id.into());
    }
    value
}
