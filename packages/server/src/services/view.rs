use std::collections::HashMap;

use chrono::Datelike;
use common::CompositeId;
use sea_orm::*;

use crate::entity::{client, client_category, contact_identifier, search, search_client};
use crate::models::client::{ClientResponse, ContactIdentifierResponse, SearchResponse};

/// Load identifiers, search links and categories for a page of clients in four queries.
pub async fn client_responses<C: ConnectionTrait>(
    conn: &C,
    clients: Vec<client::Model>,
) -> Result<Vec<ClientResponse>, DbErr> {
    if clients.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = clients.iter().map(|c| c.id).collect();

    let mut identifiers: HashMap<i32, Vec<contact_identifier::Model>> = HashMap::new();
    for row in contact_identifier::Entity::find()
        .filter(contact_identifier::Column::ClientId.is_in(ids.clone()))
        .order_by_asc(contact_identifier::Column::Position)
        .all(conn)
        .await?
    {
        identifiers.entry(row.client_id).or_default().push(row);
    }

    let links = search_client::Entity::find()
        .filter(search_client::Column::ClientId.is_in(ids.clone()))
        .all(conn)
        .await?;
    let searches: HashMap<i32, search::Model> = search::Entity::find()
        .filter(search::Column::Id.is_in(links.iter().map(|l| l.search_id).collect::<Vec<_>>()))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let mut searches_by_client: HashMap<i32, Vec<SearchResponse>> = HashMap::new();
    for link in links {
        if let Some(s) = searches.get(&link.search_id) {
            searches_by_client
                .entry(link.client_id)
                .or_default()
                .push(s.clone().into());
        }
    }
    for list in searches_by_client.values_mut() {
        list.sort_by_key(|s| s.id);
    }

    let mut categories: HashMap<i32, Vec<i32>> = HashMap::new();
    for (client_id, category_id) in client_category::Entity::find()
        .filter(client_category::Column::ClientId.is_in(ids))
        .select_only()
        .column(client_category::Column::ClientId)
        .column(client_category::Column::CategoryId)
        .order_by_asc(client_category::Column::CategoryId)
        .into_tuple::<(i32, i32)>()
        .all(conn)
        .await?
    {
        categories.entry(client_id).or_default().push(category_id);
    }

    Ok(clients
        .into_iter()
        .map(|c| {
            let year = c.created_at.year();
            let contact_identifiers = identifiers
                .remove(&c.id)
                .unwrap_or_default()
                .into_iter()
                .map(|i| ContactIdentifierResponse {
                    composite_id: CompositeId::new(year, c.id, i.position).to_string(),
                    id: i.id,
                    account_number: i.account_number,
                    account_type: i.account_type,
                    info: i.info,
                    position: i.position,
                })
                .collect();
            ClientResponse {
                contact_identifiers,
                searches: searches_by_client.remove(&c.id).unwrap_or_default(),
                category_ids: categories.remove(&c.id).unwrap_or_default(),
                id: c.id,
                slug: c.slug,
                nickname: c.nickname,
                surname: c.surname,
                first_name: c.first_name,
                description: c.description,
                requestor: c.requestor,
                priority: c.priority,
                external_help: c.external_help,
                owner_id: c.owner_id,
                deleted_at: c.deleted_at,
                created_at: c.created_at,
                updated_at: c.updated_at,
                warnings: None,
            }
        })
        .collect())
}

pub async fn client_response<C: ConnectionTrait>(
    conn: &C,
    client: client::Model,
) -> Result<ClientResponse, DbErr> {
    client_responses(conn, vec![client])
        .await?
        .pop()
        .ok_or_else(|| DbErr::Custom("client response was not built".into()))
}
