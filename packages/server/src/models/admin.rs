use common::Priority;
use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCount {
    pub priority: Priority,
    #[schema(example = 12)]
    pub count: u64,
}

/// Dashboard counters.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[schema(example = 5)]
    pub users: u64,
    /// Clients that are not soft-deleted.
    #[schema(example = 153)]
    pub active_clients: u64,
    #[schema(example = 7)]
    pub deleted_clients: u64,
    pub contact_identifiers: u64,
    pub searches: u64,
    pub history_entries: u64,
    /// Active clients per priority, every priority listed.
    pub clients_by_priority: Vec<PriorityCount>,
}
