pub mod category;
pub mod client;
pub mod client_category;
pub mod client_history;
pub mod contact_identifier;
pub mod search;
pub mod search_client;
pub mod user;
pub mod user_category;
