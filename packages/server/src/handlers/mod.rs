pub mod admin;
pub mod analytics;
pub mod auth;
pub mod category;
pub mod client;
pub mod user;
