//! Client record workflows shared by the HTTP handlers.

pub mod access;
pub mod clients;
pub mod history;
pub mod snapshot;
pub mod uniqueness;
pub mod view;
