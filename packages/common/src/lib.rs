pub mod diff;
pub mod history_action;
pub mod identifier;
pub mod priority;
pub mod reference;
pub mod slug;

pub use diff::{ChangeSet, ClientSnapshot, FieldChange, SearchSnapshot};
pub use history_action::HistoryAction;
pub use identifier::{ContactIdentifierInput, IdentifierError};
pub use priority::Priority;
pub use reference::{ClientRef, CompositeId};
