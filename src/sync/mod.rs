//! Document synchronization core.
//!
//! Follows The Elm Architecture:
//! - [`SyncModel`]: the selected document, its editable buffer and the
//!   listing
//! - [`Message`]: user intents and service results
//! - [`update`]: pure state transitions that return [`Effect`]s
//! - [`SyncDriver`]: runs effects against a [`crate::client::DocumentService`]

mod debounce;
mod driver;
mod model;
mod update;

#[cfg(test)]
mod tests;

pub use debounce::{AutosaveDebouncer, DEFAULT_AUTOSAVE_MS};
pub use driver::SyncDriver;
pub use model::{Notification, NotificationLevel, SaveReason, SyncModel, SyncPhase};
pub use update::{Effect, Message, update};
