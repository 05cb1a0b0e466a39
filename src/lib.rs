// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. export::ExportFormat)
    clippy::module_name_repetitions
)]

//! # Markdraft
//!
//! Markdown documents with a REST sync server and a terminal editor.
//!
//! Markdraft provides:
//! - A document API (axum + SQLite) with bearer-token accounts
//! - An editor with live preview and debounced autosave
//! - Export to markdown, standalone HTML and printable PDF pages
//!
//! ## Architecture
//!
//! The editing core uses The Elm Architecture (TEA) pattern:
//! - **Model**: [`sync::SyncModel`], the selected document and its buffer
//! - **Message**: user intents and completed service calls
//! - **Update**: pure state transitions returning effects
//! - **View**: the [`tui`] front end, which only reads the model
//!
//! ## Modules
//!
//! - [`document`]: Document model, validation and markdown rendering
//! - [`store`]: SQLite persistence
//! - [`auth`]: Password hashing and bearer tokens
//! - [`server`]: REST API
//! - [`client`]: Typed API client and the [`client::DocumentService`] seam
//! - [`sync`]: Selection, buffer and autosave state machine
//! - [`editor`]: Text area used by the terminal editor
//! - [`tui`]: Terminal editor
//! - [`export`]: Markdown, HTML and PDF export
//! - [`highlight`]: Syntax highlighting
//! - [`config`]: Saved command-line defaults

pub mod auth;
pub mod client;
pub mod config;
pub mod document;
pub mod editor;
pub mod export;
pub mod highlight;
pub mod server;
pub mod store;
pub mod sync;
pub mod tui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{DocumentService, HttpDocumentService, ServiceError};
    pub use crate::document::{Document, DocumentId, DocumentSummary};
    pub use crate::sync::{Message, SyncDriver, SyncModel};
}
