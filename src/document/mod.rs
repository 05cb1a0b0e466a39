//! Documents and their markdown rendering.
//!
//! This module handles:
//! - The document model shared by the store, the REST API and the sync core
//! - Request payloads and field validation
//! - Rendering markdown source to HTML with comrak

mod render;
mod types;

pub use render::{create_options, render_html};
pub use types::{
    CreateDocumentRequest, Document, DocumentEnvelope, DocumentId, DocumentSummary,
    MAX_TITLE_CHARS, MessageResponse, PLACEHOLDER_TEXT, PublicAuthor, PublicDocument,
    UpdateDocumentRequest, ValidationError, quick_title, starter_content, validate_title,
};
