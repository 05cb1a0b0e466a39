//! Core document types shared by the store, the API, and the sync core.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted document title, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

/// Shown in the editor when no document is selected.
pub const PLACEHOLDER_TEXT: &str =
    "# Welcome to Markdraft\n\nCreate your first document to get started!";

/// Opaque document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh, time-ordered id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A markdown document owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Authoritative markdown source
    pub content: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    /// Advances only when a write is persisted
    pub updated_at: DateTime<Utc>,
    pub owner_id: String,
}

impl Document {
    /// Listing projection of this document.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            is_public: self.is_public,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Listing projection of a [`Document`] without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentSummary {
    /// Mirror the listing-visible fields of a freshly persisted document.
    pub fn apply(&mut self, document: &Document) {
        self.title.clone_from(&document.title);
        self.is_public = document.is_public;
        self.updated_at = document.updated_at;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl CreateDocumentRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: None,
            is_public: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub const fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = Some(is_public);
        self
    }

    /// Check the request against the document field rules.
    ///
    /// # Errors
    /// Returns the first rule the request violates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl UpdateDocumentRequest {
    /// Full write-back of a document's editable fields.
    pub fn full(title: &str, content: &str, is_public: bool) -> Self {
        Self {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            is_public: Some(is_public),
        }
    }

    /// # Errors
    /// Returns an error when a provided title is empty or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

/// Author details attached to a publicly shared document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAuthor {
    pub name: Option<String>,
    pub email: String,
}

/// A public document as served to anonymous readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicDocument {
    #[serde(flatten)]
    pub document: Document,
    pub user: PublicAuthor,
}

/// `{message, document}` body returned by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEnvelope {
    pub message: String,
    pub document: Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A rejected field value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    TitleRequired,
    #[error("title is too long ({len} > {MAX_TITLE_CHARS} characters)")]
    TitleTooLong { len: usize },
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("password is required")]
    PasswordRequired,
}

impl ValidationError {
    /// Name of the offending field, used in API error details.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::TitleRequired | Self::TitleTooLong { .. } => "title",
            Self::InvalidEmail => "email",
            Self::PasswordTooShort { .. } | Self::PasswordRequired => "password",
        }
    }
}

/// Titles must hold between 1 and [`MAX_TITLE_CHARS`] characters.
///
/// # Errors
/// Returns [`ValidationError::TitleRequired`] or [`ValidationError::TitleTooLong`].
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.chars().count();
    if len == 0 {
        return Err(ValidationError::TitleRequired);
    }
    if len > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong { len });
    }
    Ok(())
}

/// Starter content for a newly created document.
pub fn starter_content(title: &str) -> String {
    format!("# {title}\n\nStart writing your markdown here...")
}

/// Title used by quick-create, e.g. `Document 2026-10-18`.
pub fn quick_title(today: chrono::NaiveDate) -> String {
    format!("Document {}", today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        let at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        Document {
            id: DocumentId::from("doc-1"),
            title: "Notes".to_string(),
            content: "# Notes".to_string(),
            is_public: true,
            created_at: at,
            updated_at: at,
            owner_id: "user-1".to_string(),
        }
    }

    #[test]
    fn test_validate_title_bounds() {
        assert_eq!(validate_title(""), Err(ValidationError::TitleRequired));
        assert!(validate_title("a").is_ok());
        assert!(validate_title(&"é".repeat(MAX_TITLE_CHARS)).is_ok());
        assert_eq!(
            validate_title(&"x".repeat(MAX_TITLE_CHARS + 1)),
            Err(ValidationError::TitleTooLong { len: 256 })
        );
    }

    #[test]
    fn test_update_request_without_title_is_valid() {
        let req = UpdateDocumentRequest {
            content: Some(String::new()),
            ..UpdateDocumentRequest::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_document_serializes_camel_case() {
        let json = serde_json::to_value(sample_document()).unwrap();
        assert_eq!(json["isPublic"], true);
        assert_eq!(json["ownerId"], "user-1");
        assert_eq!(json["id"], "doc-1");
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_create_request_omits_unset_fields() {
        let json = serde_json::to_string(&CreateDocumentRequest::new("T")).unwrap();
        assert_eq!(json, r#"{"title":"T"}"#);
    }

    #[test]
    fn test_summary_apply_mirrors_listing_fields() {
        let doc = sample_document();
        let mut summary = doc.summary();
        let mut renamed = doc.clone();
        renamed.title = "Renamed".to_string();
        renamed.is_public = false;
        renamed.updated_at += chrono::Duration::seconds(5);
        summary.apply(&renamed);
        assert_eq!(summary.title, "Renamed");
        assert!(!summary.is_public);
        assert_eq!(summary.updated_at, renamed.updated_at);
        assert_eq!(summary.created_at, doc.created_at);
    }

    #[test]
    fn test_public_document_flattens_fields() {
        let public = PublicDocument {
            document: sample_document(),
            user: PublicAuthor {
                name: None,
                email: "a@example.com".to_string(),
            },
        };
        let json = serde_json::to_value(&public).unwrap();
        assert_eq!(json["title"], "Notes");
        assert_eq!(json["user"]["email"], "a@example.com");
        let back: PublicDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, public);
    }

    #[test]
    fn test_quick_title_uses_iso_date() {
        let day = chrono::NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(quick_title(day), "Document 2026-10-18");
        assert!(starter_content("Plan").starts_with("# Plan\n\n"));
    }
}
