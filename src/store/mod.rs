//! SQLite persistence for users, sessions and documents.
//!
//! One connection sits behind a mutex. Each public method holds the lock only
//! for its own statements, so a multi-statement write is atomic with respect
//! to other callers.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{
    CreateDocumentRequest, Document, DocumentId, DocumentSummary, PublicAuthor,
    UpdateDocumentRequest,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database at {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to create directory {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set pragma {pragma}")]
    Pragma {
        pragma: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration failed: {message}")]
    Migration { message: String },

    #[error("query failed")]
    Query {
        #[from]
        source: rusqlite::Error,
    },

    #[error("a user with this email already exists")]
    EmailTaken,

    #[error("database lock poisoned")]
    LockPoisoned,
}

/// Public projection of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// A stored user, including the credential hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn public(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if needed) a database file and bring its schema up to date.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|source| StoreError::Pragma {
                pragma: "journal_mode",
                source,
            })?;
        tracing::info!(path = %path.display(), "opened document database");
        Self::init(conn)
    }

    /// Fresh private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|source| StoreError::Pragma {
                pragma: "foreign_keys",
                source,
            })?;
        Self::migrations()
            .to_latest(&mut conn)
            .map_err(|e| StoreError::Migration {
                message: e.to_string(),
            })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn migrations() -> Migrations<'static> {
        Migrations::new(vec![M::up(include_str!("migrations/001_init.sql"))])
    }

    /// Run `f` against the shared connection
    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&conn)?)
    }

    // Users

    /// # Errors
    /// Returns [`StoreError::EmailTaken`] when the email is already registered.
    pub fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError> {
        let now = Utc::now();
        let record = UserRecord {
            id: uuid::Uuid::now_v7().to_string(),
            email: email.to_string(),
            name: name.map(ToString::to_string),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        let inserted = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.email,
                    record.name,
                    record.password_hash,
                    record.created_at,
                    record.updated_at
                ],
            )
        });
        match inserted {
            Ok(_) => Ok(record),
            Err(StoreError::Query { source }) if is_unique_violation(&source) => {
                Err(StoreError::EmailTaken)
            }
            Err(err) => Err(err),
        }
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, name, password_hash, created_at, updated_at
                 FROM users WHERE email = ?1",
                params![email],
                user_from_row,
            )
            .optional()
        })
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, name, password_hash, created_at, updated_at
                 FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()
        })
    }

    // Sessions

    /// # Errors
    /// Returns an error if the insert fails.
    pub fn create_session(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token_hash, user_id, Utc::now(), expires_at],
            )
        })?;
        Ok(())
    }

    /// Owner of an unexpired session, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn session_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        let found: Option<(String, DateTime<Utc>)> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?1",
                params![token_hash],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })?;
        Ok(found.and_then(|(user_id, expires_at)| (expires_at > now).then_some(user_id)))
    }

    /// # Errors
    /// Returns an error if the delete fails.
    pub fn delete_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM sessions WHERE token_hash = ?1",
                params![token_hash],
            )
        })
        .map(|n| n > 0)
    }

    /// Drop every session that expired before `now`; returns how many.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![now],
            )
        })
    }

    // Documents

    /// Summaries of the owner's documents, most recently updated first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list_documents(&self, owner_id: &str) -> Result<Vec<DocumentSummary>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, is_public, created_at, updated_at
                 FROM documents WHERE owner_id = ?1
                 ORDER BY updated_at DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![owner_id], |row| {
                Ok(DocumentSummary {
                    id: DocumentId::new(row.get::<_, String>(0)?),
                    title: row.get(1)?,
                    is_public: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?;
            rows.collect()
        })
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub fn get_document(
        &self,
        owner_id: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        self.with_conn(|conn| select_document(conn, owner_id, id))
    }

    /// # Errors
    /// Returns an error if the insert fails.
    pub fn create_document(
        &self,
        owner_id: &str,
        request: &CreateDocumentRequest,
    ) -> Result<Document, StoreError> {
        let now = Utc::now();
        let document = Document {
            id: DocumentId::generate(),
            title: request.title.clone(),
            content: request.content.clone().unwrap_or_default(),
            is_public: request.is_public.unwrap_or(false),
            created_at: now,
            updated_at: now,
            owner_id: owner_id.to_string(),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, owner_id, title, content, is_public, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    document.id.as_str(),
                    document.owner_id,
                    document.title,
                    document.content,
                    document.is_public,
                    document.created_at,
                    document.updated_at
                ],
            )
        })?;
        Ok(document)
    }

    /// Apply the provided fields and advance `updated_at`.
    ///
    /// Returns `None` when the document does not exist or belongs to someone
    /// else.
    ///
    /// # Errors
    /// Returns an error if a statement fails.
    pub fn update_document(
        &self,
        owner_id: &str,
        id: &DocumentId,
        request: &UpdateDocumentRequest,
    ) -> Result<Option<Document>, StoreError> {
        self.with_conn(|conn| {
            let Some(mut document) = select_document(conn, owner_id, id)? else {
                return Ok(None);
            };
            if let Some(title) = &request.title {
                document.title.clone_from(title);
            }
            if let Some(content) = &request.content {
                document.content.clone_from(content);
            }
            if let Some(is_public) = request.is_public {
                document.is_public = is_public;
            }
            // Strictly increasing even when two writes land in the same tick.
            document.updated_at = Utc::now().max(document.updated_at + Duration::microseconds(1));
            conn.execute(
                "UPDATE documents SET title = ?1, content = ?2, is_public = ?3, updated_at = ?4
                 WHERE id = ?5 AND owner_id = ?6",
                params![
                    document.title,
                    document.content,
                    document.is_public,
                    document.updated_at,
                    document.id.as_str(),
                    owner_id
                ],
            )?;
            Ok(Some(document))
        })
    }

    /// # Errors
    /// Returns an error if the delete fails.
    pub fn delete_document(&self, owner_id: &str, id: &DocumentId) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM documents WHERE id = ?1 AND owner_id = ?2",
                params![id.as_str(), owner_id],
            )
        })
        .map(|n| n > 0)
    }

    /// A public document and its author, regardless of the caller.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn get_public_document(
        &self,
        id: &DocumentId,
    ) -> Result<Option<(Document, PublicAuthor)>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT d.id, d.title, d.content, d.is_public, d.created_at, d.updated_at,
                        d.owner_id, u.name, u.email
                 FROM documents d JOIN users u ON u.id = d.owner_id
                 WHERE d.id = ?1 AND d.is_public = 1",
                params![id.as_str()],
                |row| {
                    let document = document_from_row(row)?;
                    let author = PublicAuthor {
                        name: row.get(7)?,
                        email: row.get(8)?,
                    };
                    Ok((document, author))
                },
            )
            .optional()
        })
    }
}

fn select_document(
    conn: &Connection,
    owner_id: &str,
    id: &DocumentId,
) -> Result<Option<Document>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, title, content, is_public, created_at, updated_at, owner_id
         FROM documents WHERE id = ?1 AND owner_id = ?2",
        params![id.as_str(), owner_id],
        document_from_row,
    )
    .optional()
}

fn document_from_row(row: &Row<'_>) -> Result<Document, rusqlite::Error> {
    Ok(Document {
        id: DocumentId::new(row.get::<_, String>(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        is_public: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        owner_id: row.get(6)?,
    })
}

fn user_from_row(row: &Row<'_>) -> Result<UserRecord, rusqlite::Error> {
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
