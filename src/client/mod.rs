//! Typed client for the document API.
//!
//! [`DocumentService`] is the seam the sync core talks through. The HTTP
//! implementation maps response statuses onto [`ServiceError`] so callers
//! never see transport details.

mod session;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use session::{Session, clear_session, load_session, save_session};

use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::document::{
    CreateDocumentRequest, Document, DocumentEnvelope, DocumentId, DocumentSummary,
    PublicDocument, UpdateDocumentRequest,
};

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// Failure of a document service call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("document not found")]
    NotFound,
    #[error("invalid data: {0}")]
    Validation(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// CRUD over the caller's documents.
#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn list(&self) -> Result<Vec<DocumentSummary>, ServiceError>;
    async fn get(&self, id: &DocumentId) -> Result<Document, ServiceError>;
    async fn create(&self, request: &CreateDocumentRequest) -> Result<Document, ServiceError>;
    async fn update(
        &self,
        id: &DocumentId,
        request: &UpdateDocumentRequest,
    ) -> Result<Document, ServiceError>;
    async fn delete(&self, id: &DocumentId) -> Result<(), ServiceError>;
    /// Read a public document; needs no credential.
    async fn get_public(&self, id: &DocumentId) -> Result<Document, ServiceError>;
}

/// [`DocumentService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDocumentService {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDocumentService {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: trim_base(base_url.into()),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn list(&self) -> Result<Vec<DocumentSummary>, ServiceError> {
        let response = self
            .authorized(self.http.get(self.url("/documents")))
            .send()
            .await?;
        decode(response).await
    }

    async fn get(&self, id: &DocumentId) -> Result<Document, ServiceError> {
        let response = self
            .authorized(self.http.get(self.url(&format!("/documents/{id}"))))
            .send()
            .await?;
        decode(response).await
    }

    async fn create(&self, request: &CreateDocumentRequest) -> Result<Document, ServiceError> {
        let response = self
            .authorized(self.http.post(self.url("/documents")))
            .json(request)
            .send()
            .await?;
        decode::<DocumentEnvelope>(response)
            .await
            .map(|envelope| envelope.document)
    }

    async fn update(
        &self,
        id: &DocumentId,
        request: &UpdateDocumentRequest,
    ) -> Result<Document, ServiceError> {
        let response = self
            .authorized(self.http.put(self.url(&format!("/documents/{id}"))))
            .json(request)
            .send()
            .await?;
        decode::<DocumentEnvelope>(response)
            .await
            .map(|envelope| envelope.document)
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), ServiceError> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("/documents/{id}"))))
            .send()
            .await?;
        decode::<Value>(response).await.map(|_| ())
    }

    async fn get_public(&self, id: &DocumentId) -> Result<Document, ServiceError> {
        let response = self
            .http
            .get(self.url(&format!("/documents/public/{id}")))
            .send()
            .await?;
        decode::<PublicDocument>(response)
            .await
            .map(|public| public.document)
    }
}

/// Account endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: trim_base(base_url.into()),
        }
    }

    /// # Errors
    /// Returns the server's rejection or a network failure.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ServiceError> {
        let response = self
            .http
            .post(format!("{}/auth/register", self.base_url))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// # Errors
    /// Returns the server's rejection or a network failure.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ServiceError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// Revoke `token` on the server.
    ///
    /// # Errors
    /// Returns the server's rejection or a network failure.
    pub async fn logout(&self, token: &str) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        decode::<Value>(response).await.map(|_| ())
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(ServiceError::from);
    }
    let body: Value = response.json().await.unwrap_or(Value::Null);
    Err(error_for_status(status, &body))
}

/// Map a failed response onto the service error taxonomy.
fn error_for_status(status: StatusCode, body: &Value) -> ServiceError {
    let message = error_message(body).unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound,
        StatusCode::BAD_REQUEST => ServiceError::Validation(message),
        StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(message),
        _ => ServiceError::Network(message),
    }
}

fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?.as_str()?.to_string();
    let details: Vec<&str> = body
        .get("details")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("message").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if details.is_empty() {
        Some(error)
    } else {
        Some(format!("{error}: {}", details.join("; ")))
    }
}
