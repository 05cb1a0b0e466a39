use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::{Json, Router};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;
use super::error::ApiError;
use crate::auth::{LoginRequest, RegisterRequest};
use crate::document::{
    CreateDocumentRequest, DocumentEnvelope, DocumentId, DocumentSummary, MessageResponse,
    PublicDocument, UpdateDocumentRequest,
};
use crate::store::UserRecord;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/documents/public/{id}", get(get_public_document))
}

/// The authenticated caller, resolved from an `Authorization: Bearer` header.
pub struct AuthUser {
    pub user: UserRecord,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let user = state.auth.authenticate(&token)?;
        Ok(Self { user, token })
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
    })
}

async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::malformed_body(e.body_text()))?;
    let auth = state.auth.clone();
    let response = run_blocking(move || auth.register(&request)).await??;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::malformed_body(e.body_text()))?;
    let auth = state.auth.clone();
    Ok(Json(run_blocking(move || auth.login(&request)).await??))
}

/// Password hashing is CPU-bound; keep it off the async workers.
async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|err| {
        tracing::error!(error = %err, "blocking auth task failed");
        ApiError::internal()
    })
}

async fn logout(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.logout(&caller.token)?;
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

async fn list_documents(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    Ok(Json(state.store.list_documents(&caller.user.id)?))
}

async fn create_document(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Result<Json<CreateDocumentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::malformed_body(e.body_text()))?;
    request
        .validate()
        .map_err(|e| ApiError::invalid_data(&[e]))?;
    let document = state.store.create_document(&caller.user.id, &request)?;
    tracing::info!(id = %document.id, owner = %caller.user.id, "document created");
    Ok((
        StatusCode::CREATED,
        Json(DocumentEnvelope {
            message: "Document created successfully".to_string(),
            document,
        }),
    ))
}

async fn get_document(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .get_document(&caller.user.id, &DocumentId::new(id))?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

async fn update_document(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateDocumentRequest>, JsonRejection>,
) -> Result<Json<DocumentEnvelope>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::malformed_body(e.body_text()))?;
    request
        .validate()
        .map_err(|e| ApiError::invalid_data(&[e]))?;
    let document = state
        .store
        .update_document(&caller.user.id, &DocumentId::new(id), &request)?
        .ok_or_else(ApiError::not_found)?;
    tracing::debug!(id = %document.id, "document updated");
    Ok(Json(DocumentEnvelope {
        message: "Document updated successfully".to_string(),
        document,
    }))
}

async fn delete_document(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = DocumentId::new(id);
    if !state.store.delete_document(&caller.user.id, &id)? {
        return Err(ApiError::not_found());
    }
    tracing::info!(%id, "document deleted");
    Ok(Json(MessageResponse {
        message: "Document deleted successfully".to_string(),
    }))
}

async fn get_public_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PublicDocument>, ApiError> {
    let (document, user) = state
        .store
        .get_public_document(&DocumentId::new(id))?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(PublicDocument { document, user }))
}
