//! REST API over the document store.
//!
//! All routes live under `/api`. Document routes other than the public read
//! need a bearer token issued by register or login.

mod error;
mod routes;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{ApiError, ServerError};
pub use routes::AuthUser;

use crate::auth::{AuthService, DEFAULT_TOKEN_TTL_DAYS};
use crate::store::Store;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(store: Store, token_ttl: chrono::Duration) -> Self {
        let store = Arc::new(store);
        Self {
            auth: AuthService::new(Arc::clone(&store), token_ttl),
            store,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` keeps everything in memory.
    pub database: Option<PathBuf>,
    pub cors_origins: Vec<String>,
    pub token_ttl_days: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            database: None,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open_store(&self) -> Result<Store, ServerError> {
        let store = match &self.database {
            Some(path) => Store::open(path)?,
            None => Store::open_in_memory()?,
        };
        Ok(store)
    }
}

/// Build the axum router with every API route
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Serve `app` on an already bound listener until `shutdown` resolves.
///
/// # Errors
/// Returns [`ServerError::Serve`] if the accept loop fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| ServerError::Serve { source })
}

/// Run the HTTP server until ctrl-c or SIGTERM.
///
/// # Errors
/// Fails if the store cannot be opened, the address cannot be bound, or the
/// server stops unexpectedly.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let store = config.open_store()?;
    let state = AppState::new(store, chrono::Duration::days(config.token_ttl_days));
    let app = router(state, &config.cors_origins);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Starting HTTP server on {}", addr);

    serve(listener, app, shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
