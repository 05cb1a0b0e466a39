//! Drives a real server over HTTP with the client and the sync core.

use std::sync::Arc;

use markdraft::auth::RegisterRequest;
use markdraft::client::{AuthClient, DocumentService, HttpDocumentService, ServiceError};
use markdraft::document::CreateDocumentRequest;
use markdraft::server::{AppState, DEFAULT_CORS_ORIGIN, router, serve};
use markdraft::store::Store;
use markdraft::sync::{SyncDriver, SyncPhase};
use tokio::net::TcpListener;

async fn start_server() -> String {
    let state = AppState::new(Store::open_in_memory().unwrap(), chrono::Duration::days(7));
    let app = router(state, &[DEFAULT_CORS_ORIGIN.to_string()]);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, app, std::future::pending()));
    format!("http://{addr}/api")
}

async fn register(base: &str, email: &str) -> String {
    let response = AuthClient::new(base)
        .register(&RegisterRequest {
            email: email.to_string(),
            password: "secret1".to_string(),
            name: None,
        })
        .await
        .unwrap();
    response.token
}

#[tokio::test]
async fn test_sync_driver_against_live_server() {
    let base = start_server().await;
    let token = register(&base, "writer@example.com").await;
    let service = Arc::new(HttpDocumentService::new(&base, Some(token)));
    let mut driver = SyncDriver::new(service.clone(), 2000);

    let created = driver
        .create_document("Notes", Some("foo".to_string()), Some(false))
        .await
        .expect("document created");
    assert_eq!(driver.model().selected_id(), Some(&created.id));
    assert_eq!(driver.model().buffer(), "foo");

    driver.edit_buffer("bar");
    assert_eq!(driver.model().phase(), SyncPhase::Dirty);
    driver.save().await;
    assert_eq!(driver.model().phase(), SyncPhase::Clean);
    assert_eq!(service.get(&created.id).await.unwrap().content, "bar");

    driver
        .update_metadata(Some("Renamed".to_string()), Some(true))
        .await;
    driver.refresh_listing().await;
    let summary = &driver.model().documents()[0];
    assert_eq!(summary.title, "Renamed");
    assert!(summary.is_public);

    let anonymous = HttpDocumentService::new(&base, None);
    let public = anonymous.get_public(&created.id).await.unwrap();
    assert_eq!(public.content, "bar");

    assert!(driver.delete_document(created.id.clone()).await);
    assert_eq!(driver.model().phase(), SyncPhase::NoSelection);
    assert_eq!(service.get(&created.id).await, Err(ServiceError::NotFound));
}

#[tokio::test]
async fn test_documents_are_scoped_to_their_owner() {
    let base = start_server().await;
    let alice = HttpDocumentService::new(&base, Some(register(&base, "alice@example.com").await));
    let bob = HttpDocumentService::new(&base, Some(register(&base, "bob@example.com").await));

    let doc = alice
        .create(&CreateDocumentRequest::new("Private"))
        .await
        .unwrap();
    assert_eq!(bob.get(&doc.id).await, Err(ServiceError::NotFound));
    assert!(bob.list().await.unwrap().is_empty());
    assert_eq!(
        HttpDocumentService::new(&base, None)
            .get_public(&doc.id)
            .await,
        Err(ServiceError::NotFound)
    );
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let base = start_server().await;
    let service = HttpDocumentService::new(&base, None);
    assert!(matches!(
        service.list().await,
        Err(ServiceError::Unauthorized(_))
    ));
}
