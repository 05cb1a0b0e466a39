use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::client::{DocumentService, ServiceError};
use crate::document::{
    CreateDocumentRequest, Document, DocumentId, DocumentSummary, PLACEHOLDER_TEXT,
    UpdateDocumentRequest,
};

use super::{Effect, Message, NotificationLevel, SyncDriver, SyncModel, SyncPhase, update};

/// Document service backed by a map, with switchable failures.
#[derive(Default)]
struct MemoryService {
    docs: Mutex<HashMap<DocumentId, Document>>,
    fail_updates: AtomicBool,
    fail_gets: AtomicBool,
    updates: AtomicUsize,
}

impl MemoryService {
    fn seed(&self, title: &str, content: &str) -> Document {
        let now = Utc::now();
        let doc = Document {
            id: DocumentId::generate(),
            title: title.to_string(),
            content: content.to_string(),
            is_public: false,
            created_at: now,
            updated_at: now,
            owner_id: "user-1".to_string(),
        };
        self.docs
            .lock()
            .unwrap()
            .insert(doc.id.clone(), doc.clone());
        doc
    }

    fn stored(&self, id: &DocumentId) -> Option<Document> {
        self.docs.lock().unwrap().get(id).cloned()
    }

    fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentService for MemoryService {
    async fn list(&self) -> Result<Vec<DocumentSummary>, ServiceError> {
        let mut summaries: Vec<_> = self
            .docs
            .lock()
            .unwrap()
            .values()
            .map(Document::summary)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn get(&self, id: &DocumentId) -> Result<Document, ServiceError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(ServiceError::Network("connection refused".to_string()));
        }
        self.stored(id).ok_or(ServiceError::NotFound)
    }

    async fn create(&self, request: &CreateDocumentRequest) -> Result<Document, ServiceError> {
        let doc = self.seed(&request.title, request.content.as_deref().unwrap_or(""));
        let mut docs = self.docs.lock().unwrap();
        let stored = docs.get_mut(&doc.id).ok_or(ServiceError::NotFound)?;
        stored.is_public = request.is_public.unwrap_or(false);
        Ok(stored.clone())
    }

    async fn update(
        &self,
        id: &DocumentId,
        request: &UpdateDocumentRequest,
    ) -> Result<Document, ServiceError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ServiceError::Network("connection reset".to_string()));
        }
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.get_mut(id).ok_or(ServiceError::NotFound)?;
        if let Some(title) = &request.title {
            doc.title.clone_from(title);
        }
        if let Some(content) = &request.content {
            doc.content.clone_from(content);
        }
        if let Some(is_public) = request.is_public {
            doc.is_public = is_public;
        }
        doc.updated_at = Utc::now().max(doc.updated_at + chrono::Duration::microseconds(1));
        Ok(doc.clone())
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), ServiceError> {
        self.docs
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or(ServiceError::NotFound)
    }

    async fn get_public(&self, id: &DocumentId) -> Result<Document, ServiceError> {
        self.stored(id)
            .filter(|doc| doc.is_public)
            .ok_or(ServiceError::NotFound)
    }
}

fn fixed_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn doc(id: &str, title: &str, content: &str) -> Document {
    Document {
        id: DocumentId::from(id),
        title: title.to_string(),
        content: content.to_string(),
        is_public: false,
        created_at: fixed_time(),
        updated_at: fixed_time(),
        owner_id: "user-1".to_string(),
    }
}

/// Model with `doc` selected and listed.
fn selected_model(doc: &Document) -> SyncModel {
    let (model, _) = update(
        SyncModel::new(2000),
        Message::ListingLoaded {
            generation: 0,
            result: Ok(vec![doc.summary()]),
        },
    );
    let (model, effects) = update(model, Message::SelectDocument(doc.id.clone()));
    let [Effect::FetchDocument { epoch, .. }] = effects.as_slice() else {
        panic!("expected a fetch, got {effects:?}");
    };
    let (model, _) = update(
        model,
        Message::DocumentLoaded {
            epoch: *epoch,
            result: Ok(doc.clone()),
        },
    );
    model
}

fn persisted(doc: &Document, content: &str) -> Document {
    Document {
        content: content.to_string(),
        updated_at: doc.updated_at + chrono::Duration::seconds(1),
        ..doc.clone()
    }
}

fn error_count(model: &SyncModel) -> usize {
    model
        .notifications()
        .filter(|n| n.level == NotificationLevel::Error)
        .count()
}

#[test]
fn test_no_selection_shows_placeholder_and_stays_clean() {
    let model = SyncModel::new(2000);
    assert_eq!(model.buffer(), PLACEHOLDER_TEXT);
    assert_eq!(model.phase(), SyncPhase::NoSelection);

    let (model, effects) = update(
        model,
        Message::Edit {
            text: "typing into nothing".to_string(),
            now_ms: 0,
        },
    );
    assert!(effects.is_empty());
    assert!(!model.is_dirty());
    assert_eq!(model.autosave_deadline_ms(), None);
}

#[test]
fn test_select_resets_buffer_to_content() {
    let a = doc("a", "A", "foo");
    let model = selected_model(&a);
    assert_eq!(model.selected_id(), Some(&a.id));
    assert_eq!(model.buffer(), "foo");
    assert_eq!(model.phase(), SyncPhase::Clean);
}

#[test]
fn test_load_failure_keeps_selection() {
    let a = doc("a", "A", "foo");
    let model = selected_model(&a);
    let (model, effects) = update(model, Message::SelectDocument(DocumentId::from("missing")));
    assert_eq!(model.phase(), SyncPhase::Loading);
    let [Effect::FetchDocument { epoch, .. }] = effects.as_slice() else {
        panic!("expected a fetch");
    };
    let (model, _) = update(
        model,
        Message::DocumentLoaded {
            epoch: *epoch,
            result: Err(ServiceError::NotFound),
        },
    );
    assert_eq!(model.selected_id(), Some(&a.id));
    assert_eq!(model.buffer(), "foo");
    assert_eq!(error_count(&model), 1);
}

#[test]
fn test_stale_load_after_newer_selection_is_ignored() {
    let a = doc("a", "A", "foo");
    let b = doc("b", "B", "bar");
    let model = SyncModel::new(2000);

    let (model, first) = update(model, Message::SelectDocument(a.id.clone()));
    let (model, second) = update(model, Message::SelectDocument(b.id.clone()));
    let [Effect::FetchDocument { epoch: old, .. }] = first.as_slice() else {
        panic!("expected a fetch");
    };
    let [Effect::FetchDocument { epoch: new, .. }] = second.as_slice() else {
        panic!("expected a fetch");
    };

    let (model, _) = update(
        model,
        Message::DocumentLoaded {
            epoch: *old,
            result: Ok(a),
        },
    );
    assert_eq!(model.selected(), None);
    assert_eq!(model.phase(), SyncPhase::Loading);

    let (model, _) = update(
        model,
        Message::DocumentLoaded {
            epoch: *new,
            result: Ok(b.clone()),
        },
    );
    assert_eq!(model.selected_id(), Some(&b.id));
    assert_eq!(model.buffer(), "bar");
}

#[test]
fn test_manual_save_when_clean_is_noop() {
    let a = doc("a", "A", "foo");
    let (model, effects) = update(selected_model(&a), Message::Save);
    assert!(effects.is_empty());
    assert_eq!(model.phase(), SyncPhase::Clean);
}

#[test]
fn test_saves_for_one_document_are_serialized() {
    let a = doc("a", "A", "foo");
    let model = selected_model(&a);
    let (model, _) = update(
        model,
        Message::Edit {
            text: "one".to_string(),
            now_ms: 0,
        },
    );
    let (model, effects) = update(model, Message::Save);
    let [Effect::PersistDocument { seq: first, request, .. }] = effects.as_slice() else {
        panic!("expected a persist");
    };
    assert_eq!(request.content.as_deref(), Some("one"));
    assert_eq!(model.phase(), SyncPhase::Saving);

    let (model, _) = update(
        model,
        Message::Edit {
            text: "two".to_string(),
            now_ms: 10,
        },
    );
    let (model, effects) = update(model, Message::Save);
    assert!(effects.is_empty(), "second save must wait");

    let (model, effects) = update(
        model,
        Message::DocumentSaved {
            id: a.id.clone(),
            seq: *first,
            result: Ok(persisted(&a, "one")),
        },
    );
    let [Effect::PersistDocument { seq: second, request, .. }] = effects.as_slice() else {
        panic!("expected the queued persist");
    };
    assert!(second > first);
    assert_eq!(request.content.as_deref(), Some("two"));
    assert!(model.is_dirty());

    let (model, effects) = update(
        model,
        Message::DocumentSaved {
            id: a.id.clone(),
            seq: *second,
            result: Ok(persisted(&a, "two")),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(model.phase(), SyncPhase::Clean);
    assert!(!model.has_pending_saves());
}

#[test]
fn test_stale_save_response_is_ignored() {
    let a = doc("a", "A", "foo");
    let (model, _) = update(
        selected_model(&a),
        Message::Edit {
            text: "bar".to_string(),
            now_ms: 0,
        },
    );
    let (model, _) = update(model, Message::Save);
    let (model, effects) = update(
        model,
        Message::DocumentSaved {
            id: a.id.clone(),
            seq: 99,
            result: Ok(persisted(&a, "stale")),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(model.selected().map(|d| d.content.as_str()), Some("foo"));
    assert_eq!(model.phase(), SyncPhase::Saving);
}

#[test]
fn test_switching_flushes_dirty_buffer() {
    let a = doc("a", "A", "foo");
    let (model, _) = update(
        selected_model(&a),
        Message::Edit {
            text: "unsaved".to_string(),
            now_ms: 0,
        },
    );
    let (model, effects) = update(model, Message::SelectDocument(DocumentId::from("b")));
    assert!(matches!(
        &effects[..],
        [Effect::PersistDocument { id, request, .. }, Effect::FetchDocument { .. }]
            if id == &a.id && request.content.as_deref() == Some("unsaved")
    ));
    assert_eq!(model.autosave_deadline_ms(), None);
}

#[test]
fn test_reselecting_dirty_document_keeps_edits() {
    let a = doc("a", "A", "foo");
    let (model, _) = update(
        selected_model(&a),
        Message::Edit {
            text: "bar".to_string(),
            now_ms: 0,
        },
    );
    let (model, effects) = update(model, Message::SelectDocument(a.id.clone()));
    assert!(effects.is_empty(), "unexpected effects {effects:?}");
    assert_eq!(model.buffer(), "bar");
    assert_eq!(model.phase(), SyncPhase::Dirty);

    let (model, effects) = update(model, Message::Save);
    let [Effect::PersistDocument { seq, request, .. }] = effects.as_slice() else {
        panic!("expected one save, got {effects:?}");
    };
    assert_eq!(request.content.as_deref(), Some("bar"));
    let (model, effects) = update(
        model,
        Message::DocumentSaved {
            id: a.id.clone(),
            seq: *seq,
            result: Ok(persisted(&a, "bar")),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(model.phase(), SyncPhase::Clean);
}

#[test]
fn test_reselect_cancels_pending_switch() {
    let a = doc("a", "A", "foo");
    let b = doc("b", "B", "other");
    let (model, effects) = update(selected_model(&a), Message::SelectDocument(b.id.clone()));
    let [Effect::FetchDocument { epoch, .. }] = effects.as_slice() else {
        panic!("expected a fetch");
    };
    let (model, effects) = update(model, Message::SelectDocument(a.id.clone()));
    assert!(effects.is_empty());
    assert_eq!(model.phase(), SyncPhase::Clean);

    let (model, _) = update(
        model,
        Message::DocumentLoaded {
            epoch: *epoch,
            result: Ok(b),
        },
    );
    assert_eq!(model.selected_id(), Some(&a.id));
}

#[test]
fn test_load_during_inflight_save_keeps_unsaved_content() {
    let a = doc("a", "A", "foo");
    let b = doc("b", "B", "other");
    let (model, _) = update(
        selected_model(&a),
        Message::Edit {
            text: "bar".to_string(),
            now_ms: 0,
        },
    );
    // Switching away flushes "bar" for A
    let (model, effects) = update(model, Message::SelectDocument(b.id.clone()));
    let [
        Effect::PersistDocument { seq, .. },
        Effect::FetchDocument { epoch, .. },
    ] = effects.as_slice()
    else {
        panic!("expected flush and fetch, got {effects:?}");
    };
    let seq = *seq;
    let (model, _) = update(
        model,
        Message::DocumentLoaded {
            epoch: *epoch,
            result: Ok(b),
        },
    );

    // Back to A before the flush lands; the server still has "foo"
    let (model, effects) = update(model, Message::SelectDocument(a.id.clone()));
    let [Effect::FetchDocument { epoch, .. }] = effects.as_slice() else {
        panic!("expected a fetch, got {effects:?}");
    };
    let (model, _) = update(
        model,
        Message::DocumentLoaded {
            epoch: *epoch,
            result: Ok(a.clone()),
        },
    );
    assert_eq!(model.buffer(), "bar");

    let (model, effects) = update(
        model,
        Message::DocumentSaved {
            id: a.id.clone(),
            seq,
            result: Ok(persisted(&a, "bar")),
        },
    );
    assert!(effects.is_empty(), "unexpected effects {effects:?}");
    assert_eq!(model.buffer(), "bar");
    assert_eq!(model.phase(), SyncPhase::Clean);
}

#[test]
fn test_autosave_skips_empty_buffer() {
    let a = doc("a", "A", "foo");
    let (model, _) = update(
        selected_model(&a),
        Message::Edit {
            text: String::new(),
            now_ms: 0,
        },
    );
    let (model, effects) = update(model, Message::Tick(5000));
    assert!(effects.is_empty());
    assert!(model.is_dirty());

    // A manual save still sends it
    let (_, effects) = update(model, Message::Save);
    assert_eq!(effects.len(), 1);
}

#[test]
fn test_create_rejects_blank_title() {
    let (model, effects) = update(
        SyncModel::new(2000),
        Message::CreateDocument(CreateDocumentRequest::new("   ")),
    );
    assert!(effects.is_empty());
    assert_eq!(error_count(&model), 1);
}

#[test]
fn test_rename_without_selection_warns() {
    let (model, effects) = update(
        SyncModel::new(2000),
        Message::UpdateMetadata {
            title: Some("New".to_string()),
            is_public: None,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        model.notifications().next().map(|n| n.level),
        Some(NotificationLevel::Warning)
    );
}

#[test]
fn test_filtered_documents_ignores_case() {
    let (model, _) = update(
        SyncModel::new(2000),
        Message::ListingLoaded {
            generation: 0,
            result: Ok(vec![
                doc("a", "Meeting Notes", "").summary(),
                doc("b", "Groceries", "").summary(),
            ]),
        },
    );
    let hits: Vec<_> = model
        .filtered_documents("notes")
        .iter()
        .map(|s| s.title.as_str())
        .collect();
    assert_eq!(hits, vec!["Meeting Notes"]);
    assert_eq!(model.filtered_documents("").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_create_then_select_round_trips() {
    let service = Arc::new(MemoryService::default());
    let mut driver = SyncDriver::new(service.clone(), 2000);

    let created = driver
        .create_document("Plan", Some("# Plan\n- ship".to_string()), Some(true))
        .await
        .expect("create should succeed");
    assert_eq!(driver.model().selected_id(), Some(&created.id));
    assert!(driver.model().documents().iter().any(|s| s.id == created.id));

    driver.deselect().await;
    driver.select_document(created.id.clone()).await;
    let selected = driver.model().selected().unwrap();
    assert_eq!(selected.title, "Plan");
    assert_eq!(selected.content, "# Plan\n- ship");
    assert!(selected.is_public);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_waits_for_quiet_window() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.select_document(a.id.clone()).await;

    driver.edit_buffer("f");
    tokio::time::advance(Duration::from_millis(1000)).await;
    driver.edit_buffer("fo");

    tokio::time::advance(Duration::from_millis(1999)).await;
    driver.tick();
    driver.settle().await;
    assert_eq!(service.update_count(), 0, "nothing persists before 3000 ms");

    tokio::time::advance(Duration::from_millis(1)).await;
    driver.tick();
    driver.settle().await;
    assert_eq!(service.update_count(), 1);
    assert_eq!(service.stored(&a.id).unwrap().content, "fo");
}

#[tokio::test(start_paused = true)]
async fn test_late_edit_moves_autosave() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.select_document(a.id.clone()).await;

    driver.edit_buffer("1");
    tokio::time::advance(Duration::from_millis(1000)).await;
    driver.edit_buffer("12");
    tokio::time::advance(Duration::from_millis(1900)).await;
    driver.edit_buffer("123");
    assert_eq!(
        driver.autosave_deadline().map(|d| d.duration_since(tokio::time::Instant::now())),
        Some(Duration::from_millis(2000))
    );

    tokio::time::advance(Duration::from_millis(1999)).await;
    driver.tick();
    driver.settle().await;
    assert_eq!(service.update_count(), 0, "nothing persists before 4900 ms");

    tokio::time::advance(Duration::from_millis(1)).await;
    driver.tick();
    driver.settle().await;
    assert_eq!(service.update_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_save_scenario() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.refresh_listing().await;
    driver.select_document(a.id.clone()).await;
    let before = driver.model().documents()[0].updated_at;

    driver.edit_buffer("bar");
    assert_eq!(driver.model().phase(), SyncPhase::Dirty);

    driver.save().await;
    assert_eq!(driver.model().phase(), SyncPhase::Clean);
    assert!(driver.model().documents()[0].updated_at > before);
    assert_eq!(service.stored(&a.id).unwrap().content, "bar");
    assert!(
        driver
            .drain_notifications()
            .iter()
            .any(|n| n.message == "Document saved")
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_persist_keeps_dirty_and_reports_once() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.select_document(a.id.clone()).await;
    driver.edit_buffer("bar");

    service.fail_updates.store(true, Ordering::SeqCst);
    driver.save().await;

    assert!(driver.model().is_dirty());
    assert_eq!(driver.model().selected().unwrap().content, "foo");
    assert_eq!(error_count(driver.model()), 1);
    assert_eq!(service.update_count(), 1, "no automatic retry");
}

#[tokio::test(start_paused = true)]
async fn test_delete_selected_clears_selection() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.refresh_listing().await;
    driver.select_document(a.id.clone()).await;
    driver.edit_buffer("pending");

    assert!(driver.delete_document(a.id.clone()).await);
    assert_eq!(driver.model().selected(), None);
    assert_eq!(driver.model().buffer(), PLACEHOLDER_TEXT);
    assert!(!driver.model().is_dirty());
    assert_eq!(driver.model().autosave_deadline_ms(), None);
}

#[tokio::test(start_paused = true)]
async fn test_delete_other_leaves_selection() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let b = service.seed("B", "other");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.refresh_listing().await;
    driver.select_document(a.id.clone()).await;
    driver.edit_buffer("foo!");

    assert!(driver.delete_document(b.id.clone()).await);
    assert_eq!(driver.model().selected_id(), Some(&a.id));
    assert_eq!(driver.model().buffer(), "foo!");
    assert_eq!(driver.model().documents().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_changes_nothing() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.refresh_listing().await;
    driver.select_document(a.id.clone()).await;

    driver.delete_document(DocumentId::from("nope")).await;
    assert_eq!(driver.model().documents().len(), 1);
    assert_eq!(driver.model().selected_id(), Some(&a.id));
    assert_eq!(error_count(driver.model()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_service_leaves_selection() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let b = service.seed("B", "bar");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.select_document(a.id.clone()).await;

    service.fail_gets.store(true, Ordering::SeqCst);
    driver.select_document(b.id.clone()).await;
    assert_eq!(driver.model().selected_id(), Some(&a.id));
    assert_eq!(driver.model().phase(), SyncPhase::Clean);
    let errors: Vec<_> = driver
        .drain_notifications()
        .into_iter()
        .filter(|n| n.level == NotificationLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn test_rename_and_publish_patch_listing() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.refresh_listing().await;
    driver.select_document(a.id.clone()).await;
    driver.edit_buffer("edited");

    driver
        .update_metadata(Some("  Renamed  ".to_string()), Some(true))
        .await;
    let summary = &driver.model().documents()[0];
    assert_eq!(summary.title, "Renamed");
    assert!(summary.is_public);
    let stored = service.stored(&a.id).unwrap();
    assert_eq!(stored.content, "edited");
    assert!(!driver.model().is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_keeps_selection_and_buffer() {
    let service = Arc::new(MemoryService::default());
    let a = service.seed("A", "foo");
    let mut driver = SyncDriver::new(service.clone(), 2000);
    driver.select_document(a.id.clone()).await;
    driver.edit_buffer("draft");
    service.seed("B", "");

    driver.refresh_listing().await;
    assert_eq!(driver.model().documents().len(), 2);
    assert_eq!(driver.model().buffer(), "draft");
    assert_eq!(driver.model().selected_id(), Some(&a.id));
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn edit_text() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("foo".to_string()),
            Just(String::new()),
            "[a-z# \\n]{0,12}",
        ]
    }

    proptest! {
        #[test]
        fn dirty_iff_buffer_differs(edits in proptest::collection::vec(edit_text(), 0..20)) {
            let a = doc("a", "A", "foo");
            let mut model = selected_model(&a);
            for (i, text) in edits.into_iter().enumerate() {
                let (next, _) = update(model, Message::Edit { text: text.clone(), now_ms: i as u64 });
                model = next;
                prop_assert_eq!(model.is_dirty(), text != "foo");
            }
            let (model, _) = update(model, Message::Edit { text: "foo".to_string(), now_ms: 100 });
            prop_assert!(!model.is_dirty());
        }
    }
}
