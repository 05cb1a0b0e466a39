use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::model::{Notification, SyncModel};
use super::update::{Effect, Message, update};
use crate::client::DocumentService;
use crate::document::{CreateDocumentRequest, Document, DocumentId};

/// Runs [`update`] on the caller's task and carries out its effects as
/// spawned tokio tasks, whose results come back over a channel.
pub struct SyncDriver {
    model: SyncModel,
    service: Arc<dyn DocumentService>,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    in_flight: usize,
    origin: Instant,
}

impl SyncDriver {
    pub fn new(service: Arc<dyn DocumentService>, autosave_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            model: SyncModel::new(autosave_ms),
            service,
            tx,
            rx,
            in_flight: 0,
            origin: Instant::now(),
        }
    }

    pub const fn model(&self) -> &SyncModel {
        &self.model
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.model.drain_notifications()
    }

    /// Milliseconds since the driver started, on tokio's clock.
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Number of service calls whose results have not been applied yet.
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn dispatch(&mut self, msg: Message) {
        let model = std::mem::take(&mut self.model);
        let (model, effects) = update(model, msg);
        self.model = model;
        for effect in effects {
            self.spawn(effect);
        }
    }

    fn spawn(&mut self, effect: Effect) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let msg = run_effect(service.as_ref(), effect).await;
            if tx.send(msg).is_err() {
                tracing::debug!("sync driver dropped before result arrived");
            }
        });
    }

    /// Apply every result that has already arrived. Returns whether any did.
    pub fn poll_completions(&mut self) -> bool {
        let mut applied = false;
        while let Ok(msg) = self.rx.try_recv() {
            self.complete(msg);
            applied = true;
        }
        applied
    }

    /// Wait for the next result and apply it. Returns `false` when nothing is
    /// outstanding.
    pub async fn next_completion(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(msg) => {
                self.complete(msg);
                true
            }
            None => false,
        }
    }

    /// Wait until every outstanding call, including follow-ups it
    /// triggers, has been applied.
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }

    fn complete(&mut self, msg: Message) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.dispatch(msg);
    }

    /// Fire the autosave timer if it is due.
    pub fn tick(&mut self) {
        let now = self.now_ms();
        self.dispatch(Message::Tick(now));
    }

    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.model
            .autosave_deadline_ms()
            .map(|ms| self.origin + Duration::from_millis(ms))
    }

    pub async fn select_document(&mut self, id: DocumentId) {
        self.dispatch(Message::SelectDocument(id));
        self.settle().await;
    }

    /// Create a document and select it. `None` when the create failed.
    pub async fn create_document(
        &mut self,
        title: &str,
        content: Option<String>,
        is_public: Option<bool>,
    ) -> Option<Document> {
        self.model.take_created();
        let request = CreateDocumentRequest {
            title: title.to_string(),
            content,
            is_public,
        };
        self.dispatch(Message::CreateDocument(request));
        self.settle().await;
        self.model.take_created()
    }

    /// Replace the buffer and restart the autosave window. No I/O.
    pub fn edit_buffer(&mut self, text: impl Into<String>) {
        let now_ms = self.now_ms();
        self.dispatch(Message::Edit {
            text: text.into(),
            now_ms,
        });
    }

    pub async fn save(&mut self) {
        self.dispatch(Message::Save);
        self.settle().await;
    }

    pub async fn update_metadata(&mut self, title: Option<String>, is_public: Option<bool>) {
        self.dispatch(Message::UpdateMetadata { title, is_public });
        self.settle().await;
    }

    /// Returns whether the document is gone from the listing afterwards.
    pub async fn delete_document(&mut self, id: DocumentId) -> bool {
        self.dispatch(Message::Delete(id.clone()));
        self.settle().await;
        !self.model.documents().iter().any(|summary| summary.id == id)
    }

    pub async fn refresh_listing(&mut self) {
        self.dispatch(Message::RefreshListing);
        self.settle().await;
    }

    pub async fn deselect(&mut self) {
        self.dispatch(Message::Deselect);
        self.settle().await;
    }
}

async fn run_effect(service: &dyn DocumentService, effect: Effect) -> Message {
    match effect {
        Effect::FetchDocument { id, epoch } => {
            tracing::debug!(%id, epoch, "fetching document");
            Message::DocumentLoaded {
                epoch,
                result: service.get(&id).await,
            }
        }
        Effect::CreateDocument { request, epoch } => Message::DocumentCreated {
            epoch,
            result: service.create(&request).await,
        },
        Effect::PersistDocument { id, seq, request } => {
            tracing::debug!(%id, seq, "persisting document");
            let result = service.update(&id, &request).await;
            Message::DocumentSaved { id, seq, result }
        }
        Effect::DeleteDocument { id } => {
            let result = service.delete(&id).await;
            Message::DocumentDeleted { id, result }
        }
        Effect::FetchListing { generation } => Message::ListingLoaded {
            generation,
            result: service.list().await,
        },
    }
}
