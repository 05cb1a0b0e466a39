use std::collections::{HashMap, VecDeque};

use super::debounce::{AutosaveDebouncer, DEFAULT_AUTOSAVE_MS};
use crate::document::{Document, DocumentId, DocumentSummary, PLACEHOLDER_TEXT, UpdateDocumentRequest};

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Observable state of the selected document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    NoSelection,
    Loading,
    Clean,
    Dirty,
    Saving,
}

/// Why a save was requested. Ordered by how loudly its outcome is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SaveReason {
    Autosave,
    Flush,
    Metadata,
    Manual,
}

#[derive(Debug, Clone)]
pub(super) struct PendingLoad {
    pub(super) epoch: u64,
    /// `None` while a create is outstanding.
    pub(super) target: Option<DocumentId>,
}

#[derive(Debug, Clone)]
pub(super) struct SaveRequest {
    pub(super) seq: u64,
    pub(super) reason: SaveReason,
    pub(super) request: UpdateDocumentRequest,
}

#[derive(Debug, Clone)]
pub(super) struct QueuedSave {
    pub(super) reason: SaveReason,
    pub(super) request: UpdateDocumentRequest,
}

/// Per-document save serialization state.
#[derive(Debug, Clone, Default)]
pub(super) struct SaveSlot {
    pub(super) in_flight: Option<SaveRequest>,
    pub(super) queued: Option<QueuedSave>,
    pub(super) latest_sent: u64,
}

impl SaveSlot {
    pub(super) const fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.queued.is_none()
    }
}

/// State of the document synchronization core.
///
/// Changes only through [`super::update`]; everything else reads it through
/// accessors.
#[derive(Debug, Clone)]
pub struct SyncModel {
    pub(super) documents: Vec<DocumentSummary>,
    pub(super) selected: Option<Document>,
    pub(super) buffer: String,
    pub(super) loading: Option<PendingLoad>,
    pub(super) epoch: u64,
    pub(super) listing_generation: u64,
    pub(super) saves: HashMap<DocumentId, SaveSlot>,
    pub(super) next_seq: u64,
    pub(super) autosave: AutosaveDebouncer,
    pub(super) notifications: VecDeque<Notification>,
    pub(super) created: Option<Document>,
}

impl Default for SyncModel {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_MS)
    }
}

impl SyncModel {
    pub fn new(autosave_ms: u64) -> Self {
        Self {
            documents: Vec::new(),
            selected: None,
            buffer: PLACEHOLDER_TEXT.to_string(),
            loading: None,
            epoch: 0,
            listing_generation: 0,
            saves: HashMap::new(),
            next_seq: 0,
            autosave: AutosaveDebouncer::new(autosave_ms),
            notifications: VecDeque::new(),
            created: None,
        }
    }

    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    /// Listing entries whose title contains `query`, ignoring case.
    pub fn filtered_documents(&self, query: &str) -> Vec<&DocumentSummary> {
        let needle = query.trim().to_lowercase();
        self.documents
            .iter()
            .filter(|doc| needle.is_empty() || doc.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub const fn selected(&self) -> Option<&Document> {
        self.selected.as_ref()
    }

    pub fn selected_id(&self) -> Option<&DocumentId> {
        self.selected.as_ref().map(|doc| &doc.id)
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Buffer differs from the selected document's last persisted content.
    pub fn is_dirty(&self) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|doc| doc.content != self.buffer)
    }

    pub fn phase(&self) -> SyncPhase {
        if self.loading.is_some() {
            return SyncPhase::Loading;
        }
        let Some(doc) = &self.selected else {
            return SyncPhase::NoSelection;
        };
        if self.is_saving(&doc.id) {
            SyncPhase::Saving
        } else if self.is_dirty() {
            SyncPhase::Dirty
        } else {
            SyncPhase::Clean
        }
    }

    pub fn is_saving(&self, id: &DocumentId) -> bool {
        self.saves
            .get(id)
            .is_some_and(|slot| slot.in_flight.is_some())
    }

    /// Any save in flight or waiting behind one.
    pub fn has_pending_saves(&self) -> bool {
        self.saves.values().any(|slot| !slot.is_idle())
    }

    pub fn autosave_deadline_ms(&self) -> Option<u64> {
        self.autosave.deadline_ms()
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// The most recent successfully created document, once.
    pub fn take_created(&mut self) -> Option<Document> {
        self.created.take()
    }

    /// Content of the newest save for `id` that has not completed yet.
    pub(super) fn pending_content(&self, id: &DocumentId) -> Option<String> {
        let slot = self.saves.get(id)?;
        slot.queued
            .as_ref()
            .map(|queued| &queued.request)
            .or_else(|| slot.in_flight.as_ref().map(|sent| &sent.request))
            .and_then(|request| request.content.clone())
    }

    pub(super) fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Error => tracing::warn!(%message, "sync error"),
            NotificationLevel::Warning | NotificationLevel::Info => {
                tracing::debug!(%message, "sync notice");
            }
        }
        self.notifications.push_back(Notification { level, message });
    }

    /// Title and visibility the server will hold once outstanding saves land.
    pub(super) fn effective_metadata(&self, id: &DocumentId) -> Option<(String, bool)> {
        let slot = self.saves.get(id);
        let pending = slot
            .and_then(|slot| slot.queued.as_ref().map(|queued| &queued.request))
            .or_else(|| slot.and_then(|slot| slot.in_flight.as_ref().map(|sent| &sent.request)));
        let selected = self.selected.as_ref().filter(|doc| &doc.id == id);
        let base_title = pending
            .and_then(|req| req.title.clone())
            .or_else(|| selected.map(|doc| doc.title.clone()))
            .or_else(|| self.summary(id).map(|summary| summary.title.clone()))?;
        let base_public = pending
            .and_then(|req| req.is_public)
            .or_else(|| selected.map(|doc| doc.is_public))
            .or_else(|| self.summary(id).map(|summary| summary.is_public))
            .unwrap_or(false);
        Some((base_title, base_public))
    }

    pub(super) fn summary(&self, id: &DocumentId) -> Option<&DocumentSummary> {
        self.documents.iter().find(|summary| &summary.id == id)
    }
}
