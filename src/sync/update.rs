use super::model::{NotificationLevel, PendingLoad, QueuedSave, SaveReason, SaveRequest, SyncModel};
use crate::client::ServiceError;
use crate::document::{
    CreateDocumentRequest, Document, DocumentId, DocumentSummary, PLACEHOLDER_TEXT,
    UpdateDocumentRequest, validate_title,
};

/// User intents and service results that drive the sync core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // User intents
    /// Load a document and make it the selection
    SelectDocument(DocumentId),
    /// Create a document and select it
    CreateDocument(CreateDocumentRequest),
    /// Replace the editable buffer
    Edit { text: String, now_ms: u64 },
    /// Clock advance; fires the autosave timer when due
    Tick(u64),
    /// Manual save of the selected document
    Save,
    /// Rename and/or change visibility of the selected document
    UpdateMetadata {
        title: Option<String>,
        is_public: Option<bool>,
    },
    Delete(DocumentId),
    RefreshListing,
    Deselect,

    // Service results
    DocumentLoaded {
        epoch: u64,
        result: Result<Document, ServiceError>,
    },
    DocumentCreated {
        epoch: u64,
        result: Result<Document, ServiceError>,
    },
    DocumentSaved {
        id: DocumentId,
        seq: u64,
        result: Result<Document, ServiceError>,
    },
    DocumentDeleted {
        id: DocumentId,
        result: Result<(), ServiceError>,
    },
    ListingLoaded {
        generation: u64,
        result: Result<Vec<DocumentSummary>, ServiceError>,
    },
}

/// I/O requested by [`update`], carried out by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchDocument { id: DocumentId, epoch: u64 },
    CreateDocument { request: CreateDocumentRequest, epoch: u64 },
    PersistDocument {
        id: DocumentId,
        seq: u64,
        request: UpdateDocumentRequest,
    },
    DeleteDocument { id: DocumentId },
    FetchListing { generation: u64 },
}

/// Apply one message, returning the next model and the I/O it asks for.
pub fn update(mut model: SyncModel, msg: Message) -> (SyncModel, Vec<Effect>) {
    let mut effects = Vec::new();

    match msg {
        Message::SelectDocument(id) => {
            if model.selected_id() == Some(&id) {
                // Already showing it; only drop a load that would replace it
                if model.loading.take().is_some() {
                    model.epoch += 1;
                }
                return (model, effects);
            }
            flush_if_dirty(&mut model, &mut effects);
            model.autosave.cancel();
            model.epoch += 1;
            model.loading = Some(PendingLoad {
                epoch: model.epoch,
                target: Some(id.clone()),
            });
            effects.push(Effect::FetchDocument {
                id,
                epoch: model.epoch,
            });
        }

        Message::CreateDocument(mut request) => {
            request.title = request.title.trim().to_string();
            if let Err(err) = validate_title(&request.title) {
                model.notify(NotificationLevel::Error, format!("Cannot create document: {err}"));
                return (model, effects);
            }
            flush_if_dirty(&mut model, &mut effects);
            model.autosave.cancel();
            model.epoch += 1;
            model.loading = Some(PendingLoad {
                epoch: model.epoch,
                target: None,
            });
            effects.push(Effect::CreateDocument {
                request,
                epoch: model.epoch,
            });
        }

        Message::Edit { text, now_ms } => {
            model.buffer = text;
            if let Some(id) = model.selected_id().cloned() {
                model.autosave.queue(id, now_ms);
            }
        }

        Message::Tick(now_ms) => {
            if let Some(id) = model.autosave.take_ready(now_ms) {
                let due = model.selected_id() == Some(&id)
                    && model.is_dirty()
                    && !model.buffer.is_empty();
                if due {
                    request_selected_save(&mut model, SaveReason::Autosave, &mut effects);
                }
            }
        }

        Message::Save => {
            model.autosave.cancel();
            if model.is_dirty() {
                request_selected_save(&mut model, SaveReason::Manual, &mut effects);
            }
        }

        Message::UpdateMetadata { title, is_public } => {
            let Some(id) = model.selected_id().cloned() else {
                model.notify(NotificationLevel::Warning, "No document selected");
                return (model, effects);
            };
            let title = title.map(|t| t.trim().to_string());
            if let Some(title) = &title
                && let Err(err) = validate_title(title)
            {
                model.notify(NotificationLevel::Error, format!("Cannot rename document: {err}"));
                return (model, effects);
            }
            let Some((current_title, current_public)) = model.effective_metadata(&id) else {
                return (model, effects);
            };
            let request = UpdateDocumentRequest::full(
                title.as_deref().unwrap_or(&current_title),
                &model.buffer,
                is_public.unwrap_or(current_public),
            );
            model.autosave.cancel();
            request_save(&mut model, id, SaveReason::Metadata, request, &mut effects);
        }

        Message::Delete(id) => {
            effects.push(Effect::DeleteDocument { id });
        }

        Message::RefreshListing => {
            model.listing_generation += 1;
            effects.push(Effect::FetchListing {
                generation: model.listing_generation,
            });
        }

        Message::Deselect => {
            flush_if_dirty(&mut model, &mut effects);
            model.epoch += 1;
            model.loading = None;
            clear_selection(&mut model);
        }

        Message::DocumentLoaded { epoch, result } => {
            if !is_current_load(&model, epoch) {
                tracing::debug!(epoch, current = model.epoch, "discarding stale load");
                return (model, effects);
            }
            let target = model.loading.take().and_then(|load| load.target);
            match result {
                Ok(document) => {
                    flush_if_dirty(&mut model, &mut effects);
                    let unsaved = model.pending_content(&document.id);
                    select(&mut model, document);
                    // The server copy predates a save still on its way
                    if let Some(content) = unsaved {
                        model.buffer = content;
                    }
                }
                Err(err) => {
                    let what = target.map_or_else(String::new, |id| format!(" {id}"));
                    model.notify(
                        NotificationLevel::Error,
                        format!("Failed to load document{what}: {err}"),
                    );
                }
            }
        }

        Message::DocumentCreated { epoch, result } => {
            let current = is_current_load(&model, epoch);
            if current {
                model.loading = None;
            }
            match result {
                Ok(document) => {
                    upsert_summary(&mut model, document.summary());
                    model.created = Some(document.clone());
                    if current {
                        flush_if_dirty(&mut model, &mut effects);
                        model.notify(
                            NotificationLevel::Info,
                            format!("Created \"{}\"", document.title),
                        );
                        select(&mut model, document);
                    }
                    model.listing_generation += 1;
                    effects.push(Effect::FetchListing {
                        generation: model.listing_generation,
                    });
                }
                Err(err) => {
                    model.notify(
                        NotificationLevel::Error,
                        format!("Failed to create document: {err}"),
                    );
                }
            }
        }

        Message::DocumentSaved { id, seq, result } => {
            on_save_result(&mut model, &id, seq, result, &mut effects);
        }

        Message::DocumentDeleted { id, result } => match result {
            Ok(()) => {
                model.documents.retain(|summary| summary.id != id);
                model.saves.remove(&id);
                if model.selected_id() == Some(&id) {
                    clear_selection(&mut model);
                }
                if model
                    .loading
                    .as_ref()
                    .is_some_and(|load| load.target.as_ref() == Some(&id))
                {
                    model.loading = None;
                    model.epoch += 1;
                }
                model.notify(NotificationLevel::Info, "Document deleted");
            }
            Err(err) => {
                model.notify(
                    NotificationLevel::Error,
                    format!("Failed to delete document: {err}"),
                );
            }
        },

        Message::ListingLoaded { generation, result } => {
            if generation != model.listing_generation {
                tracing::debug!(generation, "discarding stale listing");
                return (model, effects);
            }
            match result {
                Ok(documents) => model.documents = documents,
                Err(err) => model.notify(
                    NotificationLevel::Error,
                    format!("Failed to load documents: {err}"),
                ),
            }
        }
    }

    (model, effects)
}

fn is_current_load(model: &SyncModel, epoch: u64) -> bool {
    model
        .loading
        .as_ref()
        .is_some_and(|load| load.epoch == epoch)
}

fn select(model: &mut SyncModel, document: Document) {
    model.autosave.cancel();
    model.buffer.clone_from(&document.content);
    model.selected = Some(document);
}

fn clear_selection(model: &mut SyncModel) {
    model.autosave.cancel();
    model.selected = None;
    model.buffer = PLACEHOLDER_TEXT.to_string();
}

fn upsert_summary(model: &mut SyncModel, summary: DocumentSummary) {
    match model.documents.iter_mut().find(|s| s.id == summary.id) {
        Some(existing) => *existing = summary,
        None => model.documents.insert(0, summary),
    }
}

/// Persist the selected document's pending edits before it stops being
/// selected or gets replaced.
fn flush_if_dirty(model: &mut SyncModel, effects: &mut Vec<Effect>) {
    model.autosave.cancel();
    if model.is_dirty() {
        request_selected_save(model, SaveReason::Flush, effects);
    }
}

fn request_selected_save(model: &mut SyncModel, reason: SaveReason, effects: &mut Vec<Effect>) {
    let Some(id) = model.selected_id().cloned() else {
        return;
    };
    let Some((title, is_public)) = model.effective_metadata(&id) else {
        return;
    };
    let request = UpdateDocumentRequest::full(&title, &model.buffer, is_public);
    request_save(model, id, reason, request, effects);
}

/// Send a save now, or queue it behind the one already in flight for `id`.
fn request_save(
    model: &mut SyncModel,
    id: DocumentId,
    reason: SaveReason,
    request: UpdateDocumentRequest,
    effects: &mut Vec<Effect>,
) {
    let slot = model.saves.entry(id.clone()).or_default();
    if let Some(sent) = slot.in_flight.as_mut() {
        // Same payload already on its way and nothing newer queued
        if slot.queued.is_none() && sent.request == request {
            sent.reason = sent.reason.max(reason);
            return;
        }
        let reason = slot
            .queued
            .as_ref()
            .map_or(reason, |queued| queued.reason.max(reason));
        slot.queued = Some(QueuedSave { reason, request });
        return;
    }
    model.next_seq += 1;
    let seq = model.next_seq;
    slot.latest_sent = seq;
    slot.in_flight = Some(SaveRequest {
        seq,
        reason,
        request: request.clone(),
    });
    effects.push(Effect::PersistDocument { id, seq, request });
}

fn on_save_result(
    model: &mut SyncModel,
    id: &DocumentId,
    seq: u64,
    result: Result<Document, ServiceError>,
    effects: &mut Vec<Effect>,
) {
    let Some(slot) = model.saves.get_mut(id) else {
        tracing::debug!(%id, seq, "discarding save result for untracked document");
        return;
    };
    let latest = slot.latest_sent;
    let Some(sent) = slot.in_flight.take_if(|sent| sent.seq == seq && seq >= latest) else {
        tracing::debug!(%id, seq, latest, "discarding stale save result");
        return;
    };
    let queued = slot.queued.take();

    match result {
        Ok(document) => {
            if let Some(summary) = model.documents.iter_mut().find(|s| &s.id == id) {
                summary.apply(&document);
            }
            match sent.reason {
                SaveReason::Manual => model.notify(NotificationLevel::Info, "Document saved"),
                SaveReason::Metadata => model.notify(NotificationLevel::Info, "Document updated"),
                SaveReason::Autosave | SaveReason::Flush => {}
            }
            if model.selected_id() == Some(id) {
                model.selected = Some(document);
            }
        }
        Err(err) => {
            model.notify(
                NotificationLevel::Error,
                format!("Failed to save document: {err}"),
            );
        }
    }

    match queued {
        Some(queued) => {
            let mut request = queued.request;
            if model.selected_id() == Some(id) {
                request.content = Some(model.buffer.clone());
            }
            request_save(model, id.clone(), queued.reason, request, effects);
        }
        None => {
            model.saves.remove(id);
        }
    }
}
