use crate::document::DocumentId;

/// Quiet period before an edited document is written back.
pub const DEFAULT_AUTOSAVE_MS: u64 = 2000;

/// Trailing-edge debounce for autosave.
///
/// Each `queue` restarts the window; the document becomes ready once no edit
/// has arrived for `delay_ms`.
#[derive(Debug, Clone)]
pub struct AutosaveDebouncer {
    delay_ms: u64,
    pending: Option<(DocumentId, u64)>,
}

impl Default for AutosaveDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_MS)
    }
}

impl AutosaveDebouncer {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub fn queue(&mut self, id: DocumentId, now_ms: u64) {
        self.pending = Some((id, now_ms));
    }

    pub fn take_ready(&mut self, now_ms: u64) -> Option<DocumentId> {
        let (_, queued_at) = self.pending.as_ref()?;
        if now_ms.saturating_sub(*queued_at) >= self.delay_ms {
            self.pending.take().map(|(id, _)| id)
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending write-back becomes due.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.pending
            .as_ref()
            .map(|(_, queued_at)| queued_at.saturating_add(self.delay_ms))
    }

    pub const fn delay_ms(&self) -> u64 {
        self.delay_ms
    }
}
