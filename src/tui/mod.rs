//! Terminal editor: document sidebar, markdown editor and live preview.
//!
//! The sync core owns document state; [`Ui`] only holds presentation state
//! (focus, sidebar cursor and filter, the text area and toasts) and mirrors the
//! selected document's buffer into the text area when the selection changes.

mod event_loop;
mod input;
mod preview;
mod render;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::text::Line;

pub use input::{Action, action_for_key, search_action_for_key};
pub use preview::preview_lines;
pub use render::render;

use crate::document::{DocumentId, DocumentSummary};
use crate::editor::TextArea;
use crate::sync::{NotificationLevel, SyncDriver, SyncModel};

const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Editor,
}

#[derive(Debug, Clone)]
struct Toast {
    level: NotificationLevel,
    message: String,
    expires_at: Instant,
}

/// Presentation state of the editor.
#[derive(Debug)]
pub struct Ui {
    pub focus: Focus,
    /// Cursor into the filtered sidebar entries.
    pub sidebar_index: usize,
    /// Sidebar title filter.
    pub query: String,
    /// Keys go to the filter instead of navigation.
    pub searching: bool,
    pub preview_visible: bool,
    pub area: TextArea,
    /// Text area revision last pushed to the sync core.
    synced_revision: u64,
    /// Selection the text area currently mirrors.
    loaded: Option<DocumentId>,
    /// Bumped whenever the text area is reloaded wholesale.
    generation: u64,
    confirm_delete: Option<DocumentId>,
    confirm_quit: bool,
    toast: Option<Toast>,
    /// Preview lines for a content key and pane width.
    preview_cache: Option<((u64, u64), u16, Vec<Line<'static>>)>,
    pub editor_height: u16,
    pub should_quit: bool,
}

impl Ui {
    pub fn new(model: &SyncModel) -> Self {
        let area = TextArea::from_text(model.buffer());
        Self {
            focus: Focus::Sidebar,
            sidebar_index: 0,
            query: String::new(),
            searching: false,
            preview_visible: true,
            synced_revision: area.revision(),
            area,
            loaded: None,
            generation: 0,
            confirm_delete: None,
            confirm_quit: false,
            toast: None,
            preview_cache: None,
            editor_height: 1,
            should_quit: false,
        }
    }

    /// Reload the text area when the selection changed underneath it.
    /// Returns whether anything changed.
    pub fn sync_from(&mut self, model: &SyncModel) -> bool {
        let mut changed = false;
        let selected = model.selected_id().cloned();
        if selected != self.loaded {
            self.area.reset(model.buffer());
            self.synced_revision = self.area.revision();
            self.generation += 1;
            self.loaded = selected;
            self.reveal_selected(model);
            changed = true;
        }
        let len = self.sidebar_entries(model).len();
        if self.sidebar_index >= len && len > 0 {
            self.sidebar_index = len - 1;
            changed = true;
        }
        changed
    }

    /// Listing entries shown in the sidebar under the current filter.
    pub fn sidebar_entries<'a>(&self, model: &'a SyncModel) -> Vec<&'a DocumentSummary> {
        model.filtered_documents(&self.query)
    }

    /// Document under the sidebar cursor.
    pub fn sidebar_target(&self, model: &SyncModel) -> Option<DocumentId> {
        self.sidebar_entries(model)
            .get(self.sidebar_index)
            .map(|summary| summary.id.clone())
    }

    /// Move the sidebar cursor onto the selected document if it is listed.
    fn reveal_selected(&mut self, model: &SyncModel) {
        if let Some(id) = model.selected_id()
            && let Some(idx) = self
                .sidebar_entries(model)
                .iter()
                .position(|summary| &summary.id == id)
        {
            self.sidebar_index = idx;
        }
    }

    fn edit_query(&mut self, model: &SyncModel, edit: impl FnOnce(&mut String)) {
        edit(&mut self.query);
        self.sidebar_index = 0;
        self.reveal_selected(model);
    }

    /// Drop the filter and leave search mode.
    fn clear_search(&mut self, model: &SyncModel) {
        self.searching = false;
        self.edit_query(model, String::clear);
    }

    /// Push pending text area edits to the sync core.
    pub fn flush_edits(&mut self, driver: &mut SyncDriver) {
        if self.area.revision() != self.synced_revision {
            driver.edit_buffer(self.area.text());
            self.synced_revision = self.area.revision();
        }
    }

    /// Key for caching work derived from the text area contents.
    pub const fn content_key(&self) -> (u64, u64) {
        (self.generation, self.area.revision())
    }

    pub fn show_toast(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + TOAST_DURATION,
        });
    }

    pub fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, NotificationLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    /// Arm or fire the two-press delete confirmation for `id`.
    fn confirm_delete(&mut self, id: &DocumentId) -> bool {
        if self.confirm_delete.as_ref() == Some(id) {
            self.confirm_delete = None;
            true
        } else {
            self.confirm_delete = Some(id.clone());
            false
        }
    }

    /// Arm or fire the two-press quit confirmation.
    fn confirm_quit(&mut self, dirty: bool) -> bool {
        if !dirty || self.confirm_quit {
            return true;
        }
        self.confirm_quit = true;
        false
    }

    fn disarm(&mut self, action: Action) {
        if action != Action::Delete {
            self.confirm_delete = None;
        }
        if action != Action::Quit {
            self.confirm_quit = false;
        }
    }
}

/// `markdraft edit`: runs the terminal editor against a document service.
pub struct EditorApp {
    driver: SyncDriver,
    initial: Option<DocumentId>,
    export_dir: Option<PathBuf>,
}

impl EditorApp {
    pub const fn new(driver: SyncDriver, initial: Option<DocumentId>) -> Self {
        Self {
            driver,
            initial,
            export_dir: None,
        }
    }

    /// Write exports into `dir` instead of the working directory.
    #[must_use]
    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = Some(dir);
        self
    }
}
