use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;

use super::{Action, EditorApp, Focus, Ui, action_for_key, render, search_action_for_key};
use crate::document::{CreateDocumentRequest, quick_title, starter_content};
use crate::export::{ExportFormat, ExportRequest, describe, export, write_artifact};
use crate::sync::{Message, NotificationLevel};

const IDLE_POLL_MS: u64 = 250;
const BUSY_POLL_MS: u64 = 20;
/// How long quitting waits for outstanding saves.
const QUIT_GRACE: Duration = Duration::from_secs(3);

impl EditorApp {
    /// Run the editor until the user quits.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be initialized or drawn.
    pub async fn run(mut self) -> Result<()> {
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; markdraft edit requires an interactive terminal")?;
        let mut ui = Ui::new(self.driver.model());

        let result = self.event_loop(&mut terminal, &mut ui).await;
        ratatui::restore();

        if tokio::time::timeout(QUIT_GRACE, self.driver.settle())
            .await
            .is_err()
        {
            tracing::warn!(
                pending = self.driver.in_flight(),
                "exiting with requests still in flight"
            );
        }
        result
    }

    async fn event_loop(&mut self, terminal: &mut DefaultTerminal, ui: &mut Ui) -> Result<()> {
        self.driver.dispatch(Message::RefreshListing);
        if let Some(id) = self.initial.take() {
            self.driver.dispatch(Message::SelectDocument(id));
            ui.focus = Focus::Editor;
        }
        let mut needs_render = true;

        loop {
            if self.driver.poll_completions() {
                needs_render = true;
            }
            if self
                .driver
                .autosave_deadline()
                .is_some_and(|deadline| deadline <= tokio::time::Instant::now())
            {
                self.driver.tick();
                needs_render = true;
            }
            if ui.sync_from(self.driver.model()) {
                needs_render = true;
            }
            for notification in self.driver.drain_notifications() {
                ui.show_toast(notification.level, notification.message);
                needs_render = true;
            }
            if ui.expire_toast(Instant::now()) {
                needs_render = true;
            }

            if needs_render {
                terminal.draw(|frame| render(frame, ui, self.driver.model()))?;
                needs_render = false;
            }
            if ui.should_quit {
                break;
            }

            let busy = self.driver.in_flight() > 0 || self.driver.autosave_deadline().is_some();
            let poll_ms = if busy { BUSY_POLL_MS } else { IDLE_POLL_MS };
            if event::poll(Duration::from_millis(poll_ms))? {
                self.handle_event(&event::read()?, ui);
                // Coalesce key repeat bursts into a single render
                while event::poll(Duration::ZERO)? {
                    self.handle_event(&event::read()?, ui);
                }
                ui.flush_edits(&mut self.driver);
                needs_render = true;
            }
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &Event, ui: &mut Ui) {
        let Event::Key(key) = event else {
            return;
        };
        let action = if ui.searching {
            search_action_for_key(*key)
        } else {
            action_for_key(*key, ui.focus)
        };
        if let Some(action) = action {
            self.apply(ui, action);
        }
    }

    pub(super) fn apply(&mut self, ui: &mut Ui, action: Action) {
        ui.disarm(action);
        let height = usize::from(ui.editor_height);

        match action {
            Action::Save => {
                ui.flush_edits(&mut self.driver);
                if self.driver.model().selected().is_none() {
                    ui.show_toast(NotificationLevel::Warning, "No document selected");
                } else if !self.driver.model().is_dirty() {
                    ui.show_toast(NotificationLevel::Info, "Nothing to save");
                }
                self.driver.dispatch(Message::Save);
            }
            Action::QuickCreate => {
                ui.flush_edits(&mut self.driver);
                let title = quick_title(chrono::Local::now().date_naive());
                let request =
                    CreateDocumentRequest::new(&title).with_content(starter_content(&title));
                self.driver.dispatch(Message::CreateDocument(request));
                ui.focus = Focus::Editor;
            }
            Action::Delete => {
                let model = self.driver.model();
                let target = match ui.focus {
                    Focus::Editor => model.selected_id().cloned(),
                    Focus::Sidebar => ui.sidebar_target(model),
                };
                let Some(id) = target else {
                    ui.show_toast(NotificationLevel::Warning, "No document to delete");
                    return;
                };
                if ui.confirm_delete(&id) {
                    self.driver.dispatch(Message::Delete(id));
                } else {
                    let title = model
                        .documents()
                        .iter()
                        .find(|summary| summary.id == id)
                        .map_or_else(|| id.to_string(), |summary| summary.title.clone());
                    ui.show_toast(
                        NotificationLevel::Warning,
                        format!("Press Ctrl+D again to delete \"{title}\""),
                    );
                }
            }
            Action::Refresh => self.driver.dispatch(Message::RefreshListing),
            Action::ExportHtml => self.export_html(ui),
            Action::TogglePreview => ui.preview_visible = !ui.preview_visible,
            Action::SwitchFocus => {
                ui.focus = match ui.focus {
                    Focus::Sidebar => Focus::Editor,
                    Focus::Editor => Focus::Sidebar,
                };
            }
            Action::Quit => {
                ui.flush_edits(&mut self.driver);
                if ui.confirm_quit(self.driver.model().is_dirty()) {
                    ui.should_quit = true;
                } else {
                    ui.show_toast(
                        NotificationLevel::Warning,
                        "Unsaved changes. Press Ctrl+Q again to quit",
                    );
                }
            }
            Action::SidebarUp => ui.sidebar_index = ui.sidebar_index.saturating_sub(1),
            Action::SidebarDown => {
                let last = ui.sidebar_entries(self.driver.model()).len().saturating_sub(1);
                ui.sidebar_index = (ui.sidebar_index + 1).min(last);
            }
            Action::SidebarSelect => {
                let Some(id) = ui.sidebar_target(self.driver.model()) else {
                    return;
                };
                ui.flush_edits(&mut self.driver);
                self.driver.dispatch(Message::SelectDocument(id));
                ui.focus = Focus::Editor;
            }
            Action::StartSearch => ui.searching = true,
            Action::SearchInput(ch) => ui.edit_query(self.driver.model(), |query| query.push(ch)),
            Action::SearchBackspace => ui.edit_query(self.driver.model(), |query| {
                query.pop();
            }),
            Action::EndSearch => ui.searching = false,
            Action::ClearSearch => ui.clear_search(self.driver.model()),
            Action::Insert(ch) => ui.area.insert_char(ch),
            Action::Newline => ui.area.insert_newline(),
            Action::Backspace => {
                ui.area.backspace();
            }
            Action::DeleteChar => {
                ui.area.delete();
            }
            Action::Move(direction) => ui.area.move_cursor(direction),
            Action::Home => ui.area.move_home(),
            Action::End => ui.area.move_end(),
            Action::PageUp => ui.area.page(height, false),
            Action::PageDown => ui.area.page(height, true),
            Action::Top => ui.area.move_to_start(),
            Action::Bottom => ui.area.move_to_end(),
        }
        if ui.focus != Focus::Sidebar {
            ui.searching = false;
        }
        ui.area.scroll_to_cursor(height);
    }

    fn export_html(&self, ui: &mut Ui) {
        let model = self.driver.model();
        let Some(document) = model.selected() else {
            ui.show_toast(NotificationLevel::Warning, "No document selected");
            return;
        };
        let request = ExportRequest::new(
            &document.title,
            ui.area.text(),
            chrono::Local::now().date_naive(),
        );
        let written = export(ExportFormat::Html, &request)
            .map_err(anyhow::Error::from)
            .and_then(|artifact| {
                let path = write_artifact(&artifact, self.export_dir.as_deref())?;
                Ok(describe(&artifact, &path))
            });
        match written {
            Ok(summary) => ui.show_toast(NotificationLevel::Info, summary),
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                ui.show_toast(NotificationLevel::Error, format!("Export failed: {err:#}"));
            }
        }
    }
}
