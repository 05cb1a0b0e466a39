use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::{Focus, Ui, preview_lines};
use crate::sync::{NotificationLevel, SyncModel, SyncPhase};

const SIDEBAR_PERCENT: u16 = 22;
const KEY_HINTS: &str =
    "^S save  ^N new  ^D delete  ^R refresh  ^E export  ^P preview  / filter  Tab focus  ^Q quit";

/// Draw the whole editor.
pub fn render(frame: &mut Frame, ui: &mut Ui, model: &SyncModel) {
    let rows = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(frame.area());
    let columns = if ui.preview_visible {
        let rest = (100 - SIDEBAR_PERCENT) / 2;
        Layout::horizontal([
            Constraint::Percentage(SIDEBAR_PERCENT),
            Constraint::Percentage(rest),
            Constraint::Percentage(rest),
        ])
        .split(rows[0])
    } else {
        Layout::horizontal([
            Constraint::Percentage(SIDEBAR_PERCENT),
            Constraint::Percentage(100 - SIDEBAR_PERCENT),
        ])
        .split(rows[0])
    };

    render_sidebar(frame, ui, model, columns[0]);
    render_editor(frame, ui, model, columns[1]);
    if let Some(area) = columns.get(2) {
        render_preview(frame, ui, *area);
    }
    if !render_toast_bar(frame, ui, rows[1]) {
        render_status_bar(frame, model, rows[1]);
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        })
}

fn render_sidebar(frame: &mut Frame, ui: &Ui, model: &SyncModel, area: Rect) {
    let title = if ui.searching {
        format!(" /{}_ ", ui.query)
    } else if ui.query.is_empty() {
        " Documents ".to_string()
    } else {
        format!(" Documents /{} ", ui.query)
    };
    let block = pane_block(title, ui.focus == Focus::Sidebar);
    let documents = ui.sidebar_entries(model);
    if documents.is_empty() {
        let dim = Style::default().fg(Color::Indexed(245));
        let hint = if model.documents().is_empty() {
            vec![
                Line::styled("No documents", dim),
                Line::styled("Ctrl+N creates one", dim),
            ]
        } else {
            vec![Line::styled("No matches", dim), Line::styled("Esc clears", dim)]
        };
        frame.render_widget(Paragraph::new(hint).block(block), area);
        return;
    }

    let visible = usize::from(area.height.saturating_sub(2)).max(1);
    let start = ui.sidebar_index.saturating_sub(visible - 1);
    let selected = model.selected_id();
    let items: Vec<Line> = documents
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(i, summary)| {
            let marker = if i == ui.sidebar_index { ">" } else { " " };
            let mut style = Style::default();
            if selected == Some(&summary.id) {
                style = style.add_modifier(Modifier::BOLD).fg(Color::Cyan);
            }
            if i == ui.sidebar_index && ui.focus == Focus::Sidebar {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let mut spans = vec![Span::styled(format!("{marker} {}", summary.title), style)];
            if summary.is_public {
                spans.push(Span::styled(" ◆", Style::default().fg(Color::Green)));
            }
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(items).block(block), area);
}

fn render_editor(frame: &mut Frame, ui: &mut Ui, model: &SyncModel, area: Rect) {
    let title = model
        .selected()
        .map_or_else(|| " Markdraft ".to_string(), |doc| format!(" {} ", doc.title));
    let block = pane_block(title, ui.focus == Focus::Editor);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    ui.editor_height = inner.height.max(1);
    let height = usize::from(inner.height);
    ui.area.scroll_to_cursor(height);
    let scroll = ui.area.scroll();
    let lines: Vec<Line> = (scroll..scroll + height)
        .map_while(|idx| ui.area.line(idx))
        .map(Line::raw)
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);

    if ui.focus == Focus::Editor && inner.width > 0 && inner.height > 0 {
        let cursor = ui.area.cursor();
        let col = u16::try_from(ui.area.cursor_display_col())
            .unwrap_or(u16::MAX)
            .min(inner.width - 1);
        let row = u16::try_from(cursor.line.saturating_sub(scroll))
            .unwrap_or(u16::MAX)
            .min(inner.height - 1);
        frame.set_cursor_position((inner.x + col, inner.y + row));
    }
}

fn render_preview(frame: &mut Frame, ui: &mut Ui, area: Rect) {
    let block = pane_block(" Preview ".to_string(), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let key = ui.content_key();
    let stale = ui
        .preview_cache
        .as_ref()
        .is_none_or(|(cached, width, _)| *cached != key || *width != inner.width);
    if stale {
        let lines = preview_lines(&ui.area.text(), inner.width);
        ui.preview_cache = Some((key, inner.width, lines));
    }
    let Some((_, _, lines)) = &ui.preview_cache else {
        return;
    };

    // Keep the preview roughly aligned with the editor
    let total = ui.area.line_count().max(1);
    let offset = ui.area.scroll() * lines.len() / total;
    let offset = u16::try_from(offset).unwrap_or(u16::MAX);
    frame.render_widget(Paragraph::new(lines.clone()).scroll((offset, 0)), inner);
}

fn render_status_bar(frame: &mut Frame, model: &SyncModel, area: Rect) {
    let state = match model.phase() {
        SyncPhase::NoSelection => "no document",
        SyncPhase::Loading => "loading…",
        SyncPhase::Clean => "saved",
        SyncPhase::Dirty => "modified",
        SyncPhase::Saving => "saving…",
    };
    let status = format!(" [{state}]  {} documents  {KEY_HINTS}", model.documents().len());
    let bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(bar, area);
}

fn render_toast_bar(frame: &mut Frame, ui: &Ui, area: Rect) -> bool {
    let Some((message, level)) = ui.active_toast() else {
        return false;
    };
    let (prefix, style) = match level {
        NotificationLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        NotificationLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        NotificationLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    frame.render_widget(Paragraph::new(format!("{prefix} {message}")).style(style), area);
    true
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::document::{DocumentId, DocumentSummary};
    use crate::sync::{Effect, Message, update};

    fn model_with_titles(titles: &[&str]) -> SyncModel {
        let (model, effects) = update(SyncModel::default(), Message::RefreshListing);
        let Some(Effect::FetchListing { generation }) = effects.first().cloned() else {
            panic!("expected a listing fetch, got {effects:?}");
        };
        let now = chrono::Utc::now();
        let documents = titles
            .iter()
            .map(|title| DocumentSummary {
                id: DocumentId::from(title.to_lowercase().as_str()),
                title: (*title).to_string(),
                is_public: false,
                created_at: now,
                updated_at: now,
            })
            .collect();
        update(
            model,
            Message::ListingLoaded {
                generation,
                result: Ok(documents),
            },
        )
        .0
    }

    fn screen(ui: &mut Ui, model: &SyncModel) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(frame, ui, model)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for row in 0..buffer.area.height {
            for col in 0..buffer.area.width {
                out.push_str(buffer[(col, row)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_empty_state_shows_placeholder_and_hint() {
        let model = SyncModel::default();
        let mut ui = Ui::new(&model);
        let text = screen(&mut ui, &model);
        assert!(text.contains("No documents"));
        assert!(text.contains("# Welcome to Markdraft"));
        assert!(text.contains("[no document]"));
    }

    #[test]
    fn test_sidebar_shows_only_matching_titles() {
        let model = model_with_titles(&["Groceries", "Journal", "Grants"]);
        let mut ui = Ui::new(&model);
        let text = screen(&mut ui, &model);
        assert!(text.contains("> Groceries"));
        assert!(text.contains("Journal"));

        ui.searching = true;
        ui.query = "gra".to_string();
        let text = screen(&mut ui, &model);
        assert!(text.contains("/gra_"));
        assert!(text.contains("> Grants"));
        assert!(!text.contains("Groceries"));
        assert!(!text.contains("Journal"));

        ui.searching = false;
        ui.query = "zzz".to_string();
        let text = screen(&mut ui, &model);
        assert!(text.contains("Documents /zzz"));
        assert!(text.contains("No matches"));
    }

    #[test]
    fn test_toast_replaces_status_bar() {
        let model = SyncModel::default();
        let mut ui = Ui::new(&model);
        ui.show_toast(NotificationLevel::Error, "Failed to save document");
        let text = screen(&mut ui, &model);
        assert!(text.contains("[error] Failed to save document"));
        assert!(!text.contains("[no document]"));
    }

    #[test]
    fn test_hidden_preview_is_not_drawn() {
        let model = SyncModel::default();
        let mut ui = Ui::new(&model);
        assert!(screen(&mut ui, &model).contains("Preview"));
        ui.preview_visible = false;
        assert!(!screen(&mut ui, &model).contains("Preview"));
    }

    #[test]
    fn test_editor_height_tracks_pane() {
        let model = SyncModel::default();
        let mut ui = Ui::new(&model);
        screen(&mut ui, &model);
        // 20 rows minus status bar minus borders
        assert_eq!(ui.editor_height, 17);
    }
}
