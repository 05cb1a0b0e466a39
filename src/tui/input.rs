use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::editor::Direction;

use super::Focus;

/// What a key press asks the editor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Save,
    QuickCreate,
    Delete,
    Refresh,
    ExportHtml,
    TogglePreview,
    SwitchFocus,
    Quit,

    // Sidebar
    SidebarUp,
    SidebarDown,
    SidebarSelect,
    StartSearch,
    SearchInput(char),
    SearchBackspace,
    /// Leave search mode, keeping the filter.
    EndSearch,
    /// Leave search mode and drop the filter.
    ClearSearch,

    // Editor
    Insert(char),
    Newline,
    Backspace,
    DeleteChar,
    Move(Direction),
    Home,
    End,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

pub fn action_for_key(key: KeyEvent, focus: Focus) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl {
        return match key.code {
            KeyCode::Char('s') => Some(Action::Save),
            KeyCode::Char('n') => Some(Action::QuickCreate),
            KeyCode::Char('d') => Some(Action::Delete),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('e') => Some(Action::ExportHtml),
            KeyCode::Char('p') => Some(Action::TogglePreview),
            KeyCode::Char('q' | 'c') => Some(Action::Quit),
            KeyCode::Home => Some(Action::Top),
            KeyCode::End => Some(Action::Bottom),
            _ => None,
        };
    }

    if key.code == KeyCode::Tab || key.code == KeyCode::BackTab {
        return Some(Action::SwitchFocus);
    }

    match focus {
        Focus::Sidebar => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::SidebarUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::SidebarDown),
            KeyCode::Enter => Some(Action::SidebarSelect),
            KeyCode::Char('/') => Some(Action::StartSearch),
            KeyCode::Esc => Some(Action::ClearSearch),
            _ => None,
        },
        Focus::Editor => match key.code {
            KeyCode::Char(ch) => Some(Action::Insert(ch)),
            KeyCode::Enter => Some(Action::Newline),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Delete => Some(Action::DeleteChar),
            KeyCode::Left => Some(Action::Move(Direction::Left)),
            KeyCode::Right => Some(Action::Move(Direction::Right)),
            KeyCode::Up => Some(Action::Move(Direction::Up)),
            KeyCode::Down => Some(Action::Move(Direction::Down)),
            KeyCode::Home => Some(Action::Home),
            KeyCode::End => Some(Action::End),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::PageDown => Some(Action::PageDown),
            _ => None,
        },
    }
}

/// Keys while typing a sidebar filter.
pub fn search_action_for_key(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return action_for_key(key, Focus::Sidebar);
    }
    match key.code {
        KeyCode::Char(ch) => Some(Action::SearchInput(ch)),
        KeyCode::Backspace => Some(Action::SearchBackspace),
        KeyCode::Enter => Some(Action::EndSearch),
        KeyCode::Esc => Some(Action::ClearSearch),
        KeyCode::Up => Some(Action::SidebarUp),
        KeyCode::Down => Some(Action::SidebarDown),
        KeyCode::Tab | KeyCode::BackTab => Some(Action::SwitchFocus),
        _ => None,
    }
}
