//! Syntax highlighting for code blocks.
//!
//! Uses syntect for highlighting with Sublime Text syntax definitions. Exported
//! HTML uses a light theme with inline styles; the terminal preview uses a
//! dark theme rendered to ratatui spans.

use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

const LIGHT_THEMES: &[&str] = &["InspiredGitHub", "Solarized (light)", "base16-ocean.light"];
const DARK_THEMES: &[&str] = &["base16-ocean.dark", "Solarized (dark)", "base16-eighties.dark"];

/// Highlight `code` as standalone HTML with inline styles.
///
/// Returns `None` when the language is empty or unknown, so callers can fall
/// back to a plain code block.
pub fn highlight_html(language: &str, code: &str) -> Option<String> {
    let syntax = find_syntax(language)?;
    match syntect::html::highlighted_html_for_string(code, syntax_set(), syntax, light_theme()) {
        Ok(html) => Some(html),
        Err(err) => {
            tracing::debug!(language, error = %err, "html highlighting failed");
            None
        }
    }
}

/// Highlight `code` into one span list per line for the terminal preview.
pub fn highlight_spans(language: Option<&str>, code: &str) -> Vec<Vec<Span<'static>>> {
    let code_style = Style::default().fg(Color::Indexed(245));
    let Some(syntax) = language.and_then(find_syntax) else {
        return code
            .lines()
            .map(|line| vec![Span::styled(line.to_string(), code_style)])
            .collect();
    };

    let syntax_set = syntax_set();
    let mut highlighter = HighlightLines::new(syntax, dark_theme());
    let mut lines = Vec::new();
    for line in code.lines() {
        let ranges = highlighter
            .highlight_line(line, syntax_set)
            .unwrap_or_default();
        let spans = ranges
            .into_iter()
            .map(|(style, text)| {
                let fg = style.foreground;
                let mut span_style = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
                if style.font_style.contains(FontStyle::BOLD) {
                    span_style = span_style.add_modifier(Modifier::BOLD);
                }
                if style.font_style.contains(FontStyle::ITALIC) {
                    span_style = span_style.add_modifier(Modifier::ITALIC);
                }
                Span::styled(text.to_string(), span_style)
            })
            .collect();
        lines.push(spans);
    }
    lines
}

fn find_syntax(language: &str) -> Option<&'static SyntaxReference> {
    if language.is_empty() {
        return None;
    }
    let syntax_set = syntax_set();
    syntax_set
        .find_syntax_by_token(language)
        .or_else(|| syntax_set.find_syntax_by_name(language))
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

fn light_theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(|| pick_theme(LIGHT_THEMES))
}

fn dark_theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(|| pick_theme(DARK_THEMES))
}

fn pick_theme(preferred: &[&str]) -> Theme {
    let theme_set = theme_set();
    for name in preferred {
        if let Some(theme) = theme_set.themes.get(*name) {
            return theme.clone();
        }
    }
    theme_set
        .themes
        .values()
        .next()
        .cloned()
        .unwrap_or_default()
}
