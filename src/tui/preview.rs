//! Markdown preview rendered straight into ratatui lines.

use comrak::nodes::{AstNode, ListDelimType, ListType, NodeValue};
use comrak::{Arena, parse_document};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::document::create_options;
use crate::highlight::highlight_spans;

const MIN_WIDTH: usize = 8;

/// Lay out `markdown` for a pane `width` columns wide.
pub fn preview_lines(markdown: &str, width: u16) -> Vec<Line<'static>> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &create_options());
    let mut preview = Preview::new(usize::from(width).max(MIN_WIDTH));
    for child in root.children() {
        preview.block(child, 0);
    }
    preview.finish()
}

struct Preview {
    lines: Vec<Line<'static>>,
    width: usize,
}

impl Preview {
    const fn new(width: usize) -> Self {
        Self {
            lines: Vec::new(),
            width,
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        while self.lines.last().is_some_and(is_blank) {
            self.lines.pop();
        }
        self.lines
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|line| !is_blank(line)) {
            self.lines.push(Line::default());
        }
    }

    fn block<'a>(&mut self, node: &'a AstNode<'a>, depth: usize) {
        match &node.data.borrow().value {
            NodeValue::Heading(heading) => {
                self.blank();
                let style = heading_style(heading.level);
                let mut spans = vec![Span::styled(
                    format!("{} ", "#".repeat(usize::from(heading.level))),
                    style,
                )];
                collect_inline(node, style, &mut spans);
                self.wrap(spans, "", "");
                self.lines.push(Line::default());
            }

            NodeValue::Paragraph => {
                let mut spans = Vec::new();
                collect_inline(node, Style::default(), &mut spans);
                self.wrap(spans, "", "");
                self.lines.push(Line::default());
            }

            NodeValue::CodeBlock(code) => {
                let language = code.info.split_whitespace().next();
                self.code_block(language, &code.literal);
                self.lines.push(Line::default());
            }

            NodeValue::HtmlBlock(html) => {
                let style = Style::default().fg(Color::Indexed(245));
                for raw in html.literal.lines() {
                    self.lines.push(Line::styled(raw.to_string(), style));
                }
                self.lines.push(Line::default());
            }

            NodeValue::List(list) => {
                let count = node.children().count();
                let widest = (list.start + count.saturating_sub(1)).to_string().len();
                let delimiter = match list.delimiter {
                    ListDelimType::Paren => ')',
                    ListDelimType::Period => '.',
                };
                for (index, item) in node.children().enumerate() {
                    let marker = match list.list_type {
                        ListType::Bullet => "• ".to_string(),
                        ListType::Ordered => {
                            format!("{:>widest$}{delimiter} ", list.start + index)
                        }
                    };
                    self.item(item, depth + 1, &marker);
                }
                if depth == 0 {
                    self.lines.push(Line::default());
                }
            }

            NodeValue::BlockQuote => {
                let mut inner = Self::new(self.width.saturating_sub(2).max(MIN_WIDTH));
                for child in node.children() {
                    inner.block(child, depth);
                }
                let bar = Style::default().fg(Color::Blue);
                for line in inner.finish() {
                    let mut spans = vec![Span::styled("│ ", bar)];
                    spans.extend(
                        line.spans
                            .into_iter()
                            .map(|span| span.patch_style(Modifier::ITALIC)),
                    );
                    self.lines.push(Line::from(spans));
                }
                self.lines.push(Line::default());
            }

            NodeValue::ThematicBreak => {
                self.lines.push(Line::styled(
                    "─".repeat(self.width),
                    Style::default().add_modifier(Modifier::DIM),
                ));
                self.lines.push(Line::default());
            }

            NodeValue::Table(_) => {
                for line in table_lines(node, self.width) {
                    self.lines.push(line);
                }
                self.lines.push(Line::default());
            }

            NodeValue::FootnoteDefinition(def) => {
                let label = format!("[^{}]: ", def.name);
                let mut spans = Vec::new();
                collect_inline(node, Style::default(), &mut spans);
                self.wrap(spans, &label, &" ".repeat(label.width()));
                self.lines.push(Line::default());
            }

            _ => {
                for child in node.children() {
                    self.block(child, depth);
                }
            }
        }
    }

    fn item<'a>(&mut self, node: &'a AstNode<'a>, depth: usize, marker: &str) {
        let marker = match &node.data.borrow().value {
            NodeValue::TaskItem(Some(_)) => "✓ ".to_string(),
            NodeValue::TaskItem(None) => "□ ".to_string(),
            _ => marker.to_string(),
        };
        let indent = "  ".repeat(depth.saturating_sub(1));
        let first = format!("{indent}{marker}");
        let next = format!("{indent}{}", " ".repeat(marker.width()));
        let mut rendered = false;

        for child in node.children() {
            let is_text = matches!(child.data.borrow().value, NodeValue::Paragraph);
            if is_text {
                let mut spans = Vec::new();
                collect_inline(child, Style::default(), &mut spans);
                let prefix = if rendered { next.as_str() } else { first.as_str() };
                self.wrap(spans, prefix, &next);
                rendered = true;
            } else {
                if !rendered {
                    self.lines.push(Line::raw(first.clone()));
                    rendered = true;
                }
                self.block(child, depth);
            }
        }
        if !rendered {
            self.lines.push(Line::raw(first));
        }
    }

    fn code_block(&mut self, language: Option<&str>, literal: &str) {
        let frame = Style::default().fg(Color::Indexed(240));
        let highlighted = highlight_spans(language, literal);
        let widest = highlighted.iter().map(|spans| spans_width(spans)).max().unwrap_or(0);
        let inner = widest.min(self.width.saturating_sub(4)).max(1);

        let label = format!(" {} ", language.unwrap_or("code"));
        let label: String = label.chars().take(inner + 2).collect();
        self.lines.push(Line::styled(
            format!("┌{label}{}┐", "─".repeat((inner + 2).saturating_sub(label.width()))),
            frame,
        ));
        for spans in highlighted {
            let (mut kept, used) = truncate_spans(spans, inner);
            let mut line = vec![Span::styled("│ ", frame)];
            line.append(&mut kept);
            line.push(Span::raw(" ".repeat(inner - used)));
            line.push(Span::styled(" │", frame));
            self.lines.push(Line::from(line));
        }
        self.lines
            .push(Line::styled(format!("└{}┘", "─".repeat(inner + 2)), frame));
    }

    /// Word-wrap styled spans, starting with `first` and continuing with
    /// `next` as the line prefix.
    fn wrap(&mut self, spans: Vec<Span<'static>>, first: &str, next: &str) {
        let mut current = start_line(first);
        let mut used = first.width();
        let mut has_word = false;

        for token in tokens(spans) {
            if token.content == "\n" {
                self.lines.push(end_line(current));
                current = start_line(next);
                used = next.width();
                has_word = false;
                continue;
            }
            let token_width = token.content.width();
            let is_space = token.content.chars().all(char::is_whitespace);
            if has_word && used + token_width > self.width {
                self.lines.push(end_line(current));
                current = start_line(next);
                used = next.width();
                has_word = false;
            }
            if is_space && !has_word {
                continue;
            }
            used += token_width;
            current.push(token);
            has_word |= !is_space;
        }
        self.lines.push(end_line(current));
    }
}

fn is_blank(line: &Line<'_>) -> bool {
    line.spans.iter().all(|span| span.content.is_empty())
}

fn start_line(prefix: &str) -> Vec<Span<'static>> {
    if prefix.is_empty() {
        Vec::new()
    } else {
        vec![Span::raw(prefix.to_string())]
    }
}

fn end_line(mut spans: Vec<Span<'static>>) -> Line<'static> {
    while spans.len() > 1
        && spans
            .last()
            .is_some_and(|span| span.content.chars().all(char::is_whitespace))
    {
        spans.pop();
    }
    Line::from(spans)
}

/// Split spans into runs of whitespace and non-whitespace, with hard breaks
/// as their own `"\n"` token.
fn tokens(spans: Vec<Span<'static>>) -> Vec<Span<'static>> {
    let mut out = Vec::new();
    for span in spans {
        let style = span.style;
        let mut buf = String::new();
        let mut in_space = None;
        for ch in span.content.chars() {
            if ch == '\n' {
                if !buf.is_empty() {
                    out.push(Span::styled(std::mem::take(&mut buf), style));
                }
                out.push(Span::raw("\n"));
                in_space = None;
                continue;
            }
            let space = ch.is_whitespace();
            if in_space.is_some_and(|s| s != space) {
                out.push(Span::styled(std::mem::take(&mut buf), style));
            }
            buf.push(ch);
            in_space = Some(space);
        }
        if !buf.is_empty() {
            out.push(Span::styled(buf, style));
        }
    }
    out
}

fn collect_inline<'a>(node: &'a AstNode<'a>, style: Style, spans: &mut Vec<Span<'static>>) {
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(text) => spans.push(Span::styled(text.to_string(), style)),
            NodeValue::Code(code) => spans.push(Span::styled(
                code.literal.clone(),
                style.fg(Color::Yellow),
            )),
            NodeValue::HtmlInline(raw) => spans.push(Span::styled(raw.clone(), style)),
            NodeValue::Emph => collect_inline(child, style.add_modifier(Modifier::ITALIC), spans),
            NodeValue::Strong => collect_inline(child, style.add_modifier(Modifier::BOLD), spans),
            NodeValue::Strikethrough => {
                collect_inline(child, style.add_modifier(Modifier::CROSSED_OUT), spans);
            }
            NodeValue::Link(_) => collect_inline(
                child,
                style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
                spans,
            ),
            NodeValue::Image(image) => {
                let mut alt = Vec::new();
                collect_inline(child, style, &mut alt);
                let alt: String = alt.iter().map(|span| span.content.as_ref()).collect();
                let label = if alt.is_empty() { image.url.clone() } else { alt };
                spans.push(Span::styled(
                    format!("[image: {label}]"),
                    style.fg(Color::Magenta),
                ));
            }
            NodeValue::FootnoteReference(reference) => {
                spans.push(Span::styled(format!("[^{}]", reference.name), style));
            }
            NodeValue::SoftBreak => spans.push(Span::styled(" ", style)),
            NodeValue::LineBreak => spans.push(Span::raw("\n")),
            NodeValue::List(_) | NodeValue::Item(_) | NodeValue::TaskItem(_) => {}
            _ => collect_inline(child, style, spans),
        }
    }
}

fn heading_style(level: u8) -> Style {
    let style = Style::default().add_modifier(Modifier::BOLD);
    match level {
        1 => style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        2 => style.fg(Color::Green),
        3 => style.fg(Color::Yellow),
        4 => style.fg(Color::Blue),
        5 => style.fg(Color::Magenta),
        _ => style.fg(Color::Cyan),
    }
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.width()).sum()
}

/// Keep as much of `spans` as fits in `max` columns.
fn truncate_spans(spans: Vec<Span<'static>>, max: usize) -> (Vec<Span<'static>>, usize) {
    let mut kept = Vec::new();
    let mut used = 0;
    for span in spans {
        let width = span.content.width();
        if used + width <= max {
            used += width;
            kept.push(span);
            continue;
        }
        let mut text = String::new();
        for ch in span.content.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > max {
                break;
            }
            used += w;
            text.push(ch);
        }
        kept.push(Span::styled(text, span.style));
        break;
    }
    (kept, used)
}

fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut spans = Vec::new();
    collect_inline(node, Style::default(), &mut spans);
    spans
        .iter()
        .map(|span| span.content.as_ref())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn table_lines<'a>(table: &'a AstNode<'a>, width: usize) -> Vec<Line<'static>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut header = false;
    for row in table.children() {
        let NodeValue::TableRow(is_header) = row.data.borrow().value else {
            continue;
        };
        header |= is_header;
        rows.push(row.children().map(plain_text).collect());
    }
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }

    let mut widths = vec![1_usize; columns];
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.width());
        }
    }
    // Separators take three columns each
    while widths.iter().sum::<usize>() + 3 * (columns - 1) > width {
        let Some(widest) = widths.iter_mut().max() else {
            break;
        };
        if *widest <= 1 {
            break;
        }
        *widest -= 1;
    }

    let border = Style::default().fg(Color::Indexed(240));
    let mut lines = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let mut spans = Vec::new();
        for (col, cell_width) in widths.iter().enumerate() {
            if col > 0 {
                spans.push(Span::styled(" │ ", border));
            }
            let cell = row.get(col).map_or("", String::as_str);
            let (mut kept, used) = truncate_spans(vec![Span::raw(cell.to_string())], *cell_width);
            if header && idx == 0 {
                kept = kept
                    .into_iter()
                    .map(|span| span.patch_style(Modifier::BOLD))
                    .collect();
            }
            spans.append(&mut kept);
            spans.push(Span::raw(" ".repeat(cell_width - used)));
        }
        lines.push(Line::from(spans));
        if header && idx == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            lines.push(Line::styled(rule.join("─┼─"), border));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(markdown: &str, width: u16) -> Vec<String> {
        preview_lines(markdown, width)
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let lines = texts("# Title\n\nHello world", 40);
        assert_eq!(lines, vec!["# Title", "", "Hello world"]);
    }

    #[test]
    fn test_paragraph_wraps_to_width() {
        let lines = texts("alpha beta gamma delta", 12);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_bullets_and_tasks() {
        assert_eq!(texts("- one\n- two", 40), vec!["• one", "• two"]);
        assert_eq!(texts("- [ ] todo\n- [x] done", 40), vec!["□ todo", "✓ done"]);
    }

    #[test]
    fn test_ordered_list_numbers() {
        assert_eq!(texts("1. a\n2. b", 40), vec!["1. a", "2. b"]);
    }

    #[test]
    fn test_nested_list_indents() {
        let lines = texts("- outer\n  - inner", 40);
        assert_eq!(lines, vec!["• outer", "  • inner"]);
    }

    #[test]
    fn test_code_block_is_framed() {
        let lines = texts("```rust\nfn main() {}\n```", 40);
        assert!(lines[0].starts_with("┌ rust "));
        assert!(lines.iter().any(|l| l.starts_with("│ fn main() {}")));
        assert!(lines.last().unwrap().starts_with('└'));
    }

    #[test]
    fn test_blockquote_gets_bar() {
        assert_eq!(texts("> quoted", 40), vec!["│ quoted"]);
    }

    #[test]
    fn test_quote_is_italic_and_table_header_bold() {
        let quote = preview_lines("> quoted", 40);
        let text = quote[0].spans.iter().find(|span| span.content == "quoted").unwrap();
        assert!(text.style.add_modifier.contains(Modifier::ITALIC));

        let table = preview_lines("| a | b |\n|---|---|\n| 1 | 2 |", 40);
        let header = table[0].spans.iter().find(|span| span.content == "a").unwrap();
        assert!(header.style.add_modifier.contains(Modifier::BOLD));
        let body = table[2].spans.iter().find(|span| span.content == "1").unwrap();
        assert!(!body.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_raw_html_is_shown_as_text() {
        let lines = texts("a <b>bold</b> claim", 40);
        assert_eq!(lines, vec!["a <b>bold</b> claim"]);
    }

    #[test]
    fn test_table_has_header_rule() {
        let lines = texts("| a | b |\n|---|---|\n| 1 | 2 |", 40);
        assert_eq!(lines[0], "a │ b");
        assert_eq!(lines[1], "──┼──");
        assert_eq!(lines[2], "1 │ 2");
    }

    #[test]
    fn test_hard_break_splits_line() {
        let lines = texts("first  \nsecond", 40);
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_empty_document_has_no_lines() {
        assert!(preview_lines("", 40).is_empty());
    }
}
