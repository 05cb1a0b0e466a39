use ropey::Rope;
use unicode_width::UnicodeWidthChar;

/// Cursor position, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
}

impl Cursor {
    pub const fn at(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Rope-backed markdown editing surface.
///
/// Tracks a cursor, a sticky column for vertical movement and a scroll
/// offset. Every mutation bumps `revision` so the caller can tell when the
/// text needs to be pushed to the sync core.
pub struct TextArea {
    rope: Rope,
    cursor: Cursor,
    sticky_col: usize,
    scroll: usize,
    revision: u64,
}

impl Default for TextArea {
    fn default() -> Self {
        Self::from_text("")
    }
}

impl TextArea {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            sticky_col: 0,
            scroll: 0,
            revision: 0,
        }
    }

    /// Replace the whole text, keeping the cursor where it still fits.
    ///
    /// Does not count as an edit.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        let line = self.cursor.line.min(self.last_line());
        let col = self.cursor.col.min(self.line_len(line));
        self.cursor = Cursor::at(line, col);
        self.sticky_col = col;
        self.scroll = self.scroll.min(self.last_line());
    }

    /// Replace the text and put the cursor at the top.
    pub fn reset(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.cursor = Cursor::default();
        self.sticky_col = 0;
        self.scroll = 0;
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub const fn scroll(&self) -> usize {
        self.scroll
    }

    /// Incremented on every edit.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line content without its line ending.
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(idx).to_string();
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Line length in characters, excluding the line ending.
    pub fn line_len(&self, idx: usize) -> usize {
        self.line(idx).map_or(0, |line| line.chars().count())
    }

    /// Terminal column of the cursor within its line.
    pub fn cursor_display_col(&self) -> usize {
        self.line(self.cursor.line)
            .unwrap_or_default()
            .chars()
            .take(self.cursor.col)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        let idx = self.char_idx();
        self.rope.insert_char(idx, ch);
        self.set_col(self.cursor.col + 1);
        self.touch();
    }

    /// Insert pasted text at the cursor.
    pub fn insert_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let text = text.replace("\r\n", "\n");
        let idx = self.char_idx();
        self.rope.insert(idx, &text);
        let end = self.rope.char_to_line(idx + text.chars().count());
        let end_col = idx + text.chars().count() - self.rope.line_to_char(end);
        self.cursor.line = end;
        self.set_col(end_col);
        self.touch();
    }

    /// Split the line at the cursor, continuing a markdown list item.
    pub fn insert_newline(&mut self) {
        let current = self.line(self.cursor.line).unwrap_or_default();
        let marker = list_continuation(&current);

        // Enter on an empty item ends the list
        if let Some(marker) = &marker
            && current.trim_end() == marker.trim_end()
            && self.cursor.col == current.chars().count()
        {
            let start = self.rope.line_to_char(self.cursor.line);
            self.rope.remove(start..start + current.chars().count());
            self.set_col(0);
            self.touch();
            return;
        }

        let idx = self.char_idx();
        self.rope.insert_char(idx, '\n');
        self.cursor.line += 1;
        self.set_col(0);
        if let Some(marker) = marker {
            self.rope.insert(idx + 1, &marker);
            self.set_col(marker.chars().count());
        }
        self.touch();
    }

    /// Delete the character before the cursor. Returns whether anything changed.
    pub fn backspace(&mut self) -> bool {
        let idx = self.char_idx();
        if idx == 0 {
            return false;
        }
        if self.cursor.col == 0 {
            let prev = self.cursor.line - 1;
            let col = self.line_len(prev);
            self.rope.remove(idx - 1..idx);
            self.cursor.line = prev;
            self.set_col(col);
        } else {
            self.rope.remove(idx - 1..idx);
            self.set_col(self.cursor.col - 1);
        }
        self.touch();
        true
    }

    /// Delete the character under the cursor. Returns whether anything changed.
    pub fn delete(&mut self) -> bool {
        let idx = self.char_idx();
        if idx >= self.rope.len_chars() {
            return false;
        }
        // A CRLF pair goes as one
        let end = if self.rope.char(idx) == '\r'
            && self.rope.get_char(idx + 1) == Some('\n')
        {
            idx + 2
        } else {
            idx + 1
        };
        self.rope.remove(idx..end);
        self.touch();
        true
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => {
                if self.cursor.col > 0 {
                    self.set_col(self.cursor.col - 1);
                } else if self.cursor.line > 0 {
                    self.cursor.line -= 1;
                    self.set_col(self.line_len(self.cursor.line));
                }
            }
            Direction::Right => {
                if self.cursor.col < self.line_len(self.cursor.line) {
                    self.set_col(self.cursor.col + 1);
                } else if self.cursor.line < self.last_line() {
                    self.cursor.line += 1;
                    self.set_col(0);
                }
            }
            Direction::Up => self.move_vertical(-1),
            Direction::Down => self.move_vertical(1),
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor.col = 0;
        self.sticky_col = 0;
    }

    pub fn move_end(&mut self) {
        self.set_col(self.line_len(self.cursor.line));
    }

    pub fn page(&mut self, height: usize, down: bool) {
        let step = isize::try_from(height.max(1)).unwrap_or(isize::MAX);
        self.move_vertical(if down { step } else { -step });
    }

    pub fn move_to_start(&mut self) {
        self.cursor = Cursor::default();
        self.sticky_col = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor.line = self.last_line();
        self.set_col(self.line_len(self.cursor.line));
    }

    /// Adjust the scroll offset so the cursor line is within `height` rows.
    pub const fn scroll_to_cursor(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor.line < self.scroll {
            self.scroll = self.cursor.line;
        } else if self.cursor.line >= self.scroll + height {
            self.scroll = self.cursor.line + 1 - height;
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        let target = self
            .cursor
            .line
            .saturating_add_signed(delta)
            .min(self.last_line());
        self.cursor.line = target;
        self.cursor.col = self.sticky_col.min(self.line_len(target));
    }

    const fn set_col(&mut self, col: usize) {
        self.cursor.col = col;
        self.sticky_col = col;
    }

    fn last_line(&self) -> usize {
        self.rope.len_lines().saturating_sub(1)
    }

    fn char_idx(&self) -> usize {
        let line = self.cursor.line.min(self.last_line());
        self.rope.line_to_char(line) + self.cursor.col.min(self.line_len(line))
    }

    const fn touch(&mut self) {
        self.revision += 1;
    }
}

impl std::fmt::Debug for TextArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextArea")
            .field("lines", &self.rope.len_lines())
            .field("cursor", &self.cursor)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

/// Prefix to repeat on the next line when `line` is a list item.
fn list_continuation(line: &str) -> Option<String> {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, rest) = line.split_at(indent_len);

    for bullet in ["- [ ] ", "- [x] ", "* [ ] ", "- ", "* ", "+ ", "> "] {
        if rest.starts_with(bullet) {
            // Checked boxes continue unchecked
            let next = bullet.replace("[x]", "[ ]");
            return Some(format!("{indent}{next}"));
        }
    }

    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && rest[digits..].starts_with(". ") {
        let n: u64 = rest[..digits].parse().ok()?;
        return Some(format!("{indent}{}. ", n + 1));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_area_has_one_line() {
        let area = TextArea::default();
        assert_eq!(area.line_count(), 1);
        assert_eq!(area.line(0), Some(String::new()));
        assert_eq!(area.line(1), None);
    }

    #[test]
    fn test_insert_and_backspace_multibyte() {
        let mut area = TextArea::from_text("caf");
        area.move_end();
        area.insert_char('é');
        assert_eq!(area.text(), "café");
        assert_eq!(area.cursor(), Cursor::at(0, 4));
        assert!(area.backspace());
        assert_eq!(area.text(), "caf");
        assert_eq!(area.revision(), 2);
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut area = TextArea::from_text("ab\ncd");
        area.move_cursor(Direction::Down);
        assert!(area.backspace());
        assert_eq!(area.text(), "abcd");
        assert_eq!(area.cursor(), Cursor::at(0, 2));
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut area = TextArea::from_text("ab");
        assert!(!area.backspace());
        assert_eq!(area.revision(), 0);
    }

    #[test]
    fn test_delete_at_end_is_noop() {
        let mut area = TextArea::from_text("ab");
        area.move_to_end();
        assert!(!area.delete());
        area.move_home();
        assert!(area.delete());
        assert_eq!(area.text(), "b");
    }

    #[test]
    fn test_newline_continues_bullets() {
        let mut area = TextArea::from_text("- one");
        area.move_end();
        area.insert_newline();
        assert_eq!(area.text(), "- one\n- ");
        assert_eq!(area.cursor(), Cursor::at(1, 2));
    }

    #[test]
    fn test_newline_on_empty_item_ends_list() {
        let mut area = TextArea::from_text("- one\n- ");
        area.move_to_end();
        area.insert_newline();
        assert_eq!(area.text(), "- one\n");
        assert_eq!(area.cursor(), Cursor::at(1, 0));
    }

    #[test]
    fn test_list_continuation_variants() {
        assert_eq!(list_continuation("  * item"), Some("  * ".to_string()));
        assert_eq!(list_continuation("9. item"), Some("10. ".to_string()));
        assert_eq!(list_continuation("- [x] done"), Some("- [ ] ".to_string()));
        assert_eq!(list_continuation("plain"), None);
        assert_eq!(list_continuation("2024 was"), None);
    }

    #[test]
    fn test_vertical_movement_keeps_sticky_column() {
        let mut area = TextArea::from_text("long line\nab\nlong line");
        area.move_end();
        area.move_cursor(Direction::Down);
        assert_eq!(area.cursor(), Cursor::at(1, 2));
        area.move_cursor(Direction::Down);
        assert_eq!(area.cursor(), Cursor::at(2, 9));
    }

    #[test]
    fn test_insert_str_moves_cursor_to_end() {
        let mut area = TextArea::from_text("x");
        area.insert_str("a\r\nbc");
        assert_eq!(area.text(), "a\nbcx");
        assert_eq!(area.cursor(), Cursor::at(1, 2));
    }

    #[test]
    fn test_set_text_clamps_cursor_without_bumping_revision() {
        let mut area = TextArea::from_text("one\ntwo\nthree");
        area.move_to_end();
        area.set_text("a");
        assert_eq!(area.cursor(), Cursor::at(0, 1));
        assert_eq!(area.revision(), 0);
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut area = TextArea::from_text(&"x\n".repeat(20));
        area.page(10, true);
        area.scroll_to_cursor(5);
        assert_eq!(area.cursor().line, 10);
        assert_eq!(area.scroll(), 6);
        area.move_to_start();
        area.scroll_to_cursor(5);
        assert_eq!(area.scroll(), 0);
    }

    #[test]
    fn test_display_col_counts_wide_chars() {
        let mut area = TextArea::from_text("日本x");
        area.move_end();
        assert_eq!(area.cursor_display_col(), 5);
    }
}
