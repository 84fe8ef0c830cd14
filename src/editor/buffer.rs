use ropey::Rope;

use crate::undo::{Action, Delta, DeltaHost, Position, Range};

/// Cursor position in the editor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column (char offset within the line).
    pub col: usize,
    /// Remembered column for vertical movement (sticky column).
    col_memory: usize,
}

impl Cursor {
    /// Create a cursor at line 0, column 0.
    pub const fn new() -> Self {
        Self {
            line: 0,
            col: 0,
            col_memory: 0,
        }
    }

    /// Create a cursor at a specific position.
    pub const fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            col_memory: col,
        }
    }

    pub const fn position(self) -> Position {
        Position::new(self.line, self.col)
    }

    /// Update column and reset column memory to match.
    const fn set_col(&mut self, col: usize) {
        self.col = col;
        self.col_memory = col;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A text buffer backed by a rope data structure.
///
/// Every mutating method returns the [`Delta`] it applied so the caller can
/// record it for undo. Columns are char offsets.
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    anchor: Option<Position>,
}

impl EditorBuffer {
    /// Create a new buffer from a string. CRLF line endings become LF.
    pub fn from_text(text: &str) -> Self {
        let rope = if text.contains("\r\n") {
            Rope::from_str(&text.replace("\r\n", "\n"))
        } else {
            Rope::from_str(text)
        };
        Self {
            rope,
            cursor: Cursor::new(),
            anchor: None,
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// The current cursor position.
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The selected range, if a selection anchor is set.
    pub fn selection(&self) -> Option<Range> {
        self.anchor
            .map(|anchor| Range::new(anchor, self.cursor.position()))
            .filter(|range| !range.is_empty())
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the content of a line (without trailing newline).
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let s = self.rope.line(line_idx).to_string();
        Some(s.trim_end_matches('\n').to_string())
    }

    /// Length of a line in chars (without trailing newline).
    pub fn line_len(&self, line_idx: usize) -> usize {
        if line_idx >= self.rope.len_lines() {
            return 0;
        }
        let line = self.rope.line(line_idx);
        let len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    /// The full text content of the buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// The text between two positions.
    pub fn text_in(&self, range: Range) -> String {
        let start = self.char_index(range.start);
        let end = self.char_index(range.end);
        self.rope.slice(start..end).to_string()
    }

    /// Position just past the last char.
    pub fn end_position(&self) -> Position {
        let last = self.line_count().saturating_sub(1);
        Position::new(last, self.line_len(last))
    }

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, ch: char) -> Delta {
        let mut buf = [0u8; 4];
        let delta = Delta::insert(self.cursor.position(), ch.encode_utf8(&mut buf));
        self.apply(&delta);
        delta
    }

    /// Insert a string at the cursor position.
    ///
    /// Returns `None` for an empty string.
    pub fn insert_str(&mut self, s: &str) -> Option<Delta> {
        if s.is_empty() {
            return None;
        }
        let delta = Delta::insert(self.cursor.position(), s);
        self.apply(&delta);
        Some(delta)
    }

    /// Split the current line at the cursor (Enter key).
    pub fn split_line(&mut self) -> Delta {
        self.insert_char('\n')
    }

    /// Delete the character before the cursor (Backspace).
    ///
    /// Returns `None` at the start of the buffer.
    pub fn delete_back(&mut self) -> Option<Delta> {
        let end = self.cursor.position();
        let start = if end.column > 0 {
            Position::new(end.row, end.column - 1)
        } else if end.row > 0 {
            Position::new(end.row - 1, self.line_len(end.row - 1))
        } else {
            return None;
        };
        Some(self.delete_range(Range::new(start, end)))
    }

    /// Delete the character at the cursor (Delete key).
    ///
    /// Returns `None` at the end of the buffer.
    pub fn delete_forward(&mut self) -> Option<Delta> {
        let start = self.cursor.position();
        let end = if start.column < self.line_len(start.row) {
            Position::new(start.row, start.column + 1)
        } else if start.row + 1 < self.line_count() {
            Position::new(start.row + 1, 0)
        } else {
            return None;
        };
        Some(self.delete_range(Range::new(start, end)))
    }

    /// Delete the selected text, if any.
    pub fn delete_selection(&mut self) -> Option<Delta> {
        let range = self.selection()?;
        Some(self.delete_range(range))
    }

    /// Delete the text in `range`.
    pub fn delete_range(&mut self, range: Range) -> Delta {
        let range = Range::new(self.clamp(range.start), self.clamp(range.end));
        let delta = Delta::delete(range.start, &self.text_in(range));
        self.apply(&delta);
        delta
    }

    /// Select from `anchor` to `head`, leaving the cursor at `head`.
    pub fn select(&mut self, anchor: Position, head: Position) {
        self.anchor = Some(self.clamp(anchor));
        self.move_to(head.row, head.column);
    }

    /// Select `range` with the cursor at its end.
    pub fn select_range(&mut self, range: Range) {
        self.select(range.start, range.end);
    }

    pub const fn clear_selection(&mut self) {
        self.anchor = None;
    }

    /// The selected text, or an empty string without a selection.
    pub fn selected_text(&self) -> String {
        self.selection()
            .map(|range| self.text_in(range))
            .unwrap_or_default()
    }

    /// Move the cursor in the given direction.
    pub fn move_cursor(&mut self, direction: Direction) {
        self.anchor = None;
        match direction {
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
            Direction::Up => self.move_up(),
            Direction::Down => self.move_down(),
        }
    }

    /// Move cursor to the beginning of the line (Home).
    pub const fn move_home(&mut self) {
        self.cursor.set_col(0);
    }

    /// Move cursor to the end of the line (End).
    pub fn move_end(&mut self) {
        let len = self.line_len(self.cursor.line);
        self.cursor.set_col(len);
    }

    /// `delta` adjusted to fit the text, or `None` if it cannot apply.
    ///
    /// An insert moves to the nearest valid position, or to the end of the
    /// text when its row is past the last line. A delete is only kept when its
    /// span lies inside the text and holds exactly its lines.
    pub fn fit(&self, delta: &Delta) -> Option<Delta> {
        match delta.action {
            Action::Insert => {
                let at = if delta.start.row >= self.line_count() {
                    self.end_position()
                } else {
                    self.clamp(delta.start)
                };
                Some(Delta::insert(at, &delta.text()))
            }
            Action::Delete => {
                let inside =
                    self.clamp(delta.start) == delta.start && self.clamp(delta.end) == delta.end;
                (inside && self.text_in(delta.span()) == delta.text()).then(|| delta.clone())
            }
        }
    }

    /// Move cursor to a specific line and column, clamped to the text.
    pub fn move_to(&mut self, line: usize, col: usize) {
        let pos = self.clamp(Position::new(line, col));
        self.cursor.line = pos.row;
        self.cursor.set_col(pos.column);
    }

    // --- Private helpers ---

    fn clamp(&self, pos: Position) -> Position {
        let max_line = self.line_count().saturating_sub(1);
        let row = pos.row.min(max_line);
        Position::new(row, pos.column.min(self.line_len(row)))
    }

    /// Convert a position to a ropey char index.
    fn char_index(&self, pos: Position) -> usize {
        let pos = self.clamp(pos);
        self.rope.line_to_char(pos.row) + pos.column
    }

    /// Apply `delta` to the rope and place the cursor after it.
    fn apply(&mut self, delta: &Delta) -> Range {
        self.anchor = None;
        match delta.action {
            Action::Insert => {
                let at = self.char_index(delta.start);
                self.rope.insert(at, &delta.text());
                self.move_to(delta.end.row, delta.end.column);
                delta.span()
            }
            Action::Delete => {
                debug_assert_eq!(
                    self.text_in(delta.span()),
                    delta.text(),
                    "delete does not match buffer text"
                );
                let start = self.char_index(delta.start);
                let end = self.char_index(delta.end);
                self.rope.remove(start..end);
                self.move_to(delta.start.row, delta.start.column);
                Range::caret(delta.start)
            }
        }
    }

    fn move_left(&mut self) {
        if self.cursor.col > 0 {
            self.cursor.set_col(self.cursor.col - 1);
        } else if self.cursor.line > 0 {
            self.cursor.line -= 1;
            self.cursor.set_col(self.line_len(self.cursor.line));
        }
    }

    fn move_right(&mut self) {
        if self.cursor.col < self.line_len(self.cursor.line) {
            self.cursor.set_col(self.cursor.col + 1);
        } else if self.cursor.line + 1 < self.line_count() {
            self.cursor.line += 1;
            self.cursor.set_col(0);
        }
    }

    fn move_up(&mut self) {
        if self.cursor.line > 0 {
            self.cursor.line -= 1;
            let max_col = self.line_len(self.cursor.line);
            self.cursor.col = self.cursor.col_memory.min(max_col);
        }
    }

    fn move_down(&mut self) {
        if self.cursor.line + 1 < self.line_count() {
            self.cursor.line += 1;
            let max_col = self.line_len(self.cursor.line);
            self.cursor.col = self.cursor.col_memory.min(max_col);
        }
    }
}

impl DeltaHost for EditorBuffer {
    fn apply_forward(&mut self, delta: &Delta) -> Option<Range> {
        Some(self.apply(delta))
    }

    fn apply_inverse(&mut self, delta: &Delta) -> Option<Range> {
        Some(self.apply(&delta.inverted()))
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("cursor", &self.cursor)
            .field("anchor", &self.anchor)
            .finish()
    }
}
