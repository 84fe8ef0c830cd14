//! Atomic text mutations and the groups that form one undoable action.

use serde::{Deserialize, Serialize};

use super::position::{Position, Range, ShiftDirection, shift_position};

/// Identifier assigned to each delta set when it enters the history.
pub type Revision = u64;

/// Kind of text mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Insert,
    Delete,
}

impl Action {
    pub const fn inverse(self) -> Self {
        match self {
            Self::Insert => Self::Delete,
            Self::Delete => Self::Insert,
        }
    }
}

/// One line-oriented insert or delete.
///
/// `lines` holds `end.row - start.row + 1` entries: the text between `start`
/// and `end` split on newlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub action: Action,
    pub start: Position,
    pub end: Position,
    pub lines: Vec<String>,
}

impl Delta {
    /// Build a delta from its parts.
    ///
    /// Malformed spans are a caller bug and only checked in debug builds.
    pub fn from_parts(action: Action, start: Position, end: Position, lines: Vec<String>) -> Self {
        let delta = Self {
            action,
            start,
            end,
            lines,
        };
        debug_assert!(delta.is_well_formed(), "malformed delta: {delta:?}");
        delta
    }

    /// An insertion of `text` at `start`.
    pub fn insert(start: Position, text: &str) -> Self {
        Self::spanning(Action::Insert, start, text)
    }

    /// A deletion of `text`, which must be the document text found at `start`.
    pub fn delete(start: Position, text: &str) -> Self {
        Self::spanning(Action::Delete, start, text)
    }

    fn spanning(action: Action, start: Position, text: &str) -> Self {
        let lines: Vec<String> = text.split('\n').map(ToOwned::to_owned).collect();
        let end = end_of(start, &lines);
        Self {
            action,
            start,
            end,
            lines,
        }
    }

    pub const fn is_insert(&self) -> bool {
        matches!(self.action, Action::Insert)
    }

    pub const fn span(&self) -> Range {
        Range {
            start: self.start,
            end: self.end,
        }
    }

    /// The inserted or deleted text, newline-joined.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// The same span and text with the action flipped.
    pub fn inverted(&self) -> Self {
        Self {
            action: self.action.inverse(),
            start: self.start,
            end: self.end,
            lines: self.lines.clone(),
        }
    }

    /// Whether `end` and `lines` agree with each other.
    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
            && !self.lines.is_empty()
            && self.lines.len() == self.end.row - self.start.row + 1
            && end_of(self.start, &self.lines) == self.end
    }
}

fn end_of(start: Position, lines: &[String]) -> Position {
    let last = lines.last().map_or(0, |l| l.chars().count());
    if lines.len() <= 1 {
        Position::new(start.row, start.column + last)
    } else {
        Position::new(start.row + lines.len() - 1, last)
    }
}

/// Move both endpoints of `delta` across `span`.
pub fn shift_delta(delta: &mut Delta, span: Range, direction: ShiftDirection) {
    shift_position(&mut delta.start, span.start, span.end, direction);
    shift_position(&mut delta.end, span.start, span.end, direction);
}

/// Cut `delta` at `at`, keeping the head in place and returning the tail.
///
/// `at` must lie within the delta's span. The concatenated text of head and
/// tail equals the original text.
pub fn split_delta(delta: &mut Delta, at: Position) -> Delta {
    debug_assert!(delta.span().contains(at), "split point outside delta");
    let end = delta.end;
    delta.end = at;
    let rows_before = at.row - delta.start.row;
    let mut tail = delta.lines.split_off(rows_before);
    let column = if rows_before > 0 {
        at.column
    } else {
        at.column - delta.start.column
    };
    let cut = byte_index(&tail[0], column);
    let head_part = tail[0][..cut].to_owned();
    tail[0].replace_range(..cut, "");
    delta.lines.push(head_part);
    Delta {
        action: delta.action,
        start: at,
        end,
        lines: tail,
    }
}

/// Byte offset of the char at `column`, clamped to the line end.
pub(crate) fn byte_index(line: &str, column: usize) -> usize {
    line.char_indices().nth(column).map_or(line.len(), |(i, _)| i)
}

/// The deltas of one logical user edit.
///
/// `ignore` marks sets that must never become the undo target on their own,
/// such as programmatic edits. Selection annotations are hints for the host
/// and are dropped whenever the set is reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSet {
    pub id: Revision,
    pub deltas: Vec<Delta>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_before: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Range>,
}

impl DeltaSet {
    pub fn new(deltas: Vec<Delta>) -> Self {
        Self {
            deltas,
            ..Self::default()
        }
    }

    /// A set flagged to be skipped when looking for the undo target.
    pub fn ignored(deltas: Vec<Delta>) -> Self {
        Self {
            deltas,
            ignore: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_selection(mut self, before: Option<Range>, after: Option<Range>) -> Self {
        self.selection_before = before;
        self.selection_after = after;
        self
    }

    pub fn push(&mut self, delta: Delta) {
        self.deltas.push(delta);
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Delta> {
        self.deltas.iter()
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selection_before = None;
        self.selection_after = None;
    }
}

impl<'a> IntoIterator for &'a DeltaSet {
    type Item = &'a Delta;
    type IntoIter = std::slice::Iter<'a, Delta>;

    fn into_iter(self) -> Self::IntoIter {
        self.deltas.iter()
    }
}
