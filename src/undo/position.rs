//! Row/column positions and the ranges between them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A location in the document.
///
/// `column` counts chars within the row. Ordering is lexicographic on
/// `(row, column)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Zero-based line index.
    pub row: usize,
    /// Zero-based char offset within the line.
    pub column: usize,
}

impl Position {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// A span between two positions, `start <= end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Build a range, ordering the endpoints.
    pub fn new(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// A collapsed range at `pos`.
    pub const fn caret(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// Sign applied when moving a position across a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    /// The span was inserted before the position (`+1`).
    Forward,
    /// The span was removed before the position (`-1`).
    Backward,
}

impl ShiftDirection {
    const fn sign(self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Compare two positions by row, then column.
pub fn compare_points(a: Position, b: Position) -> Ordering {
    a.cmp(&b)
}

/// Move `pos` as if the text between `start` and `end` had been inserted
/// (`Forward`) or removed (`Backward`) ahead of it.
///
/// The column only moves when `pos` sits on the boundary row: the start row
/// for an insertion, the end row for a removal. The row always moves.
pub fn shift_position(
    pos: &mut Position,
    start: Position,
    end: Position,
    direction: ShiftDirection,
) {
    let sign = direction.sign();
    let boundary = match direction {
        ShiftDirection::Forward => start,
        ShiftDirection::Backward => end,
    };
    if pos.row == boundary.row {
        pos.column = offset(pos.column, sign * signed_diff(end.column, start.column));
    }
    pos.row = offset(pos.row, sign * signed_diff(end.row, start.row));
}

#[allow(clippy::cast_possible_wrap)]
const fn signed_diff(a: usize, b: usize) -> isize {
    a as isize - b as isize
}

fn offset(value: usize, delta: isize) -> usize {
    let shifted = value.checked_add_signed(delta);
    debug_assert!(
        shifted.is_some(),
        "position shift out of range: {value} + {delta}"
    );
    shifted.unwrap_or(0)
}
