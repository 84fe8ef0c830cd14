//! Editor module for undoable markdown editing.
//!
//! Provides a rope-backed text buffer with cursor management and a
//! [`Session`] that records every edit in an [`UndoManager`](crate::undo::UndoManager).

mod buffer;
mod session;

pub use buffer::{Cursor, Direction, EditorBuffer};
pub use session::{ButtonState, Session};
