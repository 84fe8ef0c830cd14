// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. undo::UndoManager)
    clippy::module_name_repetitions
)]

//! # mdrewind
//!
//! Undo and redo for a markdown editor, with support for edits that are not
//! the user's own.
//!
//! Most editors keep history as a plain stack. That breaks down once text can
//! change underneath the user, e.g. a generated completion inserted below the
//! cursor: undo would revert the wrong edit, and redo would replay deltas at
//! positions that have since moved. mdrewind records such edits as
//! *ignored* delta sets and uses operational transformation to
//! - reorder the undo stack so the user's own most recent edit is undone
//!   first,
//! - rebase the redo stack over edits made after an undo.
//!
//! ## Modules
//!
//! - [`undo`]: Positions, deltas, transforms and the [`UndoManager`](undo::UndoManager)
//! - [`editor`]: Rope-backed text buffer and the editing [`Session`](editor::Session)
//! - [`settings`]: Settings embedded in the document header
//! - [`store`]: Loading and saving documents
//! - [`completion`]: Text completion services
//! - [`script`]: Edit scripts driving a session
//! - [`config`]: Command-line defaults stored in config files

pub mod completion;
pub mod config;
pub mod editor;
pub mod script;
pub mod settings;
pub mod store;
pub mod undo;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::editor::{EditorBuffer, Session};
    pub use crate::undo::{Action, Delta, DeltaHost, DeltaSet, Position, Range, UndoManager};
}
