//! Operational-transform undo/redo.
//!
//! Edits are recorded as [`DeltaSet`]s, one per user action. Undo can reach
//! past sets flagged `ignore` by transforming the target up to the top of the
//! stack ([`reorder`]); redo rebases its stack over edits recorded after the
//! undo ([`rebase`]). Both rely on the pairwise rules in [`transform`].

pub mod delta;
mod manager;
pub mod position;
pub mod rebase;
pub mod reorder;
pub mod transform;

pub use delta::{Action, Delta, DeltaSet, Revision, shift_delta, split_delta};
pub use manager::{DeltaHost, Replay, UndoManager};
pub use position::{Position, Range, ShiftDirection, compare_points, shift_position};
pub use rebase::rebase_redo_stack;
pub use reorder::{promote_to_top, swap_groups};
pub use transform::{Rebased, Transformed, swap, transform, transform_all};
