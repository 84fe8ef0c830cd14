//! Rebasing the redo stack over edits made since it was recorded.

use tracing::{debug, trace};

use super::delta::{Delta, DeltaSet};
use super::transform::transform_all;

/// Transform every queued redo delta over the deltas of `applied`, in order.
///
/// Redo deltas swallowed by an applied delete are dropped, partially
/// overlapped ones are split, and redo sets left empty are removed. Rebased
/// sets lose their selection annotations.
pub fn rebase_redo_stack(redo_stack: &mut Vec<DeltaSet>, applied: &[DeltaSet]) {
    let before = redo_stack.len();
    let run: Vec<Delta> = applied.iter().flat_map(|set| set.iter().cloned()).collect();
    if !run.is_empty() {
        carry_through(redo_stack, run);
    }
    debug!(
        applied = applied.len(),
        before,
        after = redo_stack.len(),
        "rebased redo stack"
    );
}

/// Carry the applied run down through the redo stack, top set first. Each set
/// sees the run as it stands once the sets above it have been redone.
fn carry_through(redo_stack: &mut Vec<DeltaSet>, mut applied: Vec<Delta>) {
    for j in (0..redo_stack.len()).rev() {
        let set = &mut redo_stack[j];
        let pending = std::mem::take(&mut set.deltas);
        let count = pending.len();
        let (rebased, carried) = transform_all(pending, applied);
        applied = carried;
        if rebased.len() != count {
            trace!(set = set.id, count, now = rebased.len(), "redo set reshaped");
        }
        set.deltas = rebased;
        set.clear_selection();
        if set.deltas.is_empty() {
            debug!(set = set.id, "redo set fully subsumed");
            redo_stack.remove(j);
        }
    }
}
