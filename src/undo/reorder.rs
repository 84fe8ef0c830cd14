//! Moving the most recent undoable delta set to the top of the undo stack.

use tracing::{debug, trace};

use super::delta::DeltaSet;
use super::transform::swap;

/// Bring the nearest delta set below `from` that is not ignore-flagged up to
/// index `from - 1`, swapping it past each set above it.
///
/// Returns `false` when every set below `from` is ignore-flagged; the stack
/// is left untouched. A pair that cannot be swapped stays in place and the
/// walk carries on, so the set left on top may then be an ignored one.
pub fn promote_to_top(stack: &mut [DeltaSet], from: usize) -> bool {
    let from = from.min(stack.len());
    let Some(target) = stack[..from].iter().rposition(|set| !set.ignore) else {
        trace!(from, "no undoable delta set below");
        return false;
    };
    if target + 1 < from {
        debug!(target, top = from - 1, "promoting delta set");
    }
    for i in target..from.saturating_sub(1) {
        let (lower, upper) = stack.split_at_mut(i + 1);
        let lower = &mut lower[i];
        let upper = &mut upper[0];
        if swap_groups(lower, upper) {
            stack.swap(i, i + 1);
        }
    }
    true
}

/// Reorder two adjacent delta sets in place so `second` applies before
/// `first`.
///
/// Each delta of `first` (last to first) is swapped against each delta of
/// `second` (first to last). If any pair refuses, the pairs already swapped
/// are swapped back and `false` is returned with both sets restored. On
/// success the selection annotations of both sets are cleared, and the caller
/// is expected to exchange the two sets' positions.
pub fn swap_groups(first: &mut DeltaSet, second: &mut DeltaSet) -> bool {
    for i in (0..first.deltas.len()).rev() {
        for j in 0..second.deltas.len() {
            if !swap(&mut first.deltas[i], &mut second.deltas[j]) {
                debug!(first = first.id, second = second.id, "swap refused, rolling back");
                rollback(first, second, i, j);
                return false;
            }
        }
    }
    first.clear_selection();
    second.clear_selection();
    true
}

/// Undo the swaps done before `(i, j)` refused, newest first.
fn rollback(first: &mut DeltaSet, second: &mut DeltaSet, mut i: usize, mut j: usize) {
    while i < first.deltas.len() {
        while j > 0 {
            j -= 1;
            if !swap(&mut second.deltas[j], &mut first.deltas[i]) {
                trace!(i, j, "rollback swap refused");
            }
        }
        j = second.deltas.len();
        i += 1;
    }
}
