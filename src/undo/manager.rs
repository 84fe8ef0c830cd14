//! The undo/redo controller.
//!
//! [`UndoManager`] owns both stacks and the revision counters and drives a
//! [`DeltaHost`], the buffer that actually holds the text. The host never
//! sees the manager; it only applies deltas it is handed.

use tracing::debug;

use super::delta::{Delta, DeltaSet, Revision};
use super::position::Range;
use super::rebase::rebase_redo_stack;
use super::reorder::promote_to_top;

/// A text buffer the manager can replay deltas against.
pub trait DeltaHost {
    /// Apply `delta` to the live text. Returns the range the host would
    /// select afterwards, or `None` if it has nothing to report.
    fn apply_forward(&mut self, delta: &Delta) -> Option<Range>;

    /// Apply the inverse of `delta` (insert and delete exchanged).
    fn apply_inverse(&mut self, delta: &Delta) -> Option<Range>;
}

impl<H: DeltaHost + ?Sized> DeltaHost for &mut H {
    fn apply_forward(&mut self, delta: &Delta) -> Option<Range> {
        (**self).apply_forward(delta)
    }

    fn apply_inverse(&mut self, delta: &Delta) -> Option<Range> {
        (**self).apply_inverse(delta)
    }
}

/// Outcome of a successful undo or redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replay {
    /// Revision the document is at afterwards.
    pub revision: Revision,
    /// Range the host should select, if any.
    pub selection: Option<Range>,
}

/// Undo and redo stacks over a host buffer.
#[derive(Debug)]
pub struct UndoManager<H> {
    host: H,
    undo_stack: Vec<DeltaSet>,
    redo_stack: Vec<DeltaSet>,
    /// Revision of the set on top of the undo stack.
    revision: Revision,
    /// Revision the redo stack was last valid against.
    redo_baseline: Revision,
    /// Highest id ever issued; survives `reset`.
    max_revision: Revision,
    mark: Revision,
    undo_depth: Option<usize>,
}

impl<H: DeltaHost> UndoManager<H> {
    /// Create a manager with empty history over `host`.
    pub const fn new(host: H) -> Self {
        Self {
            host,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            revision: 0,
            redo_baseline: 0,
            max_revision: 0,
            mark: 0,
            undo_depth: None,
        }
    }

    /// Keep at most `depth` delta sets on the undo stack, dropping the oldest.
    pub fn with_undo_depth(mut self, depth: Option<usize>) -> Self {
        self.undo_depth = depth.map(|d| d.max(1));
        self
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    ///
    /// Edits made through it are not recorded; report them with [`push`].
    ///
    /// [`push`]: Self::push
    pub const fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Record a user edit already applied to the host.
    ///
    /// Any pending redo history is discarded.
    pub fn push(&mut self, set: DeltaSet) {
        self.record(set, false);
    }

    /// Record an edit without discarding the redo stack.
    ///
    /// The redo stack becomes stale and is rebased over this edit on the next
    /// [`redo`](Self::redo).
    pub fn push_preserving_redo(&mut self, set: DeltaSet) {
        self.record(set, true);
    }

    fn record(&mut self, mut set: DeltaSet, keep_redo: bool) {
        if set.is_empty() {
            return;
        }
        if !keep_redo && !self.redo_stack.is_empty() {
            debug!(dropped = self.redo_stack.len(), "new edit clears redo stack");
            self.redo_stack.clear();
        }
        self.max_revision += 1;
        set.id = self.max_revision;
        self.revision = set.id;

        if let Some(depth) = self.undo_depth
            && self.undo_stack.len() >= depth
        {
            let excess = self.undo_stack.len() + 1 - depth;
            self.undo_stack.drain(..excess);
        }
        self.undo_stack.push(set);
    }

    /// Revert the most recent undoable delta set.
    ///
    /// Ignore-flagged sets above it are reordered out of the way first.
    /// Returns `None` when there is nothing to undo.
    pub fn undo(&mut self, dont_select: bool) -> Option<Replay> {
        let depth = self.undo_stack.len();
        if !promote_to_top(&mut self.undo_stack, depth) {
            return None;
        }
        if self.is_redo_stale() && !self.redo_stack.is_empty() {
            debug!(dropped = self.redo_stack.len(), "stale redo stack discarded");
            self.redo_stack.clear();
        }

        let set = self.undo_stack.pop()?;
        let mut reported = None;
        for delta in set.deltas.iter().rev() {
            reported = merge(reported, self.host.apply_inverse(delta));
        }
        let selection = if dont_select {
            None
        } else {
            set.selection_before.or(reported)
        };
        debug!(id = set.id, deltas = set.len(), "undo");
        self.redo_stack.push(set);
        self.sync_revision();

        Some(Replay {
            revision: self.revision,
            selection,
        })
    }

    /// Re-apply the most recently undone delta set.
    ///
    /// If edits were recorded since the redo stack was last valid, it is
    /// rebased over them first. Returns `None` when there is nothing to redo.
    pub fn redo(&mut self, dont_select: bool) -> Option<Replay> {
        if self.is_redo_stale() {
            let applied =
                delta_sets_between(&self.undo_stack, self.redo_baseline, self.revision + 1);
            rebase_redo_stack(&mut self.redo_stack, applied);
            self.redo_baseline = self.revision;
            for set in &mut self.redo_stack {
                self.max_revision += 1;
                set.id = self.max_revision;
            }
        }

        let set = self.redo_stack.pop()?;
        let mut reported = None;
        for delta in &set {
            reported = merge(reported, self.host.apply_forward(delta));
        }
        let selection = if dont_select {
            None
        } else {
            set.selection_after.or(reported)
        };
        debug!(id = set.id, deltas = set.len(), "redo");
        self.undo_stack.push(set);
        self.sync_revision();

        Some(Replay {
            revision: self.revision,
            selection,
        })
    }

    /// Forget all history, e.g. after loading a different document.
    ///
    /// Revision ids issued afterwards keep counting up from the last one.
    pub fn reset(&mut self) {
        debug!(max_revision = self.max_revision, "history reset");
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.revision = 0;
        self.redo_baseline = 0;
        self.mark = 0;
    }

    /// Remember `revision` (default: the current one) as the saved state.
    pub fn bookmark(&mut self, revision: Option<Revision>) {
        self.mark = revision.unwrap_or(self.revision);
    }

    pub const fn is_at_bookmark(&self) -> bool {
        self.revision == self.mark
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub const fn revision(&self) -> Revision {
        self.revision
    }

    pub fn undo_stack(&self) -> &[DeltaSet] {
        &self.undo_stack
    }

    pub fn redo_stack(&self) -> &[DeltaSet] {
        &self.redo_stack
    }

    /// Whether edits were recorded since the redo stack was last valid.
    pub const fn is_redo_stale(&self) -> bool {
        self.redo_baseline != self.revision
    }

    /// Undo-stack sets with revisions in `(from, to)`.
    pub fn delta_sets(&self, from: Revision, to: Revision) -> &[DeltaSet] {
        delta_sets_between(&self.undo_stack, from, to)
    }

    fn sync_revision(&mut self) {
        let id = self.undo_stack.last().map_or(0, |set| set.id);
        self.redo_baseline = id;
        self.revision = id;
    }
}

/// The contiguous run of sets, scanning down from the top, whose revisions
/// fall in `(from, to)`.
fn delta_sets_between(stack: &[DeltaSet], from: Revision, to: Revision) -> &[DeltaSet] {
    let mut start = 0;
    let mut end = None;
    for (i, set) in stack.iter().enumerate().rev() {
        if set.id < to && end.is_none() {
            end = Some(i + 1);
        }
        if set.id <= from {
            start = i + 1;
            break;
        }
    }
    let end = end.unwrap_or(start).max(start);
    &stack[start..end]
}

fn merge(acc: Option<Range>, next: Option<Range>) -> Option<Range> {
    match (acc, next) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, b) => a.or(b),
    }
}
