//! Reordering two deltas while keeping their combined effect.
//!
//! Two entry points share the same shifting rules:
//!
//! - [`swap`] exchanges two adjacent deltas in place. It is used when a
//!   delta set is moved up the undo stack and can refuse, in which case the
//!   caller rolls back.
//! - [`transform`] rebases a pending redo delta over a delta that was applied
//!   after it was recorded. It never refuses; a delete that overlaps the
//!   other edit is split instead. [`transform_all`] does the same for whole
//!   runs of deltas.

use super::delta::{Action, Delta, shift_delta, split_delta};
use super::position::{Range, ShiftDirection};

use ShiftDirection::{Backward, Forward};

/// Exchange `first` and `second`, which were applied in that order, so that
/// `second` can be applied before `first` with the same net result.
///
/// Returns `false` without touching either delta when the pair cannot be
/// reordered, e.g. an insert that lands inside text inserted by `first`.
#[must_use]
pub fn swap(first: &mut Delta, second: &mut Delta) -> bool {
    match (first.action, second.action) {
        (Action::Insert, Action::Insert) => {
            if second.start >= first.end {
                shift_delta(second, first.span(), Backward);
            } else if second.start <= first.start {
                shift_delta(first, second.span(), Forward);
            } else {
                return false;
            }
        }
        (Action::Insert, Action::Delete) => {
            if second.start >= first.end {
                shift_delta(second, first.span(), Backward);
            } else if second.end <= first.start {
                shift_delta(first, second.span(), Backward);
            } else {
                return false;
            }
        }
        (Action::Delete, Action::Insert) => {
            if second.start >= first.start {
                shift_delta(second, first.span(), Forward);
            } else {
                shift_delta(first, second.span(), Forward);
            }
        }
        (Action::Delete, Action::Delete) => {
            if second.start >= first.start {
                shift_delta(second, first.span(), Forward);
            } else if second.end <= first.start {
                shift_delta(first, second.span(), Backward);
            } else {
                return false;
            }
        }
    }
    true
}

/// What becomes of the pending delta after [`transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rebased {
    /// The delta survives whole, at a new position.
    Shifted(Delta),
    /// A pending delete overlapped an applied edit. The pieces still to be
    /// deleted, applied in order; both `None` means it was fully subsumed.
    Split {
        before: Option<Delta>,
        after: Option<Delta>,
    },
}

impl Rebased {
    /// The deltas replacing the pending one, in document order.
    pub fn into_deltas(self) -> Vec<Delta> {
        match self {
            Self::Shifted(delta) => vec![delta],
            Self::Split { before, after } => before.into_iter().chain(after).collect(),
        }
    }
}

/// Result of rebasing one pending delta over one applied delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    /// The applied delta, adjusted to follow the pending one, in the order
    /// the pieces apply. A delete that swallowed the pending insert comes back
    /// as two pieces; a delete fully covered by the pending one as none.
    pub applied: Vec<Delta>,
    pub pending: Rebased,
}

/// Rebase `pending` (queued for redo) over `applied` (already in the
/// document), returning both adjusted.
///
/// Inserts at the same position are ordered by start position only: on a tie
/// the pending delta is the one shifted.
pub fn transform(mut pending: Delta, mut applied: Delta) -> Transformed {
    match (pending.action, applied.action) {
        (Action::Insert, Action::Insert) => {
            if pending.start < applied.start {
                shift_delta(&mut applied, pending.span(), Forward);
            } else {
                shift_delta(&mut pending, applied.span(), Forward);
            }
        }
        (Action::Insert, Action::Delete) => {
            if pending.start >= applied.end {
                shift_delta(&mut pending, applied.span(), Backward);
            } else if pending.start <= applied.start {
                shift_delta(&mut applied, pending.span(), Forward);
            } else {
                return split_applied_around_insert(pending, applied);
            }
        }
        (Action::Delete, Action::Insert) => {
            if applied.start >= pending.end {
                shift_delta(&mut applied, pending.span(), Backward);
            } else if applied.start <= pending.start {
                shift_delta(&mut pending, applied.span(), Forward);
            } else {
                return split_pending_around_insert(pending, applied);
            }
        }
        (Action::Delete, Action::Delete) => {
            if applied.start >= pending.end {
                shift_delta(&mut applied, pending.span(), Backward);
            } else if applied.end <= pending.start {
                shift_delta(&mut pending, applied.span(), Backward);
            } else {
                return split_overlapping_deletes(pending, applied);
            }
        }
    }
    Transformed {
        applied: vec![applied],
        pending: Rebased::Shifted(pending),
    }
}

/// Rebase a run of pending deltas over a run of applied deltas.
///
/// Both runs start from the same document and each delta applies after the
/// ones before it in its run. Returns the pending run adjusted to follow
/// `applied`, then the applied run adjusted to follow `pending`.
pub fn transform_all(
    mut pending: Vec<Delta>,
    mut applied: Vec<Delta>,
) -> (Vec<Delta>, Vec<Delta>) {
    match (pending.len(), applied.len()) {
        (0, _) | (_, 0) => (pending, applied),
        (1, 1) => {
            let t = transform(pending.swap_remove(0), applied.swap_remove(0));
            (t.pending.into_deltas(), t.applied)
        }
        (1, _) => {
            let rest = applied.split_off(1);
            let (pending, mut applied) = transform_all(pending, applied);
            let (pending, rest) = transform_all(pending, rest);
            applied.extend(rest);
            (pending, applied)
        }
        _ => {
            let rest = pending.split_off(1);
            let (mut pending, applied) = transform_all(pending, applied);
            let (rest, applied) = transform_all(rest, applied);
            pending.extend(rest);
            (pending, applied)
        }
    }
}

/// The pending insert stays whole at the delete start; the applied delete is
/// cut in two around it.
fn split_applied_around_insert(mut pending: Delta, mut applied: Delta) -> Transformed {
    let mut tail = split_delta(&mut applied, pending.start);
    shift_delta(&mut tail, pending.span(), Forward);
    shift_delta(&mut tail, applied.span(), Backward);
    shift_delta(&mut pending, applied.span(), Backward);
    Transformed {
        applied: vec![applied, tail],
        pending: Rebased::Shifted(pending),
    }
}

/// The applied insert stays whole; the pending delete is cut in two around it.
fn split_pending_around_insert(mut pending: Delta, mut applied: Delta) -> Transformed {
    let mut after = split_delta(&mut pending, applied.start);
    shift_delta(&mut after, applied.span(), Forward);
    shift_delta(&mut after, pending.span(), Backward);
    shift_delta(&mut applied, pending.span(), Backward);
    Transformed {
        applied: vec![applied],
        pending: Rebased::Split {
            before: Some(pending),
            after: Some(after),
        },
    }
}

fn split_overlapping_deletes(pending: Delta, applied: Delta) -> Transformed {
    let start = pending.start.min(applied.start);
    let mut overlap = pending;
    let mut before = None;
    if overlap.start < applied.start {
        let tail = split_delta(&mut overlap, applied.start);
        before = Some(std::mem::replace(&mut overlap, tail));
    }
    let mut after = (overlap.end > applied.end).then(|| split_delta(&mut overlap, applied.end));

    // `after` runs once both the applied delete and `before` are gone.
    if let Some(after) = after.as_mut() {
        shift_delta(after, applied.span(), Backward);
        if let Some(before) = &before {
            shift_delta(after, before.span(), Backward);
        }
    }

    // The overlap is already gone from the document; what the applied delete
    // removed on either side of it closes up at `start`.
    let rest = text_outside(applied, overlap.span());
    let applied = if rest.is_empty() {
        Vec::new()
    } else {
        vec![Delta::delete(start, &rest)]
    };

    Transformed {
        applied,
        pending: Rebased::Split { before, after },
    }
}

/// The text of `delta` with the part inside `cut` removed.
fn text_outside(mut delta: Delta, cut: Range) -> String {
    let tail = split_delta(&mut delta, cut.end);
    split_delta(&mut delta, cut.start);
    delta.text() + &tail.text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorBuffer;
    use crate::undo::DeltaHost;
    use crate::undo::position::Position;

    fn p(row: usize, column: usize) -> Position {
        Position::new(row, column)
    }

    fn shifted(t: Transformed) -> (Delta, Delta) {
        let applied: [Delta; 1] = t.applied.try_into().expect("one applied delta");
        let [applied] = applied;
        match t.pending {
            Rebased::Shifted(pending) => (pending, applied),
            Rebased::Split { .. } => panic!("expected a shifted delta, got {:?}", t.pending),
        }
    }

    /// Apply `deltas` in order to a buffer holding `text`.
    fn replay(text: &str, deltas: &[Delta]) -> String {
        let mut buf = EditorBuffer::from_text(text);
        for delta in deltas {
            buf.apply_forward(delta);
        }
        buf.text()
    }

    /// Both orders of applying the two runs reach the same text.
    fn assert_converges(text: &str, pending: Vec<Delta>, applied: Vec<Delta>) {
        let (pending_after, applied_after) = transform_all(pending.clone(), applied.clone());
        for delta in pending_after.iter().chain(&applied_after) {
            assert!(delta.is_well_formed(), "malformed {delta:?}");
        }
        let via_applied = replay(&replay(text, &applied), &pending_after);
        let via_pending = replay(&replay(text, &pending), &applied_after);
        assert_eq!(via_applied, via_pending);
    }

    // --- swap ---

    #[test]
    fn test_swap_insert_after_insert_moves_back() {
        let mut first = Delta::insert(p(0, 0), "abc");
        let mut second = Delta::insert(p(0, 5), "x");
        assert!(swap(&mut first, &mut second));
        assert_eq!(second.start, p(0, 2));
        assert_eq!(first.start, p(0, 0));
    }

    #[test]
    fn test_swap_insert_before_insert_shifts_first() {
        let mut first = Delta::insert(p(2, 4), "abc");
        let mut second = Delta::insert(p(0, 0), "x\ny");
        assert!(swap(&mut first, &mut second));
        assert_eq!(first.span(), Range::new(p(3, 4), p(3, 7)));
        assert_eq!(second.start, p(0, 0));
    }

    #[test]
    fn test_swap_insert_inside_insert_refuses() {
        let mut first = Delta::insert(p(0, 0), "hello");
        let mut second = Delta::insert(p(0, 2), "x");
        let (a, b) = (first.clone(), second.clone());
        assert!(!swap(&mut first, &mut second));
        assert_eq!(first, a);
        assert_eq!(second, b);
    }

    #[test]
    fn test_swap_delete_overlapping_insert_refuses() {
        let mut first = Delta::insert(p(0, 2), "abcd");
        let mut second = Delta::delete(p(0, 3), "bc");
        assert!(!swap(&mut first, &mut second));
    }

    #[test]
    fn test_swap_delete_then_insert_before() {
        let mut first = Delta::delete(p(1, 2), "zz");
        let mut second = Delta::insert(p(0, 0), "q\n");
        assert!(swap(&mut first, &mut second));
        assert_eq!(first.start, p(2, 2));
    }

    #[test]
    fn test_swap_deletes_overlapping_refuses() {
        let mut first = Delta::delete(p(0, 4), "ab");
        let mut second = Delta::delete(p(0, 2), "cdef");
        assert!(!swap(&mut first, &mut second));
    }

    // --- transform ---

    #[test]
    fn test_transform_earlier_insert_shifts_later_one() {
        let pending = Delta::insert(p(0, 1), "ab");
        let applied = Delta::insert(p(0, 5), "xyz");
        let (pending, applied) = shifted(transform(pending, applied));
        assert_eq!(pending.start, p(0, 1));
        assert_eq!(applied.span(), Range::new(p(0, 7), p(0, 10)));
    }

    #[test]
    fn test_transform_insert_tie_shifts_pending() {
        let pending = Delta::insert(p(1, 1), "a");
        let applied = Delta::insert(p(1, 1), "bb");
        let (pending, applied) = shifted(transform(pending, applied));
        assert_eq!(pending.start, p(1, 3));
        assert_eq!(applied.start, p(1, 1));
    }

    #[test]
    fn test_transform_insert_after_delete_moves_back() {
        let pending = Delta::insert(p(0, 8), "x");
        let applied = Delta::delete(p(0, 2), "abc");
        let (pending, applied) = shifted(transform(pending, applied));
        assert_eq!(pending.start, p(0, 5));
        assert_eq!(applied.start, p(0, 2));
    }

    #[test]
    fn test_transform_insert_inside_delete_splits_the_delete() {
        // "01abcd": pending puts "xy" after "ab", applied removed "abcd".
        let pending = Delta::insert(p(0, 4), "xy");
        let applied = Delta::delete(p(0, 2), "abcd");
        let t = transform(pending, applied);
        assert_eq!(
            t.pending,
            Rebased::Shifted(Delta::insert(p(0, 2), "xy"))
        );
        assert_eq!(
            t.applied,
            vec![Delta::delete(p(0, 2), "ab"), Delta::delete(p(0, 4), "cd")]
        );
        assert_eq!(replay("01abxycd", &t.applied), "01xy");
    }

    #[test]
    fn test_transform_insert_inside_multiline_delete() {
        // "a\nbc\nd": pending breaks "bc", applied removed "\nbc\n".
        let pending = Delta::insert(p(1, 1), "X\n");
        let applied = Delta::delete(p(0, 1), "\nbc\n");
        let t = transform(pending, applied);
        assert_eq!(
            t.pending,
            Rebased::Shifted(Delta::insert(p(0, 1), "X\n"))
        );
        assert_eq!(t.applied.len(), 2);
        assert_eq!(t.applied[0].lines, vec!["", "b"]);
        assert_eq!(t.applied[1].lines, vec!["c", ""]);
        assert_eq!(t.applied[1].start, p(1, 0));
        assert_converges(
            "a\nbc\nd",
            vec![Delta::insert(p(1, 1), "X\n")],
            vec![Delta::delete(p(0, 1), "\nbc\n")],
        );
    }

    #[test]
    fn test_transform_delete_before_insert_shifts_insert() {
        let pending = Delta::delete(p(0, 0), "ab");
        let applied = Delta::insert(p(0, 6), "z");
        let (pending, applied) = shifted(transform(pending, applied));
        assert_eq!(pending.start, p(0, 0));
        assert_eq!(applied.start, p(0, 4));
    }

    #[test]
    fn test_transform_insert_inside_pending_delete_splits_it() {
        // "abcdef": pending removes "bcde", applied put "XY" after "abc".
        let pending = Delta::delete(p(0, 1), "bcde");
        let applied = Delta::insert(p(0, 3), "XY");
        let t = transform(pending, applied);
        assert_eq!(t.applied[0].span(), Range::new(p(0, 1), p(0, 3)));
        let pieces = t.pending.into_deltas();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].lines, vec!["bc"]);
        assert_eq!(pieces[0].span(), Range::new(p(0, 1), p(0, 3)));
        assert_eq!(pieces[1].lines, vec!["de"]);
        assert_eq!(pieces[1].span(), Range::new(p(0, 3), p(0, 5)));
    }

    #[test]
    fn test_transform_disjoint_deletes() {
        let pending = Delta::delete(p(3, 0), "line");
        let applied = Delta::delete(p(0, 0), "a\nb\n");
        let (pending, _) = shifted(transform(pending, applied));
        assert_eq!(pending.span(), Range::new(p(1, 0), p(1, 4)));
    }

    #[test]
    fn test_transform_delete_inside_delete_is_subsumed() {
        let pending = Delta::delete(p(0, 3), "cd");
        let applied = Delta::delete(p(0, 1), "abcdef");
        let t = transform(pending, applied);
        assert_eq!(
            t.pending,
            Rebased::Split {
                before: None,
                after: None
            }
        );
        assert_eq!(t.applied, vec![Delta::delete(p(0, 1), "abef")]);
    }

    #[test]
    fn test_transform_delete_overlapping_start_keeps_head() {
        let pending = Delta::delete(p(0, 0), "abcd");
        let applied = Delta::delete(p(0, 2), "cdef");
        let t = transform(pending, applied);
        let Rebased::Split { before, after } = t.pending else {
            panic!("expected split");
        };
        let before = before.unwrap();
        assert_eq!(before.lines, vec!["ab"]);
        assert_eq!(before.span(), Range::new(p(0, 0), p(0, 2)));
        assert!(after.is_none());
        // "ef" is what is left of the applied delete once "abcd" is gone.
        assert_eq!(t.applied, vec![Delta::delete(p(0, 0), "ef")]);
    }

    #[test]
    fn test_transform_delete_overlapping_end_keeps_tail() {
        let pending = Delta::delete(p(0, 3), "defgh");
        let applied = Delta::delete(p(0, 1), "bcde");
        let t = transform(pending, applied);
        let Rebased::Split { before, after } = t.pending else {
            panic!("expected split");
        };
        assert!(before.is_none());
        let after = after.unwrap();
        assert_eq!(after.lines, vec!["fgh"]);
        assert_eq!(after.span(), Range::new(p(0, 1), p(0, 4)));
        assert_eq!(t.applied, vec![Delta::delete(p(0, 1), "bc")]);
    }

    #[test]
    fn test_transform_delete_around_delete_splits_in_two() {
        let pending = Delta::delete(p(0, 0), "abcdefgh");
        let applied = Delta::delete(p(0, 3), "de");
        let t = transform(pending, applied);
        assert!(t.applied.is_empty());
        let pieces = t.pending.into_deltas();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].lines, vec!["abc"]);
        assert_eq!(pieces[1].lines, vec!["fgh"]);
        assert_eq!(pieces[1].span(), Range::new(p(0, 0), p(0, 3)));
    }

    #[test]
    fn test_transform_split_deletes_across_lines() {
        // Document "ab\ncd\nef": pending removes "b\ncd\ne", applied removed "d\nef".
        let pending = Delta::delete(p(0, 1), "b\ncd\ne");
        let applied = Delta::delete(p(1, 1), "d\nef");
        let t = transform(pending, applied);
        let Rebased::Split { before, after } = t.pending else {
            panic!("expected split");
        };
        assert_eq!(before.unwrap().span(), Range::new(p(0, 1), p(1, 1)));
        assert!(after.is_none());
        // Only the trailing "f" of the applied delete survives, at (0, 1).
        assert_eq!(t.applied, vec![Delta::delete(p(0, 1), "f")]);
    }

    // --- transform_all ---

    #[test]
    fn test_transform_all_carries_split_delete_to_later_pending() {
        // "abcdef": pending types "X" after "ab" then erases "Xc"; applied
        // removed "bcd". Redoing both leaves only "aef".
        let pending = vec![Delta::insert(p(0, 2), "X"), Delta::delete(p(0, 2), "Xc")];
        let applied = vec![Delta::delete(p(0, 1), "bcd")];
        let (rebased, carried) = transform_all(pending.clone(), applied.clone());
        assert_eq!(replay("aef", &rebased), "aef");
        assert_eq!(replay(&replay("abcdef", &pending), &carried), "aef");
    }

    #[test]
    fn test_transform_all_with_empty_runs() {
        let run = vec![Delta::insert(p(0, 0), "a")];
        assert_eq!(transform_all(run.clone(), Vec::new()), (run.clone(), Vec::new()));
        assert_eq!(transform_all(Vec::new(), run.clone()), (Vec::new(), run));
    }

    #[test]
    fn test_transform_all_line_join_over_deleted_lines() {
        assert_converges(
            "a\n",
            vec![
                Delta::insert(p(0, 1), "\n"),
                Delta::insert(p(1, 0), "a"),
                Delta::delete(p(0, 0), "a\n"),
                Delta::insert(p(0, 0), "a"),
            ],
            vec![Delta::delete(p(0, 0), "a\n")],
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        /// A run of edits, each valid on the text left by the ones before.
        fn edit_run(text: &str, picks: &[(bool, usize, usize, String)]) -> Vec<Delta> {
            let mut buf = EditorBuffer::from_text(text);
            let mut run = Vec::new();
            for (insert, a, b, word) in picks {
                let len = buf.text().chars().count();
                let (a, b) = ((*a).min(len), (*b).min(len));
                let at = position_of(&buf, a.min(b));
                let delta = if *insert || a == b {
                    Delta::insert(at, word)
                } else {
                    let to = position_of(&buf, a.max(b));
                    Delta::delete(at, &buf.text_in(Range::new(at, to)))
                };
                buf.apply_forward(&delta);
                run.push(delta);
            }
            run
        }

        fn position_of(buf: &EditorBuffer, offset: usize) -> Position {
            let text = buf.text();
            let before: String = text.chars().take(offset).collect();
            let row = before.matches('\n').count();
            let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
            p(row, column)
        }

        fn pick() -> impl Strategy<Value = (bool, usize, usize, String)> {
            (any::<bool>(), 0..14usize, 0..14usize, "[xy\n]{1,3}")
        }

        proptest! {
            #[test]
            fn transformed_runs_converge(
                text in "[ab\n]{0,10}",
                pending in proptest::collection::vec(pick(), 1..4),
                applied in proptest::collection::vec(pick(), 1..4),
            ) {
                let pending = edit_run(&text, &pending);
                let applied = edit_run(&text, &applied);
                let (pending_after, applied_after) =
                    transform_all(pending.clone(), applied.clone());
                for delta in pending_after.iter().chain(&applied_after) {
                    prop_assert!(delta.is_well_formed(), "malformed {:?}", delta);
                }
                let via_applied = replay(&replay(&text, &applied), &pending_after);
                let via_pending = replay(&replay(&text, &pending), &applied_after);
                prop_assert_eq!(via_applied, via_pending);
            }

            #[test]
            fn disjoint_inserts_shift_only_the_later_one(
                row in 0..20usize,
                p1 in 0..40usize,
                gap in 1..40usize,
                l1 in "[a-z]{1,8}",
                l2 in "[a-z]{1,8}",
            ) {
                let first = Delta::insert(p(row, p1), &l1);
                let second = Delta::insert(p(row, p1 + gap), &l2);

                let (kept, moved) = shifted(transform(first.clone(), second.clone()));
                prop_assert_eq!(&kept, &first);
                prop_assert_eq!(moved.start, p(row, p1 + gap + l1.len()));
                prop_assert_eq!(moved.end, p(row, p1 + gap + l1.len() + l2.len()));

                let (moved, kept) = shifted(transform(second.clone(), first.clone()));
                prop_assert_eq!(&kept, &first);
                prop_assert_eq!(moved.start, p(row, p1 + gap + l1.len()));
            }

            #[test]
            fn refused_swap_leaves_both_untouched(
                start in 0..10usize,
                len in 2..10usize,
                inner in 1..9usize,
            ) {
                prop_assume!(inner < len);
                let text = "x".repeat(len);
                let mut first = Delta::insert(p(0, start), &text);
                let mut second = Delta::insert(p(0, start + inner), "y");
                let (a, b) = (first.clone(), second.clone());
                prop_assert!(!swap(&mut first, &mut second));
                prop_assert_eq!(first, a);
                prop_assert_eq!(second, b);
            }
        }
    }
}
