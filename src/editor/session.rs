//! One open document: its buffer, undo history and settings.

use anyhow::Result;
use tracing::debug;

use super::buffer::{Direction, EditorBuffer};
use crate::completion::{CompletionError, CompletionRequest, CompletionService};
use crate::settings::DocumentSettings;
use crate::store::DocumentStore;
use crate::undo::{Delta, DeltaHost, DeltaSet, Position, Range, Replay, UndoManager};

/// Which editor commands are currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    /// Unsaved changes exist.
    pub save: bool,
    pub undo: bool,
    pub redo: bool,
}

/// An editing session over a single document.
///
/// Each user action becomes one delta set on the undo stack.
#[derive(Debug)]
pub struct Session {
    history: UndoManager<EditorBuffer>,
    settings: DocumentSettings,
    select_on_replay: bool,
    keep_redo: bool,
}

impl Session {
    /// Open `text` as a new document with empty, bookmarked history.
    pub fn new(text: &str) -> Self {
        let mut session = Self {
            history: UndoManager::new(EditorBuffer::empty()),
            settings: DocumentSettings::default(),
            select_on_replay: true,
            keep_redo: false,
        };
        session.set_text(text);
        session
    }

    /// Load the document held by `store`.
    pub fn open(store: &dyn DocumentStore) -> Result<Self> {
        let text = store.load()?;
        Ok(Self::new(&text))
    }

    /// Limit how many actions can be undone.
    #[must_use]
    pub fn with_undo_depth(mut self, depth: Option<usize>) -> Self {
        self.history = self.history.with_undo_depth(depth);
        self
    }

    /// Whether undo/redo should select the affected text.
    #[must_use]
    pub fn with_select_on_replay(mut self, enabled: bool) -> Self {
        self.select_on_replay = enabled;
        self
    }

    /// Keep the redo stack when the user types after an undo.
    #[must_use]
    pub fn with_keep_redo(mut self, enabled: bool) -> Self {
        self.keep_redo = enabled;
        self
    }

    /// Replace the whole document. Undo history does not reach past this.
    pub fn set_text(&mut self, text: &str) {
        *self.history.host_mut() = EditorBuffer::from_text(text);
        self.history.reset();
        self.history.bookmark(None);
        self.refresh_settings();
    }

    pub fn text(&self) -> String {
        self.buffer().text()
    }

    pub const fn buffer(&self) -> &EditorBuffer {
        self.history.host()
    }

    pub const fn history(&self) -> &UndoManager<EditorBuffer> {
        &self.history
    }

    pub const fn settings(&self) -> &DocumentSettings {
        &self.settings
    }

    // --- Edits ---

    /// Type `text` at the cursor, replacing the selection if there is one.
    pub fn type_text(&mut self, text: &str) {
        self.edit(|buf| {
            let mut deltas: Vec<Delta> = buf.delete_selection().into_iter().collect();
            deltas.extend(buf.insert_str(text));
            deltas
        });
    }

    /// Break the line at the cursor.
    pub fn enter(&mut self) {
        self.edit(|buf| {
            let mut deltas: Vec<Delta> = buf.delete_selection().into_iter().collect();
            deltas.push(buf.split_line());
            deltas
        });
    }

    pub fn backspace(&mut self) {
        self.edit(|buf| {
            buf.delete_selection()
                .or_else(|| buf.delete_back())
                .into_iter()
                .collect()
        });
    }

    pub fn delete_forward(&mut self) {
        self.edit(|buf| {
            buf.delete_selection()
                .or_else(|| buf.delete_forward())
                .into_iter()
                .collect()
        });
    }

    /// Delete the selection; a no-op without one.
    pub fn erase_selection(&mut self) {
        self.edit(|buf| buf.delete_selection().into_iter().collect());
    }

    /// Apply an edit that did not come from the user, e.g. generated text.
    ///
    /// The edit is never the target of an undo on its own and keeps the redo
    /// stack, which is rebased over it if the user redoes.
    ///
    /// Inserts outside the text are moved to the nearest valid position. A
    /// delete that does not match the text is rejected.
    pub fn apply_external(&mut self, delta: Delta) -> Result<()> {
        let Some(delta) = self.buffer().fit(&delta) else {
            anyhow::bail!(
                "External delete at {}:{} does not match the document",
                delta.start.row,
                delta.start.column
            );
        };
        let cursor = self.buffer().cursor();
        let buf = self.history.host_mut();
        buf.apply_forward(&delta);
        buf.move_to(cursor.line, cursor.col);
        debug!(action = ?delta.action, start = ?delta.start, "external edit");
        self.history
            .push_preserving_redo(DeltaSet::ignored(vec![delta]));
        self.refresh_settings();
        Ok(())
    }

    fn edit(&mut self, f: impl FnOnce(&mut EditorBuffer) -> Vec<Delta>) {
        let before = self.selection_or_caret();
        let deltas = f(self.history.host_mut());
        if deltas.is_empty() {
            return;
        }
        let after = self.selection_or_caret();
        let set = DeltaSet::new(deltas).with_selection(Some(before), Some(after));
        if self.keep_redo {
            self.history.push_preserving_redo(set);
        } else {
            self.history.push(set);
        }
        self.refresh_settings();
    }

    fn selection_or_caret(&self) -> Range {
        let buf = self.buffer();
        buf.selection()
            .unwrap_or_else(|| Range::caret(buf.cursor().position()))
    }

    // --- History ---

    pub fn undo(&mut self) -> Option<Replay> {
        let replay = self.history.undo(!self.select_on_replay)?;
        self.after_replay(replay);
        Some(replay)
    }

    pub fn redo(&mut self) -> Option<Replay> {
        let replay = self.history.redo(!self.select_on_replay)?;
        self.after_replay(replay);
        Some(replay)
    }

    fn after_replay(&mut self, replay: Replay) {
        if let Some(range) = replay.selection {
            let buf = self.history.host_mut();
            if range.is_empty() {
                buf.move_to(range.start.row, range.start.column);
            } else {
                buf.select_range(range);
            }
        }
        self.refresh_settings();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Mark the current state as saved.
    pub fn bookmark(&mut self) {
        self.history.bookmark(None);
    }

    pub const fn is_saved(&self) -> bool {
        self.history.is_at_bookmark()
    }

    pub fn button_state(&self) -> ButtonState {
        ButtonState {
            save: !self.is_saved(),
            undo: self.can_undo(),
            redo: self.can_redo(),
        }
    }

    /// Write the text to `store` and mark it saved.
    pub fn save(&mut self, store: &dyn DocumentStore) -> Result<()> {
        store.save(&self.text())?;
        self.bookmark();
        Ok(())
    }

    /// Forget undo history without touching the text.
    pub fn reset_history(&mut self) {
        self.history.reset();
        self.history.bookmark(None);
    }

    // --- Cursor ---

    pub fn move_to(&mut self, pos: Position) {
        self.history.host_mut().move_to(pos.row, pos.column);
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        self.history.host_mut().move_cursor(direction);
    }

    pub fn select(&mut self, anchor: Position, head: Position) {
        self.history.host_mut().select(anchor, head);
    }

    // --- Completion ---

    /// Ask `service` to continue the selected text and insert the answer,
    /// followed by a newline, at the cursor.
    pub fn complete(&mut self, service: &dyn CompletionService) -> Result<(), CompletionError> {
        let prompt = self.buffer().selected_text();
        if prompt.is_empty() {
            return Err(CompletionError::NoSelection);
        }
        let request = CompletionRequest::new(&self.settings, prompt);
        let completion = service.complete(&request)?;
        self.history.host_mut().clear_selection();
        self.type_text(&format!("{completion}\n"));
        Ok(())
    }

    fn refresh_settings(&mut self) {
        let settings = DocumentSettings::parse(&self.text());
        if settings != self.settings {
            debug!(model = settings.model(), "document settings changed");
            self.settings = settings;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn p(row: usize, column: usize) -> Position {
        Position::new(row, column)
    }

    struct FixedCompletion {
        answer: &'static str,
        seen: RefCell<Vec<CompletionRequest>>,
    }

    impl CompletionService for FixedCompletion {
        fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.seen.borrow_mut().push(request.clone());
            Ok(self.answer.to_string())
        }
    }

    #[test]
    fn test_new_session_is_saved() {
        let s = Session::new("hello");
        assert!(s.is_saved());
        assert_eq!(
            s.button_state(),
            ButtonState {
                save: false,
                undo: false,
                redo: false
            }
        );
    }

    #[test]
    fn test_typing_then_undo_restores_text() {
        let mut s = Session::new("hello");
        s.move_to(p(0, 5));
        s.type_text(" world");
        assert_eq!(s.text(), "hello world");
        assert!(!s.is_saved());

        s.undo().unwrap();
        assert_eq!(s.text(), "hello");
        assert!(s.is_saved());
        assert_eq!(s.buffer().cursor().position(), p(0, 5));
    }

    #[test]
    fn test_redo_reapplies_and_selects() {
        let mut s = Session::new("ab");
        s.move_to(p(0, 1));
        s.type_text("X");
        s.undo().unwrap();
        s.redo().unwrap();
        assert_eq!(s.text(), "aXb");
        assert_eq!(s.buffer().cursor().position(), p(0, 2));
    }

    #[test]
    fn test_typing_over_selection_is_one_action() {
        let mut s = Session::new("hello world");
        s.select(p(0, 0), p(0, 5));
        s.type_text("bye");
        assert_eq!(s.text(), "bye world");
        assert_eq!(s.history().undo_stack().len(), 1);
        s.undo().unwrap();
        assert_eq!(s.text(), "hello world");
        assert_eq!(s.buffer().selection(), Some(Range::new(p(0, 0), p(0, 5))));
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut s = Session::new("abc\ndef");
        s.move_to(p(1, 0));
        s.backspace();
        assert_eq!(s.text(), "abcdef");
        s.delete_forward();
        assert_eq!(s.text(), "abcef");
        s.undo().unwrap();
        s.undo().unwrap();
        assert_eq!(s.text(), "abc\ndef");
    }

    #[test]
    fn test_noop_edit_records_nothing() {
        let mut s = Session::new("x");
        s.backspace();
        s.erase_selection();
        assert!(!s.can_undo());
    }

    #[test]
    fn test_set_text_resets_history() {
        let mut s = Session::new("a");
        s.type_text("b");
        s.set_text("fresh");
        assert!(!s.can_undo());
        assert!(s.is_saved());
        assert_eq!(s.text(), "fresh");
    }

    #[test]
    fn test_external_edit_is_skipped_by_undo() {
        let mut s = Session::new("title\n");
        s.move_to(p(0, 5));
        s.type_text("!");
        s.apply_external(Delta::insert(p(1, 0), "generated")).unwrap();
        assert_eq!(s.text(), "title!\ngenerated");

        s.undo().unwrap();
        assert_eq!(s.text(), "title\ngenerated");
        assert_eq!(s.history().undo_stack().len(), 1);
        assert!(s.history().undo_stack()[0].ignore);
    }

    #[test]
    fn test_redo_survives_external_edit() {
        let mut s = Session::new("line one\nline two");
        s.move_to(p(1, 8));
        s.type_text("!");
        s.undo().unwrap();
        s.apply_external(Delta::insert(p(0, 0), "# header\n\n")).unwrap();
        s.redo().unwrap();
        assert_eq!(s.text(), "# header\n\nline one\nline two!");
    }

    #[test]
    fn test_external_insert_out_of_range_is_recorded_where_applied() {
        let mut s = Session::new("one\ntwo");
        s.apply_external(Delta::insert(p(99, 0), "!")).unwrap();
        assert_eq!(s.text(), "one\ntwo!");
        let recorded = &s.history().undo_stack()[0].deltas[0];
        assert_eq!(recorded.start, p(1, 3));
    }

    #[test]
    fn test_external_delete_must_match_text() {
        let mut s = Session::new("one\ntwo");
        assert!(s.apply_external(Delta::delete(p(0, 0), "two")).is_err());
        assert!(s.apply_external(Delta::delete(p(7, 0), "x")).is_err());
        assert_eq!(s.text(), "one\ntwo");
        assert!(!s.history().can_undo());

        s.apply_external(Delta::delete(p(0, 1), "ne\nt")).unwrap();
        assert_eq!(s.text(), "owo");
    }

    #[test]
    fn test_redo_after_external_delete_over_pending_insert() {
        let mut s = Session::new("abcdef");
        s.move_to(p(0, 2));
        s.type_text("X");
        s.select(p(0, 2), p(0, 4));
        s.erase_selection();
        assert_eq!(s.text(), "abdef");
        s.undo().unwrap();
        s.undo().unwrap();
        assert_eq!(s.text(), "abcdef");

        s.apply_external(Delta::delete(p(0, 1), "bcd")).unwrap();
        while s.redo().is_some() {}
        assert_eq!(s.text(), "aef");
    }

    #[test]
    fn test_redo_after_external_delete_of_joined_lines() {
        let mut s = Session::new("a\n");
        s.move_to(p(0, 1));
        s.enter();
        s.type_text("a");
        s.select(p(0, 0), p(1, 1));
        s.type_text("a");
        assert_eq!(s.text(), "a\n");
        s.undo().unwrap();
        s.undo().unwrap();
        assert_eq!(s.text(), "a\n\n");

        s.apply_external(Delta::delete(p(0, 0), "a\n")).unwrap();
        while s.redo().is_some() {}
        assert_eq!(s.text(), "a\n");
    }

    #[test]
    fn test_redo_delete_keeps_text_inserted_inside_it() {
        let mut s = Session::new("abcdef");
        s.select(p(0, 1), p(0, 5));
        s.erase_selection();
        s.undo().unwrap();
        s.apply_external(Delta::insert(p(0, 3), "XY")).unwrap();
        s.redo().unwrap();
        assert_eq!(s.text(), "aXYf");
    }

    #[test]
    fn test_save_bookmarks() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::store::FileStore::new(dir.path().join("doc.md"));
        let mut s = Session::new("draft");
        s.type_text("> ");
        assert!(s.button_state().save);
        s.save(&store).unwrap();
        assert!(s.is_saved());
        assert_eq!(store.load().unwrap(), "> draft");
    }

    #[test]
    fn test_settings_follow_edits() {
        let mut s = Session::new("body");
        s.type_text("<!--{\"GPT_MODEL\":\"gpt-4\"}-->\n");
        assert_eq!(s.settings().model(), "gpt-4");
        s.undo().unwrap();
        assert_eq!(s.settings().model(), crate::settings::DEFAULT_MODEL);
    }

    #[test]
    fn test_complete_requires_selection() {
        let mut s = Session::new("prompt");
        let service = FixedCompletion {
            answer: "answer",
            seen: RefCell::new(Vec::new()),
        };
        assert!(matches!(
            s.complete(&service),
            Err(CompletionError::NoSelection)
        ));
    }

    #[test]
    fn test_complete_inserts_answer_at_cursor() {
        let mut s = Session::new("ask me\n");
        let service = FixedCompletion {
            answer: "ok",
            seen: RefCell::new(Vec::new()),
        };
        s.select(p(0, 0), p(0, 6));
        s.complete(&service).unwrap();
        assert_eq!(s.text(), "ask meok\n\n");
        assert_eq!(service.seen.borrow()[0].prompt, "ask me");
        s.undo().unwrap();
        assert_eq!(s.text(), "ask me\n");
    }

    #[test]
    fn test_undo_depth_is_applied() {
        let mut s = Session::new("").with_undo_depth(Some(1));
        s.type_text("a");
        s.type_text("b");
        s.undo().unwrap();
        assert!(s.undo().is_none());
        assert_eq!(s.text(), "a");
    }

    #[test]
    fn test_keep_redo_rebases_over_typing() {
        let mut s = Session::new("a\nb").with_keep_redo(true);
        s.move_to(p(1, 1));
        s.type_text("!");
        s.undo().unwrap();
        s.move_to(p(0, 0));
        s.type_text("> ");
        assert!(s.can_redo());
        s.redo().unwrap();
        assert_eq!(s.text(), "> a\nb!");
    }

    #[test]
    fn test_typing_after_undo_drops_redo() {
        let mut s = Session::new("a");
        s.type_text("b");
        s.undo().unwrap();
        s.type_text("c");
        assert!(!s.can_redo());
    }

    #[test]
    fn test_no_select_keeps_cursor() {
        let mut s = Session::new("abc").with_select_on_replay(false);
        s.move_to(p(0, 3));
        s.type_text("d");
        s.move_to(p(0, 0));
        s.undo().unwrap();
        assert_eq!(s.text(), "abc");
        assert!(s.buffer().selection().is_none());
    }
}
