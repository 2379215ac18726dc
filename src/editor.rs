//! Versioned editing session over a [`TableDocument`].
//!
//! A session owns the live document plus two snapshot stacks. Every
//! snapshot is an independent deep copy; nothing on the stacks aliases
//! the live document. Cell edits are special-cased: the live value
//! updates on every keystroke, but history records at most one commit
//! per edit, holding the pre-edit document, and only when the final
//! value differs from the value captured when editing began.
//!
//! The stacks are private to one open document. Concurrent editing is
//! out of scope by design.

use crate::{
    document::{CellValue, Column, ColumnType, TableDocument},
    error::{Error, Result},
};

/// An in-flight cell edit: the pre-edit snapshot plus the value captured
/// when editing began.
#[derive(Debug, Clone)]
struct PendingCellEdit {
    snapshot: TableDocument,
    row: usize,
    column: String,
    original: CellValue,
}

/// Editing session with multi-step undo/redo and exact-state
/// restoration.
///
/// # Example
///
/// ```
/// use limpiar::{CellValue, EditorSession, TableDocument};
///
/// let doc = TableDocument::from_csv_str("name,age\nana,34\n").unwrap();
/// let mut session = EditorSession::new(doc);
///
/// session.begin_cell_edit(0, "age").unwrap();
/// session.update_cell(CellValue::Number(35.0)).unwrap();
/// assert!(session.end_cell_edit().unwrap());
///
/// session.undo();
/// assert_eq!(
///     session.document().value(0, "age"),
///     Some(&CellValue::Number(34.0))
/// );
/// ```
#[derive(Debug)]
pub struct EditorSession {
    current: TableDocument,
    undo: Vec<TableDocument>,
    redo: Vec<TableDocument>,
    pending: Option<PendingCellEdit>,
}

impl EditorSession {
    /// Start a session over a freshly loaded document. Both stacks start
    /// empty.
    pub fn new(document: TableDocument) -> Self {
        Self {
            current: document,
            undo: Vec::new(),
            redo: Vec::new(),
            pending: None,
        }
    }

    /// The live document.
    pub fn document(&self) -> &TableDocument {
        &self.current
    }

    /// True when an undo step is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// True when a redo step is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Depth of the undo stack.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Depth of the redo stack.
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Record a state transition: push the given pre-change state onto
    /// the undo stack and clear redo. This is the only operation that
    /// clears redo.
    fn push_commit(&mut self, previous: TableDocument) {
        self.undo.push(previous);
        self.redo.clear();
    }

    /// Replace the document as a single atomic commit.
    pub fn commit(&mut self, document: TableDocument) {
        self.finish_pending();
        let previous = std::mem::replace(&mut self.current, document);
        self.push_commit(previous);
    }

    /// Step back to the previous state. No-op on an empty stack;
    /// returns whether a step was taken.
    pub fn undo(&mut self) -> bool {
        self.finish_pending();
        let Some(state) = self.undo.pop() else {
            return false;
        };
        let replaced = std::mem::replace(&mut self.current, state);
        self.redo.push(replaced);
        true
    }

    /// Step forward to an undone state. No-op on an empty stack;
    /// returns whether a step was taken.
    pub fn redo(&mut self) -> bool {
        self.finish_pending();
        let Some(state) = self.redo.pop() else {
            return false;
        };
        let replaced = std::mem::replace(&mut self.current, state);
        self.undo.push(replaced);
        true
    }

    /// Clear both stacks after a successful save. The live document is
    /// untouched.
    pub fn mark_saved(&mut self) {
        self.finish_pending();
        self.undo.clear();
        self.redo.clear();
    }

    // ─── Cell editing ────────────────────────────────────────────────

    /// Begin editing a cell, capturing the pre-edit document and value.
    /// An edit already in flight is finalized first.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist.
    pub fn begin_cell_edit(&mut self, row: usize, column: &str) -> Result<()> {
        self.finish_pending();
        let original = self
            .current
            .value(row, column)
            .cloned()
            .ok_or_else(|| {
                if self.current.has_column(column) {
                    Error::RowIndexOutOfBounds {
                        index: row,
                        len: self.current.num_rows(),
                    }
                } else {
                    Error::column_not_found(column)
                }
            })?;
        self.pending = Some(PendingCellEdit {
            snapshot: self.current.clone(),
            row,
            column: column.to_string(),
            original,
        });
        Ok(())
    }

    /// Update the in-flight cell to a new live value. No history entry
    /// is recorded per keystroke.
    ///
    /// # Errors
    ///
    /// Returns an error if no edit is in flight.
    pub fn update_cell(&mut self, value: CellValue) -> Result<()> {
        let Some(pending) = &self.pending else {
            return Err(Error::edit("no cell edit in progress"));
        };
        let (row, column) = (pending.row, pending.column.clone());
        self.current.set_value(row, &column, value)
    }

    /// Finish the in-flight edit. Exactly one commit is recorded, and
    /// only if the final value differs from the captured original; the
    /// recorded entry holds the pre-edit document.
    ///
    /// # Errors
    ///
    /// Returns an error if no edit is in flight.
    pub fn end_cell_edit(&mut self) -> Result<bool> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| Error::edit("no cell edit in progress"))?;
        Ok(self.settle(pending))
    }

    /// Finalize any in-flight edit; used by operations that must not
    /// leave a pending edit behind.
    fn finish_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.settle(pending);
        }
    }

    fn settle(&mut self, pending: PendingCellEdit) -> bool {
        let changed = self
            .current
            .value(pending.row, &pending.column)
            .is_some_and(|v| *v != pending.original);
        if changed {
            self.push_commit(pending.snapshot);
        }
        changed
    }

    // ─── Structural edits: single atomic commits ─────────────────────

    /// Add a column filled with a default value.
    ///
    /// # Errors
    ///
    /// Returns an error if the name already exists.
    pub fn add_column(
        &mut self,
        name: &str,
        ty: ColumnType,
        default: CellValue,
    ) -> Result<()> {
        self.finish_pending();
        let mut next = self.current.clone();
        next.add_column(Column::new(name, ty), default)?;
        self.commit(next);
        Ok(())
    }

    /// Delete a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn delete_row(&mut self, index: usize) -> Result<()> {
        self.finish_pending();
        let mut next = self.current.clone();
        next.remove_row(index)?;
        self.commit(next);
        Ok(())
    }

    /// Delete a column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist.
    pub fn delete_column(&mut self, name: &str) -> Result<()> {
        self.finish_pending();
        let mut next = self.current.clone();
        next.remove_column(name)?;
        self.commit(next);
        Ok(())
    }

    /// Merge two columns into one, joining values with `separator`.
    ///
    /// # Errors
    ///
    /// Returns an error if either column is missing or the new name
    /// collides.
    pub fn merge_columns(
        &mut self,
        left: &str,
        right: &str,
        new_name: &str,
        separator: &str,
    ) -> Result<()> {
        self.finish_pending();
        let mut next = self.current.clone();
        next.merge_columns(left, right, new_name, separator)?;
        self.commit(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EditorSession {
        EditorSession::new(
            TableDocument::from_csv_str("name,age\nana,34\nbo,29\n").unwrap(),
        )
    }

    #[test]
    fn test_initial_state() {
        let session = session();
        assert!(!session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn test_undo_redo_underflow_is_noop() {
        let mut session = session();
        assert!(!session.undo());
        assert!(!session.redo());
        assert_eq!(session.document().num_rows(), 2);
    }

    #[test]
    fn test_cell_edit_commits_once() {
        let mut session = session();
        session.begin_cell_edit(0, "age").unwrap();
        // several keystrokes, one history entry
        session.update_cell(CellValue::Number(3.0)).unwrap();
        session.update_cell(CellValue::Number(35.0)).unwrap();
        session.update_cell(CellValue::Number(351.0)).unwrap();
        assert_eq!(session.undo_depth(), 0);
        assert!(session.end_cell_edit().unwrap());
        assert_eq!(session.undo_depth(), 1);

        // undo restores the pre-edit value, not an intermediate one
        session.undo();
        assert_eq!(
            session.document().value(0, "age"),
            Some(&CellValue::Number(34.0))
        );
    }

    #[test]
    fn test_cell_edit_same_value_suppressed() {
        let mut session = session();
        session.begin_cell_edit(0, "age").unwrap();
        session.update_cell(CellValue::Number(99.0)).unwrap();
        session.update_cell(CellValue::Number(34.0)).unwrap();
        assert!(!session.end_cell_edit().unwrap());
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut session = session();
        session.delete_row(1).unwrap();
        session.undo();
        assert!(session.can_redo());

        session.delete_row(0).unwrap();
        assert!(!session.can_redo());
    }

    #[test]
    fn test_undo_redo_symmetry() {
        let mut session = session();
        let initial = session.document().clone();

        session.delete_row(1).unwrap();
        session
            .add_column("team", ColumnType::Text, CellValue::Text("a".to_string()))
            .unwrap();
        session.delete_column("name").unwrap();
        assert_eq!(session.undo_depth(), 3);

        assert!(session.undo() && session.undo() && session.undo());
        assert_eq!(session.document(), &initial);

        assert!(session.redo() && session.redo() && session.redo());
        assert!(!session.document().has_column("name"));
        assert!(session.document().has_column("team"));
    }

    #[test]
    fn test_structural_edits_are_atomic() {
        let mut session = session();
        session
            .merge_columns("name", "age", "name_age", " ")
            .unwrap();
        assert_eq!(session.undo_depth(), 1);
        assert_eq!(
            session.document().value(0, "name_age"),
            Some(&CellValue::Text("ana 34".to_string()))
        );

        session.undo();
        assert!(session.document().has_column("name"));
        assert!(session.document().has_column("age"));
    }

    #[test]
    fn test_snapshots_are_independent_copies() {
        let mut session = session();
        session.delete_row(0).unwrap();
        // mutate the live document through another commit
        session.begin_cell_edit(0, "name").unwrap();
        session
            .update_cell(CellValue::Text("zed".to_string()))
            .unwrap();
        session.end_cell_edit().unwrap();

        session.undo();
        session.undo();
        assert_eq!(
            session.document().value(0, "name"),
            Some(&CellValue::Text("ana".to_string()))
        );
        assert_eq!(session.document().num_rows(), 2);
    }

    #[test]
    fn test_mark_saved_clears_history() {
        let mut session = session();
        session.delete_row(0).unwrap();
        session.undo();
        assert!(session.can_undo() || session.can_redo());

        session.mark_saved();
        assert!(!session.can_undo());
        assert!(!session.can_redo());
        assert_eq!(session.document().num_rows(), 2);
    }

    #[test]
    fn test_begin_edit_on_missing_cell_errors() {
        let mut session = session();
        assert!(matches!(
            session.begin_cell_edit(0, "nope"),
            Err(Error::ColumnNotFound { .. })
        ));
        assert!(matches!(
            session.begin_cell_edit(9, "age"),
            Err(Error::RowIndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_update_without_begin_errors() {
        let mut session = session();
        assert!(session.update_cell(CellValue::Number(1.0)).is_err());
        assert!(session.end_cell_edit().is_err());
    }

    #[test]
    fn test_undo_finalizes_pending_edit() {
        let mut session = session();
        session.begin_cell_edit(0, "age").unwrap();
        session.update_cell(CellValue::Number(50.0)).unwrap();
        // undo first settles the pending commit, then undoes it
        assert!(session.undo());
        assert_eq!(
            session.document().value(0, "age"),
            Some(&CellValue::Number(34.0))
        );
    }
}
