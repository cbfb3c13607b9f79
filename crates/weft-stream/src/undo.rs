//! Undo and redo as ordinary changes appended to a stream.
//!
//! Only changes recorded through the manager can be undone. Changes that
//! reach the stream through other cursors still enter the history, since an
//! inverse has to be rebased past them before it is appended. An undo is an
//! entry like any other, which is what makes it redoable.

use crate::stream::Stream;
use std::collections::VecDeque;
use weft_core::{Change, Result};

/// Where a history entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Recorded through [`UndoManager::record`].
    Local,
    /// Observed on the stream.
    Remote,
    /// Produced by [`UndoManager::undo`].
    Undo,
    /// Produced by [`UndoManager::redo`].
    Redo,
}

/// A change in the history, in stream order.
#[derive(Clone, Debug)]
pub struct Entry {
    pub seq: u64,
    pub kind: EntryKind,
    pub change: Change,
}

/// Undo manager bound to a stream cursor.
#[derive(Clone, Debug)]
pub struct UndoManager {
    /// Cursor just past the last change in `history`.
    stream: Stream,
    next_seq: u64,
    /// Every change seen since the manager was created, oldest first.
    history: VecDeque<Entry>,
    /// Local or redo entries that can be undone.
    undo_stack: Vec<u64>,
    /// Undo entries that can be redone.
    redo_stack: Vec<u64>,
    history_limit: usize,
}

/// Entries kept before the oldest are dropped, along with any undo or redo
/// that still pointed at them.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

impl UndoManager {
    pub fn new(stream: Stream) -> Self {
        Self {
            stream,
            next_seq: 0,
            history: VecDeque::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` entries. Shrinking drops the oldest at once, so
    /// local changes among them can no longer be undone.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.history_limit = limit;
        self.trim_history();
    }

    /// Cursor just past everything the manager has seen.
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_stack_size(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_stack_size(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn history(&self) -> impl Iterator<Item = &Entry> {
        self.history.iter()
    }

    /// Pull changes that reached the stream from elsewhere into the history.
    pub fn sync(&mut self) -> usize {
        let mut seen = 0;
        while let Some((change, next)) = self.stream.next() {
            if let Some(change) = change {
                self.push_entry(EntryKind::Remote, change);
                seen += 1;
            }
            self.stream = next;
        }
        self.trim_history();
        seen
    }

    /// Append a local change to the stream and make it undoable.
    pub fn record(&mut self, change: Change) -> Result<()> {
        self.sync();
        self.stream = self.stream.append(change.clone())?;
        let seq = self.push_entry(EntryKind::Local, change);
        self.undo_stack.push(seq);
        // A fresh edit invalidates the redo chain.
        self.redo_stack.clear();
        self.trim_history();
        Ok(())
    }

    /// Revert the newest undoable change, transformed past everything that
    /// happened since. Returns the change appended, or `None` if there was
    /// nothing to undo or later edits already erased it.
    pub fn undo(&mut self) -> Result<Option<Change>> {
        self.sync();
        let Some(seq) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let applied = self.apply_inverse(seq, EntryKind::Undo)?;
        if let Some(undo_seq) = applied.as_ref().map(|(s, _)| *s) {
            self.redo_stack.push(undo_seq);
        }
        Ok(applied.map(|(_, c)| c))
    }

    /// Revert the newest undo. Returns the change appended.
    pub fn redo(&mut self) -> Result<Option<Change>> {
        self.sync();
        let Some(seq) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let applied = self.apply_inverse(seq, EntryKind::Redo)?;
        if let Some(redo_seq) = applied.as_ref().map(|(s, _)| *s) {
            self.undo_stack.push(redo_seq);
        }
        Ok(applied.map(|(_, c)| c))
    }

    /// Forget every entry. The stream keeps its changes and the cursor stays
    /// where it is; nothing seen so far can be undone or redone.
    pub fn clear(&mut self) {
        self.history.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn apply_inverse(&mut self, seq: u64, kind: EntryKind) -> Result<Option<(u64, Change)>> {
        let Some(index) = self.history.iter().position(|e| e.seq == seq) else {
            return Ok(None);
        };
        let mut inverse = Some(self.history[index].change.revert());
        for later in self.history.iter().skip(index + 1) {
            let Some(x) = inverse.take() else { break };
            let (rebased, _) = later.change.merge(&x)?;
            inverse = rebased;
        }
        let Some(inverse) = inverse else {
            tracing::debug!(seq, "undo erased by later changes");
            return Ok(None);
        };
        self.stream = self.stream.append(inverse.clone())?;
        let new_seq = self.push_entry(kind, inverse.clone());
        self.trim_history();
        Ok(Some((new_seq, inverse)))
    }

    fn push_entry(&mut self, kind: EntryKind, change: Change) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.history.push_back(Entry { seq, kind, change });
        seq
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.history_limit {
            if let Some(removed) = self.history.pop_front() {
                self.undo_stack.retain(|s| *s != removed.seq);
                self.redo_stack.retain(|s| *s != removed.seq);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::Value;

    fn fold(start: &Value, stream: &Stream) -> Value {
        stream
            .edges()
            .filter_map(|(c, _)| c)
            .fold(start.clone(), |v, c| v.apply(&c).unwrap())
    }

    #[test]
    fn test_undo_redo_local() {
        let base = Value::text("abc");
        let root = Stream::new();
        let mut undo = UndoManager::new(root.clone());

        undo.record(Change::insert(3, Value::text("d"))).unwrap();
        undo.record(Change::insert(0, Value::text("_"))).unwrap();
        assert_eq!(fold(&base, &root), Value::text("_abcd"));

        undo.undo().unwrap();
        assert_eq!(fold(&base, &root), Value::text("abcd"));
        assert!(undo.can_redo());

        undo.redo().unwrap();
        assert_eq!(fold(&base, &root), Value::text("_abcd"));

        undo.undo().unwrap();
        undo.undo().unwrap();
        assert_eq!(fold(&base, &root), base);
        assert!(!undo.can_undo());
        assert_eq!(undo.redo_stack_size(), 2);
    }

    #[test]
    fn test_undo_transforms_past_remote_changes() {
        let base = Value::text("world");
        let root = Stream::new();
        let mut undo = UndoManager::new(root.clone());

        undo.record(Change::insert(5, Value::text("!"))).unwrap();
        // Someone else edits through another cursor on the same log.
        undo.stream()
            .append(Change::insert(0, Value::text("hello ")))
            .unwrap();

        let inverse = undo.undo().unwrap();
        assert_eq!(inverse, Some(Change::remove(11, Value::text("!"))));
        assert_eq!(fold(&base, &root), Value::text("hello world"));
        assert_eq!(
            undo.history().map(|e| e.kind).collect::<Vec<_>>(),
            vec![EntryKind::Local, EntryKind::Remote, EntryKind::Undo]
        );
    }

    #[test]
    fn test_new_record_clears_redo() {
        let root = Stream::new();
        let mut undo = UndoManager::new(root);
        undo.record(Change::increment(1)).unwrap();
        undo.undo().unwrap();
        assert!(undo.can_redo());
        undo.record(Change::increment(2)).unwrap();
        assert!(!undo.can_redo());
    }

    #[test]
    fn test_history_is_trimmed() {
        let root = Stream::new();
        let mut undo = UndoManager::new(root);
        undo.set_history_limit(2);
        for i in 0..5 {
            undo.record(Change::increment(i)).unwrap();
        }
        assert_eq!(undo.history().count(), 2);
        assert_eq!(undo.undo_stack_size(), 2);
    }

    #[test]
    fn test_clear_keeps_stream_but_drops_undo() {
        let base = Value::text("ab");
        let root = Stream::new();
        let mut undo = UndoManager::new(root.clone());
        undo.record(Change::insert(2, Value::text("c"))).unwrap();

        undo.clear();
        assert!(!undo.can_undo());
        assert_eq!(undo.undo().unwrap(), None);
        assert_eq!(fold(&base, &root), Value::text("abc"));

        // The cursor did not move back: new records land after the old ones.
        undo.record(Change::insert(0, Value::text("_"))).unwrap();
        assert_eq!(fold(&base, &root), Value::text("_abc"));
        assert_eq!(undo.history().count(), 1);
    }
}
