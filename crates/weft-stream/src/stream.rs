//! A forward-linked log of changes.
//!
//! A [`Stream`] is a handle to one node of the log. Each node has at most
//! one successor edge, carrying the change that leads from this node's state
//! to the successor's. Appending on a node that already has successors never
//! rewrites them: the new change is transformed past them and a fresh chain
//! of nodes is built that rejoins the log at its tail. Only the tail's
//! forward pointer is ever written.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use weft_core::{Change, Result};

/// Callback fired when a node gains its successor edge.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// A forward edge: the change (nil if two concurrent changes cancelled) and
/// the node it leads to.
pub type Edge = (Option<Change>, Stream);

#[derive(Default)]
struct Node {
    next: Option<Edge>,
    listeners: Vec<(String, Listener)>,
}

/// Handle to a node in a change log. Cloning shares the node.
#[derive(Clone, Default)]
pub struct Stream(Arc<Mutex<Node>>);

impl Stream {
    /// A fresh log with a single node.
    pub fn new() -> Self {
        Self::default()
    }

    /// The forward edge, if this node has a successor.
    pub fn next(&self) -> Option<Edge> {
        self.0.lock().next.clone()
    }

    /// Register, replace or (with `None`) remove the listener under `key`.
    pub fn nextf(&self, key: impl Into<String>, listener: Option<Listener>) {
        let key = key.into();
        let mut node = self.0.lock();
        node.listeners.retain(|(k, _)| *k != key);
        if let Some(listener) = listener {
            node.listeners.push((key, listener));
        }
    }

    /// Walk forward edges to the current tail.
    pub fn latest(&self) -> Stream {
        let mut cursor = self.clone();
        while let Some((_, next)) = cursor.next() {
            cursor = next;
        }
        cursor
    }

    /// Iterate forward edges from this node.
    pub fn edges(&self) -> Edges {
        Edges {
            cursor: self.clone(),
        }
    }

    /// Same node?
    pub fn ptr_eq(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Record `change` as happening after everything already in the log.
    ///
    /// Returns the node for the state right after `change`; its forward
    /// edges carry the existing successors transformed past `change`.
    pub fn append(&self, change: Change) -> Result<Stream> {
        self.transform(change, false)
    }

    /// Record `change` as happening before the existing successors. Those
    /// successors are rebased onto it.
    pub fn reverse_append(&self, change: Change) -> Result<Stream> {
        self.transform(change, true)
    }

    /// Like [`append`](Self::append) but nil is accepted and leaves the log
    /// untouched.
    pub fn append_opt(&self, change: Option<Change>) -> Result<Stream> {
        match change {
            Some(c) => self.append(c),
            None => Ok(self.clone()),
        }
    }

    pub fn reverse_append_opt(&self, change: Option<Change>) -> Result<Stream> {
        match change {
            Some(c) => self.reverse_append(c),
            None => Ok(self.clone()),
        }
    }

    fn transform(&self, change: Change, reverse: bool) -> Result<Stream> {
        let head = Stream::new();
        let mut fresh = head.clone();
        let mut cursor = self.clone();
        let mut carried = change;
        let mut hops = 0usize;

        loop {
            let node = cursor.0.lock();
            let Some((existing, successor)) = node.next.clone() else {
                drop(node);
                let listeners = cursor.link_tail(carried, fresh);
                tracing::trace!(hops, reverse, listeners = listeners.len(), "appended at tail");
                for listener in listeners {
                    listener();
                }
                return Ok(head);
            };
            drop(node);
            hops += 1;

            let (existing, rebased) = match existing {
                None => (None, Some(carried)),
                Some(existing) if reverse => carried.merge(&existing)?,
                Some(existing) => {
                    let (rebased, existing) = existing.merge(&carried)?;
                    (existing, rebased)
                }
            };

            match rebased {
                Some(c) => {
                    let step = Stream::new();
                    fresh.set_next(existing, step.clone());
                    fresh = step;
                    cursor = successor;
                    carried = c;
                }
                None => {
                    // Fully absorbed: the fresh chain rejoins the log here.
                    tracing::trace!(hops, reverse, "append absorbed by existing change");
                    fresh.set_next(existing, successor);
                    return Ok(head);
                }
            }
        }
    }

    fn set_next(&self, change: Option<Change>, next: Stream) {
        self.0.lock().next = Some((change, next));
    }

    /// Write the tail edge and collect listeners to fire outside the lock.
    /// A tail that gained a successor in the meantime is followed instead.
    fn link_tail(&self, change: Change, next: Stream) -> Vec<Listener> {
        let mut cursor = self.clone();
        loop {
            let mut node = cursor.0.lock();
            match node.next.clone() {
                None => {
                    node.next = Some((Some(change), next));
                    return node.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
                }
                Some((_, successor)) => {
                    drop(node);
                    cursor = successor;
                }
            }
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0.lock();
        f.debug_struct("Stream")
            .field("next", &node.next.as_ref().map(|(c, _)| c))
            .field("listeners", &node.listeners.len())
            .finish()
    }
}

/// Iterator over forward edges. Yields each edge's change (nil included)
/// and the node it leads to.
pub struct Edges {
    cursor: Stream,
}

impl Iterator for Edges {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        let (change, next) = self.cursor.next()?;
        self.cursor = next.clone();
        Some((change, next))
    }
}
