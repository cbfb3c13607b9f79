//! # weft-stream
//!
//! Forward-linked change logs.
//!
//! A [`Stream`] is a cursor into a log where every node has at most one
//! successor. Appending on an old node transforms the new change past the
//! existing successors instead of rewriting them, so any reader holding an
//! old node always sees one consistent, linear history.
//!
//! On top of that:
//! - [`Branch`]: a private log exchanging changes with a shared one
//! - [`UndoManager`]: collaborative undo/redo over a stream
//!
//! Streams are single-owner: the host serialises every append and walk.

pub mod branch;
pub mod stream;
pub mod undo;

pub use branch::Branch;
pub use stream::{Edge, Edges, Listener, Stream};
pub use undo::{Entry, EntryKind, UndoManager, DEFAULT_HISTORY_LIMIT};
