//! Two-way synchronisation between a local stream and a shared log.
//!
//! A [`Session`] owns a cursor into the host's local [`Stream`]. Everything
//! after the cursor is local editing the session has not turned into
//! operations yet. Everything between the log version it has seen and the
//! cursor is its `pending` list: operations it has minted but the log has
//! not echoed back.
//!
//! - [`push`](Session::push) mints operations for new local edits and
//!   appends whatever the log has not accepted yet.
//! - [`fetch`](Session::fetch) reads the log past `version`. Our own
//!   operations come back as acknowledgements; anything else is merged past
//!   the pending changes and reverse-appended to the local stream.
//!
//! State only changes once a store call has returned, so a dropped or
//! failed call can simply be repeated.

use crate::config::SessionConfig;
use crate::error::{OpsError, Result};
use crate::nonblocking::NonBlocking;
use crate::operation::{ulid_factory, IdFactory, Operation};
use crate::reliable::ReliableStore;
use crate::store::Store;
use crate::transformer::Transformer;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use weft_core::{merge, Change};
use weft_stream::Stream;

/// Called with `(version, pending, merge_chain)` after they change.
pub type Observer = Arc<dyn Fn(i64, &[Operation], &[Option<Change>]) + Send + Sync>;

/// Everything needed to resume a session later.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub version: i64,
    pub pending: Vec<Operation>,
    pub merge_chain: Vec<Option<Change>>,
}

pub struct Session {
    store: Arc<dyn Store>,
    /// Just past the last minted local change.
    stream: Stream,
    ids: IdFactory,
    version: i64,
    pending: Vec<Operation>,
    /// Each pending change rebased past every remote change fetched since.
    merge_chain: Vec<Option<Change>>,
    /// How many operations at the end of `pending` the store has not
    /// confirmed.
    unsent: usize,
    notify: Option<Observer>,
    closed: bool,
}

impl Session {
    /// Bind `stream` to `store`. Wrappers are layered as the config asks:
    /// retries innermost, then the transformer, then non-blocking reads.
    pub fn new(store: impl Store, stream: Stream, ids: IdFactory, config: SessionConfig) -> Self {
        let mut store: Arc<dyn Store> = Arc::new(store);
        if let Some(backoff) = config.backoff {
            store = Arc::new(ReliableStore::new(store, backoff));
        }
        if let Some(cache) = config.auto_transform {
            store = Arc::new(Transformer::with_cache(store, cache));
        }
        if config.non_blocking {
            store = Arc::new(NonBlocking::new(store));
        }

        let pending = config.initial_pending;
        let merge_chain = match config.initial_merge_chain {
            Some(chain) if chain.len() == pending.len() => chain,
            _ => pending.iter().map(|op| op.change.clone()).collect(),
        };
        Self {
            store,
            stream,
            ids,
            version: config.initial_version,
            unsent: pending.len(),
            pending,
            merge_chain,
            notify: config.notify,
            closed: false,
        }
    }

    /// A session with ULID ids and no wrappers.
    pub fn with_defaults(store: impl Store, stream: Stream) -> Self {
        Self::new(store, stream, ulid_factory(), SessionConfig::default())
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn pending(&self) -> &[Operation] {
        &self.pending
    }

    pub fn merge_chain(&self) -> &[Option<Change>] {
        &self.merge_chain
    }

    /// Cursor just past the last local change turned into an operation.
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            version: self.version,
            pending: self.pending.clone(),
            merge_chain: self.merge_chain.clone(),
        }
    }

    /// Mint operations for new local edits and append everything the store
    /// has not accepted yet.
    pub async fn push(&mut self) -> Result<()> {
        self.ensure_open()?;
        let minted = self.mint();
        if self.unsent == 0 {
            return Ok(());
        }
        let batch = self.pending[self.pending.len() - self.unsent..].to_vec();
        let sent = batch.len();
        self.store.append(batch).await?;
        self.unsent = 0;
        tracing::debug!(minted, sent, version = self.version, "session push");
        Ok(())
    }

    /// One pull round: read up to `limit` operations past `version`.
    /// Returns how many were processed.
    pub async fn fetch(&mut self, limit: usize) -> Result<usize> {
        self.ensure_open()?;
        let ops = self.store.get_since(self.version + 1, limit).await?;

        let mut processed = 0;
        let mut result = Ok(());
        for op in ops {
            if let Err(e) = self.apply_remote(op) {
                result = Err(e);
                break;
            }
            processed += 1;
        }
        if processed > 0 {
            tracing::debug!(processed, version = self.version, pending = self.pending.len(), "session fetch");
            self.notify();
        }
        result.map(|_| processed)
    }

    /// [`fetch`](Self::fetch) with a deadline. Running out of time leaves
    /// the session untouched.
    pub async fn fetch_within(&mut self, limit: usize, deadline: Duration) -> Result<usize> {
        match tokio::time::timeout(deadline, self.fetch(limit)).await {
            Ok(result) => result,
            Err(_) => Err(OpsError::Canceled),
        }
    }

    /// Push, then fetch.
    pub async fn sync(&mut self, limit: usize) -> Result<usize> {
        self.push().await?;
        self.fetch(limit).await
    }

    /// Wait until the log may have something past `version`.
    pub async fn poll(&self) -> Result<()> {
        self.ensure_open()?;
        self.store.poll(self.version + 1).await?;
        Ok(())
    }

    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.store.close().await;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(OpsError::Closed);
        }
        Ok(())
    }

    /// Turn local edits past the cursor into pending operations.
    fn mint(&mut self) -> usize {
        let mut minted = 0;
        while let Some((change, next)) = self.stream.next() {
            if let Some(change) = change {
                let parent = self.pending.last().map(|op| op.id.clone());
                let op = Operation::new((self.ids)(), parent, self.version, Some(change.clone()));
                self.pending.push(op);
                self.merge_chain.push(Some(change));
                self.unsent += 1;
                minted += 1;
            }
            self.stream = next;
        }
        if minted > 0 {
            self.notify();
        }
        minted
    }

    fn apply_remote(&mut self, op: Operation) -> Result<()> {
        let expected = self.version + 1;
        if op.version != expected {
            tracing::warn!(got = op.version, expected, "log version mismatch");
            return Err(OpsError::VersionMismatch {
                got: op.version,
                expected,
            });
        }

        if self.pending.first().is_some_and(|p| p.id == op.id) {
            self.pending.remove(0);
            self.merge_chain.remove(0);
            self.unsent = self.unsent.min(self.pending.len());
            tracing::debug!(version = op.version, id = %op.id, "ack");
        } else {
            let mut carried = op.change;
            let mut chain = self.merge_chain.clone();
            for slot in chain.iter_mut() {
                let (rebased, next) = merge(carried.as_ref(), slot.as_ref())?;
                *slot = rebased;
                carried = next;
            }
            self.stream = self.stream.reverse_append_opt(carried)?;
            self.merge_chain = chain;
        }
        self.version = op.version;
        Ok(())
    }

    fn notify(&self) {
        if let Some(observer) = &self.notify {
            observer(self.version, &self.pending, &self.merge_chain);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("version", &self.version)
            .field("pending", &self.pending.len())
            .field("unsent", &self.unsent)
            .field("closed", &self.closed)
            .finish()
    }
}
