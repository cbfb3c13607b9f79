//! A store wrapper whose reads never wait on the backend.

use crate::error::StoreError;
use crate::operation::Operation;
use crate::store::Store;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Notify;

const DEFAULT_BATCH: usize = 100;

#[derive(Default)]
struct Prefetch {
    ops: BTreeMap<i64, Operation>,
    in_flight: bool,
    failed: Option<StoreError>,
}

struct Shared<S> {
    inner: S,
    prefetch: Mutex<Prefetch>,
    fetched: Notify,
}

/// Serves `get_since` from a prefetched window and refreshes it in the
/// background.
///
/// A read returns whatever is already buffered, possibly nothing, and
/// kicks off a fetch for the rest. `poll` waits until the backend has data
/// and that data has been buffered. A failed background fetch is reported
/// by the next read. Must be used inside a tokio runtime.
pub struct NonBlocking<S> {
    shared: Arc<Shared<S>>,
}

impl<S: Store> NonBlocking<S> {
    pub fn new(inner: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner,
                prefetch: Mutex::new(Prefetch::default()),
                fetched: Notify::new(),
            }),
        }
    }

    /// Number of operations currently buffered.
    pub fn buffered(&self) -> usize {
        self.shared.prefetch.lock().ops.len()
    }

    /// Start a background fetch from `version` unless one is running.
    fn refresh(&self, version: i64, limit: usize) {
        {
            let mut prefetch = self.shared.prefetch.lock();
            if prefetch.in_flight {
                return;
            }
            prefetch.in_flight = true;
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let result = shared.inner.get_since(version, limit).await;
            {
                let mut prefetch = shared.prefetch.lock();
                prefetch.in_flight = false;
                match result {
                    Ok(ops) => {
                        tracing::trace!(version, fetched = ops.len(), "prefetch complete");
                        for op in ops {
                            prefetch.ops.insert(op.version, op);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(version, error = %e, "prefetch failed");
                        prefetch.failed = Some(e);
                    }
                }
            }
            shared.fetched.notify_waiters();
        });
    }
}

#[async_trait]
impl<S: Store> Store for NonBlocking<S> {
    async fn append(&self, ops: Vec<Operation>) -> Result<(), StoreError> {
        self.shared.inner.append(ops).await
    }

    async fn get_since(&self, version: i64, limit: usize) -> Result<Vec<Operation>, StoreError> {
        let ready = {
            let mut prefetch = self.shared.prefetch.lock();
            if let Some(e) = prefetch.failed.take() {
                return Err(e);
            }
            // Readers only move forward.
            prefetch.ops = prefetch.ops.split_off(&version);
            let mut ready = Vec::new();
            let mut next = version;
            while ready.len() < limit {
                match prefetch.ops.get(&next) {
                    Some(op) => ready.push(op.clone()),
                    None => break,
                }
                next += 1;
            }
            ready
        };
        if ready.len() < limit {
            self.refresh(version + ready.len() as i64, limit - ready.len());
        }
        Ok(ready)
    }

    async fn poll(&self, version: i64) -> Result<(), StoreError> {
        if self.shared.prefetch.lock().ops.contains_key(&version) {
            return Ok(());
        }
        self.shared.inner.poll(version).await?;

        let fetched = self.shared.fetched.notified();
        tokio::pin!(fetched);
        fetched.as_mut().enable();
        self.refresh(version, DEFAULT_BATCH);
        {
            let prefetch = self.shared.prefetch.lock();
            if prefetch.ops.contains_key(&version) || prefetch.failed.is_some() {
                return Ok(());
            }
        }
        fetched.await;
        Ok(())
    }

    async fn close(&self) {
        self.shared.inner.close().await
    }
}
