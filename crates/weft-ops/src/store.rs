//! The append-only operation log.

use crate::error::StoreError;
use crate::operation::{OpId, Operation};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Notify;

/// An append-only, totally ordered log of operations.
///
/// Every method may be called concurrently. Dropping a returned future
/// cancels the call; implementations must leave the log consistent when
/// that happens.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Append `ops` contiguously, in order. Operations whose id is already
    /// in the log are dropped silently. Each accepted op is assigned its
    /// index as `version`.
    async fn append(&self, ops: Vec<Operation>) -> Result<(), StoreError>;

    /// Up to `limit` operations starting at `version`. A version past the
    /// end yields an empty list.
    async fn get_since(&self, version: i64, limit: usize) -> Result<Vec<Operation>, StoreError>;

    /// Wait until an operation at `version` or later may exist. May return
    /// early.
    async fn poll(&self, version: i64) -> Result<(), StoreError>;

    /// Release resources. Calls in flight may fail.
    async fn close(&self);
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn append(&self, ops: Vec<Operation>) -> Result<(), StoreError> {
        (**self).append(ops).await
    }

    async fn get_since(&self, version: i64, limit: usize) -> Result<Vec<Operation>, StoreError> {
        (**self).get_since(version, limit).await
    }

    async fn poll(&self, version: i64) -> Result<(), StoreError> {
        (**self).poll(version).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

#[derive(Default)]
struct Log {
    ops: Vec<Operation>,
    ids: HashSet<OpId>,
    closed: bool,
}

/// In-memory log, for tests, demos and single-process hosts.
#[derive(Default)]
pub struct MemoryStore {
    log: Mutex<Log>,
    appended: Notify,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations in the log.
    pub fn len(&self) -> usize {
        self.log.lock().ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the whole log.
    pub fn operations(&self) -> Vec<Operation> {
        self.log.lock().ops.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn append(&self, ops: Vec<Operation>) -> Result<(), StoreError> {
        let (accepted, total) = {
            let mut log = self.log.lock();
            if log.closed {
                return Err(StoreError::Closed);
            }
            let mut accepted = 0;
            for op in ops {
                if !log.ids.insert(op.id.clone()) {
                    continue;
                }
                let version = log.ops.len() as i64;
                log.ops.push(op.with_version(version));
                accepted += 1;
            }
            (accepted, log.ops.len())
        };
        tracing::debug!(accepted, total, "memory store append");
        if accepted > 0 {
            self.appended.notify_waiters();
        }
        Ok(())
    }

    async fn get_since(&self, version: i64, limit: usize) -> Result<Vec<Operation>, StoreError> {
        let log = self.log.lock();
        if log.closed {
            return Err(StoreError::Closed);
        }
        let start = version.max(0) as usize;
        if start >= log.ops.len() {
            return Ok(Vec::new());
        }
        let end = start.saturating_add(limit).min(log.ops.len());
        Ok(log.ops[start..end].to_vec())
    }

    async fn poll(&self, version: i64) -> Result<(), StoreError> {
        let appended = self.appended.notified();
        tokio::pin!(appended);
        appended.as_mut().enable();
        {
            let log = self.log.lock();
            if log.closed {
                return Err(StoreError::Closed);
            }
            if log.ops.len() as i64 > version {
                return Ok(());
            }
        }
        appended.await;
        if self.log.lock().closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    async fn close(&self) {
        self.log.lock().closed = true;
        self.appended.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use weft_core::{Change, Value};

    fn op(id: &str) -> Operation {
        Operation::new(
            OpId::from_string(id),
            None,
            -1,
            Some(Change::insert(0, Value::text(id))),
        )
    }

    #[tokio::test]
    async fn test_append_assigns_versions() {
        let store = MemoryStore::new();
        store.append(vec![op("a"), op("b")]).await.unwrap();
        store.append(vec![op("c")]).await.unwrap();

        let ops = store.get_since(0, 10).await.unwrap();
        let versions: Vec<_> = ops.iter().map(|o| o.version).collect();
        assert_eq!(versions, vec![0, 1, 2]);
        assert_eq!(ops[2].id, OpId::from_string("c"));
    }

    #[tokio::test]
    async fn test_append_is_idempotent() {
        let store = MemoryStore::new();
        store.append(vec![op("a"), op("b")]).await.unwrap();
        store.append(vec![op("b"), op("c"), op("a")]).await.unwrap();

        let ids: Vec<_> = store.operations().into_iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_poll_ready_without_runtime() {
        let store = MemoryStore::new();
        tokio_test::block_on(store.append(vec![op("a")])).unwrap();
        // Already past the requested version: returns at once.
        tokio_test::assert_ok!(tokio_test::block_on(store.poll(0)));
    }

    #[tokio::test]
    async fn test_get_since_bounds() {
        let store = MemoryStore::new();
        store.append(vec![op("a"), op("b"), op("c")]).await.unwrap();

        assert_eq!(store.get_since(1, 1).await.unwrap().len(), 1);
        assert_eq!(store.get_since(1, 10).await.unwrap().len(), 2);
        assert!(store.get_since(3, 10).await.unwrap().is_empty());
        assert!(store.get_since(100, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_wakes_on_append() {
        let store = Arc::new(MemoryStore::new());
        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.poll(0).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.append(vec![op("a")]).await.unwrap();

        let woke = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(woke, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn test_poll_returns_when_data_exists() {
        let store = MemoryStore::new();
        store.append(vec![op("a")]).await.unwrap();
        tokio::time::timeout(Duration::from_millis(100), store.poll(0))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_close_fails_calls() {
        let store = Arc::new(MemoryStore::new());
        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.poll(0).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.close().await;

        assert!(matches!(waiter.await.unwrap(), Err(StoreError::Closed)));
        assert!(matches!(
            store.append(vec![op("a")]).await,
            Err(StoreError::Closed)
        ));
    }
}
