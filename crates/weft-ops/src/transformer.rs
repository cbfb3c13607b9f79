//! Linearising the raw log.
//!
//! Clients author operations against whatever version they had seen
//! (`basis`) and on top of their own unacknowledged operations (`parent`).
//! The [`Transformer`] rewrites every operation so its change applies to the
//! state right after its predecessor in the log.
//!
//! Alongside each transformed operation it remembers a merge chain: the
//! later-arriving remote changes as seen by the author of that operation,
//! one per remote log entry between its basis and its own version. A child
//! operation starts from its parent's chain instead of re-deriving it.

use crate::error::StoreError;
use crate::operation::Operation;
use crate::store::Store;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use weft_core::{merge, Change};

/// A transformed operation plus the chain carrying its author to the
/// converged state.
#[derive(Clone, Debug, PartialEq)]
pub struct Transformed {
    pub op: Operation,
    /// `(log version, change)` for each remote entry the author had not
    /// seen, rebased past the author's own changes.
    pub merge_chain: Vec<(i64, Option<Change>)>,
}

/// Memo of transformed operations by version. Cloning shares the cache.
#[derive(Clone, Default)]
pub struct TransformCache(Arc<Mutex<HashMap<i64, Arc<Transformed>>>>);

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: i64) -> Option<Arc<Transformed>> {
        self.0.lock().get(&version).cloned()
    }

    fn insert(&self, entry: Arc<Transformed>) {
        self.0.lock().insert(entry.op.version, entry);
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

impl fmt::Debug for TransformCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Store wrapper whose `get_since` returns log-linearised operations.
pub struct Transformer<S> {
    inner: S,
    cache: TransformCache,
}

impl<S: Store> Transformer<S> {
    pub fn new(inner: S) -> Self {
        Self::with_cache(inner, TransformCache::new())
    }

    pub fn with_cache(inner: S, cache: TransformCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &TransformCache {
        &self.cache
    }

    /// Transform one stored operation, recursing into the operations it
    /// was authored concurrently with. The cache is only written once an
    /// entry is complete.
    pub fn transform(&self, op: Operation) -> BoxFuture<'_, Result<Arc<Transformed>, StoreError>> {
        async move {
            if let Some(hit) = self.cache.get(op.version) {
                return Ok(hit);
            }

            let gap = op.version - op.basis - 1;
            if gap <= 0 {
                let entry = Arc::new(Transformed {
                    op,
                    merge_chain: Vec::new(),
                });
                self.cache.insert(Arc::clone(&entry));
                return Ok(entry);
            }

            tracing::debug!(version = op.version, basis = op.basis, gap, "transform cache miss");
            let concurrent = self.inner.get_since(op.basis + 1, gap as usize).await?;
            if concurrent.len() as i64 != gap {
                return Err(StoreError::Unavailable(format!(
                    "short read: wanted {} ops after {}, got {}",
                    gap,
                    op.basis,
                    concurrent.len()
                )));
            }

            let mut change = op.change.clone();
            let mut chain = Vec::new();
            let mut start = 0;

            // Everything before the parent is already folded into the
            // parent's chain.
            let parent_at = op
                .parent
                .as_ref()
                .and_then(|p| concurrent.iter().position(|c| &c.id == p));
            if let Some(idx) = parent_at {
                let parent = self.transform(concurrent[idx].clone()).await?;
                for (version, link) in &parent.merge_chain {
                    if *version <= op.basis {
                        continue;
                    }
                    let (rebased, link) = merge(link.as_ref(), change.as_ref())?;
                    change = rebased;
                    chain.push((*version, link));
                }
                start = idx + 1;
            }

            for raw in &concurrent[start..] {
                let earlier = self.transform(raw.clone()).await?;
                let (rebased, link) = merge(earlier.op.change.as_ref(), change.as_ref())?;
                change = rebased;
                chain.push((raw.version, link));
            }

            let entry = Arc::new(Transformed {
                op: op.with_changes(change),
                merge_chain: chain,
            });
            self.cache.insert(Arc::clone(&entry));
            Ok(entry)
        }
        .boxed()
    }
}

#[async_trait]
impl<S: Store> Store for Transformer<S> {
    async fn append(&self, ops: Vec<Operation>) -> Result<(), StoreError> {
        self.inner.append(ops).await
    }

    async fn get_since(&self, version: i64, limit: usize) -> Result<Vec<Operation>, StoreError> {
        let raw = self.inner.get_since(version, limit).await?;
        let mut out = Vec::with_capacity(raw.len());
        for op in raw {
            out.push(self.transform(op).await?.op.clone());
        }
        Ok(out)
    }

    async fn poll(&self, version: i64) -> Result<(), StoreError> {
        self.inner.poll(version).await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}
