//! Background sync task.
//!
//! [`spawn`] moves a [`Session`] and the document value into a single tokio
//! task. The host talks to it through a [`SyncHandle`]; every edit, sync
//! and snapshot is a job on one channel, so the session and its stream only
//! ever see one caller.

use crate::config::SyncConfig;
use crate::error::{OpsError, Result};
use crate::session::{Session, SessionState};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use weft_core::{Change, Value};
use weft_stream::Stream;

enum Job {
    Edit(Change, oneshot::Sender<Result<()>>),
    Sync(oneshot::Sender<Result<usize>>),
    AwaitRemote(oneshot::Sender<Result<usize>>),
    Snapshot(oneshot::Sender<Result<Value>>),
    State(oneshot::Sender<SessionState>),
    Close,
}

/// Host-side handle to a running sync task.
pub struct SyncHandle {
    jobs: mpsc::Sender<Job>,
    task: JoinHandle<()>,
}

/// Start a sync task. `value` must be the document state at the session's
/// stream cursor.
pub fn spawn(session: Session, value: Value, config: SyncConfig) -> SyncHandle {
    let (tx, rx) = mpsc::channel(64);
    let worker = Worker {
        cursor: session.stream().clone(),
        session,
        value,
        config,
    };
    SyncHandle {
        jobs: tx,
        task: tokio::spawn(worker.run(rx)),
    }
}

impl SyncHandle {
    /// Apply a local edit to the document.
    pub async fn edit(&self, change: Change) -> Result<()> {
        self.call(|reply| Job::Edit(change, reply)).await?
    }

    /// Push local edits and fetch one batch from the log.
    pub async fn sync(&self) -> Result<usize> {
        self.call(Job::Sync).await?
    }

    /// Wait (up to the poll timeout) for remote operations, then fetch.
    pub async fn await_remote(&self) -> Result<usize> {
        self.call(Job::AwaitRemote).await?
    }

    /// Current document value, including every change fetched so far.
    pub async fn snapshot(&self) -> Result<Value> {
        self.call(Job::Snapshot).await?
    }

    pub async fn state(&self) -> Result<SessionState> {
        self.call(Job::State).await
    }

    /// Stop the task and close the session's store.
    pub async fn close(self) {
        let _ = self.jobs.send(Job::Close).await;
        let _ = self.task.await;
    }

    async fn call<T>(&self, job: impl FnOnce(oneshot::Sender<T>) -> Job) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.jobs.send(job(tx)).await.map_err(|_| OpsError::Closed)?;
        rx.await.map_err(|_| OpsError::Closed)
    }
}

struct Worker {
    session: Session,
    /// Where the next local edit goes. `value` is the state at this node.
    cursor: Stream,
    value: Value,
    config: SyncConfig,
}

impl Worker {
    async fn run(mut self, mut jobs: mpsc::Receiver<Job>) {
        let period = Duration::from_millis(self.config.sync_interval_ms.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(Job::Close) | None => break,
                    Some(job) => self.handle(job).await,
                },
                _ = ticker.tick(), if self.config.auto_sync => {
                    if let Err(e) = self.sync().await {
                        tracing::warn!(error = %e, retryable = e.is_retryable(), "background sync failed");
                    }
                }
            }
        }
        self.session.close().await;
        tracing::debug!(version = self.session.version(), "sync task stopped");
    }

    async fn handle(&mut self, job: Job) {
        match job {
            Job::Edit(change, reply) => {
                let _ = reply.send(self.edit(change));
            }
            Job::Sync(reply) => {
                let _ = reply.send(self.sync().await);
            }
            Job::AwaitRemote(reply) => {
                let _ = reply.send(self.await_remote().await);
            }
            Job::Snapshot(reply) => {
                let _ = reply.send(self.catch_up().map(|_| self.value.clone()));
            }
            Job::State(reply) => {
                let _ = reply.send(self.session.state());
            }
            Job::Close => {}
        }
    }

    fn edit(&mut self, change: Change) -> Result<()> {
        self.catch_up()?;
        let value = self.value.apply(&change)?;
        self.cursor = self.cursor.append(change)?;
        self.value = value;
        Ok(())
    }

    async fn sync(&mut self) -> Result<usize> {
        self.session.push().await?;
        let fetched = self.session.fetch(self.config.batch_size).await?;
        self.catch_up()?;
        Ok(fetched)
    }

    async fn await_remote(&mut self) -> Result<usize> {
        let timeout = Duration::from_millis(self.config.poll_timeout_ms);
        // Timing out is just an empty round.
        if let Ok(polled) = tokio::time::timeout(timeout, self.session.poll()).await {
            polled?;
        }
        self.sync().await
    }

    /// Fold changes that landed after the cursor into `value`.
    fn catch_up(&mut self) -> Result<()> {
        while let Some((change, next)) = self.cursor.next() {
            if let Some(change) = change {
                self.value = self.value.apply(&change)?;
            }
            self.cursor = next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfigBuilder;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn manual() -> SyncConfig {
        SyncConfigBuilder::new()
            .auto_sync(false)
            .poll_timeout(200)
            .build()
    }

    #[tokio::test]
    async fn test_edits_reach_the_log() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::with_defaults(Arc::clone(&store), Stream::new());
        let handle = spawn(session, Value::text(""), manual());

        handle.edit(Change::insert(0, Value::text("hi"))).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap(), Value::text("hi"));
        assert!(store.is_empty());

        handle.sync().await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(handle.state().await.unwrap().pending.is_empty());
        handle.close().await;
    }

    #[tokio::test]
    async fn test_illegal_edit_is_rejected() {
        let session = Session::with_defaults(MemoryStore::new(), Stream::new());
        let handle = spawn(session, Value::atomic(1), manual());

        let err = handle
            .edit(Change::insert(0, Value::text("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::Change(_)));
        assert_eq!(handle.snapshot().await.unwrap(), Value::atomic(1));
        handle.close().await;
    }

    #[tokio::test]
    async fn test_auto_sync_pushes_in_background() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::with_defaults(Arc::clone(&store), Stream::new());
        let config = SyncConfigBuilder::new().sync_interval(5).build();
        let handle = spawn(session, Value::text(""), config);

        handle.edit(Change::insert(0, Value::text("x"))).await.unwrap();
        for _ in 0..100 {
            if store.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.len(), 1);
        handle.close().await;
    }

    #[tokio::test]
    async fn test_calls_after_close_fail() {
        let session = Session::with_defaults(MemoryStore::new(), Stream::new());
        let handle = spawn(session, Value::text(""), manual());
        let jobs = handle.jobs.clone();
        handle.close().await;

        let (tx, _rx) = oneshot::channel();
        assert!(jobs.send(Job::Sync(tx)).await.is_err());
    }
}
