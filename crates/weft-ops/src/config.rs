//! Configuration for sessions, retries and the background sync task.

use crate::operation::Operation;
use crate::session::{Observer, SessionState};
use crate::transformer::TransformCache;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use weft_core::Change;

/// Retry policy for [`ReliableStore`](crate::ReliableStore).
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound on the delay between retries.
    pub max: Duration,
    /// Fraction of each delay that is randomised, in `0.0..=1.0`.
    pub jitter: f64,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Longest single wait inside `poll` before returning to the caller.
    pub poll_ceiling: Duration,
    /// Seed for the jitter source, for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(5),
            jitter: 0.5,
            max_attempts: None,
            poll_ceiling: Duration::from_secs(30),
            seed: None,
        }
    }
}

/// Options recognised by [`Session::new`](crate::Session::new).
#[derive(Clone)]
pub struct SessionConfig {
    /// Highest log version already reflected in the local stream.
    pub initial_version: i64,
    /// Operations authored but not yet acknowledged by the log.
    pub initial_pending: Vec<Operation>,
    /// Rebased form of each pending operation. Defaults to the raw changes.
    pub initial_merge_chain: Option<Vec<Option<Change>>>,
    /// Wrap the store in a [`Transformer`](crate::Transformer) sharing this cache.
    pub auto_transform: Option<TransformCache>,
    /// Wrap the store in [`NonBlocking`](crate::NonBlocking).
    pub non_blocking: bool,
    /// Called whenever the version, pending list or merge chain changes.
    pub notify: Option<Observer>,
    /// Wrap the raw store in [`ReliableStore`](crate::ReliableStore).
    pub backoff: Option<BackoffConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_version: -1,
            initial_pending: Vec::new(),
            initial_merge_chain: None,
            auto_transform: None,
            non_blocking: false,
            notify: None,
            backoff: None,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("initial_version", &self.initial_version)
            .field("initial_pending", &self.initial_pending.len())
            .field("auto_transform", &self.auto_transform.is_some())
            .field("non_blocking", &self.non_blocking)
            .field("notify", &self.notify.is_some())
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Builder for session configuration.
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn initial_version(mut self, version: i64) -> Self {
        self.config.initial_version = version;
        self
    }

    pub fn initial_pending(mut self, pending: Vec<Operation>) -> Self {
        self.config.initial_pending = pending;
        self
    }

    /// Seed everything from a saved [`SessionState`].
    pub fn resume(mut self, state: SessionState) -> Self {
        self.config.initial_version = state.version;
        self.config.initial_pending = state.pending;
        self.config.initial_merge_chain = Some(state.merge_chain);
        self
    }

    pub fn auto_transform(mut self, cache: TransformCache) -> Self {
        self.config.auto_transform = Some(cache);
        self
    }

    pub fn non_blocking(mut self, enabled: bool) -> Self {
        self.config.non_blocking = enabled;
        self
    }

    pub fn notify<F>(mut self, observer: F) -> Self
    where
        F: Fn(i64, &[Operation], &[Option<Change>]) + Send + Sync + 'static,
    {
        self.config.notify = Some(Arc::new(observer));
        self
    }

    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = Some(backoff);
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the background sync task.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// How often to push and fetch (in milliseconds).
    pub sync_interval_ms: u64,
    /// Maximum number of operations per fetch.
    pub batch_size: usize,
    /// How long a wait for remote operations may block (in milliseconds).
    pub poll_timeout_ms: u64,
    /// Enable the periodic push and fetch.
    pub auto_sync: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 1000,
            batch_size: 100,
            poll_timeout_ms: 5000,
            auto_sync: true,
        }
    }
}

/// Builder for sync configuration.
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    pub fn sync_interval(mut self, ms: u64) -> Self {
        self.config.sync_interval_ms = ms;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn poll_timeout(mut self, ms: u64) -> Self {
        self.config.poll_timeout_ms = ms;
        self
    }

    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.config.auto_sync = enabled;
        self
    }

    pub fn build(self) -> SyncConfig {
        self.config
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
