//! A store wrapper that retries transient failures.

use crate::config::BackoffConfig;
use crate::error::StoreError;
use crate::operation::Operation;
use crate::store::Store;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::time::Duration;

/// Exponential delay sequence, doubling up to a ceiling.
#[derive(Clone, Debug)]
struct Backoff {
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(config: &BackoffConfig) -> Self {
        Self {
            max: config.max,
            current: config.initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.checked_mul(2).unwrap_or(self.max);
        self.current = std::cmp::min(next, self.max);
        delay
    }
}

/// Retries [`StoreError::Unavailable`] with exponential backoff and jitter.
///
/// `append` is safe to retry because stores drop duplicate ids. `poll` is
/// additionally capped at [`BackoffConfig::poll_ceiling`]; hitting the cap
/// counts as a spurious wakeup.
pub struct ReliableStore<S> {
    inner: S,
    config: BackoffConfig,
    rng: Mutex<StdRng>,
}

impl<S: Store> ReliableStore<S> {
    pub fn new(inner: S, config: BackoffConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            inner,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn jittered(&self, delay: Duration) -> Duration {
        let jitter = self.config.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return delay;
        }
        let roll: f64 = self.rng.lock().gen();
        delay.mul_f64(1.0 - jitter * roll)
    }

    async fn retry<T, F, Fut>(&self, call: &'static str, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut backoff = Backoff::new(&self.config);
        let mut attempt = 1u32;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && self.may_retry(attempt) => {
                    let delay = self.jittered(backoff.next_delay());
                    tracing::warn!(
                        call,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "store call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn may_retry(&self, attempt: u32) -> bool {
        self.config.max_attempts.map_or(true, |max| attempt < max)
    }
}

#[async_trait]
impl<S: Store> Store for ReliableStore<S> {
    async fn append(&self, ops: Vec<Operation>) -> Result<(), StoreError> {
        self.retry("append", || self.inner.append(ops.clone())).await
    }

    async fn get_since(&self, version: i64, limit: usize) -> Result<Vec<Operation>, StoreError> {
        self.retry("get_since", || self.inner.get_since(version, limit))
            .await
    }

    async fn poll(&self, version: i64) -> Result<(), StoreError> {
        let polled = self.retry("poll", || self.inner.poll(version));
        match tokio::time::timeout(self.config.poll_ceiling, polled).await {
            Ok(result) => result,
            Err(_) => {
                tracing::trace!(version, "poll ceiling reached");
                Ok(())
            }
        }
    }

    async fn close(&self) {
        self.inner.close().await
    }
}
