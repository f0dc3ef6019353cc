//! Bounded retry for optimistic-lock conflicts.
//!
//! An operation performs one conditional update per call and reports
//! [`AttemptError::VersionConflict`] when the update matched zero rows. The
//! executor re-runs it after a fixed backoff until it succeeds or the attempt
//! budget is spent.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::DomainError;
use crate::repo::RepoError;

/// `max_attempts` counts every call of the operation, the first one included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: Duration::from_millis(100) }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_attempts = std::env::var("BOARD_RETRY_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_attempts);
        let backoff = std::env::var("BOARD_RETRY_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff);
        Self { max_attempts, backoff }
    }
}

/// Failure of a single attempt.
#[derive(thiserror::Error, Debug)]
pub enum AttemptError {
    /// The conditional update affected zero rows.
    #[error("version conflict")]
    VersionConflict,
    #[error(transparent)]
    Fatal(#[from] DomainError),
}

impl From<RepoError> for AttemptError {
    fn from(e: RepoError) -> Self {
        AttemptError::Fatal(e.into())
    }
}

/// Holds configuration only; nothing is remembered between `execute` calls.
#[derive(Clone, Debug)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    shutdown: Option<watch::Receiver<bool>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, shutdown: None }
    }

    /// A `true` on this channel aborts any backoff wait with `Interrupted`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `op` until it succeeds, fails fatally, or `max_attempts` conflicts
    /// have been observed. `label` names the mutation in logs and metrics.
    pub async fn execute<T, F, Fut>(&self, label: &'static str, mut op: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::VersionConflict) => {
                    metrics::counter!("board_version_conflicts_total", "counter" => label).increment(1);
                    if attempt >= max_attempts {
                        warn!(label, attempt, "version conflict persisted past retry bound");
                        metrics::counter!("board_concurrent_modifications_total", "counter" => label)
                            .increment(1);
                        return Err(DomainError::ConcurrentModification(format!(
                            "{label} was modified concurrently; gave up after {attempt} attempts"
                        )));
                    }
                    let backoff_ms = self.policy.backoff.as_millis() as u64;
                    debug!(label, attempt, backoff_ms, "version conflict, backing off");
                    self.backoff(label).await?;
                }
            }
        }
    }

    async fn backoff(&self, label: &'static str) -> Result<(), DomainError> {
        let Some(shutdown) = self.shutdown.clone() else {
            tokio::time::sleep(self.policy.backoff).await;
            return Ok(());
        };
        tokio::select! {
            _ = tokio::time::sleep(self.policy.backoff) => Ok(()),
            _ = stop_requested(shutdown) => {
                warn!(label, "retry interrupted during backoff");
                Err(DomainError::Interrupted(format!("{label} retry was interrupted")))
            }
        }
    }
}

/// Resolves once `true` is observed; never resolves if the sender is gone.
async fn stop_requested(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryPolicy {
        RetryPolicy { max_attempts: 3, backoff: Duration::from_millis(1) }
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let out = RetryExecutor::new(fast())
            .execute("test", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, AttemptError>(7)
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn conflict_then_success_takes_two_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        RetryExecutor::new(fast())
            .execute("test", || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(AttemptError::VersionConflict)
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhaustion_is_concurrent_modification() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = RetryExecutor::new(fast())
            .execute("test", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AttemptError::VersionConflict)
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConcurrentModification(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = RetryExecutor::new(fast())
            .execute("test", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AttemptError::from(RepoError::NotFound))
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Repo(RepoError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_during_backoff_interrupts() {
        let (tx, rx) = watch::channel(false);
        let policy = RetryPolicy { max_attempts: 3, backoff: Duration::from_secs(60) };
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let exec = RetryExecutor::new(policy).with_shutdown(rx);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });
        let err = exec
            .execute("test", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AttemptError::VersionConflict)
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Interrupted(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_does_not_interrupt() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        RetryExecutor::new(fast())
            .with_shutdown(rx)
            .execute("test", || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(AttemptError::VersionConflict)
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn defaults_are_three_attempts_with_100ms_backoff() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.backoff, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn zero_attempt_policy_still_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = RetryExecutor::new(RetryPolicy { max_attempts: 0, backoff: Duration::from_millis(1) })
            .execute("test", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AttemptError::VersionConflict)
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConcurrentModification(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
