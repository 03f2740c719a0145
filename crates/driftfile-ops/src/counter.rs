//! Per-view count of in-flight file operations.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::OpsError;

/// Counts the background jobs a view is waiting on.
///
/// Clones share the same count. Waiters are woken through a watch channel
/// when the count returns to zero, so nothing has to spin on it.
#[derive(Debug, Clone)]
pub struct OpCounter {
    tx: Arc<watch::Sender<usize>>,
}

impl Default for OpCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl OpCounter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Number of operations in flight.
    pub fn count(&self) -> usize {
        *self.tx.borrow()
    }

    /// True when nothing is in flight.
    pub fn is_quiescent(&self) -> bool {
        self.count() == 0
    }

    pub fn increment(&self) {
        self.tx.send_modify(|n| *n += 1);
    }

    /// Decrement the count. Going below zero is a bookkeeping bug: it panics
    /// in debug builds and is clamped (and logged) in release builds.
    pub fn decrement(&self) {
        let decremented = self.tx.send_if_modified(|n| {
            if *n == 0 {
                false
            } else {
                *n -= 1;
                true
            }
        });
        if !decremented {
            tracing::error!("operation counter decremented below zero");
            if cfg!(debug_assertions) {
                panic!("operation counter decremented below zero");
            }
        }
    }

    /// Refuse with [`OpsError::Busy`] unless quiescent.
    pub fn ensure_quiescent(&self) -> Result<(), OpsError> {
        match self.count() {
            0 => Ok(()),
            pending => Err(OpsError::Busy { pending }),
        }
    }

    /// Resolve once the count is zero, or fail after `timeout`.
    ///
    /// Only useful when job events are being dispatched elsewhere; on a
    /// single-threaded loop use the engine's pumping wait instead.
    pub async fn wait_until_quiescent(&self, timeout: Duration) -> Result<(), OpsError> {
        let mut rx = self.tx.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await {
            Ok(_) => Ok(()),
            Err(_) => Err(OpsError::Timeout {
                pending: self.count(),
            }),
        }
    }

    /// Resolve once the count is zero, or fail when `cancel` fires.
    pub async fn wait_or_cancel(&self, cancel: &CancellationToken) -> Result<(), OpsError> {
        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = rx.wait_for(|n| *n == 0) => Ok(()),
            _ = cancel.cancelled() => Err(OpsError::Cancelled),
        }
    }
}

/// Holds one counted operation and releases it on drop, so the count is
/// restored even if the code holding it panics.
#[derive(Debug)]
pub struct OpGuard {
    counter: OpCounter,
}

impl OpGuard {
    /// Count a new operation.
    pub fn start(counter: &OpCounter) -> Self {
        counter.increment();
        Self {
            counter: counter.clone(),
        }
    }

    /// Take over an operation that was already counted.
    pub fn adopt(counter: OpCounter) -> Self {
        Self { counter }
    }
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        self.counter.decrement();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_decrement() {
        let counter = OpCounter::new();
        let shared = counter.clone();
        assert!(counter.is_quiescent());

        counter.increment();
        shared.increment();
        assert_eq!(counter.count(), 2);
        assert!(matches!(counter.ensure_quiescent(), Err(OpsError::Busy { pending: 2 })));

        shared.decrement();
        counter.decrement();
        assert!(counter.is_quiescent());
        assert!(counter.ensure_quiescent().is_ok());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "below zero")]
    fn test_underflow_panics_in_debug() {
        OpCounter::new().decrement();
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let counter = OpCounter::new();
        let inner = counter.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = OpGuard::start(&inner);
            panic!("handler failed");
        }));
        assert!(result.is_err());
        assert!(counter.is_quiescent());
    }

    #[tokio::test]
    async fn test_wait_resolves_at_zero() {
        let counter = OpCounter::new();
        counter.increment();

        let background = counter.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            background.decrement();
        });

        counter
            .wait_until_quiescent(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(counter.count(), 0);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let counter = OpCounter::new();
        counter.increment();
        let err = counter
            .wait_until_quiescent(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::Timeout { pending: 1 }));
        counter.decrement();
    }

    #[tokio::test]
    async fn test_wait_can_be_cancelled() {
        let counter = OpCounter::new();
        counter.increment();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            counter.wait_or_cancel(&token).await,
            Err(OpsError::Cancelled)
        ));
        counter.decrement();
    }
}
