//! Bounded retry for code issuance.

use std::future::Future;

use tracing::debug;

use super::PairingError;

/// Retries an operation while `retry_on` accepts its error, at most
/// `max_attempts` times in total. Every other error ends the loop at once.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_on: fn(&PairingError) -> bool,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(max_attempts: u32, retry_on: fn(&PairingError) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_on,
        }
    }

    /// Retry only on a store uniqueness conflict.
    pub fn on_conflict(max_attempts: u32) -> Self {
        Self::new(max_attempts, PairingError::is_conflict)
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` with the 1-based attempt number. Exhaustion yields
    /// [`PairingError::CodeSpaceExhausted`].
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, PairingError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, PairingError>>,
    {
        for attempt in 1..=self.max_attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if (self.retry_on)(&e) => {
                    debug!(attempt, error = %e, "Retryable failure");
                }
                Err(e) => return Err(e),
            }
        }
        Err(PairingError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::on_conflict(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::storage::DatabaseError;

    fn conflict() -> PairingError {
        DatabaseError::Conflict("UNIQUE constraint failed: relays.pairing_code".into()).into()
    }

    #[tokio::test]
    async fn succeeds_after_conflicts() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::on_conflict(5)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { if attempt < 3 { Err(conflict()) } else { Ok(attempt) } }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_is_reported() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::on_conflict(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(conflict()) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PairingError::CodeSpaceExhausted { attempts: 5 }));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn timeout_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::on_conflict(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(PairingError::Timeout("insert_pending")) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PairingError::Timeout(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(PairingError::NotFound("relay r1".into())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PairingError::NotFound(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::on_conflict(0).max_attempts(), 1);
    }
}
