//! The relay pairing protocol.
//!
//! [`PairingCoordinator`] issues codes, [`ClaimCoordinator`] binds a pending
//! relay to the caller's coop, and [`StatusReporter`] answers polls,
//! configuration lookups and heartbeats. All state lives in the store;
//! every transition is a single conditional update, so nothing here locks.

mod claim;
mod code;
mod coordinator;
mod error;
mod retry;
mod status;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

pub use claim::ClaimCoordinator;
#[cfg(test)]
pub(crate) use code::ScriptedCodes;
pub use code::{CODE_LENGTH, CodeGenerator, PairingCode, RandomCodeGenerator};
pub use coordinator::{IssuedCode, PairingCoordinator};
pub use error::PairingError;
pub use retry::RetryPolicy;
pub use status::StatusReporter;

use crate::storage::DatabaseError;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Await a store call for at most `limit`. Expiry is [`PairingError::Timeout`].
async fn bounded<T, F>(limit: Duration, op: &'static str, call: F) -> Result<T, PairingError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(PairingError::from),
        Err(_) => {
            tracing::warn!(op, timeout_ms = limit.as_millis(), "Store call timed out");
            Err(PairingError::Timeout(op))
        }
    }
}

/// Unix milliseconds as an RFC 3339 UTC string.
pub fn millis_to_rfc3339(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// RFC 3339 timestamp to Unix milliseconds.
pub fn rfc3339_to_millis(s: &str) -> Result<i64, PairingError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.timestamp_millis())
        .map_err(|e| PairingError::InvalidArgument(format!("invalid timestamp {s:?}: {e}")))
}
