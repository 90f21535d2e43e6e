//! Errors raised by the pairing coordinators.

use crate::storage::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("caller does not belong to a coop")]
    NoCoopMembership,

    #[error("no free pairing code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    #[error("store call {0} timed out")]
    Timeout(&'static str),

    #[error("store error: {0}")]
    Store(DatabaseError),
}

impl PairingError {
    /// A uniqueness conflict reported by the store.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }
}

impl From<DatabaseError> for PairingError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}
