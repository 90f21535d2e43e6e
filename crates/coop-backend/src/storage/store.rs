//! Store interfaces consumed by the pairing coordinators.
//!
//! The relay store exposes conditional updates as a first-class operation:
//! a filter and a patch applied as one indivisible step, reporting how many
//! rows matched. Every state transition in the pairing protocol is written
//! as one of these, so concurrent writers expecting different prior states
//! cannot both succeed.

use async_trait::async_trait;
use coop_proto::RelayStatus;

use super::DatabaseError;
use super::models::Relay;

/// Row selector for reads and conditional updates. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayFilter {
    pub id: Option<String>,
    pub pairing_code: Option<String>,
    pub status: Option<RelayStatus>,
    /// Matches rows never seen, or last seen strictly before this instant.
    pub last_seen_before: Option<i64>,
}

impl RelayFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_code(code: impl Into<String>) -> Self {
        Self {
            pairing_code: Some(code.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: RelayStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn last_seen_before(mut self, at: i64) -> Self {
        self.last_seen_before = Some(at);
        self
    }

    /// A filter that selects a single relay by key. Updates are refused
    /// without one.
    pub const fn is_keyed(&self) -> bool {
        self.id.is_some() || self.pairing_code.is_some()
    }
}

/// Column changes applied by a conditional update. `None` leaves the
/// column alone; `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayPatch {
    pub pairing_code: Option<String>,
    pub status: Option<RelayStatus>,
    pub coop_id: Option<Option<String>>,
    pub paired_at: Option<Option<i64>>,
    pub interval: Option<Option<String>>,
    pub rtsp_url: Option<Option<String>>,
    pub last_seen_at: Option<i64>,
}

impl RelayPatch {
    /// Start a new pairing epoch under `code`.
    pub fn restart_pairing(code: impl Into<String>) -> Self {
        Self {
            pairing_code: Some(code.into()),
            status: Some(RelayStatus::Pending),
            coop_id: Some(None),
            paired_at: Some(None),
            ..Self::default()
        }
    }

    pub fn claim(coop_id: impl Into<String>, at: i64) -> Self {
        Self {
            status: Some(RelayStatus::Claimed),
            coop_id: Some(Some(coop_id.into())),
            paired_at: Some(Some(at)),
            ..Self::default()
        }
    }

    pub fn configure(interval: impl Into<String>, rtsp_url: Option<String>) -> Self {
        Self {
            interval: Some(Some(interval.into())),
            rtsp_url: Some(rtsp_url),
            ..Self::default()
        }
    }

    pub fn seen(at: i64) -> Self {
        Self {
            last_seen_at: Some(at),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Result of a conditional update: the rows that matched, as written.
#[derive(Debug, Clone, Default)]
pub struct UpdateOutcome {
    pub rows_affected: u64,
    pub relays: Vec<Relay>,
}

impl UpdateOutcome {
    /// The single updated relay, if exactly one row matched.
    pub fn into_single(self) -> Option<Relay> {
        if self.rows_affected == 1 {
            self.relays.into_iter().next()
        } else {
            None
        }
    }
}

#[async_trait]
pub trait RelayStore: Send + Sync {
    /// Insert a new pending relay holding `pairing_code`; the store assigns
    /// the id. A taken code yields [`DatabaseError::Conflict`].
    async fn insert_pending(&self, pairing_code: &str) -> Result<Relay, DatabaseError>;

    /// First relay matching `filter`, if any.
    async fn find_relay(&self, filter: &RelayFilter) -> Result<Option<Relay>, DatabaseError>;

    /// Apply `patch` to every row matching `filter` in one atomic statement.
    /// Zero matching rows is a normal outcome, not an error. A patch that
    /// would duplicate a pairing code yields [`DatabaseError::Conflict`].
    async fn conditional_update(
        &self,
        filter: &RelayFilter,
        patch: &RelayPatch,
    ) -> Result<UpdateOutcome, DatabaseError>;
}

#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// The coop the user acts for, or `None` when they belong to none.
    async fn coop_for_user(&self, user_id: &str) -> Result<Option<String>, DatabaseError>;
}
