//! Data models for coop backend storage.

use coop_proto::RelayStatus;
use serde::{Deserialize, Serialize};

use super::DatabaseError;

/// Raw `relays` row as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RelayRow {
    pub id: String,
    pub pairing_code: String,
    pub status: String,
    pub coop_id: Option<String>,
    pub capture_interval: Option<String>,
    pub rtsp_url: Option<String>,
    pub created_at: i64,
    pub paired_at: Option<i64>,
    pub last_seen_at: Option<i64>,
}

/// One physical relay registration. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub id: String,
    pub pairing_code: String,
    pub status: RelayStatus,
    pub coop_id: Option<String>,
    pub interval: Option<String>,
    pub rtsp_url: Option<String>,
    pub created_at: i64,
    pub paired_at: Option<i64>,
    pub last_seen_at: Option<i64>,
}

impl Relay {
    pub const fn is_claimed(&self) -> bool {
        matches!(self.status, RelayStatus::Claimed)
    }
}

impl TryFrom<RelayRow> for Relay {
    type Error = DatabaseError;

    fn try_from(row: RelayRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| DatabaseError::Query(format!("relay {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            pairing_code: row.pairing_code,
            status,
            coop_id: row.coop_id,
            interval: row.capture_interval,
            rtsp_url: row.rtsp_url,
            created_at: row.created_at,
            paired_at: row.paired_at,
            last_seen_at: row.last_seen_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coop {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoopMember {
    pub user_id: String,
    pub coop_id: String,
    pub joined_at: i64,
}
