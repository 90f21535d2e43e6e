//! Database queries for the coop backend.

use async_trait::async_trait;
use coop_core::db::unix_millis;
use sqlx::{QueryBuilder, Sqlite};

use super::db::BackendDatabase;
use super::models::{Coop, CoopMember, Relay, RelayRow};
use super::store::{MembershipDirectory, RelayFilter, RelayPatch, RelayStore, UpdateOutcome};
use super::DatabaseError;

/// Append `WHERE ...` for every set field of `filter`.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RelayFilter) {
    let mut first = true;

    if let Some(id) = &filter.id {
        push_conjunction(qb, &mut first);
        qb.push("id = ").push_bind(id.clone());
    }
    if let Some(code) = &filter.pairing_code {
        push_conjunction(qb, &mut first);
        qb.push("pairing_code = ").push_bind(code.clone());
    }
    if let Some(status) = filter.status {
        push_conjunction(qb, &mut first);
        qb.push("status = ").push_bind(status.as_str());
    }
    if let Some(before) = filter.last_seen_before {
        push_conjunction(qb, &mut first);
        qb.push("(last_seen_at IS NULL OR last_seen_at < ")
            .push_bind(before)
            .push(")");
    }
}

fn push_conjunction(qb: &mut QueryBuilder<'_, Sqlite>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

fn rows_to_relays(rows: Vec<RelayRow>) -> Result<Vec<Relay>, DatabaseError> {
    rows.into_iter().map(Relay::try_from).collect()
}

impl BackendDatabase {
    // =========================================================================
    // Relay queries
    // =========================================================================

    /// Get a relay by ID.
    pub async fn get_relay(&self, id: &str) -> Result<Relay, DatabaseError> {
        sqlx::query_as::<_, RelayRow>("SELECT * FROM relays WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Relay {id}")))?
            .try_into()
    }

    /// Count relays currently holding `pairing_code`.
    pub async fn count_relays_with_code(&self, pairing_code: &str) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM relays WHERE pairing_code = ?")
            .bind(pairing_code)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Coop queries
    // =========================================================================

    /// Create a coop.
    pub async fn create_coop(&self, id: &str, name: &str) -> Result<Coop, DatabaseError> {
        let now = unix_millis();

        sqlx::query("INSERT INTO coops (id, name, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(Coop {
            id: id.to_string(),
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Add a user to a coop.
    pub async fn add_coop_member(
        &self,
        user_id: &str,
        coop_id: &str,
    ) -> Result<CoopMember, DatabaseError> {
        let now = unix_millis();

        sqlx::query("INSERT INTO coop_members (user_id, coop_id, joined_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(coop_id)
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(CoopMember {
            user_id: user_id.to_string(),
            coop_id: coop_id.to_string(),
            joined_at: now,
        })
    }
}

#[async_trait]
impl RelayStore for BackendDatabase {
    async fn insert_pending(&self, pairing_code: &str) -> Result<Relay, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = unix_millis();

        let row = sqlx::query_as::<_, RelayRow>(
            "INSERT INTO relays (id, pairing_code, status, created_at) VALUES (?, ?, 'pending', ?) RETURNING *",
        )
        .bind(&id)
        .bind(pairing_code)
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    async fn find_relay(&self, filter: &RelayFilter) -> Result<Option<Relay>, DatabaseError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM relays");
        push_filter(&mut qb, filter);
        qb.push(" LIMIT 1");

        qb.build_query_as::<RelayRow>()
            .fetch_optional(self.pool())
            .await?
            .map(Relay::try_from)
            .transpose()
    }

    async fn conditional_update(
        &self,
        filter: &RelayFilter,
        patch: &RelayPatch,
    ) -> Result<UpdateOutcome, DatabaseError> {
        if !filter.is_keyed() {
            return Err(DatabaseError::Query(
                "conditional update requires an id or pairing_code filter".into(),
            ));
        }
        if patch.is_empty() {
            // Nothing to write; still report which rows the filter matches.
            let relays = self.find_relay(filter).await?.into_iter().collect::<Vec<_>>();
            return Ok(UpdateOutcome {
                rows_affected: relays.len() as u64,
                relays,
            });
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE relays SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(code) = &patch.pairing_code {
                set.push("pairing_code = ").push_bind_unseparated(code.clone());
            }
            if let Some(status) = patch.status {
                set.push("status = ").push_bind_unseparated(status.as_str());
            }
            if let Some(coop_id) = &patch.coop_id {
                set.push("coop_id = ").push_bind_unseparated(coop_id.clone());
            }
            if let Some(paired_at) = patch.paired_at {
                set.push("paired_at = ").push_bind_unseparated(paired_at);
            }
            if let Some(interval) = &patch.interval {
                set.push("capture_interval = ")
                    .push_bind_unseparated(interval.clone());
            }
            if let Some(rtsp_url) = &patch.rtsp_url {
                set.push("rtsp_url = ").push_bind_unseparated(rtsp_url.clone());
            }
            if let Some(seen) = patch.last_seen_at {
                set.push("last_seen_at = ").push_bind_unseparated(seen);
            }
        }
        push_filter(&mut qb, filter);
        qb.push(" RETURNING *");

        let rows = qb
            .build_query_as::<RelayRow>()
            .fetch_all(self.pool())
            .await?;
        let relays = rows_to_relays(rows)?;

        Ok(UpdateOutcome {
            rows_affected: relays.len() as u64,
            relays,
        })
    }
}

#[async_trait]
impl MembershipDirectory for BackendDatabase {
    async fn coop_for_user(&self, user_id: &str) -> Result<Option<String>, DatabaseError> {
        let coop_id = sqlx::query_scalar::<_, String>(
            "SELECT coop_id FROM coop_members WHERE user_id = ? ORDER BY joined_at ASC, coop_id ASC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(coop_id)
    }
}
