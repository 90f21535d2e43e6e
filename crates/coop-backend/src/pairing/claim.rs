//! Claiming a pending relay for the caller's coop.

use std::sync::Arc;
use std::time::Duration;

use coop_core::db::unix_millis;
use coop_proto::RelayStatus;
use tracing::{info, instrument};

use super::{PairingCode, PairingError, bounded};
use crate::storage::{MembershipDirectory, Relay, RelayFilter, RelayPatch, RelayStore};

#[derive(Clone)]
pub struct ClaimCoordinator {
    store: Arc<dyn RelayStore>,
    members: Arc<dyn MembershipDirectory>,
    timeout: Duration,
}

impl ClaimCoordinator {
    pub fn new(
        store: Arc<dyn RelayStore>,
        members: Arc<dyn MembershipDirectory>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            members,
            timeout,
        }
    }

    /// Bind the relay pending under `code` to the caller's coop.
    ///
    /// The update is guarded by `status = pending`, so of any number of
    /// concurrent claims on one code exactly one matches a row. Unknown,
    /// already claimed and superseded codes all come back as
    /// [`PairingError::NotFound`].
    #[instrument(skip(self, code))]
    pub async fn claim(&self, user_id: &str, code: &str) -> Result<Relay, PairingError> {
        let code = PairingCode::parse(code)?;

        let coop_id = bounded(
            self.timeout,
            "coop_for_user",
            self.members.coop_for_user(user_id),
        )
        .await?
        .ok_or(PairingError::NoCoopMembership)?;

        let filter = RelayFilter::by_code(code.as_str()).with_status(RelayStatus::Pending);
        let patch = RelayPatch::claim(coop_id.as_str(), unix_millis());
        let outcome = bounded(
            self.timeout,
            "claim",
            self.store.conditional_update(&filter, &patch),
        )
        .await?;

        let relay = outcome
            .into_single()
            .ok_or_else(|| PairingError::NotFound("pending relay for pairing code".into()))?;

        info!(relay_id = %relay.id, coop_id = %coop_id, "Relay claimed");
        Ok(relay)
    }
}
