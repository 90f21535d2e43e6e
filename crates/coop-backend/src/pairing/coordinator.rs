//! Code issuance for new and re-pairing relays.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use super::{CodeGenerator, PairingError, RetryPolicy, bounded};
use crate::storage::{Relay, RelayFilter, RelayPatch, RelayStore};

/// A freshly issued code and the relay that now holds it.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub relay: Relay,
    /// `true` when the relay record was created by this call.
    pub created: bool,
}

#[derive(Clone)]
pub struct PairingCoordinator {
    store: Arc<dyn RelayStore>,
    codes: Arc<dyn CodeGenerator>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl PairingCoordinator {
    pub fn new(
        store: Arc<dyn RelayStore>,
        codes: Arc<dyn CodeGenerator>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            codes,
            retry,
            timeout,
        }
    }

    /// Issue a pending code. Without `relay_id` a new relay is created;
    /// with one, that relay starts a new pairing epoch. Blank ids count as
    /// absent.
    #[instrument(skip(self))]
    pub async fn request_code(&self, relay_id: Option<&str>) -> Result<IssuedCode, PairingError> {
        match relay_id.map(str::trim).filter(|id| !id.is_empty()) {
            None => self.issue_new().await,
            Some(id) => self.reissue(id).await,
        }
    }

    async fn issue_new(&self) -> Result<IssuedCode, PairingError> {
        let relay = self
            .retry
            .run(|attempt| async move {
                let code = self.codes.generate();
                tracing::debug!(attempt, "Inserting pending relay");
                bounded(
                    self.timeout,
                    "insert_pending",
                    self.store.insert_pending(code.as_str()),
                )
                .await
            })
            .await?;

        info!(relay_id = %relay.id, "Issued pairing code for new relay");
        Ok(IssuedCode {
            relay,
            created: true,
        })
    }

    async fn reissue(&self, relay_id: &str) -> Result<IssuedCode, PairingError> {
        let filter = RelayFilter::by_id(relay_id);
        let filter = &filter;

        let relay = self
            .retry
            .run(|attempt| async move {
                let patch = RelayPatch::restart_pairing(self.codes.generate().as_str());
                tracing::debug!(attempt, relay_id, "Restarting pairing");
                let outcome = bounded(
                    self.timeout,
                    "restart_pairing",
                    self.store.conditional_update(filter, &patch),
                )
                .await?;
                outcome
                    .into_single()
                    .ok_or_else(|| PairingError::NotFound(format!("relay {relay_id}")))
            })
            .await?;

        info!(relay_id = %relay.id, "Issued pairing code for existing relay");
        Ok(IssuedCode {
            relay,
            created: false,
        })
    }
}
