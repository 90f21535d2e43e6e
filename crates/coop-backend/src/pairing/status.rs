//! Read-side of the protocol plus the two device-driven writes
//! (configuration and heartbeat).

use std::sync::Arc;
use std::time::Duration;

use coop_core::CaptureInterval;
use coop_core::db::unix_millis;
use coop_core::interval::{DEFAULT_PAIRING_INTERVAL, DEFAULT_RELAY_INTERVAL};
use coop_proto::{
    PairingConfigResponse, PairingStatusResponse, RelayConfigResponse, RelayStatus,
    RelayStatusResponse,
};
use tracing::{debug, instrument};

use super::{PairingCode, PairingError, bounded, millis_to_rfc3339, rfc3339_to_millis};
use crate::storage::{Relay, RelayFilter, RelayPatch, RelayStore};

#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn RelayStore>,
    timeout: Duration,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn RelayStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn find(&self, filter: &RelayFilter) -> Result<Option<Relay>, PairingError> {
        bounded(self.timeout, "find_relay", self.store.find_relay(filter)).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Relay, PairingError> {
        let code = PairingCode::parse(code)?;
        self.find(&RelayFilter::by_code(code.as_str()))
            .await?
            .ok_or_else(|| PairingError::NotFound("relay for pairing code".into()))
    }

    /// Poll by pairing code.
    #[instrument(skip(self, code))]
    pub async fn pairing_status(&self, code: &str) -> Result<PairingStatusResponse, PairingError> {
        let relay = self.find_by_code(code).await?;

        Ok(if relay.is_claimed() {
            PairingStatusResponse {
                status: RelayStatus::Claimed,
                relay_id: Some(relay.id),
                paired_at: relay.paired_at.and_then(millis_to_rfc3339),
            }
        } else {
            PairingStatusResponse {
                status: RelayStatus::Pending,
                relay_id: None,
                paired_at: None,
            }
        })
    }

    /// Operating configuration for a relay. Unknown and unclaimed relays get
    /// the default interval and no stream URL; only store failures are
    /// errors.
    #[instrument(skip(self))]
    pub async fn config_by_relay(&self, relay_id: &str) -> Result<RelayConfigResponse, PairingError> {
        let relay = self.find(&RelayFilter::by_id(relay_id)).await?;

        Ok(match relay {
            Some(relay) if relay.is_claimed() => RelayConfigResponse {
                interval: relay
                    .interval
                    .unwrap_or_else(|| DEFAULT_RELAY_INTERVAL.to_string()),
                rtsp_url: relay.rtsp_url,
            },
            _ => default_relay_config(),
        })
    }

    /// Configuration and claim state by pairing code. Claim fields are
    /// only filled once claimed.
    #[instrument(skip(self, code))]
    pub async fn config_by_code(&self, code: &str) -> Result<PairingConfigResponse, PairingError> {
        let relay = self.find_by_code(code).await?;

        if relay.is_claimed() {
            Ok(PairingConfigResponse {
                relay_id: relay.id,
                status: RelayStatus::Claimed,
                coop_id: relay.coop_id,
                interval: Some(
                    relay
                        .interval
                        .unwrap_or_else(|| DEFAULT_PAIRING_INTERVAL.to_string()),
                ),
                rtsp_url: relay.rtsp_url,
            })
        } else {
            Ok(PairingConfigResponse {
                relay_id: relay.id,
                status: relay.status,
                coop_id: None,
                interval: None,
                rtsp_url: None,
            })
        }
    }

    /// Store capture interval and stream URL. An empty URL clears it.
    #[instrument(skip(self, rtsp_url))]
    pub async fn set_config(
        &self,
        relay_id: &str,
        interval: &str,
        rtsp_url: Option<&str>,
    ) -> Result<Relay, PairingError> {
        let relay_id = required_relay_id(relay_id)?;
        if interval.trim().is_empty() {
            return Err(PairingError::InvalidArgument("interval is required".into()));
        }
        let interval: CaptureInterval = interval
            .parse()
            .map_err(|e: coop_core::IntervalError| PairingError::InvalidArgument(e.to_string()))?;
        let rtsp_url = rtsp_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        let patch = RelayPatch::configure(interval.to_string(), rtsp_url);
        let outcome = bounded(
            self.timeout,
            "configure",
            self.store
                .conditional_update(&RelayFilter::by_id(relay_id), &patch),
        )
        .await?;

        outcome
            .into_single()
            .ok_or_else(|| PairingError::NotFound(format!("relay {relay_id}")))
    }

    /// Record a heartbeat at `seen_at` (RFC 3339) or now. Only moves
    /// `last_seen_at` forward; returns whether it moved. Unknown relays are
    /// rejected as invalid input.
    #[instrument(skip(self))]
    pub async fn heartbeat(
        &self,
        relay_id: &str,
        seen_at: Option<&str>,
    ) -> Result<bool, PairingError> {
        let relay_id = required_relay_id(relay_id)?;
        let at = match seen_at.map(str::trim).filter(|s| !s.is_empty()) {
            Some(ts) => rfc3339_to_millis(ts)?,
            None => unix_millis(),
        };

        let filter = RelayFilter::by_id(relay_id).last_seen_before(at);
        let outcome = bounded(
            self.timeout,
            "heartbeat",
            self.store.conditional_update(&filter, &RelayPatch::seen(at)),
        )
        .await?;
        if outcome.rows_affected > 0 {
            return Ok(true);
        }

        // Nothing matched: either a stale heartbeat or no such relay.
        if self.find(&RelayFilter::by_id(relay_id)).await?.is_none() {
            return Err(PairingError::InvalidArgument(format!(
                "unknown relay {relay_id}"
            )));
        }
        debug!(at, "Ignoring heartbeat older than last_seen_at");
        Ok(false)
    }

    /// Liveness summary for one relay.
    #[instrument(skip(self))]
    pub async fn read_status(&self, relay_id: &str) -> Result<RelayStatusResponse, PairingError> {
        let relay_id = required_relay_id(relay_id)?;
        let relay = self
            .find(&RelayFilter::by_id(relay_id))
            .await?
            .ok_or_else(|| PairingError::NotFound(format!("relay {relay_id}")))?;

        Ok(RelayStatusResponse {
            relay_id: relay.id,
            status: relay.status,
            paired_at: relay.paired_at.and_then(millis_to_rfc3339),
            last_seen_at: relay.last_seen_at.and_then(millis_to_rfc3339),
            interval: relay
                .interval
                .unwrap_or_else(|| DEFAULT_RELAY_INTERVAL.to_string()),
        })
    }
}

fn default_relay_config() -> RelayConfigResponse {
    RelayConfigResponse {
        interval: DEFAULT_RELAY_INTERVAL.to_string(),
        rtsp_url: None,
    }
}

fn required_relay_id(relay_id: &str) -> Result<&str, PairingError> {
    let relay_id = relay_id.trim();
    if relay_id.is_empty() {
        return Err(PairingError::InvalidArgument("relay_id is required".into()));
    }
    Ok(relay_id)
}
