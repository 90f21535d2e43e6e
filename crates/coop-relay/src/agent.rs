//! Device-side pairing state machine.
//!
//! Unpaired: obtain a pairing code and poll the backend by code until an
//! operator claims it in the coop app. Paired: refresh the configuration
//! by relay id and send a heartbeat every capture interval. Network errors
//! are logged and retried on the next tick; they never stop the agent.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use coop_core::interval::{DEFAULT_RELAY_INTERVAL, parse_interval};
use coop_proto::{RelayConfigResponse, RelayStatus};
use tracing::{debug, info, warn};

use crate::client::BackendClient;
use crate::state::AgentState;

/// Fallback cadence when the backend hands out an unusable interval.
const FALLBACK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Where the agent persists its relay id and pending code.
    pub state_path: PathBuf,
    /// Relay id to use when the state file has none.
    pub seed_relay_id: Option<String>,
    /// Delay between pairing polls and after failed requests.
    pub poll_interval: Duration,
    /// Pair if needed, run a single config + heartbeat cycle, then stop.
    pub once: bool,
    /// Start a new pairing epoch even if already claimed.
    pub repair: bool,
}

pub struct Agent {
    client: BackendClient,
    config: AgentConfig,
    state: AgentState,
    current: Option<RelayConfigResponse>,
}

impl Agent {
    pub fn new(client: BackendClient, config: AgentConfig) -> Self {
        let mut state = AgentState::load(&config.state_path);
        if state.relay_id.is_none() {
            state.relay_id.clone_from(&config.seed_relay_id);
        }
        Self {
            client,
            config,
            state,
            current: None,
        }
    }

    pub const fn state(&self) -> &AgentState {
        &self.state
    }

    /// Configuration last received from the backend.
    pub const fn current_config(&self) -> Option<&RelayConfigResponse> {
        self.current.as_ref()
    }

    /// Run until `shutdown` resolves, or after one cycle in `once` mode.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        tokio::select! {
            result = self.drive() => result,
            () = shutdown => {
                info!("Agent shutting down");
                Ok(())
            }
        }
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        if self.config.repair || !self.state.claimed {
            self.pair().await?;
        }
        loop {
            let next = self.cycle().await;
            if self.config.once {
                return Ok(());
            }
            tokio::time::sleep(next).await;
        }
    }

    /// Obtain a code if needed and poll until the relay is claimed.
    pub async fn pair(&mut self) -> anyhow::Result<()> {
        let mut force_new = self.config.repair;

        loop {
            if force_new || self.state.pairing_code.is_none() {
                if !self.request_code().await? {
                    tokio::time::sleep(self.config.poll_interval).await;
                    continue;
                }
                force_new = false;
            }

            let Some(code) = self.state.pairing_code.clone() else {
                continue;
            };
            match self.client.config_by_code(&code).await {
                Ok(cfg) if cfg.status == RelayStatus::Claimed => {
                    info!(relay_id = %cfg.relay_id, coop_id = ?cfg.coop_id, "Relay claimed");
                    self.state.relay_id = Some(cfg.relay_id);
                    self.state.pairing_code = None;
                    self.state.claimed = true;
                    self.save()?;
                    return Ok(());
                }
                Ok(_) => debug!("Waiting for claim"),
                Err(e) if e.is_not_found() => {
                    info!("Pairing code is no longer valid; requesting a new one");
                    self.state.pairing_code = None;
                    continue;
                }
                Err(e) => warn!(error = %e, "Pairing poll failed"),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Returns `false` on a transient failure worth retrying later.
    async fn request_code(&mut self) -> anyhow::Result<bool> {
        match self
            .client
            .request_pairing_code(self.state.relay_id.as_deref())
            .await
        {
            Ok(issued) => {
                info!(
                    relay_id = %issued.relay_id,
                    pairing_code = %issued.pairing_code,
                    "Enter this pairing code in the coop app"
                );
                self.state.relay_id = Some(issued.relay_id);
                self.state.pairing_code = Some(issued.pairing_code);
                self.state.claimed = false;
                self.save()?;
                Ok(true)
            }
            Err(e) if e.is_not_found() && self.state.relay_id.is_some() => {
                warn!("Backend does not know this relay; registering as a new one");
                self.state.relay_id = None;
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Pairing code request failed");
                Ok(false)
            }
        }
    }

    /// One paired tick: refresh configuration, then heartbeat. Returns the
    /// delay until the next tick.
    pub async fn cycle(&mut self) -> Duration {
        let Some(relay_id) = self.state.relay_id.clone() else {
            return self.config.poll_interval;
        };

        match self.client.config_by_relay(&relay_id).await {
            Ok(cfg) => {
                if self.current.as_ref() != Some(&cfg) {
                    info!(interval = %cfg.interval, rtsp_url = ?cfg.rtsp_url, "Configuration updated");
                }
                self.current = Some(cfg);
            }
            Err(e) => warn!(error = %e, "Config refresh failed; keeping previous"),
        }

        let seen_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Err(e) = self.client.heartbeat(&relay_id, Some(seen_at)).await {
            warn!(error = %e, "Heartbeat failed");
        }

        self.interval()
    }

    fn interval(&self) -> Duration {
        let interval = self
            .current
            .as_ref()
            .map_or(DEFAULT_RELAY_INTERVAL, |c| c.interval.as_str());
        parse_interval(interval).unwrap_or_else(|e| {
            warn!(error = %e, "Unusable interval from backend");
            FALLBACK_INTERVAL
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        self.state.save(&self.config.state_path)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn agent_with(state: &AgentState, seed: Option<&str>) -> (Agent, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state.json");
        state.save(&state_path).unwrap();
        let client = BackendClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let agent = Agent::new(
            client,
            AgentConfig {
                state_path,
                seed_relay_id: seed.map(str::to_string),
                poll_interval: Duration::from_millis(10),
                once: true,
                repair: false,
            },
        );
        (agent, dir)
    }

    #[test]
    fn seed_relay_id_fills_empty_state() {
        let (agent, _dir) = agent_with(&AgentState::default(), Some("seeded"));
        assert_eq!(agent.state().relay_id.as_deref(), Some("seeded"));
    }

    #[test]
    fn stored_relay_id_wins_over_seed() {
        let stored = AgentState {
            relay_id: Some("stored".into()),
            pairing_code: None,
            claimed: true,
        };
        let (agent, _dir) = agent_with(&stored, Some("seeded"));
        assert_eq!(agent.state().relay_id.as_deref(), Some("stored"));
    }

    #[test]
    fn interval_follows_backend_config() {
        let (mut agent, _dir) = agent_with(&AgentState::default(), None);
        assert_eq!(agent.interval(), Duration::from_secs(30));

        agent.current = Some(RelayConfigResponse {
            interval: "2m".into(),
            rtsp_url: None,
        });
        assert_eq!(agent.interval(), Duration::from_secs(120));

        agent.current = Some(RelayConfigResponse {
            interval: "whenever".into(),
            rtsp_url: None,
        });
        assert_eq!(agent.interval(), FALLBACK_INTERVAL);
    }

    #[tokio::test]
    async fn unreachable_backend_does_not_abort_cycle() {
        let stored = AgentState {
            relay_id: Some("r1".into()),
            pairing_code: None,
            claimed: true,
        };
        let (mut agent, _dir) = agent_with(&stored, None);
        assert_eq!(agent.cycle().await, Duration::from_secs(30));
        assert!(agent.current_config().is_none());
    }
}
