//! Coop Relay Agent
//!
//! Runs on a capture device: pairs it with a coop, then keeps its
//! configuration fresh and reports liveness.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use coop_relay::{Agent, AgentConfig, AgentState, BackendClient};

#[derive(Parser, Debug)]
#[command(name = "coop-relay")]
#[command(version, about = "Coop relay agent - device pairing and keep-alive")]
struct Args {
    /// Base URL of the coop backend (e.g. "http://backend.local:8080").
    #[arg(long, env = "COOP_BACKEND_URL")]
    backend_url: String,

    /// Agent state file [default: ~/.coop-relay/state.json].
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Relay id to re-pair when the state file has none.
    #[arg(long)]
    relay_id: Option<String>,

    /// Seconds between pairing polls.
    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// Pair if needed, run one config and heartbeat cycle, then exit.
    #[arg(long)]
    once: bool,

    /// Request a new pairing code even if this relay is already claimed.
    #[arg(long)]
    repair: bool,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    coop_core::tracing_init::init_tracing("coop_relay=info", args.log_json)?;

    if args.poll_interval_secs == 0 || args.request_timeout_secs == 0 {
        anyhow::bail!("--poll-interval-secs and --request-timeout-secs must be at least 1");
    }

    let state_path = match args.state_file {
        Some(path) => path,
        None => AgentState::default_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?,
    };

    let client = BackendClient::new(
        &args.backend_url,
        Duration::from_secs(args.request_timeout_secs),
    )?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = client.base_url(),
        state = %state_path.display(),
        "Starting coop-relay"
    );

    let mut agent = Agent::new(
        client,
        AgentConfig {
            state_path,
            seed_relay_id: args.relay_id.filter(|id| !id.trim().is_empty()),
            poll_interval: Duration::from_secs(args.poll_interval_secs),
            once: args.once,
            repair: args.repair,
        },
    );

    agent
        .run(async {
            // An error here means no signal handler; shut down right away.
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Agent stopped");
    Ok(())
}
