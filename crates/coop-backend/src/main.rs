//! Coop Backend Server
//!
//! HTTP service that pairs relay devices with coops.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use coop_backend::auth::JwtManager;
use coop_backend::pairing::{RandomCodeGenerator, RetryPolicy};
use coop_backend::server::{AppState, router};
use coop_backend::storage::BackendDatabase;

#[derive(Parser, Debug)]
#[command(name = "coop-backend")]
#[command(version, about = "Coop backend - relay pairing and claim service")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "COOP_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "COOP_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Secret used to verify companion-app bearer tokens (HS256).
    #[arg(long, env = "COOP_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Upper bound on a single store call, in seconds.
    #[arg(long, default_value_t = 5)]
    store_timeout_secs: u64,

    /// Attempts at finding a free pairing code before giving up.
    #[arg(long, default_value_t = RetryPolicy::DEFAULT_MAX_ATTEMPTS)]
    max_code_attempts: u32,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    coop_core::tracing_init::init_tracing("coop_backend=info,tower_http=info", args.log_json)?;

    if args.jwt_secret.trim().is_empty() {
        anyhow::bail!("--jwt-secret must not be empty");
    }
    if args.store_timeout_secs == 0 {
        anyhow::bail!("--store-timeout-secs must be at least 1");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting coop-backend"
    );

    let db_path = match args.db_path {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening backend database");
    let db = BackendDatabase::open(&db_path).await?;

    let state = AppState::new(
        Arc::new(db.clone()),
        Arc::new(db),
        Arc::new(RandomCodeGenerator),
        Arc::new(JwtManager::new(args.jwt_secret.as_bytes())),
        RetryPolicy::on_conflict(args.max_code_attempts),
        Duration::from_secs(args.store_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    info!(addr = %args.addr, "Backend listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            // An error here means no signal handler; shut down right away.
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Backend stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".coop").join("backend.db"))
}
