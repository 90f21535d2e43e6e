//! Coop Relay Agent Library
//!
//! Device side of the relay pairing protocol:
//! - HTTP client for the coop backend
//! - Persisted agent state (relay id, pending code)
//! - Pairing and keep-alive state machine

pub mod agent;
pub mod client;
pub mod state;

pub use agent::{Agent, AgentConfig};
pub use client::{BackendClient, ClientError};
pub use state::AgentState;
