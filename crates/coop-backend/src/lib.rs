//! Coop Backend Library
//!
//! Relay pairing-and-claim service:
//! - `SQLite` storage for relays and coop memberships
//! - Bearer-token (JWT) identity verification
//! - Pairing coordinators: code issuance, claim, status and configuration
//! - HTTP router (axum)

pub mod auth;
pub mod pairing;
pub mod server;
pub mod storage;
