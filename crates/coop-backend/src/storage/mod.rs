//! `SQLite` storage for the coop backend.
//!
//! Persists relays and coop memberships. The pairing coordinators only see
//! the narrow [`RelayStore`] and [`MembershipDirectory`] traits.

mod db;
mod models;
mod queries;
mod store;


pub use coop_core::DatabaseError;
pub use db::BackendDatabase;
pub use models::*;
pub use store::{MembershipDirectory, RelayFilter, RelayPatch, RelayStore, UpdateOutcome};
