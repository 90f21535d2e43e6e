//! HTTP surface of the coop backend.

pub mod error;
pub mod health;
pub mod interceptor;
pub mod relay_api;

#[cfg(test)]
mod relay_api_tests;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{Router, middleware};
use coop_proto::paths;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use interceptor::require_bearer;

use crate::auth::JwtManager;
use crate::pairing::{
    ClaimCoordinator, CodeGenerator, PairingCoordinator, RetryPolicy, StatusReporter,
};
use crate::storage::{MembershipDirectory, RelayStore};

/// Shared handler state. Cloned per request; everything inside is `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pairing: PairingCoordinator,
    pub claims: ClaimCoordinator,
    pub status: StatusReporter,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RelayStore>,
        members: Arc<dyn MembershipDirectory>,
        codes: Arc<dyn CodeGenerator>,
        jwt: Arc<JwtManager>,
        retry: RetryPolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            pairing: PairingCoordinator::new(Arc::clone(&store), codes, retry, store_timeout),
            claims: ClaimCoordinator::new(Arc::clone(&store), members, store_timeout),
            status: StatusReporter::new(store, store_timeout),
            jwt,
        }
    }
}

/// Build the full router. Only the claim route requires a bearer token.
pub fn router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route(paths::CLAIM, post(relay_api::claim_relay))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.jwt),
            require_bearer,
        ));

    Router::new()
        .route(paths::HEALTH, get(health::health))
        .route(
            paths::REQUEST_PAIRING_CODE,
            post(relay_api::request_pairing_code),
        )
        .route(paths::PAIRING, get(relay_api::pairing_status))
        .route(
            paths::CONFIG,
            get(relay_api::get_config).post(relay_api::set_config),
        )
        .route(paths::STATUS, post(relay_api::report_status))
        .route(paths::STATUS_READ, get(relay_api::read_status))
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
