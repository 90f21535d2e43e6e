//! HTTP client for the coop backend relay API.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

use coop_proto::{
    ClaimRelayRequest, ClaimRelayResponse, ErrorBody, HealthResponse, HeartbeatRequest,
    PairingConfigResponse, PairingStatusQuery, PairingStatusResponse, RelayConfigQuery,
    RelayConfigResponse, RelayIdQuery, RelayStatusResponse, RequestPairingCodeRequest,
    RequestPairingCodeResponse, SetRelayConfigRequest, paths,
};

/// Backend client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Client for the relay endpoints of the coop backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ClientError::Config("backend URL is empty".into()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "backend URL must start with http:// or https://, got {base_url}"
            )));
        }

        // reqwest is built with rustls-no-provider. Err means already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coop-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send and turn non-2xx answers into [`ClientError::Api`], using the
    /// backend's `{"error": ...}` body when it has one.
    async fn send(req: RequestBuilder) -> Result<Response, ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let fallback = status.canonical_reason().unwrap_or("Unknown").to_string();
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => fallback,
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
        Ok(Self::send(req).await?.json().await?)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        Self::send_json(self.http.get(self.url(paths::HEALTH))).await
    }

    /// Ask for a pairing code; pass the known relay id to start a new
    /// pairing epoch for an existing relay.
    pub async fn request_pairing_code(
        &self,
        relay_id: Option<&str>,
    ) -> Result<RequestPairingCodeResponse, ClientError> {
        let body = RequestPairingCodeRequest {
            relay_id: relay_id.map(str::to_string),
        };
        Self::send_json(
            self.http
                .post(self.url(paths::REQUEST_PAIRING_CODE))
                .json(&body),
        )
        .await
    }

    /// Claim a relay as the user behind `token` (companion-app side).
    pub async fn claim(
        &self,
        token: &str,
        pairing_code: &str,
    ) -> Result<ClaimRelayResponse, ClientError> {
        let body = ClaimRelayRequest {
            pairing_code: pairing_code.to_string(),
        };
        Self::send_json(
            self.http
                .post(self.url(paths::CLAIM))
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    pub async fn pairing_status(&self, code: &str) -> Result<PairingStatusResponse, ClientError> {
        let query = PairingStatusQuery {
            code: code.to_string(),
        };
        Self::send_json(self.http.get(self.url(paths::PAIRING)).query(&query)).await
    }

    pub async fn config_by_code(&self, code: &str) -> Result<PairingConfigResponse, ClientError> {
        let query = RelayConfigQuery {
            relay_id: None,
            pairing_code: Some(code.to_string()),
        };
        Self::send_json(self.http.get(self.url(paths::CONFIG)).query(&query)).await
    }

    pub async fn config_by_relay(&self, relay_id: &str) -> Result<RelayConfigResponse, ClientError> {
        let query = RelayConfigQuery {
            relay_id: Some(relay_id.to_string()),
            pairing_code: None,
        };
        Self::send_json(self.http.get(self.url(paths::CONFIG)).query(&query)).await
    }

    pub async fn set_config(&self, req: &SetRelayConfigRequest) -> Result<(), ClientError> {
        Self::send(self.http.post(self.url(paths::CONFIG)).json(req)).await?;
        Ok(())
    }

    pub async fn heartbeat(&self, relay_id: &str, seen_at: Option<String>) -> Result<(), ClientError> {
        let body = HeartbeatRequest {
            relay_id: relay_id.to_string(),
            seen_at,
        };
        Self::send(self.http.post(self.url(paths::STATUS)).json(&body)).await?;
        Ok(())
    }

    pub async fn read_status(&self, relay_id: &str) -> Result<RelayStatusResponse, ClientError> {
        let query = RelayIdQuery {
            relay_id: relay_id.to_string(),
        };
        Self::send_json(self.http.get(self.url(paths::STATUS_READ)).query(&query)).await
    }
}
