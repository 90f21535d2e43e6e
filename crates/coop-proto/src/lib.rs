//! Coop relay wire contract
//!
//! Request and response bodies exchanged between relay devices, the companion
//! app and the coop backend. Field names are part of the protocol; every
//! type here serializes to the exact JSON the devices expect.
//!
//! Timestamps travel as RFC 3339 strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP routes served by the backend.
pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const REQUEST_PAIRING_CODE: &str = "/api/relay/request_pairing_code";
    pub const CLAIM: &str = "/api/relay/claim";
    pub const PAIRING: &str = "/api/relay/pairing";
    pub const CONFIG: &str = "/api/relay/config";
    pub const STATUS: &str = "/api/relay/status";
    pub const STATUS_READ: &str = "/api/relay/status/read";
}

/// Pairing state of a relay within its current pairing epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStatus {
    Pending,
    Claimed,
}

impl RelayStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
        }
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown relay status {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for RelayStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "claimed" => Ok(Self::Claimed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// =========================================================================
// Pairing
// =========================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPairingCodeRequest {
    /// Present when an existing relay asks for a fresh code (re-pairing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPairingCodeResponse {
    pub relay_id: String,
    pub pairing_code: String,
    pub status: RelayStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRelayRequest {
    pub pairing_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRelayResponse {
    pub relay_id: String,
    pub status: RelayStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingStatusQuery {
    pub code: String,
}

/// `{status: "pending"}` or `{status: "claimed", relay_id, paired_at}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingStatusResponse {
    pub status: RelayStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_at: Option<String>,
}

// =========================================================================
// Configuration
// =========================================================================

/// Query for `GET /api/relay/config`; exactly one field is expected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfigQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
}

/// Operating parameters for a relay looked up by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfigResponse {
    pub interval: String,
    pub rtsp_url: Option<String>,
}

/// Relay configuration looked up by pairing code. The optional fields are
/// only populated once the relay is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingConfigResponse {
    pub relay_id: String,
    pub status: RelayStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coop_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtsp_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRelayConfigRequest {
    pub relay_id: String,
    pub interval: String,
    #[serde(default)]
    pub rtsp_url: Option<String>,
}

// =========================================================================
// Liveness
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub relay_id: String,
    /// When omitted the server stamps the heartbeat with its receipt time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayIdQuery {
    pub relay_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatusResponse {
    pub relay_id: String,
    pub status: RelayStatus,
    pub paired_at: Option<String>,
    pub last_seen_at: Option<String>,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_value(RelayStatus::Claimed).unwrap(),
            json!("claimed")
        );
        assert_eq!("pending".parse::<RelayStatus>().unwrap(), RelayStatus::Pending);
        assert!("Claimed".parse::<RelayStatus>().is_err());
    }

    #[test]
    fn pending_poll_response_has_only_status() {
        let resp = PairingStatusResponse {
            status: RelayStatus::Pending,
            relay_id: None,
            paired_at: None,
        };
        assert_eq!(serde_json::to_value(&resp).unwrap(), json!({"status": "pending"}));
    }

    #[test]
    fn request_code_body_may_be_empty_object() {
        let req: RequestPairingCodeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.relay_id.is_none());
    }

    #[test]
    fn unclaimed_config_keeps_null_stream_url() {
        let resp = RelayConfigResponse {
            interval: "30s".into(),
            rtsp_url: None,
        };
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"interval": "30s", "rtsp_url": null})
        );
    }

    #[test]
    fn pending_pairing_config_omits_claim_fields() {
        let resp = PairingConfigResponse {
            relay_id: "r1".into(),
            status: RelayStatus::Pending,
            coop_id: None,
            interval: None,
            rtsp_url: None,
        };
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"relay_id": "r1", "status": "pending"})
        );
    }
}
