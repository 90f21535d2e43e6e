//! Handlers for the relay pairing endpoints.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use coop_proto::{
    ClaimRelayRequest, ClaimRelayResponse, HeartbeatRequest, PairingStatusQuery,
    PairingStatusResponse, RelayConfigQuery, RelayIdQuery, RelayStatusResponse,
    RequestPairingCodeRequest, RequestPairingCodeResponse, SetRelayConfigRequest,
};

use super::{ApiError, AppState};
use crate::auth::Claims;

/// `POST /api/relay/request_pairing_code`. The body is optional; an empty
/// body asks for a brand new relay.
pub async fn request_pairing_code(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<RequestPairingCodeResponse>), ApiError> {
    let req: RequestPairingCodeRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RequestPairingCodeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let issued = state.pairing.request_code(req.relay_id.as_deref()).await?;
    let status = if issued.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(RequestPairingCodeResponse {
            relay_id: issued.relay.id,
            pairing_code: issued.relay.pairing_code,
            status: issued.relay.status,
        }),
    ))
}

/// `POST /api/relay/claim`, behind the bearer middleware.
pub async fn claim_relay(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ClaimRelayRequest>, JsonRejection>,
) -> Result<Json<ClaimRelayResponse>, ApiError> {
    let Json(req) = payload?;
    let relay = state
        .claims
        .claim(claims.user_id(), &req.pairing_code)
        .await?;

    Ok(Json(ClaimRelayResponse {
        relay_id: relay.id,
        status: relay.status,
    }))
}

/// `GET /api/relay/pairing?code=`.
pub async fn pairing_status(
    State(state): State<AppState>,
    query: Result<Query<PairingStatusQuery>, QueryRejection>,
) -> Result<Json<PairingStatusResponse>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.status.pairing_status(&query.code).await?))
}

/// `GET /api/relay/config?relay_id=` or `?pairing_code=`. The two lookups
/// answer with different shapes.
pub async fn get_config(
    State(state): State<AppState>,
    query: Result<Query<RelayConfigQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;

    if let Some(relay_id) = non_empty(query.relay_id.as_deref()) {
        return Ok(Json(state.status.config_by_relay(relay_id).await?).into_response());
    }
    if let Some(code) = non_empty(query.pairing_code.as_deref()) {
        return Ok(Json(state.status.config_by_code(code).await?).into_response());
    }
    Err(ApiError::BadRequest(
        "Missing relay_id or pairing_code parameter".into(),
    ))
}

/// `POST /api/relay/config`.
pub async fn set_config(
    State(state): State<AppState>,
    payload: Result<Json<SetRelayConfigRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    state
        .status
        .set_config(&req.relay_id, &req.interval, req.rtsp_url.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/relay/status`: device heartbeat.
pub async fn report_status(
    State(state): State<AppState>,
    payload: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    state
        .status
        .heartbeat(&req.relay_id, req.seen_at.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/relay/status/read?relay_id=`.
pub async fn read_status(
    State(state): State<AppState>,
    query: Result<Query<RelayIdQuery>, QueryRejection>,
) -> Result<Json<RelayStatusResponse>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.status.read_status(&query.relay_id).await?))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
