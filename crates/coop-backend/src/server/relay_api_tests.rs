//! Router-level tests for the relay endpoints.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::{AppState, router};
use crate::auth::JwtManager;
use crate::pairing::{CodeGenerator, RandomCodeGenerator, RetryPolicy, ScriptedCodes};
use crate::storage::BackendDatabase;

struct TestApp {
    app: Router,
    db: BackendDatabase,
    jwt: Arc<JwtManager>,
}

impl TestApp {
    async fn new(codes: Arc<dyn CodeGenerator>) -> Self {
        let db = BackendDatabase::open_in_memory().await.unwrap();
        db.create_coop("coop-g", "Group G").await.unwrap();
        db.add_coop_member("user-u", "coop-g").await.unwrap();

        let jwt = Arc::new(JwtManager::new(b"router-test-secret"));
        let state = AppState::new(
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            codes,
            Arc::clone(&jwt),
            RetryPolicy::default(),
            Duration::from_secs(5),
        );
        Self {
            app: router(state),
            db,
            jwt,
        }
    }

    async fn random() -> Self {
        Self::new(Arc::new(RandomCodeGenerator)).await
    }

    fn token(&self, user_id: &str) -> String {
        self.jwt
            .issue_token(user_id, Duration::from_secs(300))
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), None).await
    }

    async fn claim(&self, code: &str, user_id: &str) -> (StatusCode, Value) {
        let token = self.token(user_id);
        self.send(
            Method::POST,
            "/api/relay/claim",
            Some(json!({"pairing_code": code})),
            Some(&token),
        )
        .await
    }

    async fn new_relay(&self) -> (String, String) {
        let (status, body) = self.post("/api/relay/request_pairing_code", json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        (
            body["relay_id"].as_str().unwrap().to_string(),
            body["pairing_code"].as_str().unwrap().to_string(),
        )
    }
}

// === Health ===

#[tokio::test]
async fn health_reports_serving() {
    let t = TestApp::random().await;
    let (status, body) = t.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "serving");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// === Request pairing code ===

#[tokio::test]
async fn request_code_without_body_creates_relay() {
    let t = TestApp::random().await;
    let (status, body) = t
        .send(Method::POST, "/api/relay/request_pairing_code", None, None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["pairing_code"].as_str().unwrap().len(), 8);
    assert!(body["relay_id"].as_str().is_some());
}

#[tokio::test]
async fn request_code_for_existing_relay_is_ok() {
    let t = TestApp::random().await;
    let (relay_id, code) = t.new_relay().await;

    let (status, body) = t
        .post(
            "/api/relay/request_pairing_code",
            json!({"relay_id": relay_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relay_id"], relay_id.as_str());
    assert_ne!(body["pairing_code"], code.as_str());
}

#[tokio::test]
async fn request_code_for_unknown_relay_is_not_found() {
    let t = TestApp::random().await;
    let (status, body) = t
        .post(
            "/api/relay/request_pairing_code",
            json!({"relay_id": "ghost"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn request_code_with_garbage_body_is_bad_request() {
    let t = TestApp::random().await;
    let req = Request::post("/api/relay/request_pairing_code")
        .body(Body::from("relay please"))
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn exhausted_code_space_is_unavailable() {
    let t = TestApp::new(Arc::new(ScriptedCodes::new(&["12341234"]))).await;
    t.new_relay().await;

    let (status, body) = t.post("/api/relay/request_pairing_code", json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().is_some());
}

// === Claim ===

#[tokio::test]
async fn claim_scenario() {
    let t = TestApp::new(Arc::new(ScriptedCodes::new(&["04213099"]))).await;

    let (status, body) = t.post("/api/relay/request_pairing_code", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pairing_code"], "04213099");
    assert_eq!(body["status"], "pending");
    let relay_id = body["relay_id"].as_str().unwrap().to_string();

    let (status, body) = t.claim("04213099", "user-u").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"relay_id": relay_id, "status": "claimed"}));

    let relay = t.db.get_relay(&relay_id).await.unwrap();
    assert_eq!(relay.coop_id.as_deref(), Some("coop-g"));

    let (status, body) = t.get("/api/relay/pairing?code=04213099").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "claimed");
    assert_eq!(body["relay_id"], relay_id.as_str());
    assert!(body["paired_at"].as_str().is_some());

    // Already claimed.
    let (status, _) = t.claim("04213099", "user-u").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn claim_without_token_is_unauthorized() {
    let t = TestApp::random().await;
    let (_, code) = t.new_relay().await;

    let (status, body) = t
        .post("/api/relay/claim", json!({"pairing_code": code}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn claim_with_malformed_token_is_unauthorized() {
    let t = TestApp::random().await;
    let (_, code) = t.new_relay().await;

    let (status, body) = t
        .send(
            Method::POST,
            "/api/relay/claim",
            Some(json!({"pairing_code": code})),
            Some("not.a.jwt"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn claim_by_user_without_coop_is_bad_request() {
    let t = TestApp::random().await;
    let (_, code) = t.new_relay().await;

    let (status, _) = t.claim(&code, "loner").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn claim_with_missing_code_is_bad_request() {
    let t = TestApp::random().await;
    let token = t.token("user-u");
    let (status, body) = t
        .send(Method::POST, "/api/relay/claim", Some(json!({})), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
}

// === Polling and configuration ===

#[tokio::test]
async fn pending_poll_has_only_status() {
    let t = TestApp::random().await;
    let (_, code) = t.new_relay().await;

    let (status, body) = t.get(&format!("/api/relay/pairing?code={code}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "pending"}));
}

#[tokio::test]
async fn poll_unknown_code_is_not_found() {
    let t = TestApp::random().await;
    let (status, _) = t.get("/api/relay/pairing?code=00000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.get("/api/relay/pairing").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_length_code_is_not_found() {
    let t = TestApp::random().await;
    t.new_relay().await;

    let (status, _) = t.get("/api/relay/pairing?code=4213099").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.get("/api/relay/config?pairing_code=abc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.claim("123", "user-u").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn config_by_relay_store_failure_is_internal_error() {
    let t = TestApp::random().await;
    t.db.pool().close().await;

    let (status, body) = t.get("/api/relay/config?relay_id=r1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal error");
}

#[tokio::test]
async fn config_by_relay_defaults_until_claimed() {
    let t = TestApp::random().await;
    let (relay_id, code) = t.new_relay().await;

    let (status, body) = t
        .get(&format!("/api/relay/config?relay_id={relay_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"interval": "30s", "rtsp_url": null}));

    let (status, _) = t
        .post(
            "/api/relay/config",
            json!({"relay_id": relay_id, "interval": "2m", "rtsp_url": "rtsp://coop/cam"}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    t.claim(&code, "user-u").await;

    let (_, body) = t
        .get(&format!("/api/relay/config?relay_id={relay_id}"))
        .await;
    assert_eq!(body, json!({"interval": "2m", "rtsp_url": "rtsp://coop/cam"}));
}

#[tokio::test]
async fn config_for_unknown_relay_is_default() {
    let t = TestApp::random().await;
    let (status, body) = t.get("/api/relay/config?relay_id=ghost").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"interval": "30s", "rtsp_url": null}));
}

#[tokio::test]
async fn config_by_code_reports_claim() {
    let t = TestApp::random().await;
    let (relay_id, code) = t.new_relay().await;

    let (status, body) = t
        .get(&format!("/api/relay/config?pairing_code={code}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"relay_id": relay_id, "status": "pending"}));

    t.claim(&code, "user-u").await;
    let (_, body) = t
        .get(&format!("/api/relay/config?pairing_code={code}"))
        .await;
    assert_eq!(
        body,
        json!({"relay_id": relay_id, "status": "claimed", "coop_id": "coop-g", "interval": "10m"})
    );
}

#[tokio::test]
async fn config_without_key_is_bad_request() {
    let t = TestApp::random().await;
    for uri in [
        "/api/relay/config",
        "/api/relay/config?relay_id=",
        "/api/relay/config?pairing_code=",
    ] {
        let (status, body) = t.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "Missing relay_id or pairing_code parameter");
    }
}

#[tokio::test]
async fn set_config_rejects_bad_interval() {
    let t = TestApp::random().await;
    let (relay_id, _) = t.new_relay().await;

    let (status, _) = t
        .post(
            "/api/relay/config",
            json!({"relay_id": relay_id, "interval": "fortnightly"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .post("/api/relay/config", json!({"relay_id": "ghost", "interval": "5m"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// === Heartbeat ===

#[tokio::test]
async fn heartbeat_is_acknowledged_and_readable() {
    let t = TestApp::random().await;
    let (relay_id, _) = t.new_relay().await;

    let (status, body) = t
        .post(
            "/api/relay/status",
            json!({"relay_id": relay_id, "seen_at": "2025-03-01T08:00:00Z"}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    // Older report is accepted but does not rewind.
    let (status, _) = t
        .post(
            "/api/relay/status",
            json!({"relay_id": relay_id, "seen_at": "2025-03-01T07:00:00Z"}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = t
        .get(&format!("/api/relay/status/read?relay_id={relay_id}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["last_seen_at"], "2025-03-01T08:00:00.000Z");
    assert_eq!(body["interval"], "30s");
}

#[tokio::test]
async fn heartbeat_for_unknown_relay_is_bad_request() {
    let t = TestApp::random().await;
    let (status, _) = t
        .post("/api/relay/status", json!({"relay_id": "ghost"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn read_status_of_unknown_relay_is_not_found() {
    let t = TestApp::random().await;
    let (status, _) = t.get("/api/relay/status/read?relay_id=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
