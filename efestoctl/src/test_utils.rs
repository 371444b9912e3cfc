//! Test utilities for CLI testing
//!
//! Provides a mock of the Efesto portal: a login endpoint issuing a session
//! cookie and an action endpoint speaking the `{status, message}` envelope.
//! Scripted failure knobs make the retry and recovery bounds observable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::client::{ACTION_PATH, LOGIN_PATH, TRANSIENT_FAULT_MARKER};

/// Heater id the mock service accepts
pub const MOCK_HEATER_ID: &str = "1234";

/// Name of the session cookie the mock service issues
pub const MOCK_COOKIE_NAME: &str = "PHPSESSID";

/// Mock service state
#[derive(Debug, Clone, Default)]
pub struct MockServiceState {
    /// Answer the next login with HTTP 500
    pub login_should_fail: Arc<AtomicBool>,
    /// Answer the next N action calls with `status: 1` (expired session)
    pub expire_next: Arc<AtomicU32>,
    /// Serve the transient communications-error page for the next N action calls
    pub transient_next: Arc<AtomicU32>,
    /// Serve a non-JSON body for the next N action calls
    pub malformed_next: Arc<AtomicU32>,
    /// Answer every action call with HTTP 502
    pub action_http_error: Arc<AtomicBool>,
    /// Number of login requests received
    pub login_count: Arc<AtomicU32>,
    /// Number of action requests received
    pub action_count: Arc<AtomicU32>,
    /// Power level last written via `write-parameters-queue`
    pub power: Arc<Mutex<Option<String>>>,
    /// Last heater on/off switch received
    pub heater_on: Arc<Mutex<Option<bool>>>,
    /// Device-state blob answered to `get-state`
    pub device_state: Arc<Mutex<Value>>,
    /// Currently valid session cookie value, set by login
    session_token: Arc<Mutex<Option<String>>>,
    token_counter: Arc<AtomicU32>,
}

impl MockServiceState {
    fn new() -> Self {
        let state = Self::default();
        *state.device_state.lock().unwrap() = json!({
            "temp": 21,
            "power": 3,
            "status": "on",
        });
        state
    }

    /// Replace the device-state payload answered to `get-state`
    pub fn set_device_state(&self, value: Value) {
        *self.device_state.lock().unwrap() = value;
    }

    /// Invalidate the current session so the next authenticated call fails
    pub fn invalidate_session(&self) {
        *self.session_token.lock().unwrap() = None;
    }

    fn issue_token(&self) -> String {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("sess-{}", n);
        *self.session_token.lock().unwrap() = Some(token.clone());
        token
    }

    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        let token = self.session_token.lock().unwrap();
        let Some(token) = token.as_deref() else {
            return false;
        };
        let expected = format!("{}={}", MOCK_COOKIE_NAME, token);

        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(|cookies| cookies.split("; ").any(|pair| pair == expected))
            .unwrap_or(false)
    }

    // Consume one unit from a scripted-failure counter
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Mock Efesto portal
#[derive(Debug)]
pub struct MockService {
    state: MockServiceState,
    port: u16,
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockService {
    /// Create a new mock service
    pub fn new() -> Self {
        Self {
            state: MockServiceState::new(),
            port: 0, // Will be assigned when the service starts
        }
    }

    /// Start the mock service and return its base URL
    pub async fn start(mut self) -> Result<(Self, String)> {
        let app = self.create_router();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.port = addr.port();

        let server_url = format!("http://127.0.0.1:{}", self.port);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock service error: {}", e);
            }
        });

        // Give the service a moment to start and verify it's running
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
        }

        Ok((self, server_url))
    }

    /// Get the service port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the service state
    pub fn state(&self) -> &MockServiceState {
        &self.state
    }

    fn create_router(&self) -> Router {
        Router::new()
            .route(LOGIN_PATH, post(login_handler))
            .route(ACTION_PATH, post(action_handler))
            .with_state(self.state.clone())
    }
}

// Handler functions

async fn login_handler(
    State(state): State<MockServiceState>,
    Form(_fields): Form<HashMap<String, String>>,
) -> Response {
    state.login_count.fetch_add(1, Ordering::SeqCst);

    if state.login_should_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "login unavailable").into_response();
    }

    let token = state.issue_token();
    let cookie = format!("{}={}; path=/", MOCK_COOKIE_NAME, token);

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        "<html><body>Willkommen</body></html>",
    )
        .into_response()
}

async fn action_handler(
    State(state): State<MockServiceState>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    state.action_count.fetch_add(1, Ordering::SeqCst);

    // Transport-level failures fire before any protocol handling
    if MockServiceState::take(&state.transient_next) {
        return (StatusCode::OK, TRANSIENT_FAULT_MARKER).into_response();
    }
    if state.action_http_error.load(Ordering::SeqCst) {
        return (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response();
    }
    if MockServiceState::take(&state.malformed_next) {
        return (StatusCode::OK, "<html><body>Wartungsarbeiten</body></html>").into_response();
    }

    if MockServiceState::take(&state.expire_next) || !state.is_authenticated(&headers) {
        return (StatusCode::OK, json!({ "status": 1 }).to_string()).into_response();
    }

    if fields.get("device").map(String::as_str) != Some(MOCK_HEATER_ID) {
        let body = json!({ "status": 2, "message": "unknown device" });
        return (StatusCode::OK, body.to_string()).into_response();
    }

    let method = fields.get("method").map(String::as_str).unwrap_or("");
    let params = fields.get("params").map(String::as_str).unwrap_or("");

    let body = match method {
        "get-state" => {
            let device_state = state.device_state.lock().unwrap().clone();
            json!({ "status": 0, "message": device_state })
        }
        "write-parameters-queue" => match params.strip_prefix("set-power=") {
            Some(level) => {
                *state.power.lock().unwrap() = Some(level.to_string());
                json!({ "status": 0 })
            }
            None => json!({ "status": 2, "message": "unknown parameter" }),
        },
        "heater-on" => {
            *state.heater_on.lock().unwrap() = Some(true);
            json!({ "status": 0 })
        }
        "heater-off" => {
            *state.heater_on.lock().unwrap() = Some(false);
            json!({ "status": 0 })
        }
        _ => json!({ "status": 2, "message": "unknown method" }),
    };

    (StatusCode::OK, body.to_string()).into_response()
}
