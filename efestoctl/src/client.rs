//! HTTP client for the Efesto heater service.
//!
//! This client carries the whole protocol layer:
//! - Transport: form POSTs with the session cookies attached, plus a single
//!   process-wide retry for the portal's transient communications-error page
//! - Authenticator: the login exchange, persisting the session on success
//! - Command dispatcher: the three device operations and the shared
//!   response-envelope interpretation
//! - Recovery flow: one re-login and one re-execution when the service reports
//!   an expired session
//!
//! # Retry logic
//!
//! The transient-fault retry budget is owned by the client value, so it is
//! shared across every operation of one CLI invocation: at most one retry per
//! process run, not one per call. Session-expiry recovery is likewise bounded
//! to exactly one re-login and one re-execution.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, ORIGIN, REFERER, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use efesto_core::{
    ActionResponse, Outcome, Session, SessionStore, STATUS_NOT_AUTHENTICATED, STATUS_OK,
};

use crate::cli::Command;
use crate::config::CliConfig;

/// Login form endpoint on the portal
pub const LOGIN_PATH: &str = "/de/login/";
/// Ajax action endpoint all device commands go through
pub const ACTION_PATH: &str = "/de/ajax/action/frontend/response/ajax/";

/// Body of the error page the portal serves on a transient backend fault.
/// A response matching this text is retried once; anything else is not.
pub const TRANSIENT_FAULT_MARKER: &str = "<title>Kommunikationsprobleme</title>";

/// Total transient-fault retries per process invocation
const TRANSIENT_RETRY_BUDGET: u32 = 1;
/// Fixed delay before the transient-fault resend
const TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Client for a single Efesto-connected heater.
///
/// Owns the current [`Session`] and passes it to the transport per call; the
/// [`SessionStore`] mediates all persistence.
#[derive(Debug)]
pub struct EfestoClient {
    http: reqwest::Client,
    config: CliConfig,
    store: SessionStore,
    session: Session,
    /// Remaining transient-fault retries for this invocation
    retries_left: u32,
    retry_delay: Duration,
}

impl EfestoClient {
    /// Create a client from a validated configuration.
    ///
    /// The underlying HTTP client gets an explicit request timeout; the portal
    /// is slow but must not hang an unattended invocation forever.
    pub fn new(config: CliConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent("efestoctl/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        let store = SessionStore::new(&config.session_file);

        Ok(Self {
            http,
            config,
            store,
            session: Session::new(),
            retries_left: TRANSIENT_RETRY_BUDGET,
            retry_delay: TRANSIENT_RETRY_DELAY,
        })
    }

    /// Override the transient-retry delay. Tests use this to avoid the fixed
    /// 5 second sleep.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// The session currently attached to requests
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The store persisting the session between invocations
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn login_url(&self) -> String {
        format!("{}{}", self.config.server_url, LOGIN_PATH)
    }

    fn action_url(&self) -> String {
        format!("{}{}", self.config.server_url, ACTION_PATH)
    }

    /// Headers the portal expects on the login form POST
    fn login_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        if let Ok(referer) = HeaderValue::from_str(&self.login_url()) {
            headers.insert(REFERER, referer);
        }
        headers
    }

    /// XHR headers the portal expects on device command POSTs
    fn command_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );
        let referer = format!(
            "{}/de/heaters/action/manage/heater/{}/",
            self.config.server_url, self.config.heater_id
        );
        if let Ok(referer) = HeaderValue::from_str(&referer) {
            headers.insert(REFERER, referer);
        }
        if let Ok(origin) = HeaderValue::from_str(&self.config.server_url) {
            headers.insert(ORIGIN, origin);
        }
        headers
    }

    /// POST a form to the portal with the current session cookies attached.
    ///
    /// Folds refreshed cookies from every response back into the session. If
    /// the body is the transient-fault page and the retry budget is not
    /// exhausted, waits and resends the identical request once.
    async fn post_form(
        &mut self,
        url: &str,
        fields: &[(&str, String)],
        headers: &HeaderMap,
    ) -> Result<(StatusCode, String)> {
        loop {
            let mut request = self.http.post(url).headers(headers.clone()).form(fields);
            if let Some(cookie) = self.session.cookie_header() {
                request = request.header(COOKIE, cookie);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to POST to {}", url))?;

            let status = response.status();
            let set_cookies: Vec<String> = response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok().map(String::from))
                .collect();
            let body = response
                .text()
                .await
                .with_context(|| format!("Failed to read response body from {}", url))?;

            // The server may refresh cookies on any response
            self.session
                .update_from_set_cookie(set_cookies.iter().map(String::as_str));

            if body.trim() == TRANSIENT_FAULT_MARKER && self.retries_left > 0 {
                self.retries_left -= 1;
                warn!(
                    url,
                    delay_secs = self.retry_delay.as_secs_f64(),
                    "communications error page received, retrying"
                );
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            return Ok((status, body));
        }
    }

    /// Perform the login exchange and persist the session on success.
    ///
    /// Any non-200 status is a login failure; there is no retry here beyond
    /// what the transport itself performs.
    pub async fn login(&mut self) -> Result<Outcome> {
        let url = self.login_url();
        let headers = self.login_headers();
        let fields = [
            ("login[username]", self.config.username.clone()),
            ("login[password]", self.config.password.clone()),
        ];

        let (status, _body) = self.post_form(&url, &fields, &headers).await?;

        if status == StatusCode::OK {
            self.store.save(&self.session)?;
            info!(
                session_file = %self.store.path().display(),
                "login successful, session saved"
            );
            Ok(Outcome::ok())
        } else {
            error!(code = status.as_u16(), "login failed");
            Ok(Outcome::error(format!(
                "LOGIN STATUS CODE {}",
                status.as_u16()
            )))
        }
    }

    /// Execute a single device operation and interpret the response envelope.
    pub async fn execute(&mut self, command: &Command) -> Result<Outcome> {
        let url = self.action_url();
        let headers = self.command_headers();
        let fields = [
            ("method", command.method()),
            ("params", command.params()),
            ("device", self.config.heater_id.clone()),
        ];

        let (status, body) = self.post_form(&url, &fields, &headers).await?;

        if status != StatusCode::OK {
            return Ok(Outcome::error(format!(
                "{} STATUS CODE {}",
                command.label(),
                status.as_u16()
            )));
        }

        let parsed: ActionResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(
                    operation = command.name(),
                    %e,
                    body = %body,
                    "failed to parse device response"
                );
                return Ok(Outcome::error(format!(
                    "Error parsing response in {}: {}",
                    command.name(),
                    body
                )));
            }
        };

        match parsed.status {
            STATUS_OK => {
                if command.has_payload() {
                    let payload = parsed.message.unwrap_or(Value::Null);
                    Ok(Outcome::ok_with_data(serde_json::to_string(&payload)?))
                } else {
                    Ok(Outcome::ok())
                }
            }
            STATUS_NOT_AUTHENTICATED => Ok(Outcome::NotAuthenticated),
            _ => Ok(Outcome::error(format!(
                "{} STATUS NOT OK: {}",
                command.label(),
                body
            ))),
        }
    }

    /// Run a command with session restore and expiry recovery.
    ///
    /// Restores the persisted session if one exists, otherwise logs in first
    /// (aborting on login failure). On a `NOT LOGGED IN` answer the client
    /// re-logs-in exactly once and re-executes the command exactly once more;
    /// whatever that second attempt yields is final.
    pub async fn run(&mut self, command: &Command) -> Result<Outcome> {
        if self.store.exists() {
            // A corrupt blob propagates as a hard failure rather than being
            // treated as "no session"
            self.session = self.store.load()?;
            debug!(
                session_file = %self.store.path().display(),
                "restored persisted session"
            );
        } else {
            debug!("no persisted session, logging in first");
            let outcome = self.login().await?;
            if !outcome.is_ok() {
                return Ok(outcome);
            }
        }

        let outcome = self.execute(command).await?;

        match outcome {
            Outcome::NotAuthenticated => {
                info!(operation = command.name(), "session expired, logging in again");
                let login_outcome = self.login().await?;
                if !login_outcome.is_ok() {
                    return Ok(login_outcome);
                }
                self.execute(command).await
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::test_utils::MockService;

    fn test_config(server_url: &str, session_file: std::path::PathBuf) -> CliConfig {
        CliConfig::builder()
            .with_server_url(server_url)
            .unwrap()
            .with_username("test@example.com")
            .with_password("secret")
            .with_heater_id("1234")
            .with_session_file(session_file)
            .build()
            .unwrap()
    }

    fn test_client(server_url: &str, dir: &tempfile::TempDir) -> EfestoClient {
        let config = test_config(server_url, dir.path().join("session.json"));
        EfestoClient::new(config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_login_saves_session_cookies() {
        let (service, url) = MockService::new().start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&url, &dir);

        let outcome = client.login().await.unwrap();
        assert!(outcome.is_ok());
        assert!(!client.session().is_empty());
        assert!(client.store().exists());
        assert_eq!(service.state().login_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_failure_maps_status_code() {
        let (service, url) = MockService::new().start().await.unwrap();
        service.state().login_should_fail.store(true, Ordering::SeqCst);

        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&url, &dir);

        let outcome = client.login().await.unwrap();
        assert_eq!(outcome, Outcome::error("LOGIN STATUS CODE 500"));
        assert!(!client.store().exists());
    }

    #[tokio::test]
    async fn test_transient_fault_retried_exactly_once() {
        let (service, url) = MockService::new().start().await.unwrap();
        // Every action response is the error page: budget must cap at 2 requests
        service.state().transient_next.store(u32::MAX, Ordering::SeqCst);

        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&url, &dir);
        client.login().await.unwrap();

        let outcome = client.execute(&Command::GetState).await.unwrap();
        assert_eq!(service.state().action_count.load(Ordering::SeqCst), 2);
        match outcome {
            Outcome::Error { message } => {
                assert!(message.starts_with("Error parsing response in get_state"))
            }
            other => panic!("Expected parse error outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_budget_is_shared_across_operations() {
        let (service, url) = MockService::new().start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&url, &dir);
        client.login().await.unwrap();

        // First operation consumes the whole budget
        service.state().transient_next.store(1, Ordering::SeqCst);
        let outcome = client.execute(&Command::GetState).await.unwrap();
        assert!(outcome.is_ok());
        assert_eq!(service.state().action_count.load(Ordering::SeqCst), 2);

        // Second operation in the same process gets no retry
        service.state().transient_next.store(1, Ordering::SeqCst);
        let outcome = client.execute(&Command::GetState).await.unwrap();
        assert!(!outcome.is_ok());
        assert_eq!(service.state().action_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_expired_session_maps_to_not_authenticated() {
        let (service, url) = MockService::new().start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&url, &dir);
        client.login().await.unwrap();

        service.state().expire_next.store(1, Ordering::SeqCst);
        let outcome = client.execute(&Command::GetState).await.unwrap();
        assert_eq!(outcome, Outcome::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_parse_error() {
        let (service, url) = MockService::new().start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&url, &dir);
        client.login().await.unwrap();

        service.state().malformed_next.store(1, Ordering::SeqCst);
        let outcome = client
            .execute(&Command::SetPower { level: 3 })
            .await
            .unwrap();
        match outcome {
            Outcome::Error { message } => {
                assert!(message.starts_with("Error parsing response in set_power:"));
            }
            other => panic!("Expected parse error outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_application_error_maps_to_status_not_ok() {
        let (_service, url) = MockService::new().start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        // Wrong heater id makes the service answer an application error
        let config = test_config(&url, dir.path().join("session.json"));
        let config = CliConfig {
            heater_id: "9999".to_string(),
            ..config
        };
        let mut client = EfestoClient::new(config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10));
        client.login().await.unwrap();

        let outcome = client.execute(&Command::GetState).await.unwrap();
        match outcome {
            Outcome::Error { message } => {
                assert!(message.starts_with("GET STATE STATUS NOT OK:"), "{}", message)
            }
            other => panic!("Expected application error outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_set_power_reaches_device() {
        let (service, url) = MockService::new().start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&url, &dir);
        client.login().await.unwrap();

        let outcome = client
            .execute(&Command::SetPower { level: 4 })
            .await
            .unwrap();
        assert!(outcome.is_ok());
        assert_eq!(
            service.state().power.lock().unwrap().as_deref(),
            Some("4")
        );
    }

    #[tokio::test]
    async fn test_non_200_action_status_maps_to_status_code_error() {
        let (service, url) = MockService::new().start().await.unwrap();
        service.state().action_http_error.store(true, Ordering::SeqCst);

        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(&url, &dir);
        client.login().await.unwrap();

        let outcome = client.execute(&Command::GetState).await.unwrap();
        assert_eq!(outcome, Outcome::error("GET STATE STATUS CODE 502"));
    }
}
