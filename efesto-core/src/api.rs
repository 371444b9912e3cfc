//! Wire models for the Efesto web service
//!
//! Every command POST is answered with a small JSON envelope carrying an
//! integer `status` and an optional `message` blob. The envelope reduces to an
//! [`Outcome`], the uniform result type consumed by the result reporter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device accepted the command
pub const STATUS_OK: i64 = 0;
/// Session cookies are no longer valid; the caller must re-authenticate
pub const STATUS_NOT_AUTHENTICATED: i64 = 1;

/// Response envelope returned by the action endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    /// 0 = success, 1 = not authenticated, anything else = application error
    pub status: i64,
    /// Opaque device-state blob for read operations, absent otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

/// Uniform result of a single client operation.
///
/// A closed tagged type rather than a display string, so the dispatcher's
/// recovery logic never depends on exact string matching. The display labels
/// (`OK`, `NOT LOGGED IN`, or the error message) are what the CLI prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Operation succeeded; `data` carries the serialized device-state payload
    /// for read operations
    Ok { data: Option<String> },
    /// The service reported an expired or missing session (`status == 1`)
    NotAuthenticated,
    /// Terminal failure with a human-readable message
    Error { message: String },
}

impl Outcome {
    /// Create a successful outcome without payload
    pub fn ok() -> Self {
        Self::Ok { data: None }
    }

    /// Create a successful outcome carrying a payload
    pub fn ok_with_data(data: impl Into<String>) -> Self {
        Self::Ok {
            data: Some(data.into()),
        }
    }

    /// Create an error outcome
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// The state label the reporter prints for non-payload outcomes
    pub fn state_label(&self) -> &str {
        match self {
            Self::Ok { .. } => "OK",
            Self::NotAuthenticated => "NOT LOGGED IN",
            Self::Error { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_response_roundtrip() {
        let json = r#"{"status": 0, "message": {"temp": 21}}"#;
        let response: ActionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, STATUS_OK);
        assert_eq!(response.message.unwrap()["temp"], 21);
    }

    #[test]
    fn test_action_response_without_message() {
        let response: ActionResponse = serde_json::from_str(r#"{"status": 1}"#).unwrap();
        assert_eq!(response.status, STATUS_NOT_AUTHENTICATED);
        assert!(response.message.is_none());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::ok().state_label(), "OK");
        assert_eq!(Outcome::NotAuthenticated.state_label(), "NOT LOGGED IN");
        assert_eq!(
            Outcome::error("LOGIN STATUS CODE 500").state_label(),
            "LOGIN STATUS CODE 500"
        );
    }

    #[test]
    fn test_outcome_is_ok() {
        assert!(Outcome::ok().is_ok());
        assert!(Outcome::ok_with_data("{}").is_ok());
        assert!(!Outcome::NotAuthenticated.is_ok());
        assert!(!Outcome::error("boom").is_ok());
    }
}
