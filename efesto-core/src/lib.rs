//! Efesto Core Library
//!
//! Shared types for the Efesto heater-control client: the wire envelope spoken
//! by the Efesto web service, the outcome type every operation reduces to, and
//! the file-backed session store that carries authentication cookies across
//! process invocations.

pub mod api;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use api::{ActionResponse, Outcome, STATUS_NOT_AUTHENTICATED, STATUS_OK};
pub use error::*;
pub use session::{Cookie, Session, SessionStore};
