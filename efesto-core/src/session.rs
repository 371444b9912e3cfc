//! Session model and file-backed session store
//!
//! The Efesto service authenticates with plain HTTP session cookies. To the
//! client they are an opaque bag: set by the server on login, attached to every
//! subsequent request, and possibly refreshed on any response. The bag is
//! persisted to a well-known file so each short-lived CLI invocation can reuse
//! the session of the previous one. Expiry is never checked locally; the
//! service signals it through its response envelope.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EfestoError, Result};

/// A single session cookie (name/value pair).
///
/// Attributes like `Domain` or `Expires` are not tracked: the client only ever
/// talks to one host and replays whatever the server handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Opaque bag of authentication cookies for the Efesto service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    cookies: Vec<Cookie>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Insert or replace a cookie by name. An empty value removes the cookie
    /// (the server's way of clearing one).
    pub fn set(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.cookies.retain(|c| c.name != name);
            return;
        }
        match self.cookies.iter_mut().find(|c| c.name == name) {
            Some(cookie) => cookie.value = value.to_string(),
            None => self.cookies.push(Cookie {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Render the `Cookie` request header value, or `None` when the bag is
    /// empty.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let header = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        Some(header)
    }

    /// Fold `Set-Cookie` response header values into the session.
    ///
    /// Only the leading name=value pair of each header matters; attributes
    /// after the first `;` are dropped.
    pub fn update_from_set_cookie<'a>(&mut self, headers: impl IntoIterator<Item = &'a str>) {
        for header in headers {
            let pair = header.split(';').next().unwrap_or("");
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    self.set(name, value.trim());
                }
            }
        }
    }
}

/// File-backed store for the persisted [`Session`].
///
/// The store is the only component that touches the session file; the client
/// asks it to save after a successful login and to load at process start.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a persisted session blob is present
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the persisted session.
    ///
    /// A missing file is an I/O error; a present but unparsable blob is
    /// [`EfestoError::CorruptSession`] and is propagated, never silently
    /// treated as "no session".
    pub fn load(&self) -> Result<Session> {
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| EfestoError::CorruptSession {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Persist the session, overwriting any prior content.
    ///
    /// Writes a sibling temp file and renames it over the target so a
    /// concurrent reader never observes a half-written blob.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(session)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
