use std::fmt;

use serde::{Deserialize, Serialize};

/// In-memory authentication state of the running client.
///
/// Replaced wholesale on every transition; never mutated field by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    /// Logged in as the contained principal (the email submitted at login).
    Authenticated(String),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn principal(&self) -> Option<&str> {
        match self {
            Session::Authenticated(principal) => Some(principal),
            Session::Anonymous => None,
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Session::Anonymous => f.write_str("not logged in"),
            Session::Authenticated(principal) => write!(f, "logged in as {}", principal),
        }
    }
}

/// Bearer token plus the principal it was issued to.
///
/// This is also the durable record: on disk the token lives under `jwt`
/// and the principal under `username`, always written and cleared together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "jwt")]
    pub token: String,
    #[serde(rename = "username")]
    pub principal: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            principal: principal.into(),
        }
    }

    /// A record only establishes a session when both halves are present.
    pub fn is_usable(&self) -> bool {
        !self.token.is_empty() && !self.principal.is_empty()
    }

    pub fn session(&self) -> Session {
        Session::Authenticated(self.principal.clone())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("principal", &self.principal)
            .finish()
    }
}
