use std::fmt;

use serde::{Deserialize, Serialize};

/// Body for `POST /users/login` and `POST /users/register`.
#[derive(Clone, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful `POST /users/login` response.
#[derive(Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Successful `POST /users/register` response.
///
/// The body is arbitrary JSON; this backend returns the public user
/// (`{"email": ...}`), which is exposed through [`RegistrationResult::email`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RegistrationResult(pub serde_json::Value);

impl RegistrationResult {
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(|v| v.as_str())
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.0
    }
}
