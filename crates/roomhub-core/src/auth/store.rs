//! The session store: single source of truth for who the current user is.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::{AuthError, AuthOperation};
use super::guard::RouteGuard;
use super::storage::CredentialStorage;
use super::{Credential, Session};
use crate::api::ApiClient;
use crate::models::RegistrationResult;

/// Holds the current [`Session`] and the credential behind it.
///
/// Before [`initialize`](Self::initialize) the session is unknown
/// (`current()` is `None`) so guards report `Evaluating` rather than
/// redirecting. Mutators take `&mut self`: there is exactly one writer.
pub struct SessionStore {
    api: ApiClient,
    storage: Box<dyn CredentialStorage>,
    credential: Option<Credential>,
    state: watch::Sender<Option<Session>>,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: Box<dyn CredentialStorage>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            api,
            storage,
            credential: None,
            state,
        }
    }

    /// Derive the session from the durable record. Reads storage once;
    /// later calls return the current session untouched.
    pub fn initialize(&mut self) -> Session {
        if let Some(session) = self.current() {
            debug!("Session store already initialized");
            return session;
        }

        let session = match self.storage.load() {
            Ok(Some(credential)) => {
                debug!(principal = %credential.principal, "Session restored from storage");
                let session = credential.session();
                self.credential = Some(credential);
                session
            }
            Ok(None) => {
                debug!("No stored session");
                Session::Anonymous
            }
            Err(e) => {
                warn!(error = %e, storage = %self.storage.describe(), "Failed to read stored session, starting anonymous");
                Session::Anonymous
            }
        };

        self.replace(session)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// The current session, or `None` before `initialize()`.
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// The credential behind an authenticated session.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Receiver notified every time the session is replaced.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// A route guard that follows this store.
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.subscribe())
    }

    pub fn storage_location(&self) -> String {
        self.storage.describe()
    }

    /// Log in with one call to `POST /users/login`.
    ///
    /// On success the token and the *submitted* email are persisted and
    /// the session becomes `Authenticated(email)`. On failure neither the
    /// session nor the durable record changes.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .api
            .login(email, password)
            .await
            .map_err(|e| AuthError::from_api(AuthOperation::Login, e))?;

        let credential = Credential::new(response.access_token, email);
        if !credential.is_usable() {
            return Err(AuthError::invalid_response(
                AuthOperation::Login,
                "login response carried an empty access token",
            ));
        }

        self.storage
            .save(&credential)
            .map_err(|e| AuthError::storage(AuthOperation::Login, e))?;

        info!(principal = %email, "Logged in");
        let session = credential.session();
        self.credential = Some(credential);
        Ok(self.replace(session))
    }

    /// Create an account with one call to `POST /users/register`.
    ///
    /// Never touches the session or the durable record; log in separately.
    pub async fn register(&self, email: &str, password: &str) -> Result<RegistrationResult, AuthError> {
        let result = self
            .api
            .register(email, password)
            .await
            .map_err(|e| AuthError::from_api(AuthOperation::Register, e))?;

        info!(email = %email, "Registered");
        Ok(result)
    }

    /// Clear the durable record and become `Anonymous`. No network call;
    /// the backend is not told. Logging out while anonymous is a no-op.
    pub fn logout(&mut self) -> Result<Session, AuthError> {
        self.storage
            .clear()
            .map_err(|e| AuthError::storage(AuthOperation::Logout, e))?;

        if let Some(credential) = self.credential.take() {
            info!(principal = %credential.principal, "Logged out");
        }
        Ok(self.replace(Session::Anonymous))
    }

    fn replace(&mut self, session: Session) -> Session {
        self.state.send_replace(Some(session.clone()));
        session
    }
}
