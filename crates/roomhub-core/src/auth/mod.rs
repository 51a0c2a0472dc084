//! Authentication module for the client session.
//!
//! This module provides:
//! - `SessionStore`: who the current user is; login, register, logout
//! - `RouteGuard`: allow or redirect a protected view based on the session
//! - `CredentialStorage`: the durable `(jwt, username)` record, backed by a
//!   file, the OS keychain, or memory
//!
//! Tokens carry no client-known expiry; a session stays authenticated
//! until logout or until the backend rejects the token.

pub mod error;
pub mod guard;
pub mod session;
pub mod storage;
pub mod store;

pub use error::{AuthError, AuthErrorKind, AuthOperation};
pub use guard::{GuardDecision, GuardState, Route, RouteGuard};
pub use session::{Credential, Session};
pub use storage::{CredentialStorage, FileStorage, KeyringStorage, MemoryStorage, StorageError};
pub use store::SessionStore;
