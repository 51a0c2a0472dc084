//! REST API client module for the room-listing backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend: account registration and login, room listings, the user's
//! applications, and the geocode/distance helpers.
//!
//! Protected endpoints use JWT bearer token authentication; the token is
//! obtained from `POST /users/login` and held by the session store.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, Rejection};
