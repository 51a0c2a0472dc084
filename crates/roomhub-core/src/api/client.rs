//! API client for communicating with the room-listing REST API.
//!
//! This module provides the `ApiClient` struct for the account endpoints
//! (`/users/login`, `/users/register`) and the listing, application, and
//! geodata endpoints used once a session exists.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{
    Application, Coordinates, Credentials, LoginResponse, NewApplication, RegistrationResult,
    Room, RoomDistance,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Backend used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// HTTP request timeout in seconds.
/// Bounds every call so login/register always resolve.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
#[cfg(not(test))]
const INITIAL_BACKOFF_MS: u64 = 1000;
#[cfg(test)]
const INITIAL_BACKOFF_MS: u64 = 10;

/// API client for the room-listing backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client for `base_url` with the given request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    /// Build an endpoint URL from path segments. A trailing `""` segment
    /// yields a trailing slash (`/rooms/`).
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, what).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            debug!(url = %url, "GET");
            match self.send(self.request(Method::GET, url.clone()), what).await {
                Err(ApiError::RateLimited) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
                other => return other,
            }
        }
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        what: &str,
    ) -> Result<T, ApiError> {
        debug!(url = %url, "POST");
        self.send(self.request(Method::POST, url).json(body), what).await
    }

    // ===== Account =====

    /// Exchange email and password for a bearer token
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint(&["users", "login"]);
        self.post(url, &Credentials { email, password }, "login response")
            .await
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, email: &str, password: &str) -> Result<RegistrationResult, ApiError> {
        let url = self.endpoint(&["users", "register"]);
        self.post(url, &Credentials { email, password }, "registration response")
            .await
    }

    // ===== Rooms =====

    /// Fetch every room listing
    pub async fn fetch_rooms(&self) -> Result<Vec<Room>, ApiError> {
        self.get(self.endpoint(&["rooms", ""]), "rooms").await
    }

    pub async fn fetch_room(&self, room_id: &str) -> Result<Room, ApiError> {
        self.get(self.endpoint(&["rooms", room_id]), "room").await
    }

    // ===== Applications (bearer token required) =====

    /// Fetch the current user's applications
    pub async fn fetch_applications(&self) -> Result<Vec<Application>, ApiError> {
        self.get(self.endpoint(&["applications", ""]), "applications")
            .await
    }

    /// Apply for a room
    pub async fn submit_application(&self, room_id: &str) -> Result<Application, ApiError> {
        let url = self.endpoint(&["applications", ""]);
        self.post(url, &NewApplication { room_id }, "application")
            .await
    }

    /// Cancel an application by its id
    pub async fn cancel_application(&self, application_id: &str) -> Result<Application, ApiError> {
        let url = self.endpoint(&["applications", application_id, "cancel"]);
        debug!(url = %url, "PATCH");
        self.send(self.request(Method::PATCH, url), "application")
            .await
    }

    // ===== External geodata =====

    /// Look up coordinates for a postcode
    pub async fn geocode(&self, postcode: &str) -> Result<Coordinates, ApiError> {
        let mut url = self.endpoint(&["external", "geocode"]);
        url.query_pairs_mut().append_pair("postcode", postcode);
        self.get(url, "geocode response").await
    }

    /// Travel distance from a room to campus
    pub async fn room_distance(&self, room_id: &str) -> Result<RoomDistance, ApiError> {
        let mut url = self.endpoint(&["external", "room-distance"]);
        url.query_pairs_mut().append_pair("room_id", room_id);
        self.get(url, "distance response").await
    }
}
