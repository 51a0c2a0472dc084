//! Listing and application operations on top of the session store.
//!
//! Protected calls borrow the bearer token from the `SessionStore`. When
//! `logout_on_unauthorized` is set, a 401 from a protected endpoint means
//! the backend no longer accepts the token, and the session is cleared
//! instead of leaving a stale login on screen. A 403 never logs out.

use std::future::Future;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{AuthError, SessionStore};
use crate::filter::{ApplicationFilter, RoomFilter};
use crate::models::{Application, ApplicationIndex, ApplicationStatus, Coordinates, Room, RoomDistance};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("No application found to cancel.")]
    NoApplication { room_id: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// An application joined with its room, when the room is still listed.
#[derive(Debug, Clone)]
pub struct ApplicationView {
    pub application: Application,
    pub room: Option<Room>,
}

/// A room with the user's application status for it, if any.
#[derive(Debug, Clone)]
pub struct RoomView {
    pub room: Room,
    /// Status and id of the user's latest application for the room.
    pub application: Option<(ApplicationStatus, String)>,
}

pub struct RoomService {
    api: ApiClient,
    logout_on_unauthorized: bool,
}

impl RoomService {
    pub fn new(api: ApiClient, logout_on_unauthorized: bool) -> Self {
        Self {
            api,
            logout_on_unauthorized,
        }
    }

    /// Run a protected call with the session's token.
    async fn authorized<T, F, Fut>(&self, store: &mut SessionStore, call: F) -> Result<T, ServiceError>
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let token = store
            .credential()
            .map(|c| c.token.clone())
            .ok_or(ServiceError::NotAuthenticated)?;

        match call(self.api.with_token(token)).await {
            Err(e) if e.is_unauthorized() && self.logout_on_unauthorized => {
                warn!(error = %e, "Backend rejected the session token, logging out");
                store.logout()?;
                Err(ServiceError::SessionExpired)
            }
            other => Ok(other?),
        }
    }

    // ===== Rooms (public) =====

    pub async fn rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, ServiceError> {
        let rooms = self.api.fetch_rooms().await?;
        let total = rooms.len();
        let filtered: Vec<Room> = rooms.into_iter().filter(|r| filter.matches(r)).collect();
        debug!(total, shown = filtered.len(), "Rooms filtered");
        Ok(filtered)
    }

    pub async fn room(&self, room_id: &str) -> Result<Room, ServiceError> {
        Ok(self.api.fetch_room(room_id).await?)
    }

    /// Rooms matching `filter`, each tagged with the user's application.
    pub async fn rooms_with_status(
        &self,
        store: &mut SessionStore,
        filter: &RoomFilter,
    ) -> Result<Vec<RoomView>, ServiceError> {
        let rooms = self.rooms(filter).await?;
        let index = self.application_index(store).await?;

        Ok(rooms
            .into_iter()
            .map(|room| {
                let application = index
                    .status(&room.id)
                    .cloned()
                    .zip(index.application_id(&room.id).map(str::to_string));
                RoomView { room, application }
            })
            .collect())
    }

    // ===== Applications (protected) =====

    pub async fn application_index(&self, store: &mut SessionStore) -> Result<ApplicationIndex, ServiceError> {
        let applications = self
            .authorized(store, |api| async move { api.fetch_applications().await })
            .await?;
        Ok(ApplicationIndex::new(&applications))
    }

    /// The user's applications matching `filter`, joined with their rooms.
    pub async fn applications(
        &self,
        store: &mut SessionStore,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationView>, ServiceError> {
        let applications = self
            .authorized(store, |api| async move { api.fetch_applications().await })
            .await?;

        // Room details are only a nicety; a listing failure leaves them blank
        let rooms = match self.api.fetch_rooms().await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(error = %e, "Failed to fetch rooms for applications view");
                Vec::new()
            }
        };

        let mut views: Vec<ApplicationView> = applications
            .into_iter()
            .map(|application| {
                let room = rooms.iter().find(|r| r.id == application.room_id).cloned();
                ApplicationView { application, room }
            })
            .filter(|v| filter.matches(&v.application, v.room.as_ref()))
            .collect();
        views.sort_by(|a, b| b.application.applied_at.cmp(&a.application.applied_at));
        Ok(views)
    }

    pub async fn apply(&self, store: &mut SessionStore, room_id: &str) -> Result<Application, ServiceError> {
        let room_id = room_id.to_string();
        let application = self
            .authorized(store, |api| async move { api.submit_application(&room_id).await })
            .await?;
        debug!(application_id = %application.id, room_id = %application.room_id, "Application submitted");
        Ok(application)
    }

    pub async fn cancel(&self, store: &mut SessionStore, application_id: &str) -> Result<Application, ServiceError> {
        let application_id = application_id.to_string();
        let application = self
            .authorized(store, |api| async move { api.cancel_application(&application_id).await })
            .await?;
        debug!(application_id = %application.id, "Application cancelled");
        Ok(application)
    }

    /// Cancel the user's application for a room, looked up by room id.
    pub async fn cancel_for_room(&self, store: &mut SessionStore, room_id: &str) -> Result<Application, ServiceError> {
        let index = self.application_index(store).await?;
        let application_id = index
            .application_id(room_id)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::NoApplication {
                room_id: room_id.to_string(),
            })?;
        self.cancel(store, &application_id).await
    }

    // ===== Geodata (public) =====

    pub async fn geocode(&self, postcode: &str) -> Result<Coordinates, ServiceError> {
        Ok(self.api.geocode(postcode).await?)
    }

    pub async fn distance(&self, room_id: &str) -> Result<RoomDistance, ServiceError> {
        Ok(self.api.room_distance(room_id).await?)
    }

    /// Distance to campus for several rooms at once. Each lookup fails
    /// independently.
    pub async fn distances<'a>(&self, rooms: &'a [Room]) -> Vec<(&'a Room, Result<RoomDistance, ApiError>)> {
        let lookups = rooms.iter().map(|room| async move { (room, self.api.room_distance(&room.id).await) });
        join_all(lookups).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{Credential, MemoryStorage, Session};

    fn api(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("client should build")
    }

    fn logged_in(server: &MockServer, storage: MemoryStorage) -> SessionStore {
        let mut store = SessionStore::new(api(server), Box::new(storage));
        store.initialize();
        store
    }

    fn room_json(id: &str, title: &str, price: f64) -> serde_json::Value {
        json!({"id": id, "title": title, "description": null, "address": format!("{} Road", title), "price_per_month": price, "postcode": "E1 4NS"})
    }

    fn app_json(id: &str, room_id: &str, status: &str, at: &str) -> serde_json::Value {
        json!({"id": id, "user_email": "u@x.com", "room_id": room_id, "status": status, "applied_at": at})
    }

    async fn mount_rooms(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rooms/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                room_json("r1", "Mile End", 650.0),
                room_json("r2", "Bow", 420.0),
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_rooms_are_public_and_filtered() {
        let server = MockServer::start().await;
        mount_rooms(&server).await;

        let service = RoomService::new(api(&server), true);
        let filter = RoomFilter {
            max_price: Some(500.0),
            ..Default::default()
        };
        let rooms = service.rooms(&filter).await.expect("rooms");
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, "r2");
    }

    #[tokio::test]
    async fn test_protected_call_requires_session() {
        let server = MockServer::start().await;
        let mut store = logged_in(&server, MemoryStorage::new());

        let service = RoomService::new(api(&server), true);
        let err = service.apply(&mut store, "r1").await.err().expect("should fail");
        assert!(matches!(err, ServiceError::NotAuthenticated));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_apply_sends_token_and_room() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/applications/"))
            .and(header("authorization", "Bearer T1"))
            .and(body_json(json!({"room_id": "r1"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(app_json("a1", "r1", "applied", "2024-05-01T09:00:00")))
            .expect(1)
            .mount(&server)
            .await;

        let mut store = logged_in(&server, MemoryStorage::with_record(Credential::new("T1", "u@x.com")));
        let service = RoomService::new(api(&server), true);

        let application = service.apply(&mut store, "r1").await.expect("apply");
        assert_eq!(application.status.label(), "Pending");
    }

    #[tokio::test]
    async fn test_unauthorized_forces_logout_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/applications/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid authentication credentials"})))
            .mount(&server)
            .await;

        let storage = MemoryStorage::with_record(Credential::new("stale", "u@x.com"));
        let mut store = logged_in(&server, storage.clone());
        let guard = store.guard();
        let service = RoomService::new(api(&server), true);

        let err = service
            .applications(&mut store, &ApplicationFilter::default())
            .await
            .err()
            .expect("should fail");
        assert!(matches!(err, ServiceError::SessionExpired));
        assert_eq!(store.current(), Some(Session::Anonymous));
        assert_eq!(storage.snapshot(), None);
        assert_eq!(guard.state(), crate::auth::GuardState::Denied);
    }

    #[tokio::test]
    async fn test_unauthorized_keeps_session_when_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/applications/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut store = logged_in(&server, MemoryStorage::with_record(Credential::new("stale", "u@x.com")));
        let service = RoomService::new(api(&server), false);

        let err = service.application_index(&mut store).await.err().expect("should fail");
        assert!(matches!(err, ServiceError::Api(ApiError::Unauthorized(_))));
        assert!(store.current().is_some_and(|s| s.is_authenticated()));
    }

    #[tokio::test]
    async fn test_forbidden_never_logs_out() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/applications/a1/cancel"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Forbidden"})))
            .mount(&server)
            .await;

        let mut store = logged_in(&server, MemoryStorage::with_record(Credential::new("T1", "u@x.com")));
        let service = RoomService::new(api(&server), true);

        let err = service.cancel(&mut store, "a1").await.err().expect("should fail");
        assert!(matches!(err, ServiceError::Api(ApiError::AccessDenied(_))));
        assert!(store.current().is_some_and(|s| s.is_authenticated()));
    }

    #[tokio::test]
    async fn test_applications_joined_filtered_and_sorted() {
        let server = MockServer::start().await;
        mount_rooms(&server).await;
        Mock::given(method("GET"))
            .and(path("/applications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                app_json("a1", "r1", "applied", "2024-05-01T09:00:00"),
                app_json("a2", "r2", "cancelled", "2024-05-02T09:00:00"),
                app_json("a3", "gone", "pending", "2024-05-03T09:00:00"),
            ])))
            .mount(&server)
            .await;

        let mut store = logged_in(&server, MemoryStorage::with_record(Credential::new("T1", "u@x.com")));
        let service = RoomService::new(api(&server), true);

        let all = service
            .applications(&mut store, &ApplicationFilter::default())
            .await
            .expect("applications");
        let ids: Vec<&str> = all.iter().map(|v| v.application.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a2", "a1"]);
        assert!(all[0].room.is_none());
        assert_eq!(all[2].room.as_ref().map(|r| r.title.as_str()), Some("Mile End"));

        let pending = ApplicationFilter {
            status: Some(ApplicationStatus::Pending),
            ..Default::default()
        };
        let pending = service.applications(&mut store, &pending).await.expect("applications");
        let ids: Vec<&str> = pending.iter().map(|v| v.application.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a1"]);
    }

    #[tokio::test]
    async fn test_rooms_with_status() {
        let server = MockServer::start().await;
        mount_rooms(&server).await;
        Mock::given(method("GET"))
            .and(path("/applications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                app_json("a1", "r1", "applied", "2024-05-01T09:00:00"),
            ])))
            .mount(&server)
            .await;

        let mut store = logged_in(&server, MemoryStorage::with_record(Credential::new("T1", "u@x.com")));
        let service = RoomService::new(api(&server), true);

        let views = service
            .rooms_with_status(&mut store, &RoomFilter::default())
            .await
            .expect("rooms");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].application, Some((ApplicationStatus::Applied, "a1".to_string())));
        assert_eq!(views[1].application, None);
    }

    #[tokio::test]
    async fn test_cancel_for_room_without_application() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/applications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut store = logged_in(&server, MemoryStorage::with_record(Credential::new("T1", "u@x.com")));
        let service = RoomService::new(api(&server), true);

        let err = service.cancel_for_room(&mut store, "r9").await.err().expect("should fail");
        assert_eq!(err.to_string(), "No application found to cancel.");
    }

    #[tokio::test]
    async fn test_cancel_for_room_uses_indexed_application() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/applications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                app_json("a7", "r1", "applied", "2024-05-01T09:00:00"),
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/applications/a7/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(app_json("a7", "r1", "cancelled", "2024-05-01T09:00:00")))
            .expect(1)
            .mount(&server)
            .await;

        let mut store = logged_in(&server, MemoryStorage::with_record(Credential::new("T1", "u@x.com")));
        let service = RoomService::new(api(&server), true);

        let cancelled = service.cancel_for_room(&mut store, "r1").await.expect("cancel");
        assert_eq!(cancelled.status, ApplicationStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_distances_fail_independently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/external/room-distance"))
            .and(query_param("room_id", "r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"distance_meters": 2300.0, "duration_seconds": 600.0})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/external/room-distance"))
            .and(query_param("room_id", "r2"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Failed to geocode postcodes"})))
            .mount(&server)
            .await;

        let rooms: Vec<Room> = serde_json::from_value(json!([room_json("r1", "Mile End", 650.0), room_json("r2", "Bow", 420.0)]))
            .expect("rooms");
        let service = RoomService::new(api(&server), true);

        let results = service.distances(&rooms).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.as_ref().map(|d| d.display()).ok(), Some("2.3 km (10 min)".to_string()));
        assert_eq!(
            results[1].1.as_ref().err().and_then(|e| e.detail()),
            Some("Failed to geocode postcodes")
        );
    }
}
