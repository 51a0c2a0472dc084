//! Wiring of config, session store and room service.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::auth::{CredentialStorage, Session, SessionStore};
use crate::config::Config;
use crate::service::RoomService;

/// Everything a front-end needs, built from one [`Config`].
pub struct App {
    pub config: Config,
    pub session: SessionStore,
    pub rooms: RoomService,
}

impl App {
    /// Build with the storage backend named in the config.
    pub fn new(config: Config) -> Result<Self> {
        let storage = config.open_storage().context("Failed to open credential storage")?;
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Box<dyn CredentialStorage>) -> Result<Self> {
        let api = ApiClient::new(config.api_url(), config.request_timeout())
            .with_context(|| format!("Invalid API URL {}", config.api_url()))?;
        debug!(api_url = %api.base_url(), storage = %storage.describe(), "Building app");

        let rooms = RoomService::new(api.clone(), config.logout_on_unauthorized);
        let session = SessionStore::new(api, storage);
        Ok(Self { config, session, rooms })
    }

    /// Restore the session from durable storage.
    pub fn start(&mut self) -> Session {
        let session = self.session.initialize();
        info!(session = %session, "Session ready");
        session
    }
}
