//! roomhub core - client session and data access for the room-listing backend.
//!
//! The [`auth::SessionStore`] is the single source of truth for who the
//! user is; [`auth::RouteGuard`] gates protected views on it. The
//! [`service::RoomService`] covers rooms, applications and geodata, and
//! [`app::App`] wires everything together from a [`config::Config`].

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod filter;
pub mod models;
pub mod service;
pub mod utils;

pub use app::App;
pub use config::Config;
