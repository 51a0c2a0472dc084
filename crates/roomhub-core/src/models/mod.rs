//! Data models for the room-listing backend.
//!
//! - `Room`: a listing from `GET /rooms/`
//! - `Application`, `ApplicationStatus`, `ApplicationIndex`: the user's
//!   applications and a per-room lookup over them
//! - `Coordinates`, `RoomDistance`: geocode and distance-to-campus lookups
//! - `Credentials`, `LoginResponse`, `RegistrationResult`: account endpoints

pub mod application;
pub mod geo;
pub mod room;
pub mod user;

pub use application::{Application, ApplicationIndex, ApplicationStatus, NewApplication};
pub use geo::{Coordinates, RoomDistance};
pub use room::Room;
pub use user::{Credentials, LoginResponse, RegistrationResult};
