use serde::{Deserialize, Serialize};

use crate::utils::{format_coordinates, format_distance, format_duration};

/// Result of `GET /external/geocode`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn display(&self) -> String {
        format_coordinates(self.latitude, self.longitude)
    }
}

/// Result of `GET /external/room-distance`: travel from a room to campus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomDistance {
    pub distance_meters: f64,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl RoomDistance {
    pub fn display(&self) -> String {
        match self.duration_seconds {
            Some(secs) => format!("{} ({})", format_distance(self.distance_meters), format_duration(secs)),
            None => format_distance(self.distance_meters),
        }
    }
}
