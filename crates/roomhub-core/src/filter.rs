//! Client-side filtering over fetched rooms and applications.
//!
//! Every criterion is optional; an empty filter matches everything.

use chrono::NaiveDate;

use crate::models::{Application, ApplicationStatus, Room};
use crate::utils::contains_ignore_case;

/// Room search criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomFilter {
    /// Case-insensitive substring of the address or title.
    pub location: Option<String>,
    /// Inclusive upper bound on monthly rent.
    pub max_price: Option<f64>,
    /// Substring of the postcode, ignoring case and spaces.
    pub postcode: Option<String>,
}

impl RoomFilter {
    pub fn is_empty(&self) -> bool {
        non_blank(&self.location).is_none() && self.max_price.is_none() && non_blank(&self.postcode).is_none()
    }

    pub fn matches(&self, room: &Room) -> bool {
        if let Some(location) = non_blank(&self.location) {
            if !contains_ignore_case(&room.address, location) && !contains_ignore_case(&room.title, location) {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            if room.price_per_month > max {
                return false;
            }
        }

        if let Some(postcode) = non_blank(&self.postcode) {
            if !compact_postcode(&room.postcode).contains(&compact_postcode(postcode)) {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, rooms: &'a [Room]) -> Vec<&'a Room> {
        rooms.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Application search criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationFilter {
    /// `pending` also matches applications the backend calls `applied`.
    pub status: Option<ApplicationStatus>,
    /// Calendar day (UTC) the application was made.
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring of the room's address or title.
    /// Needs the room; applications whose room is unknown never match.
    pub location: Option<String>,
}

impl ApplicationFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.date.is_none() && non_blank(&self.location).is_none()
    }

    pub fn matches(&self, application: &Application, room: Option<&Room>) -> bool {
        if let Some(ref status) = self.status {
            if !application.status.matches(status) {
                return false;
            }
        }

        if let Some(date) = self.date {
            if application.applied_on() != date {
                return false;
            }
        }

        if let Some(location) = non_blank(&self.location) {
            let Some(room) = room else {
                return false;
            };
            if !contains_ignore_case(&room.address, location) && !contains_ignore_case(&room.title, location) {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn compact_postcode(postcode: &str) -> String {
    postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::parse_timestamp;

    fn room(id: &str, title: &str, address: &str, price: f64, postcode: &str) -> Room {
        Room {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            address: address.to_string(),
            price_per_month: price,
            postcode: postcode.to_string(),
        }
    }

    fn rooms() -> Vec<Room> {
        vec![
            room("r1", "Large Ensuite", "12 Mile End Rd, London", 650.0, "E1 4NS"),
            room("r2", "Box Room", "3 Bow Common Ln", 420.0, "E3 4AU"),
            room("r3", "Studio near Stratford", "88 High St", 900.0, "E15 2PJ"),
        ]
    }

    fn application(room_id: &str, status: &str, at: &str) -> Application {
        Application {
            id: format!("app-{}", room_id),
            user_email: "u@x.com".to_string(),
            room_id: room_id.to_string(),
            status: ApplicationStatus::parse(status),
            applied_at: parse_timestamp(at).expect("test timestamp"),
        }
    }

    fn ids(rooms: Vec<&Room>) -> Vec<&str> {
        rooms.into_iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let rooms = rooms();
        let filter = RoomFilter {
            location: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&rooms).len(), 3);
    }

    #[test]
    fn test_location_matches_address_or_title() {
        let rooms = rooms();
        let by_address = RoomFilter {
            location: Some("mile end".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(by_address.apply(&rooms)), vec!["r1"]);

        let by_title = RoomFilter {
            location: Some("STRATFORD".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(by_title.apply(&rooms)), vec!["r3"]);
    }

    #[test]
    fn test_max_price_is_inclusive() {
        let rooms = rooms();
        let filter = RoomFilter {
            max_price: Some(650.0),
            ..Default::default()
        };
        assert_eq!(ids(filter.apply(&rooms)), vec!["r1", "r2"]);
    }

    #[test]
    fn test_postcode_ignores_case_and_spaces() {
        let rooms = rooms();
        let filter = RoomFilter {
            postcode: Some("e14".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(filter.apply(&rooms)), vec!["r1"]);
    }

    #[test]
    fn test_criteria_combine() {
        let rooms = rooms();
        let filter = RoomFilter {
            location: Some("london".to_string()),
            max_price: Some(500.0),
            postcode: None,
        };
        assert!(filter.apply(&rooms).is_empty());
    }

    #[test]
    fn test_application_status_filter() {
        let applied = application("r1", "applied", "2024-05-01T09:00:00");
        let cancelled = application("r2", "cancelled", "2024-05-01T09:00:00");

        let pending = ApplicationFilter {
            status: Some(ApplicationStatus::Pending),
            ..Default::default()
        };
        assert!(pending.matches(&applied, None));
        assert!(!pending.matches(&cancelled, None));
    }

    #[test]
    fn test_application_date_filter() {
        let app = application("r1", "applied", "2024-05-01T23:59:59");
        let filter = ApplicationFilter {
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..Default::default()
        };
        assert!(filter.matches(&app, None));

        let other_day = ApplicationFilter {
            date: NaiveDate::from_ymd_opt(2024, 5, 2),
            ..Default::default()
        };
        assert!(!other_day.matches(&app, None));
    }

    #[test]
    fn test_application_location_needs_room() {
        let rooms = rooms();
        let app = application("r2", "applied", "2024-05-01T09:00:00");
        let filter = ApplicationFilter {
            location: Some("bow".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&app, Some(&rooms[1])));
        assert!(!filter.matches(&app, Some(&rooms[0])));
        assert!(!filter.matches(&app, None));
        assert!(ApplicationFilter::default().matches(&app, None));
    }
}
