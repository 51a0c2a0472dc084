//! Room applications and their lifecycle status.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Status of an application as reported by the backend.
///
/// The backend creates applications as `applied`; users see that as
/// "Pending", and a `pending` filter matches both spellings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    Applied,
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Other(String),
}

impl ApplicationStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "applied" => Self::Applied,
            "pending" => Self::Pending,
            "accepted" | "approved" => Self::Accepted,
            "rejected" => Self::Rejected,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Applied => "applied",
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }

    /// Label shown to the user.
    pub fn label(&self) -> &str {
        match self {
            Self::Applied | Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
            Self::Other(s) => s,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Applied | Self::Pending)
    }

    /// Whether this status satisfies a status filter.
    pub fn matches(&self, wanted: &ApplicationStatus) -> bool {
        if wanted.is_pending() {
            return self.is_pending();
        }
        match (self, wanted) {
            (Self::Other(a), Self::Other(b)) => a.eq_ignore_ascii_case(b),
            _ => self == wanted,
        }
    }
}

impl From<String> for ApplicationStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ApplicationStatus> for String {
    fn from(status: ApplicationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(alias = "_id")]
    pub id: String,
    pub user_email: String,
    pub room_id: String,
    pub status: ApplicationStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub applied_at: DateTime<Utc>,
}

impl Application {
    pub fn applied_on(&self) -> NaiveDate {
        self.applied_at.date_naive()
    }
}

/// Body for `POST /applications/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewApplication<'a> {
    pub room_id: &'a str,
}

/// Accept RFC 3339 timestamps and the naive UTC form the backend emits
/// (`2024-05-01T09:30:00.123456`).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Per-room view of the user's applications: which rooms have been
/// applied to, with what status, and under which application id.
#[derive(Debug, Clone, Default)]
pub struct ApplicationIndex {
    by_room: HashMap<String, (ApplicationStatus, String)>,
}

impl ApplicationIndex {
    /// Build the index. When a room has several applications, the most
    /// recent one wins.
    pub fn new(applications: &[Application]) -> Self {
        let mut ordered: Vec<&Application> = applications.iter().collect();
        ordered.sort_by_key(|a| a.applied_at);

        let by_room = ordered
            .into_iter()
            .map(|a| (a.room_id.clone(), (a.status.clone(), a.id.clone())))
            .collect();
        Self { by_room }
    }

    pub fn status(&self, room_id: &str) -> Option<&ApplicationStatus> {
        self.by_room.get(room_id).map(|(status, _)| status)
    }

    pub fn application_id(&self, room_id: &str) -> Option<&str> {
        self.by_room.get(room_id).map(|(_, id)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_room.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_room.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str, room: &str, status: &str, at: &str) -> Application {
        Application {
            id: id.to_string(),
            user_email: "u@x.com".to_string(),
            room_id: room.to_string(),
            status: ApplicationStatus::parse(status),
            applied_at: parse_timestamp(at).expect("test timestamp"),
        }
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ApplicationStatus::parse("applied").label(), "Pending");
        assert_eq!(ApplicationStatus::parse("Pending").label(), "Pending");
        assert_eq!(ApplicationStatus::parse("ACCEPTED").label(), "Accepted");
        assert_eq!(ApplicationStatus::parse("canceled"), ApplicationStatus::Cancelled);
        assert_eq!(ApplicationStatus::parse("waitlisted").label(), "waitlisted");
    }

    #[test]
    fn test_pending_filter_matches_applied() {
        let pending = ApplicationStatus::Pending;
        assert!(ApplicationStatus::Applied.matches(&pending));
        assert!(ApplicationStatus::Pending.matches(&pending));
        assert!(!ApplicationStatus::Cancelled.matches(&pending));
        assert!(ApplicationStatus::Cancelled.matches(&ApplicationStatus::Cancelled));
        assert!(!ApplicationStatus::Applied.matches(&ApplicationStatus::Accepted));
    }

    #[test]
    fn test_parse_application_naive_timestamp() {
        let json = r#"{"id":"a1","user_email":"u@x.com","room_id":"r1","status":"applied","applied_at":"2024-05-01T09:30:00.123456"}"#;
        let parsed: Application = serde_json::from_str(json).expect("application should parse");
        assert_eq!(parsed.status, ApplicationStatus::Applied);
        assert_eq!(parsed.applied_on().to_string(), "2024-05-01");
    }

    #[test]
    fn test_parse_application_rfc3339_timestamp() {
        let json = r#"{"_id":"a2","user_email":"u@x.com","room_id":"r1","status":"cancelled","applied_at":"2024-05-01T23:30:00-02:00"}"#;
        let parsed: Application = serde_json::from_str(json).expect("application should parse");
        assert_eq!(parsed.id, "a2");
        assert_eq!(parsed.applied_on().to_string(), "2024-05-02");
    }

    #[test]
    fn test_status_round_trips_as_string() {
        let value = serde_json::to_value(ApplicationStatus::Applied).expect("serialize");
        assert_eq!(value, serde_json::json!("applied"));
    }

    #[test]
    fn test_application_index_latest_wins() {
        let apps = vec![
            app("new", "r1", "applied", "2024-05-03T10:00:00"),
            app("old", "r1", "cancelled", "2024-05-01T10:00:00"),
            app("other", "r2", "accepted", "2024-05-02T10:00:00"),
        ];
        let index = ApplicationIndex::new(&apps);
        assert_eq!(index.len(), 2);
        assert_eq!(index.application_id("r1"), Some("new"));
        assert_eq!(index.status("r1"), Some(&ApplicationStatus::Applied));
        assert_eq!(index.status("r2").map(|s| s.label()), Some("Accepted"));
        assert_eq!(index.status("missing"), None);
    }
}
