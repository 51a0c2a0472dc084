use serde::{Deserialize, Serialize};

use crate::utils::format_price;

/// A room listing as served by `GET /rooms/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    pub price_per_month: f64,
    pub postcode: String,
}

impl Room {
    /// Headline shown in listings: the address when present, else the title.
    pub fn headline(&self) -> &str {
        if self.address.trim().is_empty() {
            &self.title
        } else {
            &self.address
        }
    }

    pub fn display_price(&self) -> String {
        format_price(self.price_per_month)
    }

    pub fn display_description(&self) -> &str {
        self.description.as_deref().unwrap_or("No description")
    }
}
