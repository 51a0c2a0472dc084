/// Format a monthly rent for display, dropping the fraction when whole
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("${:.0}/mo", price)
    } else {
        format!("${:.2}/mo", price)
    }
}

/// Format a distance in meters as kilometers with one decimal
pub fn format_distance(meters: f64) -> String {
    format!("{:.1} km", meters / 1000.0)
}

/// Format a travel time in seconds as minutes, or hours and minutes
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).round() as i64;
    if minutes < 1 {
        "<1 min".to_string()
    } else if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("Lat: {:.4}, Lng: {:.4}", latitude, longitude)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Case-insensitive substring check; an empty needle always matches
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
