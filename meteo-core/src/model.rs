use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of hourly points kept for every saved location.
pub const FORECAST_HOURS: usize = 24;

/// A place on the map, as retained from a geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn unique_id(&self) -> String {
        unique_location_id(self)
    }

    /// Two locations are the same entity iff their ids are equal.
    pub fn same_place(&self, other: &Location) -> bool {
        self.unique_id() == other.unique_id()
    }
}

/// Identity key of a location: `"{latitude}, {longitude}"`.
///
/// Uses `f64`'s `Display`, which is locale independent and never switches to
/// scientific notation. Negative zero renders as `0`.
pub fn unique_location_id(location: &Location) -> String {
    format!(
        "{}, {}",
        format_coordinate(location.latitude),
        format_coordinate(location.longitude)
    )
}

fn format_coordinate(value: f64) -> String {
    if value == 0.0 { 0.0_f64.to_string() } else { value.to_string() }
}

/// Normalized weather at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub wind: f64,
    pub cloudcover: f64,
    pub approx_uv: f64,
    /// ISO-8601 UTC, always ending in `Z`.
    pub timestamp: String,
    /// Human-readable label of the WMO weather code.
    pub weather_code: String,
    pub location: Location,
    /// Unset for hourly forecast points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_day: Option<bool>,
}

/// A saved location with its latest readings. This is the persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEntry {
    pub updated_at_timestamp: DateTime<Utc>,
    pub location: Location,
    pub current_weather: Weather,
    pub next_24hours_forecast: Vec<Weather>,
}

/// What the caller hands to the store; the store stamps `updated_at_timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSavedEntry {
    pub location: Location,
    pub current_weather: Weather,
    pub next_24hours_forecast: Vec<Weather>,
}

impl NewSavedEntry {
    pub fn into_saved(self, updated_at_timestamp: DateTime<Utc>) -> SavedEntry {
        SavedEntry {
            updated_at_timestamp,
            location: self.location,
            current_weather: self.current_weather,
            next_24hours_forecast: self.next_24hours_forecast,
        }
    }
}
