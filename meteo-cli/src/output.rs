//! Plain-text rendering of locations and readings.

use meteo_core::{Location, SavedEntry, Weather};

pub fn location_label(location: &Location) -> String {
    format!(
        "{}, {} ({:.4}, {:.4})",
        location.name, location.country, location.latitude, location.longitude
    )
}

pub fn weather_line(weather: &Weather) -> String {
    let daylight = match weather.is_day {
        Some(true) => " day",
        Some(false) => " night",
        None => "",
    };
    format!(
        "{} {:>5.1}°C (feels {:.1}°C) {}, humidity {:.0}%, wind {:.1} km/h, clouds {:.0}%, \
         precip {:.1} mm, UV~{:.1}{daylight}",
        weather.timestamp,
        weather.temperature,
        weather.apparent_temperature,
        weather.weather_code,
        weather.humidity,
        weather.wind,
        weather.cloudcover,
        weather.precipitation,
        weather.approx_uv,
    )
}

pub fn saved_entry(entry: &SavedEntry) -> String {
    format!(
        "{}\n    {}\n    updated {}",
        location_label(&entry.location),
        weather_line(&entry.current_weather),
        entry.updated_at_timestamp.format("%Y-%m-%d %H:%M UTC"),
    )
}

pub fn forecast_table(points: &[Weather]) -> String {
    points
        .iter()
        .map(|w| format!("    {}", weather_line(w)))
        .collect::<Vec<_>>()
        .join("\n")
}
