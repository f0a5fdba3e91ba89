//! Turns raw Open-Meteo responses into [`Weather`] values.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use super::openmeteo::{Column, ForecastResponse, GeocodingResponse, Series};
use crate::{
    error::MeteoError,
    model::{FORECAST_HOURS, Location, Weather},
};

/// Empirical factor from shortwave irradiance (W/m²) to UV index.
pub const UV_PER_IRRADIANCE: f64 = 0.0016;

/// Approximate UV index from the direct and diffuse radiation components.
///
/// A linear proxy, not a physical UV computation.
pub fn approx_uv(direct_radiation: f64, diffuse_radiation: f64) -> f64 {
    (direct_radiation + diffuse_radiation) * UV_PER_IRRADIANCE
}

pub fn weather_code_label(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",

        45 => "Fog",
        48 => "Depositing rime fog",

        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",

        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",

        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",

        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",

        85 => "Slight snow showers",
        86 => "Heavy snow showers",

        95 => "Thunderstorm",
        96 => "Thunderstorm with hail (moderate)",
        99 => "Thunderstorm with hail (heavy)",

        _ => "Unknown weather code",
    }
}

/// Append the UTC designator the API leaves off.
pub fn to_utc_timestamp(raw: &str) -> String {
    if raw.ends_with('Z') { raw.to_string() } else { format!("{raw}Z") }
}

pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, MeteoError> {
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S"))
        .map(|dt| dt.and_utc())
        .map_err(|_| MeteoError::InvalidTimestamp(raw.to_string()))
}

/// Outcome of a next-24-hours lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    /// Exactly [`FORECAST_HOURS`] points.
    Complete(Vec<Weather>),
    /// The provider ran out of hourly points before 24.
    Truncated(Vec<Weather>),
    /// No hourly timestamp lies after the current one.
    Empty,
}

impl Forecast {
    pub fn as_slice(&self) -> &[Weather] {
        match self {
            Forecast::Complete(points) | Forecast::Truncated(points) => points,
            Forecast::Empty => &[],
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Forecast::Complete(_))
    }

    pub fn into_weathers(self) -> Vec<Weather> {
        match self {
            Forecast::Complete(points) | Forecast::Truncated(points) => points,
            Forecast::Empty => Vec::new(),
        }
    }

    pub fn into_complete(self) -> Result<Vec<Weather>, MeteoError> {
        match self {
            Forecast::Complete(points) => Ok(points),
            other => Err(MeteoError::IncompleteForecast {
                expected: FORECAST_HOURS,
                actual: other.as_slice().len(),
            }),
        }
    }
}

/// Current conditions: the `current_weather` snapshot, completed by the
/// 15-minute series at the same timestamp.
pub fn current_weather(
    response: &ForecastResponse,
    location: &Location,
) -> Result<Weather, MeteoError> {
    let current = response
        .current_weather
        .as_ref()
        .ok_or(MeteoError::MissingField("current_weather"))?;
    let series = response.minutely_15.as_ref().ok_or(MeteoError::MissingField("minutely_15"))?;
    let times = series.time.as_deref().ok_or(MeteoError::MissingField("minutely_15.time"))?;

    let timestamp = to_utc_timestamp(&current.time);
    let index = times
        .iter()
        .position(|t| to_utc_timestamp(t) == timestamp)
        .ok_or_else(|| MeteoError::TimestampNotFound(timestamp.clone()))?;

    let direct = value_at(&series.direct_radiation, "minutely_15.direct_radiation", index)?;
    let diffuse = value_at(&series.diffuse_radiation, "minutely_15.diffuse_radiation", index)?;

    Ok(Weather {
        temperature: current.temperature,
        apparent_temperature: value_at(
            &series.apparent_temperature,
            "minutely_15.apparent_temperature",
            index,
        )?,
        precipitation: value_at(&series.precipitation, "minutely_15.precipitation", index)?,
        humidity: value_at(
            &series.relative_humidity_2m,
            "minutely_15.relative_humidity_2m",
            index,
        )?,
        wind: current.windspeed,
        cloudcover: value_at(&series.cloudcover, "minutely_15.cloudcover", index)?,
        approx_uv: approx_uv(direct, diffuse),
        timestamp,
        weather_code: weather_code_label(current.weathercode).to_string(),
        location: location.clone(),
        is_day: Some(current.is_day),
    })
}

/// The hourly points strictly after the current timestamp, at most 24 of them.
pub fn next_24_hours(
    response: &ForecastResponse,
    location: &Location,
) -> Result<Forecast, MeteoError> {
    let current = response
        .current_weather
        .as_ref()
        .ok_or(MeteoError::MissingField("current_weather"))?;
    let series = response.hourly.as_ref().ok_or(MeteoError::MissingField("hourly"))?;
    let times = series.time.as_deref().ok_or(MeteoError::MissingField("hourly.time"))?;

    let anchor = parse_utc(&current.time)?;
    let mut start = None;
    for (i, t) in times.iter().enumerate() {
        if parse_utc(t)? > anchor {
            start = Some(i);
            break;
        }
    }

    let Some(start) = start else {
        warn!(
            anchor = %current.time,
            points = times.len(),
            "no hourly point after the current time"
        );
        return Ok(Forecast::Empty);
    };

    let available = hourly_len(series, times.len())?;
    let end = (start + FORECAST_HOURS).min(available);

    let points = (start..end)
        .map(|i| hourly_point(series, &times[i], i, location))
        .collect::<Result<Vec<_>, _>>()?;

    if points.len() < FORECAST_HOURS {
        warn!(start, available, got = points.len(), "hourly series shorter than 24 points");
        if points.is_empty() {
            return Ok(Forecast::Empty);
        }
        return Ok(Forecast::Truncated(points));
    }

    debug!(start, "built 24 hour forecast");
    Ok(Forecast::Complete(points))
}

/// Candidate locations of a geocoding search; none when `results` is absent.
pub fn search_results(response: GeocodingResponse) -> Vec<Location> {
    response
        .results
        .unwrap_or_default()
        .into_iter()
        .map(|hit| Location {
            name: hit.name,
            country: hit.country,
            latitude: hit.latitude,
            longitude: hit.longitude,
        })
        .collect()
}

fn hourly_point(
    series: &Series,
    time: &str,
    i: usize,
    location: &Location,
) -> Result<Weather, MeteoError> {
    let direct = value_at(&series.direct_radiation, "hourly.direct_radiation", i)?;
    let diffuse = value_at(&series.diffuse_radiation, "hourly.diffuse_radiation", i)?;
    let code = value_at(&series.weathercode, "hourly.weathercode", i)?;

    Ok(Weather {
        temperature: value_at(&series.temperature_2m, "hourly.temperature_2m", i)?,
        apparent_temperature: value_at(
            &series.apparent_temperature,
            "hourly.apparent_temperature",
            i,
        )?,
        precipitation: value_at(&series.precipitation, "hourly.precipitation", i)?,
        humidity: value_at(&series.relative_humidity_2m, "hourly.relative_humidity_2m", i)?,
        wind: value_at(&series.windspeed_10m, "hourly.windspeed_10m", i)?,
        cloudcover: value_at(&series.cloudcover, "hourly.cloudcover", i)?,
        approx_uv: approx_uv(direct, diffuse),
        timestamp: to_utc_timestamp(time),
        weather_code: weather_code_label(code).to_string(),
        location: location.clone(),
        is_day: None,
    })
}

/// Shortest of `time` and every column a forecast point reads.
fn hourly_len(series: &Series, times: usize) -> Result<usize, MeteoError> {
    let lens = [
        column_len(&series.temperature_2m, "hourly.temperature_2m")?,
        column_len(&series.apparent_temperature, "hourly.apparent_temperature")?,
        column_len(&series.precipitation, "hourly.precipitation")?,
        column_len(&series.relative_humidity_2m, "hourly.relative_humidity_2m")?,
        column_len(&series.windspeed_10m, "hourly.windspeed_10m")?,
        column_len(&series.cloudcover, "hourly.cloudcover")?,
        column_len(&series.direct_radiation, "hourly.direct_radiation")?,
        column_len(&series.diffuse_radiation, "hourly.diffuse_radiation")?,
        column_len(&series.weathercode, "hourly.weathercode")?,
    ];
    Ok(lens.into_iter().fold(times, usize::min))
}

fn column_len<T>(column: &Column<T>, field: &'static str) -> Result<usize, MeteoError> {
    column.as_ref().map(Vec::len).ok_or(MeteoError::MissingField(field))
}

fn value_at<T: Copy>(
    column: &Column<T>,
    field: &'static str,
    index: usize,
) -> Result<T, MeteoError> {
    let values = column.as_ref().ok_or(MeteoError::MissingField(field))?;
    values
        .get(index)
        .copied()
        .flatten()
        .ok_or(MeteoError::MissingValue { field, index })
}
