//! HTTP client for the Open-Meteo forecast and geocoding APIs.
//!
//! Timestamps in these responses are UTC but carry no `Z` designator.

use std::collections::BTreeMap;

use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use tracing::debug;

use crate::{config::ApiConfig, error::MeteoError};

const USER_AGENT: &str = concat!("meteo/", env!("CARGO_PKG_VERSION"));

const SERIES_FIELDS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
precipitation,rain,snowfall,shortwave_radiation,direct_radiation,diffuse_radiation,\
cloudcover,windspeed_10m,weathercode";

const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,apparent_temperature_max,\
apparent_temperature_min,sunrise,sunset,daylight_duration,sunshine_duration,precipitation_sum,\
rain_sum,snowfall_sum,precipitation_hours,weathercode,windspeed_10m_max,windgusts_10m_max,\
winddirection_10m_dominant";

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    forecast_url: Url,
    geocoding_url: Url,
    http: Client,
}

impl OpenMeteoClient {
    pub fn new(config: &ApiConfig) -> Result<Self, MeteoError> {
        let http = Client::builder().timeout(config.timeout()).user_agent(USER_AGENT).build()?;

        Ok(Self {
            forecast_url: parse_base(&config.forecast_url)?,
            geocoding_url: parse_base(&config.geocoding_url)?,
            http,
        })
    }

    pub fn current_url(&self, latitude: f64, longitude: f64) -> Url {
        self.forecast_query(latitude, longitude, &[("minutely_15", SERIES_FIELDS)])
    }

    pub fn hourly_url(&self, latitude: f64, longitude: f64) -> Url {
        self.forecast_query(latitude, longitude, &[("hourly", SERIES_FIELDS)])
    }

    pub fn daily_url(&self, latitude: f64, longitude: f64) -> Url {
        self.forecast_query(latitude, longitude, &[("daily", DAILY_FIELDS), ("timezone", "GMT")])
    }

    pub fn search_url(&self, query: &str) -> Url {
        let mut url = self.geocoding_url.clone();
        url.query_pairs_mut().append_pair("name", query);
        url
    }

    fn forecast_query(&self, latitude: f64, longitude: f64, extra: &[(&str, &str)]) -> Url {
        let mut url = self.forecast_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("latitude", &latitude.to_string())
                .append_pair("longitude", &longitude.to_string())
                .append_pair("current_weather", "true");
            for (key, value) in extra {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// Current snapshot plus the 15-minute series around it.
    pub async fn fetch_current_and_subhourly(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastResponse, MeteoError> {
        self.get_json("minutely_15 forecast", self.current_url(latitude, longitude)).await
    }

    /// Hourly series plus the current snapshot used as its anchor.
    pub async fn fetch_hourly(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastResponse, MeteoError> {
        self.get_json("hourly forecast", self.hourly_url(latitude, longitude)).await
    }

    pub async fn fetch_daily(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastResponse, MeteoError> {
        self.get_json("daily forecast", self.daily_url(latitude, longitude)).await
    }

    pub async fn search_locations(&self, query: &str) -> Result<GeocodingResponse, MeteoError> {
        self.get_json("location search", self.search_url(query)).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
    ) -> Result<T, MeteoError> {
        debug!(%url, "requesting {endpoint}");

        let res = self.http.get(url).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(MeteoError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        debug!(bytes = body.len(), "received {endpoint}");
        serde_json::from_str(&body).map_err(|source| MeteoError::Validation { endpoint, source })
    }
}

fn parse_base(url: &str) -> Result<Url, MeteoError> {
    Url::parse(url).map_err(|_| MeteoError::InvalidBaseUrl(url.to_string()))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i64,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub elevation: f64,

    pub current_weather_units: Option<Units>,
    pub current_weather: Option<CurrentWeather>,

    pub hourly_units: Option<Units>,
    pub hourly: Option<Series>,

    pub minutely_15_units: Option<Units>,
    pub minutely_15: Option<Series>,

    pub daily_units: Option<Units>,
    pub daily: Option<DailySeries>,

    pub forecast_metadata: Option<ForecastMetadata>,
}

/// Field name to unit label, e.g. `"temperature_2m" -> "°C"`.
pub type Units = BTreeMap<String, String>;

/// One column of a time series; `None` entries are gaps for that timestep.
/// Structs holding columns need `#[serde(default)]` to accept absent ones.
pub type Column<T> = Option<Vec<Option<T>>>;

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub time: String,
    pub interval: Option<i64>,
    pub temperature: f64,
    pub windspeed: f64,
    pub winddirection: f64,
    #[serde(deserialize_with = "bool_or_int")]
    pub is_day: bool,
    pub weathercode: i32,
}

/// Shared shape of the `hourly` and `minutely_15` blocks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Series {
    pub time: Option<Vec<String>>,
    pub temperature_2m: Column<f64>,
    pub apparent_temperature: Column<f64>,
    pub relative_humidity_2m: Column<f64>,
    pub dew_point_2m: Column<f64>,
    pub precipitation: Column<f64>,
    pub rain: Column<f64>,
    pub snowfall: Column<f64>,
    pub weathercode: Column<i32>,
    pub cloudcover: Column<f64>,
    pub pressure_msl: Column<f64>,
    pub surface_pressure: Column<f64>,
    pub windspeed_10m: Column<f64>,
    pub winddirection_10m: Column<f64>,
    pub windgusts_10m: Column<f64>,
    pub shortwave_radiation: Column<f64>,
    pub direct_radiation: Column<f64>,
    pub diffuse_radiation: Column<f64>,
    pub evapotranspiration: Column<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DailySeries {
    pub time: Option<Vec<String>>,
    pub temperature_2m_max: Column<f64>,
    pub temperature_2m_min: Column<f64>,
    pub apparent_temperature_max: Column<f64>,
    pub apparent_temperature_min: Column<f64>,
    pub sunrise: Column<String>,
    pub sunset: Column<String>,
    pub daylight_duration: Column<f64>,
    pub sunshine_duration: Column<f64>,
    pub precipitation_sum: Column<f64>,
    pub rain_sum: Column<f64>,
    pub snowfall_sum: Column<f64>,
    pub precipitation_hours: Column<f64>,
    pub weathercode: Column<i32>,
    pub windspeed_10m_max: Column<f64>,
    pub windgusts_10m_max: Column<f64>,
    pub winddirection_10m_dominant: Column<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastMetadata {
    pub forecast_start: Option<String>,
    pub forecast_end: Option<String>,
    pub forecast_interval: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingResponse {
    pub generationtime_ms: Option<f64>,
    /// Omitted by the API when nothing matches.
    pub results: Option<Vec<GeocodingHit>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingHit {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub elevation: Option<f64>,
    pub feature_code: Option<String>,
    pub country_code: Option<String>,
    pub country_id: Option<i64>,
    pub admin1: Option<String>,
    pub admin1_id: Option<i64>,
    pub admin2: Option<String>,
    pub admin2_id: Option<i64>,
    pub admin3: Option<String>,
    pub admin3_id: Option<i64>,
    pub timezone: Option<String>,
    pub population: Option<u64>,
}

/// The API documents `is_day` as 0/1; older clients treated it as a boolean.
fn bool_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(i) => Ok(i != 0),
    }
}
