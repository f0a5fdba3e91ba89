//! Integration tests for the Open-Meteo provider using wiremock.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use meteo_core::{
    ApiConfig, FileStorage, Forecast, Location, MeteoError, OpenMeteoClient, OpenMeteoProvider,
    SavedLocations, WeatherProvider, fetch_save_entry,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERIES_FIELDS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
precipitation,rain,snowfall,shortwave_radiation,direct_radiation,diffuse_radiation,\
cloudcover,windspeed_10m,weathercode";

fn provider(server: &MockServer) -> OpenMeteoProvider {
    let config = ApiConfig {
        forecast_url: format!("{}/v1/forecast", server.uri()),
        geocoding_url: format!("{}/v1/search", server.uri()),
        timeout_secs: 5,
    };
    OpenMeteoProvider::new(OpenMeteoClient::new(&config).unwrap())
}

fn berlin() -> Location {
    Location { name: "Berlin".into(), country: "Germany".into(), latitude: 52.52, longitude: 13.41 }
}

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn series(len: usize, step_minutes: i64) -> Value {
    let time: Vec<String> = (0..len)
        .map(|i| {
            (start() + Duration::minutes(step_minutes * i as i64))
                .format("%Y-%m-%dT%H:%M")
                .to_string()
        })
        .collect();
    let ramp: Vec<f64> = (0..len).map(|i| i as f64).collect();
    let constant = |v: f64| vec![v; len];

    json!({
        "time": time,
        "temperature_2m": ramp,
        "apparent_temperature": ramp.iter().map(|t| t - 2.0).collect::<Vec<_>>(),
        "relative_humidity_2m": constant(70.0),
        "precipitation": constant(0.2),
        "rain": constant(0.2),
        "snowfall": constant(0.0),
        "shortwave_radiation": constant(400.0),
        "direct_radiation": constant(300.0),
        "diffuse_radiation": constant(100.0),
        "cloudcover": constant(25.0),
        "windspeed_10m": constant(8.5),
        "weathercode": vec![3; len],
    })
}

fn forecast_body(block: &str, len: usize, step_minutes: i64) -> Value {
    let mut body = json!({
        "latitude": 52.52,
        "longitude": 13.419998,
        "generationtime_ms": 0.5,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "timezone_abbreviation": "GMT",
        "elevation": 38.0,
        "current_weather_units": { "time": "iso8601", "temperature": "°C" },
        "current_weather": {
            "time": "2024-05-01T12:00",
            "interval": 900,
            "temperature": 18.3,
            "windspeed": 12.0,
            "winddirection": 240,
            "is_day": 1,
            "weathercode": 2
        }
    });
    body[block] = series(len, step_minutes);
    body
}

async fn mount_forecasts(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("minutely_15", SERIES_FIELDS))
        .and(query_param("current_weather", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(forecast_body("minutely_15", 96, 15)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("hourly", SERIES_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body("hourly", 72, 60)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_current_weather_success() {
    let server = MockServer::start().await;
    mount_forecasts(&server).await;

    let weather = provider(&server).current_weather(&berlin()).await.unwrap();

    assert_eq!(weather.temperature, 18.3);
    assert_eq!(weather.apparent_temperature, 46.0);
    assert_eq!(weather.humidity, 70.0);
    assert_eq!(weather.wind, 12.0);
    assert_eq!(weather.approx_uv, (300.0 + 100.0) * 0.0016);
    assert_eq!(weather.timestamp, "2024-05-01T12:00Z");
    assert_eq!(weather.weather_code, "Partly cloudy");
    assert_eq!(weather.is_day, Some(true));
    assert_eq!(weather.location, berlin());
}

#[tokio::test]
async fn test_forecast_next_24_hours_success() {
    let server = MockServer::start().await;
    mount_forecasts(&server).await;

    let forecast = provider(&server).forecast_next_24_hours(&berlin()).await.unwrap();
    assert!(matches!(forecast, Forecast::Complete(_)), "got {forecast:?}");
    let points = forecast.into_weathers();

    assert_eq!(points.len(), 24);
    assert_eq!(points[0].timestamp, "2024-05-01T13:00Z");
    assert_eq!(points[23].timestamp, "2024-05-02T12:00Z");
    assert!(points.iter().all(|p| p.is_day.is_none() && p.weather_code == "Overcast"));
}

#[tokio::test]
async fn test_search_location_maps_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "generationtime_ms": 0.7,
            "results": [
                {
                    "id": 2950159, "name": "Berlin", "latitude": 52.52437, "longitude": 13.41053,
                    "elevation": 74.0, "feature_code": "PPLC", "country_code": "DE",
                    "admin1_id": 2950157, "timezone": "Europe/Berlin", "population": 3426354,
                    "country_id": 2921044, "country": "Germany", "admin1": "Land Berlin"
                },
                {
                    "id": 5083330, "name": "Berlin", "latitude": 44.46867, "longitude": -71.18508,
                    "country_code": "US", "timezone": "America/New_York",
                    "country": "United States", "admin1": "New Hampshire"
                }
            ]
        })))
        .mount(&server)
        .await;

    let found = provider(&server).search_location("Berlin").await.unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].country, "Germany");
    assert_eq!(found[0].latitude, 52.52437);
    assert_eq!(found[1].country, "United States");
    assert_eq!(found[1].longitude, -71.18508);
}

#[tokio::test]
async fn test_search_location_without_results_field_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "generationtime_ms": 0.2 })))
        .mount(&server)
        .await;

    let found = provider(&server).search_location("Nowhereville").await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = provider(&server).current_weather(&berlin()).await.unwrap_err();

    assert!(err.is_transport());
    assert!(matches!(
        err,
        MeteoError::Status { status: 503, ref body, .. } if body == "upstream unavailable"
    ));
}

#[tokio::test]
async fn test_malformed_json_is_validation_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"latitude\": "))
        .mount(&server)
        .await;

    let err = provider(&server).forecast_next_24_hours(&berlin()).await.unwrap_err();
    assert!(matches!(err, MeteoError::Validation { endpoint: "hourly forecast", .. }));
}

#[tokio::test]
async fn test_fetch_daily_parses_daily_block() {
    let server = MockServer::start().await;

    let mut body = forecast_body("hourly", 1, 60);
    body["daily"] = json!({
        "time": ["2024-05-01", "2024-05-02"],
        "temperature_2m_max": [21.4, null],
        "temperature_2m_min": [9.1, 10.2],
        "sunrise": ["2024-05-01T03:34", "2024-05-02T03:32"],
        "sunset": ["2024-05-01T18:38", null]
    });

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("timezone", "GMT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let raw = provider.client().fetch_daily(52.52, 13.41).await.unwrap();
    let daily = raw.daily.unwrap();

    assert_eq!(daily.temperature_2m_max, Some(vec![Some(21.4), None]));
    assert_eq!(daily.sunset.unwrap()[1], None);
    assert!(daily.precipitation_sum.is_none());
}

#[tokio::test]
async fn test_save_refresh_and_reload_through_file_storage() {
    let server = MockServer::start().await;
    mount_forecasts(&server).await;
    let provider = provider(&server);
    let dir = tempfile::tempdir().unwrap();

    let mut store = SavedLocations::new(FileStorage::new(dir.path()));
    let entry = fetch_save_entry(&provider, berlin()).await.unwrap();
    store.save_and_sync(entry).unwrap();
    assert_eq!(store.refresh_all(&provider).await.unwrap(), 1);

    let reloaded = SavedLocations::open(FileStorage::new(dir.path())).unwrap();
    assert_eq!(reloaded.entries(), store.entries());
    assert_eq!(reloaded.entries()[0].next_24hours_forecast.len(), 24);
}
