use async_trait::async_trait;
use std::fmt::Debug;
use tracing::debug;

use crate::{
    Config,
    error::MeteoError,
    model::{Location, Weather},
};

pub mod normalize;
pub mod openmeteo;

pub use normalize::Forecast;
pub use openmeteo::OpenMeteoClient;

/// Source of normalized weather and location candidates.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, location: &Location) -> Result<Weather, MeteoError>;

    /// Hourly points strictly after the current time, see [`Forecast`].
    async fn forecast_next_24_hours(&self, location: &Location) -> Result<Forecast, MeteoError>;

    /// Candidates matching a free-text name; empty when nothing matches.
    async fn search_location(&self, term: &str) -> Result<Vec<Location>, MeteoError>;
}

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: OpenMeteoClient,
}

impl OpenMeteoProvider {
    pub fn new(client: OpenMeteoClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OpenMeteoClient {
        &self.client
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current_weather(&self, location: &Location) -> Result<Weather, MeteoError> {
        let raw = self
            .client
            .fetch_current_and_subhourly(location.latitude, location.longitude)
            .await?;
        normalize::current_weather(&raw, location)
    }

    async fn forecast_next_24_hours(&self, location: &Location) -> Result<Forecast, MeteoError> {
        let raw = self.client.fetch_hourly(location.latitude, location.longitude).await?;
        normalize::next_24_hours(&raw, location)
    }

    async fn search_location(&self, term: &str) -> Result<Vec<Location>, MeteoError> {
        let raw = self.client.search_locations(term).await?;
        let found = normalize::search_results(raw);
        debug!(term, count = found.len(), "location search finished");
        Ok(found)
    }
}

/// Construct the Open-Meteo provider from the `[api]` section of the config.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn WeatherProvider>, MeteoError> {
    let client = OpenMeteoClient::new(&config.api)?;
    Ok(Box::new(OpenMeteoProvider::new(client)))
}
