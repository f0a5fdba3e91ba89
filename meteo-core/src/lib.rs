//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - An Open-Meteo client and the normalization of its responses
//! - Shared domain models (locations, weather, saved entries)
//! - The saved locations store and its durable storage
//!
//! It is used by `meteo-cli`, but can also be embedded by other front ends.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod storage;
pub mod store;

pub use config::{ApiConfig, Config, RefreshConfig, StorageConfig};
pub use error::MeteoError;
pub use model::{FORECAST_HOURS, Location, NewSavedEntry, SavedEntry, Weather, unique_location_id};
pub use provider::{
    Forecast, OpenMeteoClient, OpenMeteoProvider, WeatherProvider, provider_from_config,
};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{Removed, Saved, SavedLocations, fetch_refresh, fetch_save_entry};
