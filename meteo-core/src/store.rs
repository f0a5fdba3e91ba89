//! Saved locations with their latest readings, mirrored to durable storage.
//!
//! The store is a plain owned value; mutating operations take `&mut self`,
//! so at most one of them runs at a time. Embedders that share it across
//! tasks (e.g. behind a mutex) should not hold the lock while fetching:
//! [`fetch_refresh`] needs no access to the store, and
//! [`SavedLocations::apply_refresh`] matches results to entries by unique
//! location id, so entries removed in the meantime are skipped.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::{
    error::MeteoError,
    model::{FORECAST_HOURS, Location, NewSavedEntry, SavedEntry, Weather},
    provider::WeatherProvider,
    storage::KeyValueStorage,
};

/// The single storage key holding the JSON array of saved entries.
pub const STORAGE_KEY: &str = "weathers";

pub type Clock = fn() -> DateTime<Utc>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saved {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    Removed,
    NotFound,
}

/// Fresh readings for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct Refreshed {
    pub location: Location,
    pub current_weather: Weather,
    pub next_24hours_forecast: Vec<Weather>,
}

/// Results of a fully successful refresh, one per requested location.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefreshBatch {
    pub results: Vec<Refreshed>,
}

pub struct SavedLocations<S> {
    saved: Vec<SavedEntry>,
    storage: S,
    clock: Clock,
}

impl<S: KeyValueStorage> SavedLocations<S> {
    pub fn new(storage: S) -> Self {
        Self { saved: Vec::new(), storage, clock: Utc::now }
    }

    /// Source of `updated_at_timestamp`.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// New store populated from storage.
    pub fn open(storage: S) -> Result<Self, MeteoError> {
        let mut store = Self::new(storage);
        store.load()?;
        Ok(store)
    }

    pub fn entries(&self) -> &[SavedEntry] {
        &self.saved
    }

    pub fn len(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn locations(&self) -> Vec<Location> {
        self.saved.iter().map(|e| e.location.clone()).collect()
    }

    pub fn get(&self, location: &Location) -> Option<&SavedEntry> {
        self.position(location).map(|i| &self.saved[i])
    }

    fn position(&self, location: &Location) -> Option<usize> {
        let id = location.unique_id();
        self.saved.iter().position(|e| e.location.unique_id() == id)
    }

    /// Insert or replace (in place) the entry for this location, then persist.
    pub fn save_and_sync(&mut self, entry: NewSavedEntry) -> Result<Saved, MeteoError> {
        let actual = entry.next_24hours_forecast.len();
        if actual != FORECAST_HOURS {
            return Err(MeteoError::IncompleteForecast { expected: FORECAST_HOURS, actual });
        }

        let saved = entry.into_saved((self.clock)());
        let id = saved.location.unique_id();

        match self.position(&saved.location) {
            Some(i) => {
                info!(location = %id, "location already saved, updating it");
                let previous = std::mem::replace(&mut self.saved[i], saved);
                if let Err(e) = self.persist() {
                    self.saved[i] = previous;
                    return Err(e);
                }
                Ok(Saved::Updated)
            }
            None => {
                info!(location = %id, "saving new location");
                self.saved.push(saved);
                if let Err(e) = self.persist() {
                    self.saved.pop();
                    return Err(e);
                }
                Ok(Saved::Inserted)
            }
        }
    }

    /// Remove the entry for this location if present, then persist.
    pub fn remove_and_sync(&mut self, location: &Location) -> Result<Removed, MeteoError> {
        let Some(i) = self.position(location) else {
            warn!(location = %location.unique_id(), "location is not saved, nothing to remove");
            return Ok(Removed::NotFound);
        };

        let removed = self.saved.remove(i);
        if let Err(e) = self.persist() {
            self.saved.insert(i, removed);
            return Err(e);
        }

        info!(location = %location.unique_id(), "removed saved location");
        Ok(Removed::Removed)
    }

    /// Write the whole list under [`STORAGE_KEY`].
    pub fn persist(&self) -> Result<(), MeteoError> {
        let json = serde_json::to_string(&self.saved).map_err(MeteoError::Encode)?;
        self.storage.set(STORAGE_KEY, &json)
    }

    /// Replace the in-memory list with the stored one, if any.
    ///
    /// Returns `false` when nothing is stored; the list is then left as is.
    pub fn load(&mut self) -> Result<bool, MeteoError> {
        let Some(json) = self.storage.get(STORAGE_KEY)? else {
            debug!("no saved locations in storage");
            return Ok(false);
        };

        let entries: Vec<SavedEntry> = serde_json::from_str(&json).map_err(MeteoError::Decode)?;

        let mut seen = HashSet::new();
        let mut saved = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.location.unique_id();
            if seen.insert(id.clone()) {
                saved.push(entry);
            } else {
                warn!(location = %id, "dropping duplicate saved location");
            }
        }

        info!(count = saved.len(), "loaded saved locations");
        self.saved = saved;
        Ok(true)
    }

    /// Re-fetch every saved location and overwrite its weather in place.
    ///
    /// All or nothing: if any fetch fails, no entry changes. Returns the
    /// number of entries updated.
    pub async fn refresh_all(
        &mut self,
        provider: &dyn WeatherProvider,
    ) -> Result<usize, MeteoError> {
        if self.saved.is_empty() {
            return Ok(0);
        }

        let batch = match fetch_refresh(provider, &self.locations()).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "failed to update saved weathers");
                return Err(e);
            }
        };

        let previous = self.saved.clone();
        let updated = self.apply_refresh(batch);
        if let Err(e) = self.persist() {
            self.saved = previous;
            return Err(e);
        }

        info!(updated, "refreshed saved locations");
        Ok(updated)
    }

    /// Overwrite weather of the entries matching the batch, by unique id.
    pub fn apply_refresh(&mut self, batch: RefreshBatch) -> usize {
        let mut fresh: HashMap<String, Refreshed> = batch
            .results
            .into_iter()
            .map(|r| (r.location.unique_id(), r))
            .collect();

        let mut updated = 0;
        for entry in &mut self.saved {
            if let Some(r) = fresh.remove(&entry.location.unique_id()) {
                entry.current_weather = r.current_weather;
                entry.next_24hours_forecast = r.next_24hours_forecast;
                updated += 1;
            }
        }

        for id in fresh.keys() {
            debug!(location = %id, "skipping refresh of a location that is no longer saved");
        }
        updated
    }
}

/// Fetch current weather and a complete 24 hour forecast for one location.
///
/// Both requests run concurrently; either failing fails the call.
pub async fn fetch_save_entry(
    provider: &dyn WeatherProvider,
    location: Location,
) -> Result<NewSavedEntry, MeteoError> {
    let r = fetch_pair(provider, &location).await?;
    Ok(NewSavedEntry {
        location,
        current_weather: r.current_weather,
        next_24hours_forecast: r.next_24hours_forecast,
    })
}

/// Fetch fresh readings for all `locations` concurrently.
///
/// Every fetch is awaited; the batch fails if any of them failed.
pub async fn fetch_refresh(
    provider: &dyn WeatherProvider,
    locations: &[Location],
) -> Result<RefreshBatch, MeteoError> {
    let outcomes = join_all(locations.iter().map(|location| fetch_pair(provider, location))).await;
    let results = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(RefreshBatch { results })
}

async fn fetch_pair(
    provider: &dyn WeatherProvider,
    location: &Location,
) -> Result<Refreshed, MeteoError> {
    let (current, forecast) = futures::join!(
        provider.current_weather(location),
        provider.forecast_next_24_hours(location)
    );

    Ok(Refreshed {
        location: location.clone(),
        current_weather: current?,
        next_24hours_forecast: forecast?.into_complete()?,
    })
}
