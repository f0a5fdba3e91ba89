use std::{fmt, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Select, Text};
use meteo_core::{
    Config, FileStorage, Location, Removed, Saved, SavedLocations, WeatherProvider,
    fetch_save_entry, provider_from_config,
};
use tracing::info;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Weather for your saved locations")]
pub struct Cli {
    /// Log debug output (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search locations by name.
    Search { query: String },

    /// Search, pick a location and save it with its current weather.
    Add {
        query: String,

        /// Take the first candidate instead of prompting.
        #[arg(long)]
        first: bool,
    },

    /// Pick a saved location and remove it.
    Remove,

    /// List saved locations with their stored readings.
    List {
        /// Also print the stored 24 hour forecast.
        #[arg(long)]
        forecast: bool,
    },

    /// Show current weather and the next 24 hours without saving.
    Show {
        query: String,

        #[arg(long)]
        first: bool,
    },

    /// Re-fetch the weather of every saved location.
    Refresh,

    /// Refresh saved locations periodically until interrupted.
    Watch {
        /// Seconds between refreshes; defaults to `refresh.interval_secs`.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Edit the configuration file interactively.
    Configure,
}

/// Display wrapper so locations can be offered in a prompt.
struct Choice(Location);

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&output::location_label(&self.0))
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config)?,
            Command::Search { query } => {
                let provider = provider_from_config(&config)?;
                let found = provider.search_location(&query).await?;
                if found.is_empty() {
                    println!("No locations match '{query}'.");
                }
                for location in &found {
                    println!("{}", output::location_label(location));
                }
            }
            Command::Add { query, first } => {
                let mut store = open_store(&config)?;
                let provider = provider_from_config(&config)?;
                let Some(location) = pick_location(provider.as_ref(), &query, first).await? else {
                    return Ok(());
                };
                let entry = fetch_save_entry(provider.as_ref(), location).await?;
                let label = output::location_label(&entry.location);
                match store.save_and_sync(entry)? {
                    Saved::Inserted => println!("Saved {label}."),
                    Saved::Updated => println!("Updated {label}."),
                }
            }
            Command::Remove => {
                let mut store = open_store(&config)?;
                if store.is_empty() {
                    println!("No saved locations.");
                    return Ok(());
                }
                let choices = store.locations().into_iter().map(Choice).collect();
                let Choice(location) = Select::new("Remove which location?", choices).prompt()?;
                if store.remove_and_sync(&location)? == Removed::Removed {
                    println!("Removed {}.", output::location_label(&location));
                }
            }
            Command::List { forecast } => {
                let store = open_store(&config)?;
                if store.is_empty() {
                    println!("No saved locations. Add one with `meteo add <name>`.");
                }
                for entry in store.entries() {
                    println!("{}", output::saved_entry(entry));
                    if forecast {
                        println!("{}", output::forecast_table(&entry.next_24hours_forecast));
                    }
                }
            }
            Command::Show { query, first } => {
                let provider = provider_from_config(&config)?;
                let Some(location) = pick_location(provider.as_ref(), &query, first).await? else {
                    return Ok(());
                };
                let entry = fetch_save_entry(provider.as_ref(), location).await?;
                println!("{}", output::location_label(&entry.location));
                println!("{}", output::weather_line(&entry.current_weather));
                println!("{}", output::forecast_table(&entry.next_24hours_forecast));
            }
            Command::Refresh => {
                let mut store = open_store(&config)?;
                let provider = provider_from_config(&config)?;
                let updated = store.refresh_all(provider.as_ref()).await?;
                println!("Refreshed {updated} location(s).");
            }
            Command::Watch { interval } => {
                let period = match interval {
                    Some(0) => bail!("--interval must be greater than zero"),
                    Some(secs) => std::time::Duration::from_secs(secs),
                    None => config.refresh_interval(),
                };
                let mut store = open_store(&config)?;
                let provider = provider_from_config(&config)?;
                watch(&mut store, provider.as_ref(), period).await?;
            }
        }

        Ok(())
    }
}

fn open_store(config: &Config) -> Result<SavedLocations<FileStorage>> {
    let dir = config.storage_dir()?;
    SavedLocations::open(FileStorage::new(&dir))
        .with_context(|| format!("Failed to load saved locations from {}", dir.display()))
}

async fn pick_location(
    provider: &dyn WeatherProvider,
    query: &str,
    first: bool,
) -> Result<Option<Location>> {
    let mut found = provider.search_location(query).await?;
    if found.is_empty() {
        println!("No locations match '{query}'.");
        return Ok(None);
    }
    if first || found.len() == 1 {
        return Ok(Some(found.swap_remove(0)));
    }

    let choices = found.into_iter().map(Choice).collect();
    let Choice(location) = Select::new("Which location?", choices).prompt()?;
    Ok(Some(location))
}

async fn watch(
    store: &mut SavedLocations<FileStorage>,
    provider: &dyn WeatherProvider,
    period: std::time::Duration,
) -> Result<()> {
    let mut ticker = tokio::time::interval(period);
    // Created once so a Ctrl-C during a refresh is seen by the next select.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    info!(secs = period.as_secs(), "watching saved locations");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => {
                println!("Stopped.");
                return Ok(());
            }
        }

        tokio::select! {
            result = store.refresh_all(provider) => match result {
                Ok(updated) => {
                    let at = chrono::Utc::now().format("%H:%M:%S");
                    println!("Refreshed {updated} location(s) at {at}");
                    for entry in store.entries() {
                        println!("  {}", output::saved_entry(entry));
                    }
                }
                // Keep the stale readings and try again next tick.
                Err(e) => eprintln!("Refresh failed: {}", e.user_message()),
            },
            _ = &mut ctrl_c => {
                println!("Stopped.");
                return Ok(());
            }
        }
    }
}

fn configure(mut config: Config) -> Result<()> {
    config.api.forecast_url =
        Text::new("Forecast API URL:").with_default(&config.api.forecast_url).prompt()?;
    config.api.geocoding_url =
        Text::new("Geocoding API URL:").with_default(&config.api.geocoding_url).prompt()?;
    config.api.timeout_secs = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.api.timeout_secs)
        .prompt()?;
    config.refresh.interval_secs = CustomType::<u64>::new("Refresh interval (seconds):")
        .with_default(config.refresh.interval_secs)
        .prompt()?;

    let current_dir = config.storage_dir()?.display().to_string();
    let dir = Text::new("Storage directory:").with_default(&current_dir).prompt()?;
    config.storage.dir = (dir != current_dir || config.storage.dir.is_some())
        .then(|| PathBuf::from(dir));

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}
