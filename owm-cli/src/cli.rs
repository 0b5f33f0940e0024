use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use owm_core::{
    ApiVersion, Config, Coordinate, OwmError,
    provider::{client_from_config, configured_client},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "owm", version, about = "OpenWeatherMap CLI")]
pub struct Cli {
    /// Log requests, retries and cache hits to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an API key and detect which API version it can use.
    Configure {
        /// API key; prompted for when absent.
        #[arg(long)]
        api_key: Option<String>,

        // Also stored as the default location when given.
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Show current conditions and the daily outlook.
    Current {
        #[command(flatten)]
        location: LocationArgs,

        /// Always hit the network, ignoring cached responses.
        #[arg(long)]
        no_cache: bool,
    },

    /// Show the 5-day / 3-hour forecast.
    Forecast {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Report which API versions a key is entitled to, without saving anything.
    Probe {
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lon: Option<f64>,
}

impl LocationArgs {
    fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    /// Explicit coordinate, or the configured default location.
    fn resolve(&self, config: &Config) -> anyhow::Result<Coordinate> {
        self.coordinate().or(config.default_location).ok_or_else(|| {
            anyhow!(
                "No location given.\n\
                 Hint: pass --lat and --lon, or run `owm configure --lat <LAT> --lon <LON>`."
            )
        })
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure { api_key, location } => {
                let api_key = match api_key {
                    Some(key) => key,
                    None => inquire::Password::new("OpenWeatherMap API key:")
                        .without_confirmation()
                        .prompt()
                        .context("Failed to read API key")?,
                };
                let api_key = api_key.trim().to_string();

                let client = client_from_config(&config)?;
                let version = client.determine_api_version(&api_key).await.map_err(classified)?;

                config.set_api_key(api_key, version);
                if let Some(coordinate) = location.coordinate() {
                    config.default_location = Some(coordinate);
                }
                config.save()?;

                println!("API key saved. Using API version {version}.");
                if version == ApiVersion::Weather2_5 {
                    println!("Note: this key has no access to OneCall; forecasts are unavailable.");
                }
            }
            Command::Current { location, no_cache } => {
                let coordinate = location.resolve(&config)?;
                let (client, api_key, version) = configured_client(&config)?;

                let document = client
                    .current_and_daily(version, &api_key, coordinate, !no_cache)
                    .await
                    .map_err(classified)?;

                print!("{}", render::current_and_daily(&document));
            }
            Command::Forecast { location } => {
                let coordinate = location.resolve(&config)?;
                let client = client_from_config(&config)?;
                let api_key = config.api_key()?;

                let document =
                    client.interval_forecast(&api_key, coordinate).await.map_err(classified)?;

                print!("{}", render::interval_forecast(&document));
            }
            Command::Probe { api_key } => {
                let api_key = match api_key {
                    Some(key) => key,
                    None => config.api_key()?,
                };
                let client = client_from_config(&config)?;

                let report = client.probe_all(&api_key).await.map_err(classified)?;
                print!("{}", render::probe_report(&report));
            }
        }

        Ok(())
    }
}

/// Put the user-facing hint first, keep the underlying error as the cause.
fn classified(err: OwmError) -> anyhow::Error {
    let hint = err.kind().hint();
    anyhow::Error::new(err).context(hint)
}
