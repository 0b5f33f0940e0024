//! Core library for the `owm` CLI.
//!
//! This crate defines:
//! - Coordinate normalization and per-coordinate response caching
//! - A retrying fetcher over a pluggable HTTP transport
//! - Concurrent detection of the API version a key is entitled to
//! - The OpenWeatherMap client tying these together
//! - Configuration & credentials handling
//!
//! It is used by `owm-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lang;
pub mod location;
pub mod model;
pub mod provider;
pub mod retry;

pub use cache::{CacheEntry, Clock, ManualClock, ResponseCache, SystemClock};
pub use config::{ClientConfig, Config};
pub use error::{ErrorKind, OwmError};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use lang::Language;
pub use location::{CacheKey, Coordinate, normalize};
pub use model::{ForecastDocument, IntervalForecastDocument};
pub use provider::{
    ApiVersion, WeatherProvider,
    openweather::OpenWeatherClient,
    probe::{ProbeOutcome, ProbeReport, VersionProber},
};
pub use retry::{RetryConfig, RetryingFetcher};
