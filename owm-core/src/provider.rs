use crate::{
    Config,
    error::OwmError,
    location::Coordinate,
    model::{ForecastDocument, IntervalForecastDocument},
    provider::{openweather::OpenWeatherClient, probe::ProbeReport},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod openweather;
pub mod probe;

/// OpenWeatherMap API flavours an API key may be entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiVersion {
    #[serde(rename = "onecall-3.0")]
    OneCall3_0,
    #[serde(rename = "onecall-2.5")]
    OneCall2_5,
    /// Current conditions only, no forecast.
    #[serde(rename = "weather-2.5")]
    Weather2_5,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::OneCall3_0 => "onecall-3.0",
            ApiVersion::OneCall2_5 => "onecall-2.5",
            ApiVersion::Weather2_5 => "weather-2.5",
        }
    }

    /// All versions, most preferred first.
    pub const fn all() -> &'static [ApiVersion] {
        &[ApiVersion::OneCall3_0, ApiVersion::OneCall2_5, ApiVersion::Weather2_5]
    }

    /// Whether the endpoint returns current conditions plus daily forecast.
    pub fn supports_forecast(&self) -> bool {
        !matches!(self, ApiVersion::Weather2_5)
    }

    /// Path below `/data/` for this version's endpoint.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            ApiVersion::OneCall3_0 => "3.0/onecall",
            ApiVersion::OneCall2_5 => "2.5/onecall",
            ApiVersion::Weather2_5 => "2.5/weather",
        }
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ApiVersion {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "onecall-3.0" | "3.0" => Ok(ApiVersion::OneCall3_0),
            "onecall-2.5" => Ok(ApiVersion::OneCall2_5),
            "weather-2.5" => Ok(ApiVersion::Weather2_5),
            _ => Err(anyhow::anyhow!(
                "Unknown API version '{value}'. Supported versions: onecall-3.0, onecall-2.5, weather-2.5."
            )),
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions plus hourly/daily outlook from the OneCall endpoint.
    async fn current_and_daily(
        &self,
        version: ApiVersion,
        api_key: &str,
        coordinate: Coordinate,
        use_cache: bool,
    ) -> Result<Arc<ForecastDocument>, OwmError>;

    /// The 5-day / 3-hour forecast.
    async fn interval_forecast(
        &self,
        api_key: &str,
        coordinate: Coordinate,
    ) -> Result<Arc<IntervalForecastDocument>, OwmError>;

    /// Find the most preferred API version `api_key` may use.
    async fn determine_api_version(&self, api_key: &str) -> Result<ApiVersion, OwmError>;

    /// Outcome of every candidate endpoint, without picking a winner.
    async fn probe_all(&self, api_key: &str) -> Result<ProbeReport, OwmError>;
}

/// Construct a provider from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let client = OpenWeatherClient::new(config.client.clone())
        .map_err(|e| anyhow::anyhow!("Failed to build OpenWeatherMap client: {e}"))?;
    Ok(Box::new(client))
}

/// Construct a client and resolve the API key and version it should use.
///
/// Fails with a hint when the key or version has not been configured yet.
pub fn configured_client(
    config: &Config,
) -> anyhow::Result<(Box<dyn WeatherProvider>, String, ApiVersion)> {
    let api_key = config.api_key()?;
    let version = config.api_version()?;
    Ok((client_from_config(config)?, api_key, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn api_version_as_str_roundtrip() {
        for version in ApiVersion::all() {
            let s = version.as_str();
            let parsed = ApiVersion::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*version, parsed);
        }
    }

    #[test]
    fn unknown_version_error() {
        let err = ApiVersion::try_from("4.0").unwrap_err();
        assert!(err.to_string().contains("Unknown API version"));
    }

    #[test]
    fn preference_order_puts_primary_first() {
        assert_eq!(
            ApiVersion::all(),
            &[ApiVersion::OneCall3_0, ApiVersion::OneCall2_5, ApiVersion::Weather2_5]
        );
        assert!(ApiVersion::OneCall3_0.supports_forecast());
        assert!(ApiVersion::OneCall2_5.supports_forecast());
        assert!(!ApiVersion::Weather2_5.supports_forecast());
    }

    #[test]
    fn serde_uses_dashed_names() {
        let json = serde_json::to_string(&ApiVersion::OneCall2_5).unwrap();
        assert_eq!(json, r#""onecall-2.5""#);
        let parsed: ApiVersion = serde_json::from_str(r#""weather-2.5""#).unwrap();
        assert_eq!(parsed, ApiVersion::Weather2_5);
    }

    #[test]
    fn configured_client_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = configured_client(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn configured_client_errors_when_version_not_detected() {
        let mut cfg = Config::default();
        cfg.api_key = Some("KEY".to_string());

        let msg = configured_client(&cfg).unwrap_err().to_string();
        assert!(msg.contains("No API version configured"));
        assert!(msg.contains("Hint: run `owm configure"));
    }

    #[test]
    fn configured_client_works_when_set() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string(), ApiVersion::OneCall3_0);

        let (_, key, version) = configured_client(&cfg).expect("client should build");
        assert_eq!(key, "KEY");
        assert_eq!(version, ApiVersion::OneCall3_0);
    }
}
