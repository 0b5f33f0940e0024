use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Url;
use tracing::instrument;

use crate::{
    cache::{Clock, ResponseCache, SystemClock},
    config::ClientConfig,
    error::OwmError,
    http::{HttpTransport, ReqwestTransport},
    lang::Language,
    location::{CacheKey, Coordinate},
    model::{ForecastDocument, IntervalForecastDocument},
    provider::probe::{ProbeReport, VersionProber},
    retry::RetryingFetcher,
};

use super::{ApiVersion, WeatherProvider};

/// OpenWeatherMap client: one cache per response kind, shared by every caller
/// holding this instance.
#[derive(Debug)]
pub struct OpenWeatherClient {
    fetcher: RetryingFetcher,
    config: ClientConfig,
    language: Language,
    onecall_cache: ResponseCache<ForecastDocument>,
    forecast_cache: ResponseCache<IntervalForecastDocument>,
}

impl OpenWeatherClient {
    pub fn new(config: ClientConfig) -> Result<Self, OwmError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(SystemClock)))
    }

    /// Build a client on an explicit transport and clock.
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fetcher = RetryingFetcher::new(transport, config.retry.clone(), config.user_agent());

        Self {
            fetcher,
            language: config.language(),
            onecall_cache: ResponseCache::new(Arc::clone(&clock)),
            forecast_cache: ResponseCache::new(clock),
            config,
        }
    }

    pub fn prober(&self) -> VersionProber {
        VersionProber::new(
            Arc::clone(self.fetcher.transport()),
            self.config.base_url.clone(),
            self.language.clone(),
            self.fetcher.user_agent().to_string(),
        )
    }

    /// Current conditions plus hourly/daily outlook for `coordinate`.
    ///
    /// With `use_cache`, a response for the same normalized coordinate younger
    /// than the cache TTL is returned without a request.
    #[instrument(name = "current_and_daily", skip(self, api_key, version), fields(%version))]
    pub async fn current_and_daily(
        &self,
        version: ApiVersion,
        api_key: &str,
        coordinate: Coordinate,
        use_cache: bool,
    ) -> Result<Arc<ForecastDocument>, OwmError> {
        if !version.supports_forecast() {
            return Err(OwmError::Configuration(format!(
                "API version {version} has no forecast data; use onecall-3.0 or onecall-2.5"
            )));
        }

        let key = coordinate.normalize();

        if use_cache {
            if let Some(entry) = self.onecall_cache.lookup_fresh(&key, self.config.cache_ttl_ms) {
                tracing::debug!(%key, "Serving OneCall response from cache");
                return Ok(entry.value);
            }
        }

        let url = endpoint_url(
            &self.config.base_url,
            version.endpoint_path(),
            api_key,
            key,
            &self.language,
        )?;
        let document: ForecastDocument = self
            .fetcher
            .fetch_json(&url)
            .await
            .inspect_err(|e| tracing::warn!(%key, error = %e, "OneCall request failed"))?;

        Ok(self.onecall_cache.store(key, document))
    }

    pub async fn current_and_daily_cached(
        &self,
        version: ApiVersion,
        api_key: &str,
        coordinate: Coordinate,
    ) -> Result<Arc<ForecastDocument>, OwmError> {
        self.current_and_daily(version, api_key, coordinate, true).await
    }

    /// The 5-day / 3-hour forecast for `coordinate`. Always consults the cache first.
    #[instrument(name = "interval_forecast", skip(self, api_key))]
    pub async fn interval_forecast(
        &self,
        api_key: &str,
        coordinate: Coordinate,
    ) -> Result<Arc<IntervalForecastDocument>, OwmError> {
        let key = coordinate.normalize();

        if let Some(entry) = self.forecast_cache.lookup_fresh(&key, self.config.cache_ttl_ms) {
            tracing::debug!(%key, "Serving forecast response from cache");
            return Ok(entry.value);
        }

        let url = endpoint_url(
            &self.config.base_url,
            FORECAST_PATH,
            api_key,
            key,
            &self.language,
        )?;
        let document: IntervalForecastDocument = self
            .fetcher
            .fetch_json(&url)
            .await
            .inspect_err(|e| tracing::warn!(%key, error = %e, "Forecast request failed"))?;

        Ok(self.forecast_cache.store(key, document))
    }

    #[instrument(name = "determine_api_version", skip_all)]
    pub async fn determine_api_version(&self, api_key: &str) -> Result<ApiVersion, OwmError> {
        self.prober().probe(api_key).await
    }

    /// Outcome of every candidate endpoint, without picking a winner.
    pub async fn probe_all(&self, api_key: &str) -> Result<ProbeReport, OwmError> {
        self.prober().probe_all(api_key).await
    }
}

const FORECAST_PATH: &str = "2.5/forecast";

/// `{base}/data/{path}?appid=..&lat=..&lon=..&lang=..&units=imperial`
pub(crate) fn endpoint_url(
    base_url: &str,
    path: &str,
    api_key: &str,
    key: CacheKey,
    language: &Language,
) -> Result<String, OwmError> {
    let endpoint = format!("{}/data/{path}", base_url.trim_end_matches('/'));
    let lat = format!("{:.3}", key.latitude());
    let lon = format!("{:.3}", key.longitude());

    let url = Url::parse_with_params(
        &endpoint,
        &[
            ("appid", api_key),
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("lang", language.as_str()),
            ("units", "imperial"),
        ],
    )
    .map_err(|e| OwmError::InvalidRequest(format!("Invalid endpoint URL '{endpoint}': {e}")))?;

    Ok(url.into())
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current_and_daily(
        &self,
        version: ApiVersion,
        api_key: &str,
        coordinate: Coordinate,
        use_cache: bool,
    ) -> Result<Arc<ForecastDocument>, OwmError> {
        OpenWeatherClient::current_and_daily(self, version, api_key, coordinate, use_cache).await
    }

    async fn interval_forecast(
        &self,
        api_key: &str,
        coordinate: Coordinate,
    ) -> Result<Arc<IntervalForecastDocument>, OwmError> {
        OpenWeatherClient::interval_forecast(self, api_key, coordinate).await
    }

    async fn determine_api_version(&self, api_key: &str) -> Result<ApiVersion, OwmError> {
        OpenWeatherClient::determine_api_version(self, api_key).await
    }

    async fn probe_all(&self, api_key: &str) -> Result<ProbeReport, OwmError> {
        OpenWeatherClient::probe_all(self, api_key).await
    }
}
