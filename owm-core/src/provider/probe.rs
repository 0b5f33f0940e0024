//! Detect which OpenWeatherMap API version an API key may use.
//!
//! One request per candidate endpoint, all in flight at once, no retries.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    error::OwmError,
    http::HttpTransport,
    lang::Language,
    location::{Coordinate, normalize},
    provider::{ApiVersion, openweather::endpoint_url},
};

/// Fixed location every probe asks about (Atlanta, GA).
pub const REFERENCE_COORDINATE: Coordinate = Coordinate { latitude: 33.749, longitude: -84.388 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx response.
    Entitled,
    /// A response arrived, but not a 2xx one.
    Denied,
    /// No response at all.
    NetworkUnreachable,
}

/// Joined outcomes of one probe run, in preference order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    outcomes: Vec<(ApiVersion, ProbeOutcome)>,
}

impl ProbeReport {
    pub fn new(outcomes: Vec<(ApiVersion, ProbeOutcome)>) -> Self {
        Self { outcomes }
    }

    pub fn outcome(&self, version: ApiVersion) -> Option<ProbeOutcome> {
        self.outcomes.iter().find(|(v, _)| *v == version).map(|(_, outcome)| *outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ApiVersion, ProbeOutcome)> {
        self.outcomes.iter()
    }

    /// Pick the most preferred entitled version.
    ///
    /// A single unreachable endpoint makes the whole report untrustworthy.
    pub fn verdict(&self) -> Result<ApiVersion, OwmError> {
        if self.outcomes.iter().any(|(_, o)| *o == ProbeOutcome::NetworkUnreachable) {
            return Err(OwmError::ProbeConnectivity);
        }

        ApiVersion::all()
            .iter()
            .copied()
            .find(|version| self.outcome(*version) == Some(ProbeOutcome::Entitled))
            .ok_or(OwmError::ProbeEntitlement)
    }
}

#[derive(Debug, Clone)]
pub struct VersionProber {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    language: Language,
    user_agent: String,
}

impl VersionProber {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: String,
        language: Language,
        user_agent: String,
    ) -> Self {
        Self { transport, base_url, language, user_agent }
    }

    pub async fn probe(&self, api_key: &str) -> Result<ApiVersion, OwmError> {
        let report = self.probe_all(api_key).await?;
        let verdict = report.verdict();

        match &verdict {
            Ok(version) => tracing::info!(%version, "Detected API version"),
            Err(err) => tracing::warn!(?report, error = %err, "API version detection failed"),
        }

        verdict
    }

    /// Run all three probes concurrently and wait for every one of them.
    pub async fn probe_all(&self, api_key: &str) -> Result<ProbeReport, OwmError> {
        let key = normalize(REFERENCE_COORDINATE);

        let mut tasks = AbortOnDrop(Vec::with_capacity(ApiVersion::all().len()));
        for version in ApiVersion::all() {
            let url = endpoint_url(
                &self.base_url,
                version.endpoint_path(),
                api_key,
                key,
                &self.language,
            )?;
            tasks.0.push(self.spawn_probe(*version, url));
        }

        // Join every probe before looking at any result.
        let mut joined = Vec::with_capacity(tasks.0.len());
        for task in tasks.0.iter_mut() {
            joined.push(task.await);
        }

        let mut outcomes = Vec::with_capacity(joined.len());
        for result in joined {
            match result {
                Ok(result) => outcomes.push(result?),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => return Err(OwmError::Cancelled),
            }
        }

        Ok(ProbeReport::new(outcomes))
    }

    fn spawn_probe(
        &self,
        version: ApiVersion,
        url: String,
    ) -> JoinHandle<Result<(ApiVersion, ProbeOutcome), OwmError>> {
        let transport = Arc::clone(&self.transport);
        let user_agent = self.user_agent.clone();

        tokio::spawn(async move {
            let outcome = match transport.get(&url, &[("User-Agent", user_agent.as_str())]).await {
                Ok(res) if res.is_success() => ProbeOutcome::Entitled,
                Ok(res) => {
                    tracing::debug!(%version, status = res.status, "Probe denied");
                    ProbeOutcome::Denied
                }
                Err(OwmError::Transport(reason)) => {
                    tracing::debug!(%version, %reason, "Probe could not connect");
                    ProbeOutcome::NetworkUnreachable
                }
                Err(other) => return Err(other),
            };
            Ok((version, outcome))
        })
    }
}

/// Aborts probe tasks that are still running when the caller goes away.
struct AbortOnDrop<T>(Vec<JoinHandle<T>>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::http::{
        HttpResponse,
        testing::{ScriptedTransport, status},
    };

    const PRIMARY: &str = "/data/3.0/onecall";
    const LEGACY: &str = "/data/2.5/onecall";
    const SIMPLE: &str = "/data/2.5/weather";

    fn prober(transport: Arc<dyn HttpTransport>) -> VersionProber {
        VersionProber::new(
            transport,
            "https://owm.test".to_string(),
            Language::default(),
            "owm-test".to_string(),
        )
    }

    fn unreachable() -> Result<HttpResponse, OwmError> {
        Err(OwmError::Transport("dns failure".into()))
    }

    #[tokio::test]
    async fn primary_wins_when_entitled() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .when(PRIMARY, || status(200))
            .when(LEGACY, || status(401))
            .when(SIMPLE, || status(401));

        let version = prober(transport.clone()).probe("KEY").await.unwrap();

        assert_eq!(version, ApiVersion::OneCall3_0);
        assert_eq!(transport.calls(), 3);
        assert!(transport.urls().iter().all(|u| u.contains("lat=33.749&lon=-84.388")));
    }

    #[tokio::test]
    async fn preference_order_beats_other_entitlements() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .when(PRIMARY, || status(401))
            .when(LEGACY, || status(200))
            .when(SIMPLE, || status(200));

        let version = prober(transport).probe("KEY").await.unwrap();

        assert_eq!(version, ApiVersion::OneCall2_5);
    }

    #[tokio::test]
    async fn simple_endpoint_is_the_last_resort() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .when(PRIMARY, || status(401))
            .when(LEGACY, || status(404))
            .when(SIMPLE, || status(200));

        assert_eq!(prober(transport).probe("KEY").await.unwrap(), ApiVersion::Weather2_5);
    }

    #[tokio::test]
    async fn any_unreachable_endpoint_fails_the_probe() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .when(PRIMARY, || status(200))
            .when(LEGACY, || status(200))
            .when(SIMPLE, unreachable);

        let err = prober(transport).probe("KEY").await.unwrap_err();

        assert!(matches!(err, OwmError::ProbeConnectivity));
    }

    #[tokio::test]
    async fn all_denied_is_an_entitlement_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .when(PRIMARY, || status(401))
            .when(LEGACY, || status(401))
            .when(SIMPLE, || status(403));

        let err = prober(transport).probe("KEY").await.unwrap_err();

        assert!(matches!(err, OwmError::ProbeEntitlement));
    }

    #[tokio::test]
    async fn report_lists_every_outcome() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .when(PRIMARY, unreachable)
            .when(LEGACY, || status(200))
            .when(SIMPLE, || status(500));

        let report = prober(transport).probe_all("KEY").await.unwrap();

        assert_eq!(report.outcome(ApiVersion::OneCall3_0), Some(ProbeOutcome::NetworkUnreachable));
        assert_eq!(report.outcome(ApiVersion::OneCall2_5), Some(ProbeOutcome::Entitled));
        assert_eq!(report.outcome(ApiVersion::Weather2_5), Some(ProbeOutcome::Denied));
        assert_eq!(report.iter().count(), 3);
    }

    /// Answers each endpoint after its own delay, so completion order differs
    /// from preference order.
    #[derive(Debug)]
    struct StaggeredTransport;

    #[async_trait]
    impl HttpTransport for StaggeredTransport {
        async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse, OwmError> {
            let (delay_ms, reply) = if url.contains(PRIMARY) {
                (300, status(401))
            } else if url.contains(LEGACY) {
                (200, status(200))
            } else {
                (10, status(200))
            };
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            reply
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completion_order_does_not_affect_the_verdict() {
        let started = tokio::time::Instant::now();

        let version = prober(Arc::new(StaggeredTransport)).probe("KEY").await.unwrap();

        assert_eq!(version, ApiVersion::OneCall2_5);
        // Probes overlap: total wait is the slowest probe, not the sum.
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn non_transport_failures_propagate() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .when(PRIMARY, || Err(OwmError::InvalidRequest("bad header".into())))
            .when(LEGACY, || status(200))
            .when(SIMPLE, || status(200));

        let err = prober(transport).probe("KEY").await.unwrap_err();

        assert!(matches!(err, OwmError::InvalidRequest(_)));
    }

    /// Rejects the primary endpoint at once and answers the others after a delay,
    /// counting how many requests ran to completion.
    #[derive(Debug, Default)]
    struct SlowTransport {
        started: AtomicUsize,
        finished: AtomicUsize,
        dropped: AtomicUsize,
    }

    struct CountDrop<'a>(&'a AtomicUsize);

    impl Drop for CountDrop<'_> {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl HttpTransport for SlowTransport {
        async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpResponse, OwmError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _guard = CountDrop(&self.dropped);
            if url.contains(PRIMARY) {
                return Err(OwmError::InvalidRequest("bad header".into()));
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            status(200)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn early_failure_still_waits_for_every_request() {
        let transport = Arc::new(SlowTransport::default());
        let started = tokio::time::Instant::now();

        let err = prober(transport.clone()).probe_all("KEY").await.unwrap_err();

        assert!(matches!(err, OwmError::InvalidRequest(_)));
        assert_eq!(transport.finished.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_detection_aborts_in_flight_requests() {
        let transport = Arc::new(SlowTransport::default());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            prober(transport.clone()).probe_all("KEY"),
        )
        .await;
        assert!(abandoned.is_err());

        // Give the runtime time to tear down the aborted tasks and to finish
        // them, had they survived.
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(transport.started.load(Ordering::SeqCst), 3);
        assert_eq!(transport.dropped.load(Ordering::SeqCst), 3);
        assert_eq!(transport.finished.load(Ordering::SeqCst), 0);
    }
}
