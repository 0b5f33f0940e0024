use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;

use crate::error::OwmError;

/// Product identifier sent as `User-Agent` on every request.
pub const DEFAULT_USER_AGENT: &str =
    concat!("owm/", env!("CARGO_PKG_VERSION"), " (OpenWeatherMap client)");

/// A raw response: any status, body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP collaborator. Must be safe to call concurrently.
///
/// Returns `Ok` for every response that arrived, whatever its status, and
/// `Err(OwmError::Transport)` only when no response could be obtained.
#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, OwmError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, OwmError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, OwmError> {
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let res = request.send().await?;
        let status = res.status().as_u16();
        let body = res.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

/// Replace the `appid` query value so URLs can be logged.
pub(crate) fn redact_api_key(url: &str) -> String {
    match url.find("appid=") {
        Some(start) => {
            let value_start = start + "appid=".len();
            let value_end = url[value_start..].find('&').map_or(url.len(), |i| value_start + i);
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_api_key_anywhere_in_query() {
        assert_eq!(
            redact_api_key("https://x/data/2.5/weather?appid=SECRET&lat=1.000"),
            "https://x/data/2.5/weather?appid=***&lat=1.000"
        );
        assert_eq!(redact_api_key("https://x/?lat=1&appid=SECRET"), "https://x/?lat=1&appid=***");
        assert_eq!(redact_api_key("https://x/?lat=1"), "https://x/?lat=1");
    }

    #[test]
    fn success_is_2xx_only() {
        assert!(HttpResponse { status: 204, body: vec![] }.is_success());
        assert!(!HttpResponse { status: 301, body: vec![] }.is_success());
        assert!(!HttpResponse { status: 401, body: vec![] }.is_success());
    }
}
