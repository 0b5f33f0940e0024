use thiserror::Error;

/// Every way an OpenWeatherMap request can fail.
///
/// Only [`OwmError::Transport`] is retried by the fetcher; everything else
/// surfaces on first occurrence.
#[derive(Debug, Error)]
pub enum OwmError {
    /// The request never produced a response (DNS, connect, timeout, reset).
    #[error("Could not reach OpenWeatherMap: {0}")]
    Transport(String),

    /// The API answered, but rejected the request.
    #[error("OpenWeatherMap rejected the request with status {status}: {message}")]
    Protocol { status: u16, message: String },

    /// The response body did not match the expected document shape.
    #[error("Unexpected OpenWeatherMap response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request could not be built locally (bad URL, bad header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller misuse, e.g. asking the weather-only endpoint for a forecast.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The operation was abandoned before it finished.
    #[error("Operation was cancelled")]
    Cancelled,

    /// At least one probe request could not reach the API at all.
    #[error("Could not connect to OpenWeatherMap to verify the API key")]
    ProbeConnectivity,

    /// Every probe request reached the API and was denied.
    #[error("The API key is not entitled to any supported OpenWeatherMap API version")]
    ProbeEntitlement,
}

/// Coarse classification used to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TryAgainLater,
    CheckApiKey,
    UnexpectedResponse,
    Misconfigured,
}

impl ErrorKind {
    pub fn hint(&self) -> &'static str {
        match self {
            ErrorKind::TryAgainLater => "Could not connect to OpenWeatherMap. Try again later.",
            ErrorKind::CheckApiKey => "OpenWeatherMap rejected the request. Check your API key.",
            ErrorKind::UnexpectedResponse => "OpenWeatherMap returned an unexpected response.",
            ErrorKind::Misconfigured => "The request is misconfigured.",
        }
    }
}

impl OwmError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, OwmError::Transport(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OwmError::Transport(_) | OwmError::ProbeConnectivity | OwmError::Cancelled => {
                ErrorKind::TryAgainLater
            }
            OwmError::Protocol { .. } | OwmError::ProbeEntitlement => ErrorKind::CheckApiKey,
            OwmError::Decode(_) => ErrorKind::UnexpectedResponse,
            OwmError::InvalidRequest(_) | OwmError::Configuration(_) => ErrorKind::Misconfigured,
        }
    }
}

impl From<reqwest::Error> for OwmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            OwmError::InvalidRequest(err.to_string())
        } else {
            // Connect, timeout, redirect loops and truncated bodies all mean no usable response.
            OwmError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_transient() {
        assert!(OwmError::Transport("reset".into()).is_transient());
        assert!(!OwmError::Protocol { status: 401, message: "nope".into() }.is_transient());
        assert!(!OwmError::Configuration("bad".into()).is_transient());
        assert!(!OwmError::Cancelled.is_transient());

        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!OwmError::from(decode).is_transient());
    }

    #[test]
    fn kinds_map_to_distinct_hints() {
        assert_eq!(OwmError::Transport("x".into()).kind(), ErrorKind::TryAgainLater);
        assert_eq!(OwmError::ProbeConnectivity.kind(), ErrorKind::TryAgainLater);
        assert_eq!(OwmError::ProbeEntitlement.kind(), ErrorKind::CheckApiKey);
        assert_eq!(
            OwmError::Protocol { status: 403, message: String::new() }.kind(),
            ErrorKind::CheckApiKey
        );

        let decode = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        assert_eq!(OwmError::from(decode).kind(), ErrorKind::UnexpectedResponse);

        assert!(ErrorKind::CheckApiKey.hint().contains("API key"));
        assert!(ErrorKind::TryAgainLater.hint().contains("Try again later"));
    }
}
