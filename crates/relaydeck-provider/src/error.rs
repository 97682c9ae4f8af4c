use reqwest::StatusCode;
use thiserror::Error;

/// Typed failure taxonomy for provider calls.
///
/// Every kind except `Configuration` is fallback-eligible: the executor
/// moves on to the next (provider, model) candidate. `Configuration` means
/// no usable provider exists at all and is terminal for the routing layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimit(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Classify a non-2xx HTTP response.
    pub fn from_status(vendor: &str, status: StatusCode, body: &str) -> Self {
        let detail = format!("{vendor} api error ({status}): {}", truncate(body, 300));
        match status.as_u16() {
            429 => Self::RateLimit(detail),
            401 | 403 => Self::Auth(detail),
            400 | 422 => Self::InvalidRequest(detail),
            500..=599 => Self::Network(detail),
            _ => Self::Unknown(detail),
        }
    }

    /// Classify a transport-level reqwest failure (timeout, DNS, connect).
    pub fn from_transport(vendor: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("{vendor} api error (timeout): request timed out"))
        } else if err.is_connect() {
            Self::Network(format!("{vendor} api error (connect): {err}"))
        } else {
            Self::Unknown(format!("{vendor} api error: {err}"))
        }
    }

    /// Whether the fallback executor should try the next candidate.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Auth(_) => "auth",
            Self::RateLimit(_) => "rate_limit",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Network(_) => "network",
            Self::Unknown(_) => "unknown",
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
