//! Error types for month fetches.
//!
//! Every failure inside the upstream layer is a [`FetchError`] carrying a
//! [`FetchErrorCode`]. The code drives retry decisions and the status of the
//! [`CalendarResponse`](calscrape_core::CalendarResponse) the fetcher returns.

use std::fmt;
use thiserror::Error;

use calscrape_core::status;

/// Upper bound on the raw payload kept for diagnostics, in characters.
const PAYLOAD_SAMPLE_CHARS: usize = 256;

/// The category of a fetch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorCode {
    /// The caller's credential is missing or malformed.
    Credential,
    /// Connection failure, timeout, 5xx or rate limiting from upstream.
    Network,
    /// The upstream rejected the credential.
    Auth,
    /// Unexpected or malformed upstream response.
    Upstream,
    /// The upstream has no data for the requested month.
    NoData,
    /// The end-to-end deadline elapsed.
    Timeout,
    /// The caller went away before the fetch finished.
    Cancelled,
    /// The requested month is not a valid calendar month.
    InvalidMonth,
    /// Missing or invalid configuration.
    Configuration,
    /// Unexpected internal state, including caught panics.
    Internal,
}

impl FetchErrorCode {
    /// Returns true if this error is transient and the call may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credential => "credential_error",
            Self::Network => "network_error",
            Self::Auth => "auth_error",
            Self::Upstream => "upstream_error",
            Self::NoData => "no_data",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::InvalidMonth => "invalid_month",
            Self::Configuration => "configuration_error",
            Self::Internal => "internal_error",
        }
    }

    /// The HTTP-style status this code maps to by default.
    pub fn default_status(&self) -> u16 {
        match self {
            Self::Credential | Self::Auth => status::UNAUTHORIZED,
            Self::NoData => status::NOT_FOUND,
            Self::InvalidMonth => status::BAD_REQUEST,
            Self::Timeout => status::GATEWAY_TIMEOUT,
            Self::Cancelled => status::CLIENT_CLOSED_REQUEST,
            Self::Network | Self::Upstream | Self::Configuration | Self::Internal => {
                status::BAD_GATEWAY
            }
        }
    }
}

impl fmt::Display for FetchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while fetching a month from upstream.
#[derive(Debug, Error)]
pub struct FetchError {
    code: FetchErrorCode,
    message: String,
    /// Truncated raw upstream payload, kept for diagnostics only.
    payload_sample: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FetchError {
    /// Creates a new error with the given code and message.
    pub fn new(code: FetchErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            payload_sample: None,
            source: None,
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Credential, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Auth, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Upstream, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::NoData, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Cancelled, message)
    }

    pub fn invalid_month(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::InvalidMonth, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Internal, message)
    }

    /// Attaches a sample of the raw upstream payload, truncated to a fixed
    /// number of characters.
    pub fn with_payload_sample(mut self, payload: &str) -> Self {
        let mut sample: String = payload.chars().take(PAYLOAD_SAMPLE_CHARS).collect();
        if sample.len() < payload.len() {
            sample.push('…');
        }
        self.payload_sample = Some(sample);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> FetchErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn payload_sample(&self) -> Option<&str> {
        self.payload_sample.as_deref()
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
