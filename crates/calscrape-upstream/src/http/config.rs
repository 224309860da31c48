//! HTTP session client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{FetchError, FetchResult};

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`HttpSessionClient`](super::HttpSessionClient).
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the upstream calendar source.
    pub base_url: Url,
    /// Timeout applied to each individual request.
    pub request_timeout: Duration,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Name used in logs.
    pub name: String,
}

impl HttpClientConfig {
    /// Parses `base_url` and builds a configuration with defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid or not http(s).
    pub fn new(base_url: &str) -> FetchResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            FetchError::configuration(format!("invalid upstream URL '{}': {}", base_url, e))
                .with_source(e)
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(FetchError::configuration(format!(
                "upstream URL must be http or https, got '{}'",
                base_url.scheme()
            )));
        }

        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let name = base_url.host_str().unwrap_or("upstream").to_string();

        Ok(Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("calscrape/{}", env!("CARGO_PKG_VERSION")),
            name,
        })
    }

    /// Builder: set per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builder: set User-Agent.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Builder: set the name used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Resolves an endpoint path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> FetchResult<Url> {
        self.base_url.join(path).map_err(|e| {
            FetchError::configuration(format!("cannot build URL for '{}': {}", path, e))
        })
    }
}
