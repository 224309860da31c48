//! CLI configuration.
//!
//! Settings live in `config.toml`, by default at
//! `~/.config/calscrape/config.toml`:
//!
//! ```toml
//! token = "env::PORTAL_TOKEN"
//!
//! [upstream]
//! base_url = "https://portal.example.edu/api"
//! request_timeout_secs = 10
//!
//! [fetcher]
//! timezone = "Asia/Kolkata"
//! page_cap = 50
//! deadline_secs = 30
//!
//! [fetcher.retry]
//! max_attempts = 3
//! initial_backoff_ms = 200
//!
//! [fetcher.retention]
//! months_back = 12
//! months_ahead = 6
//! ```
//!
//! The `token` value supports `env::` and `pass::` references.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use calscrape_upstream::{FetcherConfig, HttpClientConfig, RetentionWindow, RetryPolicy};

use crate::error::{CliError, CliResult};

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Caller token, or a secret reference to it.
    pub token: Option<String>,

    /// Upstream connection settings.
    pub upstream: UpstreamSettings,

    /// Fetch behaviour.
    pub fetcher: FetcherSettings,
}

/// `[upstream]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Base URL of the upstream API.
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// User-Agent override.
    pub user_agent: Option<String>,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: 10,
            user_agent: None,
        }
    }
}

/// `[fetcher]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherSettings {
    /// IANA timezone name months are evaluated in.
    pub timezone: String,
    pub page_cap: usize,
    /// Whole-fetch deadline in seconds.
    pub deadline_secs: u64,
    pub upstream_unavailable_status: u16,
    pub timeout_status: u16,
    /// Log payload samples and partial results of failed fetches.
    pub verbose: bool,
    pub retry: RetrySettings,
    pub retention: Option<RetentionSettings>,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        let defaults = FetcherConfig::default();
        Self {
            timezone: defaults.timezone.name().to_string(),
            page_cap: defaults.page_cap,
            deadline_secs: defaults.deadline.as_secs(),
            upstream_unavailable_status: defaults.upstream_unavailable_status,
            timeout_status: defaults.timeout_status,
            verbose: defaults.verbose,
            retry: RetrySettings::default(),
            retention: None,
        }
    }
}

/// `[fetcher.retry]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
                self.backoff_multiplier,
            )
    }
}

/// `[fetcher.retention]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionSettings {
    pub months_back: u32,
    pub months_ahead: u32,
}

impl FetcherSettings {
    /// Parses the configured timezone.
    pub fn timezone(&self) -> CliResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| CliError::Config(format!("invalid timezone '{}': {}", self.timezone, e)))
    }

    /// Converts to fetcher configuration.
    pub fn to_fetcher_config(&self) -> CliResult<FetcherConfig> {
        if self.deadline_secs == 0 {
            return Err(CliError::Config("deadline_secs must be positive".to_string()));
        }
        if self.backoff_multiplier_invalid() {
            return Err(CliError::Config(
                "retry.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }

        let mut config = FetcherConfig::new(self.timezone()?)
            .with_page_cap(self.page_cap)
            .with_retry(self.retry.to_policy())
            .with_deadline(Duration::from_secs(self.deadline_secs))
            .with_upstream_unavailable_status(self.upstream_unavailable_status)
            .with_timeout_status(self.timeout_status)
            .with_verbose(self.verbose);

        if let Some(retention) = self.retention {
            config = config.with_retention(RetentionWindow::new(
                retention.months_back,
                retention.months_ahead,
            ));
        }

        Ok(config)
    }

    fn backoff_multiplier_invalid(&self) -> bool {
        !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0
    }
}

impl UpstreamSettings {
    /// Converts to HTTP client configuration.
    ///
    /// `base_url_override` (from the command line) wins over the file.
    pub fn to_http_config(&self, base_url_override: Option<&str>) -> CliResult<HttpClientConfig> {
        let base_url = base_url_override
            .or(self.base_url.as_deref())
            .ok_or_else(|| {
                CliError::Config(format!(
                    "no upstream base URL. Pass --base-url or add to {}:\n  \
                     [upstream]\n  \
                     base_url = \"https://portal.example.edu/api\"",
                    Settings::default_path().display()
                ))
            })?;

        let mut config = HttpClientConfig::new(base_url)?
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs.max(1)));
        if let Some(ref agent) = self.user_agent {
            config = config.with_user_agent(agent);
        }

        Ok(config)
    }
}

impl Settings {
    /// Loads settings from the default path, or defaults if it does not exist.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads settings from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calscrape")
            .join("config.toml")
    }

    /// Resolves the configured token, if any.
    pub fn resolve_token(&self) -> CliResult<Option<String>> {
        self.token.as_deref().map(crate::secret::resolve).transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let settings = Settings::default();
        let config = settings.fetcher.to_fetcher_config().unwrap();
        let library = FetcherConfig::default();

        assert_eq!(config.timezone, library.timezone);
        assert_eq!(config.page_cap, library.page_cap);
        assert_eq!(config.deadline, library.deadline);
        assert_eq!(config.retry, library.retry);
        assert!(config.retention.is_none());
    }

    #[test]
    fn full_toml_converts() {
        let toml_content = r#"
token = "abc123"

[upstream]
base_url = "https://portal.example.edu/api"
request_timeout_secs = 4
user_agent = "portal-sync/1.0"

[fetcher]
timezone = "Asia/Kolkata"
page_cap = 12
deadline_secs = 9
upstream_unavailable_status = 503
verbose = true

[fetcher.retry]
max_attempts = 5
initial_backoff_ms = 50
max_backoff_ms = 400

[fetcher.retention]
months_back = 12
months_ahead = 6
"#;
        let settings: Settings = toml::from_str(toml_content).unwrap();

        let fetcher = settings.fetcher.to_fetcher_config().unwrap();
        assert_eq!(fetcher.timezone, chrono_tz::Asia::Kolkata);
        assert_eq!(fetcher.page_cap, 12);
        assert_eq!(fetcher.deadline, Duration::from_secs(9));
        assert_eq!(fetcher.upstream_unavailable_status, 503);
        assert_eq!(fetcher.timeout_status, 504);
        assert!(fetcher.verbose);
        assert_eq!(fetcher.retry.max_attempts, 5);
        assert_eq!(fetcher.retry.initial_backoff, Duration::from_millis(50));
        assert_eq!(fetcher.retry.max_backoff, Duration::from_millis(400));
        assert_eq!(fetcher.retention, Some(RetentionWindow::new(12, 6)));

        let http = settings.upstream.to_http_config(None).unwrap();
        assert_eq!(http.base_url.as_str(), "https://portal.example.edu/api/");
        assert_eq!(http.request_timeout, Duration::from_secs(4));
        assert_eq!(http.user_agent, "portal-sync/1.0");

        assert_eq!(settings.resolve_token().unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn base_url_override_wins() {
        let settings: Settings =
            toml::from_str("[upstream]\nbase_url = \"https://a.example.edu\"\n").unwrap();
        let http = settings
            .upstream
            .to_http_config(Some("https://b.example.edu/api"))
            .unwrap();
        assert_eq!(http.base_url.host_str(), Some("b.example.edu"));
    }

    #[test]
    fn missing_base_url_errors() {
        let err = Settings::default().upstream.to_http_config(None).unwrap_err();
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn invalid_timezone_errors() {
        let settings: Settings = toml::from_str("[fetcher]\ntimezone = \"Mars/Olympus\"\n").unwrap();
        let err = settings.fetcher.to_fetcher_config().unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn zero_deadline_errors() {
        let settings: Settings = toml::from_str("[fetcher]\ndeadline_secs = 0\n").unwrap();
        assert!(settings.fetcher.to_fetcher_config().is_err());
    }

    #[test]
    fn token_env_reference() {
        unsafe {
            std::env::set_var("_CALSCRAPE_CFG_TOKEN", "tok-env");
        }
        let settings: Settings = toml::from_str("token = \"env::_CALSCRAPE_CFG_TOKEN\"\n").unwrap();
        assert_eq!(settings.resolve_token().unwrap().as_deref(), Some("tok-env"));
        unsafe {
            std::env::remove_var("_CALSCRAPE_CFG_TOKEN");
        }
    }

    #[test]
    fn no_token_is_none() {
        assert_eq!(Settings::default().resolve_token().unwrap(), None);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fetcher]\npage_cap = 3").unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.fetcher.page_cap, 3);
        assert_eq!(settings.fetcher.timezone, "UTC");
    }

    #[test]
    fn load_from_invalid_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fetcher\npage_cap = ").unwrap();

        let err = Settings::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load_from(&dir.path().join("absent.toml")).is_err());
    }
}
