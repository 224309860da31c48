//! Fetcher configuration.
//!
//! Everything the fetcher needs to know is passed in at construction; nothing
//! is read from the environment while a request is in flight.

use std::time::Duration;

use chrono_tz::Tz;

use calscrape_core::status;

use crate::error::FetchErrorCode;
use crate::retry::RetryPolicy;

/// Months around the current month for which the upstream keeps data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow {
    /// How many months before the current one are still available.
    pub months_back: u32,
    /// How many months after the current one are already published.
    pub months_ahead: u32,
}

impl RetentionWindow {
    pub fn new(months_back: u32, months_ahead: u32) -> Self {
        Self {
            months_back,
            months_ahead,
        }
    }

    /// Returns true if a month `offset` months from the current one is
    /// within the window.
    pub fn allows(&self, offset: i64) -> bool {
        -i64::from(self.months_back) <= offset && offset <= i64::from(self.months_ahead)
    }
}

/// Configuration for [`CalendarFetcher`](crate::CalendarFetcher).
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Timezone in which months start and entries are dated.
    pub timezone: Tz,
    /// Hard cap on segment requests per fetch.
    pub page_cap: usize,
    /// Retry policy for transient upstream failures.
    pub retry: RetryPolicy,
    /// End-to-end deadline for one fetch, retries included.
    pub deadline: Duration,
    /// Status reported when the upstream is unreachable or misbehaves.
    pub upstream_unavailable_status: u16,
    /// Status reported when the deadline elapses.
    pub timeout_status: u16,
    /// Months the upstream is known to serve; `None` leaves it to the upstream.
    pub retention: Option<RetentionWindow>,
    /// Log raw payload samples and partial buffers of failed fetches.
    pub verbose: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            page_cap: 50,
            retry: RetryPolicy::default(),
            deadline: Duration::from_secs(30),
            upstream_unavailable_status: status::BAD_GATEWAY,
            timeout_status: status::GATEWAY_TIMEOUT,
            retention: None,
            verbose: false,
        }
    }
}

impl FetcherConfig {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Default::default()
        }
    }

    /// Builder: set the page cap (at least 1).
    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_cap = cap.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_upstream_unavailable_status(mut self, status: u16) -> Self {
        self.upstream_unavailable_status = status;
        self
    }

    pub fn with_timeout_status(mut self, status: u16) -> Self {
        self.timeout_status = status;
        self
    }

    pub fn with_retention(mut self, retention: RetentionWindow) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The response status for a failure of the given kind.
    pub fn status_for(&self, code: FetchErrorCode) -> u16 {
        match code {
            FetchErrorCode::Network
            | FetchErrorCode::Upstream
            | FetchErrorCode::Configuration
            | FetchErrorCode::Internal => self.upstream_unavailable_status,
            FetchErrorCode::Timeout => self.timeout_status,
            other => other.default_status(),
        }
    }
}
