//! Bounded retry with exponential backoff.
//!
//! Only errors whose code is retryable (transient network failures) are
//! retried. Auth failures and malformed payloads are returned on the first
//! attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use calscrape_core::TargetMonth;

use crate::error::FetchResult;
use crate::raw_segment::{PageToken, SegmentPage};
use crate::session::{BoxFuture, Session, SessionClient};
use crate::token::Credential;

/// Retry configuration for upstream calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Factor applied to the delay after each retry.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Builder: set total attempts (at least 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder: set backoff parameters.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let delay = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let max = self.max_backoff.as_secs_f64();

        Duration::from_secs_f64(delay.min(max))
    }

    /// Runs `call` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> FetchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "upstream call recovered after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// A [`SessionClient`] that retries transient failures of an inner client.
#[derive(Debug)]
pub struct Retrying<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> Retrying<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<C: SessionClient> SessionClient for Retrying<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn open_session<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, FetchResult<Session>> {
        Box::pin(async move {
            self.policy
                .run("open_session", || self.inner.open_session(credential))
                .await
        })
    }

    fn fetch_segment<'a>(
        &'a self,
        session: &'a Session,
        month: &'a TargetMonth,
        page_token: Option<&'a PageToken>,
    ) -> BoxFuture<'a, FetchResult<SegmentPage>> {
        Box::pin(async move {
            self.policy
                .run("fetch_segment", || {
                    self.inner.fetch_segment(session, month, page_token)
                })
                .await
        })
    }
}
