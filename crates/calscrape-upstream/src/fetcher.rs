//! Month fetch orchestration.
//!
//! [`CalendarFetcher`] is the single entry point callers use: given a token
//! and a month it validates the credential, opens an upstream session, pages
//! through the month's segments, and normalizes them. It always returns a
//! well-formed [`CalendarResponse`]; failures are reported through its
//! `Error`, `Message` and `Status` fields.
//!
//! Each call walks the state machine
//!
//! ```text
//! Idle → SessionOpening → Fetching(n) → Aggregating → Done
//!              │               │
//!              └───────────────┴──────────────────────→ Failed
//! ```
//!
//! and owns its aggregation buffer; nothing is shared between calls except
//! the session client itself.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use calscrape_core::{CalendarResponse, TargetMonth};

use crate::config::FetcherConfig;
use crate::error::{FetchError, FetchErrorCode, FetchResult};
use crate::normalize::{normalize, stable_id};
use crate::pager::SegmentPager;
use crate::raw_segment::RawCalendarSegment;
use crate::retry::Retrying;
use crate::session::SessionClient;
use crate::token::{Credential, validate};

/// Where a fetch currently is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    SessionOpening,
    /// Requesting the segment with this zero-based index.
    Fetching(usize),
    Aggregating,
    Done,
    Failed,
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::SessionOpening => write!(f, "session_opening"),
            Self::Fetching(n) => write!(f, "fetching({})", n),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The result of one fetch together with how it got there.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: CalendarResponse,
    /// `Done` or `Failed`.
    pub state: FetchState,
    /// Segment requests that returned successfully.
    pub pages_fetched: usize,
    /// Kind of failure, if the fetch failed.
    pub error: Option<FetchErrorCode>,
}

/// Per-call bookkeeping: state and the aggregation buffer.
struct FetchRun {
    state: FetchState,
    buffer: Vec<RawCalendarSegment>,
    started: Instant,
}

impl FetchRun {
    fn new() -> Self {
        Self {
            state: FetchState::Idle,
            buffer: Vec::new(),
            started: Instant::now(),
        }
    }

    fn transition(&mut self, next: FetchState) {
        debug!(from = %self.state, to = %next, "fetch state");
        self.state = next;
    }

    fn buffered_records(&self) -> usize {
        self.buffer.iter().map(RawCalendarSegment::len).sum()
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Fetches and normalizes one month of calendar data per call.
pub struct CalendarFetcher<C> {
    client: Retrying<C>,
    config: FetcherConfig,
    clock: fn() -> DateTime<Utc>,
}

impl<C: SessionClient> CalendarFetcher<C> {
    /// Creates a fetcher; `client` is wrapped with the configured retry policy.
    pub fn new(client: C, config: FetcherConfig) -> Self {
        Self {
            client: Retrying::new(client, config.retry.clone()),
            config,
            clock: Utc::now,
        }
    }

    /// Replaces the clock used for the retention window check.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetches `year`/`month` for the caller identified by `token`.
    pub async fn fetch_month(&self, token: &str, year: i32, month: u32) -> CalendarResponse {
        self.fetch_month_with_cancel(token, year, month, &CancellationToken::new())
            .await
    }

    /// Like [`fetch_month`](Self::fetch_month), abandoning upstream calls as
    /// soon as `cancel` fires.
    pub async fn fetch_month_with_cancel(
        &self,
        token: &str,
        year: i32,
        month: u32,
        cancel: &CancellationToken,
    ) -> CalendarResponse {
        self.fetch_month_outcome(token, year, month, cancel)
            .await
            .response
    }

    /// Runs a fetch and reports its final state alongside the response.
    #[instrument(
        name = "fetch_month",
        skip_all,
        fields(upstream = %self.client.name(), year = year, month = month, token_len = token.len())
    )]
    pub async fn fetch_month_outcome(
        &self,
        token: &str,
        year: i32,
        month: u32,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let mut run = FetchRun::new();

        let credential = match validate(token) {
            Ok(credential) => credential,
            Err(rejection) => {
                debug!(reason = %rejection, "credential rejected before any upstream call");
                return self.failed(
                    run,
                    FetchError::credential(rejection.public_message()),
                    None,
                );
            }
        };

        let target = match TargetMonth::new(year, month, self.config.timezone) {
            Ok(target) => target,
            Err(e) => return self.failed(run, FetchError::invalid_month(e.to_string()), None),
        };

        if let Err(err) = self.check_retention(&target) {
            return self.failed(run, err, Some(&target));
        }

        let result = {
            let work = AssertUnwindSafe(self.execute(&credential, &target, &mut run)).catch_unwind();
            let bounded = tokio::time::timeout(self.config.deadline, work);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FetchError::cancelled("caller cancelled the request")),
                result = bounded => match result {
                    Ok(Ok(result)) => result,
                    Ok(Err(panic)) => Err(FetchError::internal(format!(
                        "fetch panicked: {}",
                        panic_message(panic.as_ref())
                    ))),
                    Err(_) => Err(FetchError::timeout(format!(
                        "deadline of {}ms exceeded",
                        self.config.deadline.as_millis()
                    ))),
                },
            }
        };

        match result {
            Ok(response) => {
                run.transition(FetchState::Done);
                info!(
                    entries = response.calendar.len(),
                    pages = run.buffer.len(),
                    elapsed_ms = run.elapsed_ms(),
                    "month fetched"
                );
                FetchOutcome {
                    response,
                    state: run.state,
                    pages_fetched: run.buffer.len(),
                    error: None,
                }
            }
            Err(err) => self.failed(run, err, Some(&target)),
        }
    }

    /// Session open, pagination and aggregation.
    async fn execute(
        &self,
        credential: &Credential,
        target: &TargetMonth,
        run: &mut FetchRun,
    ) -> FetchResult<CalendarResponse> {
        run.transition(FetchState::SessionOpening);
        let session = self.client.open_session(credential).await?;

        let mut pager = SegmentPager::new(&self.client, &session, target, self.config.page_cap);
        loop {
            run.transition(FetchState::Fetching(pager.pages_fetched()));
            match pager.next_segment().await? {
                Some(segment) => run.buffer.push(segment),
                None => break,
            }
        }

        run.transition(FetchState::Aggregating);
        Ok(normalize(&run.buffer, target))
    }

    fn check_retention(&self, target: &TargetMonth) -> FetchResult<()> {
        let Some(retention) = self.config.retention else {
            return Ok(());
        };

        let current = TargetMonth::containing((self.clock)(), self.config.timezone)
            .map_err(|e| FetchError::internal(format!("cannot resolve current month: {}", e)))?;
        let offset = target.months_since(&current);

        if retention.allows(offset) {
            Ok(())
        } else {
            Err(FetchError::no_data(format!(
                "{} is {} months from {}, outside the retention window",
                target, offset, current
            )))
        }
    }

    fn failed(
        &self,
        mut run: FetchRun,
        err: FetchError,
        target: Option<&TargetMonth>,
    ) -> FetchOutcome {
        run.transition(FetchState::Failed);
        let code = err.code();

        match code {
            FetchErrorCode::Credential | FetchErrorCode::InvalidMonth => {
                debug!(code = %code, message = err.message(), "fetch refused");
            }
            _ => warn!(
                code = %code,
                message = err.message(),
                pages = run.buffer.len(),
                partial_records = run.buffered_records(),
                elapsed_ms = run.elapsed_ms(),
                "month fetch failed"
            ),
        }

        if self.config.verbose {
            if let Some(sample) = err.payload_sample() {
                debug!(payload = sample, "upstream payload sample");
            }
            if !run.buffer.is_empty() {
                let ids: Vec<String> = run
                    .buffer
                    .iter()
                    .flat_map(|s| s.records.iter())
                    .map(stable_id)
                    .collect();
                debug!(partial_ids = ?ids, "discarding partial aggregation");
            }
        }

        FetchOutcome {
            response: CalendarResponse::failure(
                self.config.status_for(code),
                public_message(&err, target),
            ),
            state: run.state,
            pages_fetched: run.buffer.len(),
            error: Some(code),
        }
    }
}

/// The caller-facing message for a failure.
fn public_message(err: &FetchError, target: Option<&TargetMonth>) -> String {
    match err.code() {
        FetchErrorCode::Credential | FetchErrorCode::InvalidMonth => err.message().to_string(),
        FetchErrorCode::Auth => {
            "Authentication failed: the calendar source rejected the token".to_string()
        }
        FetchErrorCode::Network => {
            "Calendar source is unavailable, please try again later".to_string()
        }
        FetchErrorCode::Upstream => "Calendar source returned an unexpected response".to_string(),
        FetchErrorCode::NoData => match target {
            Some(target) => format!("No calendar data available for {}", target.label()),
            None => "No calendar data available".to_string(),
        },
        FetchErrorCode::Timeout => "Timed out while fetching the calendar".to_string(),
        FetchErrorCode::Cancelled => "Request was cancelled".to_string(),
        FetchErrorCode::Configuration | FetchErrorCode::Internal => {
            "Internal error while fetching the calendar".to_string()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
