//! Authenticated month fetches against the upstream calendar source.
//!
//! - [`validate`] - Token presence and shape checks, before any network work
//! - [`SessionClient`] - The seam between the fetcher and the upstream
//! - [`HttpSessionClient`] - reqwest implementation of that seam
//! - [`SegmentPager`] - Bounded pagination over a month's segments
//! - [`normalize`] - Deduplication and ordering of aggregated segments
//! - [`CalendarFetcher`] - Drives all of the above for one month
//!
//! # Architecture
//!
//! ```text
//!   token, year, month
//!          │
//!          ▼ validate()
//! ┌─────────────────┐
//! │ CalendarFetcher │──── deadline, cancellation, panics
//! └────────┬────────┘
//!          │ Retrying<C>
//!          ▼
//! ┌─────────────────┐    ┌──────────────────┐
//! │  SessionClient  │◄───│ HttpSessionClient │
//! └────────┬────────┘    └──────────────────┘
//!          │ SegmentPager
//!          ▼
//!   RawCalendarSegment*
//!          │
//!          ▼ normalize()
//!   CalendarResponse
//! ```
//!
//! # Example
//!
//! ```ignore
//! use calscrape_upstream::{CalendarFetcher, FetcherConfig, HttpClientConfig, HttpSessionClient};
//!
//! let client = HttpSessionClient::new(HttpClientConfig::new("https://portal.example.edu/api")?)?;
//! let fetcher = CalendarFetcher::new(client, FetcherConfig::default());
//! let response = fetcher.fetch_month("abc123", 2025, 10).await;
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod normalize;
pub mod pager;
pub mod raw_segment;
pub mod retry;
pub mod session;
pub mod token;

pub use config::{FetcherConfig, RetentionWindow};
pub use error::{FetchError, FetchErrorCode, FetchResult};
pub use fetcher::{CalendarFetcher, FetchOutcome, FetchState};
pub use http::{HttpClientConfig, HttpSessionClient};
pub use normalize::{normalize, normalize_entries, stable_id};
pub use pager::SegmentPager;
pub use raw_segment::{PageToken, RawCalendarSegment, RawEventTime, RawRecord, SegmentPage};
pub use retry::{RetryPolicy, Retrying};
pub use session::{BoxFuture, Session, SessionClient};
pub use token::{Credential, TokenRejection, credential_from_header, validate};

pub use tokio_util::sync::CancellationToken;
