//! Raw upstream data.
//!
//! A [`RawCalendarSegment`] is one page of records as returned by a single
//! session call. Segments are consumed by aggregation and discarded after
//! normalization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use calscrape_core::EventTime;

/// The time specification for a raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawEventTime {
    /// A specific datetime in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day date.
    Date(NaiveDate),
}

impl RawEventTime {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Converts to the normalized [`EventTime`].
    pub fn to_event_time(&self) -> EventTime {
        match self {
            Self::DateTime(dt) => EventTime::from_utc(*dt),
            Self::Date(date) => EventTime::from_date(*date),
        }
    }
}

/// A single upstream calendar record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Upstream identifier, when the source provides one.
    pub id: Option<String>,
    pub title: Option<String>,
    pub start: RawEventTime,
    pub end: RawEventTime,
    pub location: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub url: Option<String>,
    /// Upstream status (e.g. "confirmed", "cancelled").
    pub status: Option<String>,
}

impl RawRecord {
    /// Creates a record with the required time fields.
    pub fn new(start: RawEventTime, end: RawEventTime) -> Self {
        Self {
            id: None,
            title: None,
            start,
            end,
            location: None,
            description: None,
            category: None,
            url: None,
            status: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Returns the title, or a fallback if empty/missing.
    pub fn effective_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("(No title)")
    }

    /// Returns true if the upstream marked this record as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }
}

/// Opaque continuation token handed back by the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(String);

impl PageToken {
    /// Wraps a continuation token; empty or blank tokens yield `None`,
    /// which ends pagination.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of upstream records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCalendarSegment {
    pub records: Vec<RawRecord>,
}

impl RawCalendarSegment {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A segment together with the token for the following page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPage {
    pub segment: RawCalendarSegment,
    /// `None` when no further segments remain for the month.
    pub next_page_token: Option<PageToken>,
}

impl SegmentPage {
    /// The final page of a month.
    pub fn last(segment: RawCalendarSegment) -> Self {
        Self {
            segment,
            next_page_token: None,
        }
    }

    /// A page followed by another one.
    pub fn with_next(segment: RawCalendarSegment, token: impl Into<String>) -> Self {
        Self {
            segment,
            next_page_token: PageToken::new(token),
        }
    }
}
