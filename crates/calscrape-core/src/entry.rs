//! Month entries.
//!
//! A [`MonthEntry`] is one dated item of the requested month after
//! normalization: a single upstream record placed on its calendar day in the
//! reference timezone.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// A normalized calendar entry inside the requested month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthEntry {
    /// Stable identifier, unique within one response.
    pub id: String,
    /// The day this entry falls on, in the reference timezone.
    pub date: NaiveDate,
    /// Weekday name of `date` (e.g. "Wednesday").
    pub day: String,
    /// Month label (e.g. "October 2025").
    pub month: String,
    /// The entry title.
    pub title: String,
    /// When the entry starts.
    pub start: EventTime,
    /// When the entry ends.
    pub end: EventTime,
    /// Whether the entry spans whole days.
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Upstream category or event kind (e.g. "holiday", "exam").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Link to the entry on the upstream site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MonthEntry {
    /// Creates a new entry with required fields.
    ///
    /// `day` is derived from `date`; `all_day` from `start`.
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        month: impl Into<String>,
        title: impl Into<String>,
        start: EventTime,
        end: EventTime,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            day: weekday_name(date.weekday()).to_string(),
            month: month.into(),
            title: title.into(),
            all_day: start.is_all_day(),
            start,
            end,
            location: None,
            description: None,
            category: None,
            url: None,
        }
    }

    /// Builder method to set location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder method to set the upstream link.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
