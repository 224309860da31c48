//! The externally visible result of a month fetch.
//!
//! [`CalendarResponse`] has the same shape on success and failure; only the
//! populated fields differ. Serialized field names are `Error`, `Message`,
//! `Status` and `Calendar`.

use serde::{Deserialize, Serialize};

use crate::entry::MonthEntry;

/// HTTP-style status codes surfaced by fetch outcomes.
pub mod status {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const NOT_FOUND: u16 = 404;
    /// Client closed the request before a result was produced.
    pub const CLIENT_CLOSED_REQUEST: u16 = 499;
    pub const BAD_GATEWAY: u16 = 502;
    pub const GATEWAY_TIMEOUT: u16 = 504;
}

/// Message used for a successful fetch.
pub const SUCCESS_MESSAGE: &str = "Calendar fetched successfully";

/// Response for a single month fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CalendarResponse {
    pub error: bool,
    pub message: String,
    pub status: u16,
    /// Entries of the requested month, chronological. Always empty on error.
    #[serde(default)]
    pub calendar: Vec<MonthEntry>,
}

impl CalendarResponse {
    /// A successful response carrying the given entries.
    pub fn success(calendar: Vec<MonthEntry>) -> Self {
        Self {
            error: false,
            message: SUCCESS_MESSAGE.to_string(),
            status: status::OK,
            calendar,
        }
    }

    /// A failed response; the calendar is left empty.
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            status,
            calendar: Vec::new(),
        }
    }

    /// Returns true if the fetch succeeded.
    pub fn is_success(&self) -> bool {
        !self.error
    }
}
