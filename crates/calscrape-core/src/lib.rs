//! Core types: target months, event times, month entries, responses, tracing

pub mod entry;
pub mod response;
pub mod time;
pub mod tracing;

pub use entry::MonthEntry;
pub use response::{CalendarResponse, SUCCESS_MESSAGE, status};
pub use time::{EventTime, TargetMonth, TargetMonthError, TimeWindow};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

pub use chrono_tz::Tz;
