//! HTTP session client for the upstream calendar source.
//!
//! The upstream exposes two endpoints relative to the configured base URL:
//!
//! - `POST session`: exchanges the bearer token for a session, returned as a
//!   JSON body (`{"session": "..."}`) and/or a `Set-Cookie` header
//! - `GET calendar`: one page of a month's records, selected by `year`,
//!   `month`, `timeMin`, `timeMax` and an optional `pageToken`

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{COOKIE, RETRY_AFTER, SET_COOKIE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use calscrape_core::TargetMonth;

use crate::error::{FetchError, FetchResult};
use crate::raw_segment::{PageToken, RawCalendarSegment, RawEventTime, RawRecord, SegmentPage};
use crate::session::{BoxFuture, Session, SessionClient};
use crate::token::Credential;

use super::config::HttpClientConfig;

/// Header carrying the upstream session id on segment requests.
const SESSION_HEADER: &str = "X-Session-Id";

/// reqwest-backed [`SessionClient`].
///
/// The inner `reqwest::Client` pools connections and is safe to share
/// between concurrent fetches; each request draws its own connection.
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    http_client: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpSessionClient {
    /// Creates a client for the configured upstream.
    pub fn new(config: HttpClientConfig) -> FetchResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                FetchError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    async fn open_session_impl(&self, credential: &Credential) -> FetchResult<Session> {
        let url = self.config.endpoint("session")?;
        debug!(upstream = %self.config.name, "opening upstream session");

        let response = self
            .http_client
            .post(url)
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(send_error)?;

        let response = ensure_success(response, "session").await?;

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(cookie_pair)
            .next();

        let body = read_body(response).await?;
        let session_id = if body.trim().is_empty() {
            None
        } else {
            let parsed: SessionResponse = serde_json::from_str(&body).map_err(|e| {
                FetchError::upstream(format!("failed to parse session response: {}", e))
                    .with_payload_sample(&body)
            })?;
            parsed.session.filter(|s| !s.trim().is_empty())
        };

        let mut session = Session::new(credential.clone());
        match (session_id, cookie) {
            (None, None) => {
                return Err(FetchError::upstream(
                    "session handshake returned neither a session id nor a cookie",
                )
                .with_payload_sample(&body));
            }
            (id, cookie) => {
                if let Some(id) = id {
                    session = session.with_session_id(id);
                }
                if let Some(cookie) = cookie {
                    session = session.with_cookie(cookie);
                }
            }
        }

        Ok(session)
    }

    async fn fetch_segment_impl(
        &self,
        session: &Session,
        month: &TargetMonth,
        page_token: Option<&PageToken>,
    ) -> FetchResult<SegmentPage> {
        let url = self.config.endpoint("calendar")?;
        let window = month.window();

        let mut request = self
            .http_client
            .get(url)
            .bearer_auth(session.credential().expose())
            .query(&[
                ("year", month.year().to_string()),
                ("month", month.month().to_string()),
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token.as_str())]);
        }
        if let Some(id) = session.session_id() {
            request = request.header(SESSION_HEADER, id);
        }
        if let Some(cookie) = session.cookie() {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await.map_err(send_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::no_data(format!(
                "upstream has no calendar for {}",
                month
            )));
        }

        let response = ensure_success(response, "calendar").await?;
        let body = read_body(response).await?;

        let page: SegmentResponse = serde_json::from_str(&body).map_err(|e| {
            FetchError::upstream(format!("failed to parse calendar response: {}", e))
                .with_payload_sample(&body)
        })?;

        let records = page
            .items
            .into_iter()
            .map(convert_event)
            .collect::<FetchResult<Vec<RawRecord>>>()
            .map_err(|e| {
                warn!(upstream = %self.config.name, month = %month, error = %e, "malformed calendar item");
                e.with_payload_sample(&body)
            })?;
        debug!(
            upstream = %self.config.name,
            month = %month,
            records = records.len(),
            has_next = page.next_page_token.is_some(),
            "fetched calendar segment"
        );

        Ok(SegmentPage {
            segment: RawCalendarSegment::new(records),
            next_page_token: page.next_page_token.and_then(PageToken::new),
        })
    }
}

impl SessionClient for HttpSessionClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn open_session<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, FetchResult<Session>> {
        Box::pin(async move { self.open_session_impl(credential).await })
    }

    fn fetch_segment<'a>(
        &'a self,
        session: &'a Session,
        month: &'a TargetMonth,
        page_token: Option<&'a PageToken>,
    ) -> BoxFuture<'a, FetchResult<SegmentPage>> {
        Box::pin(async move { self.fetch_segment_impl(session, month, page_token).await })
    }
}

/// Maps a transport failure to a network error.
fn send_error(e: reqwest::Error) -> FetchError {
    let err = if e.is_timeout() {
        FetchError::network("request timeout")
    } else if e.is_connect() {
        FetchError::network(format!("connection failed: {}", e))
    } else {
        FetchError::network(format!("request failed: {}", e))
    };
    err.with_source(e)
}

/// Returns the response if its status is a success, otherwise the matching
/// error.
async fn ensure_success(response: Response, endpoint: &str) -> FetchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FetchError::auth(format!(
            "upstream rejected the credential ({})",
            status
        )));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(FetchError::network(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        return Err(
            FetchError::network(format!("upstream {} returned {}", endpoint, status))
                .with_payload_sample(&body),
        );
    }

    Err(
        FetchError::upstream(format!("unexpected status {} from {}", status, endpoint))
            .with_payload_sample(&body),
    )
}

async fn read_body(response: Response) -> FetchResult<String> {
    response.text().await.map_err(|e| {
        FetchError::network(format!("failed to read response: {}", e)).with_source(e)
    })
}

/// Extracts `name=value` from a `Set-Cookie` header value.
fn cookie_pair(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    match pair.split_once('=') {
        Some((name, _)) if !name.trim().is_empty() => Some(pair.to_string()),
        _ => None,
    }
}

/// Converts an upstream event to a [`RawRecord`].
///
/// A missing end is treated as equal to the start. A missing or unparseable
/// start, or an unparseable end, is an upstream fault and fails the segment.
fn convert_event(event: ApiEvent) -> FetchResult<RawRecord> {
    let label = event.id.clone().unwrap_or_else(|| "<no id>".to_string());

    let start = parse_time(&event.start)
        .map_err(|reason| FetchError::upstream(format!("event {}: start {}", label, reason)))?;
    let end = match event.end.as_ref() {
        Some(end) => parse_time(end)
            .map_err(|reason| FetchError::upstream(format!("event {}: end {}", label, reason)))?,
        None => start.clone(),
    };

    let mut record = RawRecord::new(start, end);
    record.id = event.id.filter(|id| !id.trim().is_empty());
    record.title = event.title;
    record.location = event.location;
    record.description = event.description;
    record.category = event.category;
    record.url = event.url;
    record.status = event.status;

    Ok(record)
}

/// Parses an upstream time, returning the reason on failure.
fn parse_time(time: &ApiEventTime) -> Result<RawEventTime, String> {
    if let Some(ref dt) = time.date_time {
        return DateTime::parse_from_rfc3339(dt)
            .map(|parsed| RawEventTime::DateTime(parsed.with_timezone(&Utc)))
            .map_err(|e| format!("has invalid dateTime '{}': {}", dt, e));
    }
    if let Some(ref date) = time.date {
        return NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(RawEventTime::Date)
            .map_err(|e| format!("has invalid date '{}': {}", date, e));
    }
    Err("has neither dateTime nor date".to_string())
}

/// Response from the session endpoint.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(alias = "sessionId", alias = "session_id")]
    session: Option<String>,
}

/// Response from the calendar endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentResponse {
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single upstream event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    #[serde(alias = "summary")]
    title: Option<String>,
    start: ApiEventTime,
    end: Option<ApiEventTime>,
    location: Option<String>,
    description: Option<String>,
    #[serde(alias = "type")]
    category: Option<String>,
    #[serde(alias = "htmlLink")]
    url: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}
