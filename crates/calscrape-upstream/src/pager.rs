//! Bounded pagination over a month's segments.
//!
//! [`SegmentPager`] yields the segments of one month lazily, one upstream
//! call per segment; each fetch builds a fresh pager. It stops when the
//! upstream returns no continuation token, and fails once the page cap is
//! exceeded so that a pagination bug upstream cannot loop forever.

use tracing::{debug, warn};

use calscrape_core::TargetMonth;

use crate::error::{FetchError, FetchResult};
use crate::raw_segment::{PageToken, RawCalendarSegment};
use crate::session::{Session, SessionClient};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    /// Nothing fetched yet.
    Start,
    /// The upstream asked for another page.
    Next(PageToken),
    /// The last page has been returned.
    Exhausted,
}

/// A lazy, finite sequence of segments for one month.
pub struct SegmentPager<'a, C: SessionClient + ?Sized> {
    client: &'a C,
    session: &'a Session,
    month: &'a TargetMonth,
    page_cap: usize,
    cursor: Cursor,
    pages_fetched: usize,
}

impl<'a, C: SessionClient + ?Sized> SegmentPager<'a, C> {
    /// Creates a pager that issues at most `page_cap` segment requests.
    pub fn new(
        client: &'a C,
        session: &'a Session,
        month: &'a TargetMonth,
        page_cap: usize,
    ) -> Self {
        Self {
            client,
            session,
            month,
            page_cap: page_cap.max(1),
            cursor: Cursor::Start,
            pages_fetched: 0,
        }
    }

    /// Number of segment requests issued so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Returns true once the upstream signalled the last page.
    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Fetches the next segment.
    ///
    /// Returns `Ok(None)` after the last page.
    ///
    /// # Errors
    ///
    /// Propagates the session client's error, or returns an `Upstream` error
    /// when the upstream still reports more pages after `page_cap` requests.
    pub async fn next_segment(&mut self) -> FetchResult<Option<RawCalendarSegment>> {
        let token = match &self.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token.clone()),
        };

        if self.pages_fetched >= self.page_cap {
            warn!(
                month = %self.month,
                page_cap = self.page_cap,
                "upstream pagination did not terminate"
            );
            return Err(FetchError::upstream(format!(
                "pagination exceeded {} pages for {}",
                self.page_cap, self.month
            )));
        }

        let page = self
            .client
            .fetch_segment(self.session, self.month, token.as_ref())
            .await?;
        self.pages_fetched += 1;

        self.cursor = match page.next_page_token {
            Some(next) => Cursor::Next(next),
            None => Cursor::Exhausted,
        };

        debug!(
            month = %self.month,
            page = self.pages_fetched,
            records = page.segment.len(),
            exhausted = self.is_exhausted(),
            "segment received"
        );

        Ok(Some(page.segment))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::FetchErrorCode;
    use crate::raw_segment::SegmentPage;
    use crate::session::BoxFuture;
    use crate::token::{Credential, validate};

    /// Returns pages `p1`, `p2`, ... and records the tokens it saw. With a
    /// page count set, the page at that count carries no continuation token.
    struct PagedClient {
        pages: Option<usize>,
        seen: Mutex<Vec<Option<String>>>,
    }

    impl PagedClient {
        fn endless() -> Self {
            Self {
                pages: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn with_pages(pages: usize) -> Self {
            Self {
                pages: Some(pages),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl SessionClient for PagedClient {
        fn name(&self) -> &str {
            "paged"
        }

        fn open_session<'a>(
            &'a self,
            credential: &'a Credential,
        ) -> BoxFuture<'a, FetchResult<Session>> {
            Box::pin(async move { Ok(Session::new(credential.clone())) })
        }

        fn fetch_segment<'a>(
            &'a self,
            _session: &'a Session,
            _month: &'a TargetMonth,
            page_token: Option<&'a PageToken>,
        ) -> BoxFuture<'a, FetchResult<SegmentPage>> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(page_token.map(|t| t.as_str().to_string()));
            let page = if self.pages == Some(seen.len()) {
                SegmentPage::last(RawCalendarSegment::default())
            } else {
                SegmentPage::with_next(RawCalendarSegment::default(), format!("p{}", seen.len()))
            };
            Box::pin(async move { Ok(page) })
        }
    }

    fn fixtures() -> (Session, TargetMonth) {
        (
            Session::new(validate("abc123").unwrap()),
            TargetMonth::utc(2025, 10).unwrap(),
        )
    }

    async fn drain<C: SessionClient>(pager: &mut SegmentPager<'_, C>) -> FetchResult<usize> {
        let mut segments = 0;
        while pager.next_segment().await?.is_some() {
            segments += 1;
        }
        Ok(segments)
    }

    #[tokio::test]
    async fn stops_at_page_cap() {
        let client = PagedClient::endless();
        let (session, month) = fixtures();
        let mut pager = SegmentPager::new(&client, &session, &month, 4);

        let err = drain(&mut pager).await.unwrap_err();
        assert_eq!(err.code(), FetchErrorCode::Upstream);
        assert_eq!(pager.pages_fetched(), 4);
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn last_page_exactly_at_cap_succeeds() {
        let client = PagedClient::with_pages(4);
        let (session, month) = fixtures();
        let mut pager = SegmentPager::new(&client, &session, &month, 4);

        assert_eq!(drain(&mut pager).await.unwrap(), 4);
        assert!(pager.is_exhausted());
        assert_eq!(client.calls(), 4);
        assert!(pager.next_segment().await.unwrap().is_none());
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn one_page_over_cap_fails() {
        let client = PagedClient::with_pages(5);
        let (session, month) = fixtures();
        let mut pager = SegmentPager::new(&client, &session, &month, 4);

        assert!(drain(&mut pager).await.is_err());
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn passes_previous_token_forward() {
        let client = PagedClient::endless();
        let (session, month) = fixtures();
        let mut pager = SegmentPager::new(&client, &session, &month, 3);

        for _ in 0..3 {
            pager.next_segment().await.unwrap();
        }

        let seen = client.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![None, Some("p1".to_string()), Some("p2".to_string())]
        );
    }
}
