//! SessionClient trait definition.
//!
//! A [`SessionClient`] performs the authenticated exchange with the upstream
//! calendar source: it opens a [`Session`] for a caller's credential, then
//! fetches the target month one [`SegmentPage`] at a time.
//!
//! Implementations make a single attempt per call. Retries for transient
//! failures are layered on top by [`Retrying`](crate::retry::Retrying).

use std::future::Future;
use std::pin::Pin;

use calscrape_core::TargetMonth;

use crate::error::FetchResult;
use crate::raw_segment::{PageToken, SegmentPage};
use crate::token::Credential;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so a fetcher can hold a
/// `dyn SessionClient`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An authenticated handle used for one or more segment requests.
///
/// Sessions are request-scoped and never shared between fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    credential: Credential,
    /// Session identifier issued by the upstream, sent back as a header.
    session_id: Option<String>,
    /// Cookie pair (`name=value`) issued by the upstream.
    cookie: Option<String>,
}

impl Session {
    /// A session that only carries the caller's credential.
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            session_id: None,
            cookie: None,
        }
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

/// The authenticated network exchange with the upstream calendar source.
///
/// # Errors
///
/// Both methods report failures as [`FetchError`](crate::FetchError):
/// - `Auth` when the upstream rejects the credential
/// - `Network` on connectivity failures, timeouts, 5xx and rate limiting
/// - `Upstream` on responses of unexpected shape
/// - `NoData` (segments only) when the month is outside the upstream's range
pub trait SessionClient: Send + Sync {
    /// Returns the name of this upstream (used in logs).
    fn name(&self) -> &str;

    /// Performs the handshake the upstream requires for this credential.
    fn open_session<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, FetchResult<Session>>;

    /// Fetches one page of the target month.
    ///
    /// `page_token` is `None` for the first page. The returned page's
    /// `next_page_token` is `None` once the month is complete.
    fn fetch_segment<'a>(
        &'a self,
        session: &'a Session,
        month: &'a TargetMonth,
        page_token: Option<&'a PageToken>,
    ) -> BoxFuture<'a, FetchResult<SegmentPage>>;
}

impl<C: SessionClient + ?Sized> SessionClient for &C {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open_session<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, FetchResult<Session>> {
        (**self).open_session(credential)
    }

    fn fetch_segment<'a>(
        &'a self,
        session: &'a Session,
        month: &'a TargetMonth,
        page_token: Option<&'a PageToken>,
    ) -> BoxFuture<'a, FetchResult<SegmentPage>> {
        (**self).fetch_segment(session, month, page_token)
    }
}

impl<C: SessionClient + ?Sized> SessionClient for std::sync::Arc<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open_session<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, FetchResult<Session>> {
        (**self).open_session(credential)
    }

    fn fetch_segment<'a>(
        &'a self,
        session: &'a Session,
        month: &'a TargetMonth,
        page_token: Option<&'a PageToken>,
    ) -> BoxFuture<'a, FetchResult<SegmentPage>> {
        (**self).fetch_segment(session, month, page_token)
    }
}
