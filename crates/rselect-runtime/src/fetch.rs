#![forbid(unsafe_code)]

//! The fetch collaborator and the ticket/response pair that travels through
//! the executor.
//!
//! A [`PageFetcher`] wraps whatever HTTP client the host uses. It is called
//! on a background thread, so it may block; it must report non-2xx statuses
//! as [`FetchError::Server`] and transport failures (timeouts included) as
//! [`FetchError::Network`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rselect_core::error::FetchError;
use rselect_core::query::{PageResponse, RequestToken, SearchQuery};

/// Fetches one page of results.
pub trait PageFetcher<T>: Send + Sync {
    /// Run the query. May block.
    fn fetch_page(&self, query: &SearchQuery) -> Result<PageResponse<T>, FetchError>;
}

impl<T, F> PageFetcher<T> for F
where
    F: Fn(&SearchQuery) -> Result<PageResponse<T>, FetchError> + Send + Sync,
{
    fn fetch_page(&self, query: &SearchQuery) -> Result<PageResponse<T>, FetchError> {
        self(query)
    }
}

/// Cooperative cancellation flag shared between a controller and a running
/// fetch.
///
/// Setting it never affects correctness: superseded responses are discarded
/// by token comparison whether or not the fetch observed the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

/// A dispatched request: what to fetch and which token it answers to.
#[derive(Clone, Debug)]
pub struct FetchTicket {
    token: RequestToken,
    query: SearchQuery,
    cancel: CancelToken,
}

impl FetchTicket {
    pub(crate) fn new(token: RequestToken, query: SearchQuery, cancel: CancelToken) -> Self {
        Self {
            token,
            query,
            cancel,
        }
    }

    /// Token stamped at dispatch.
    #[inline]
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// The query to run.
    #[inline]
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Whether the controller has since superseded this request.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancellation flag, for fetchers that can abort mid-flight.
    #[inline]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Package a result for [`RemoteSelect::apply`](crate::RemoteSelect::apply).
    #[must_use]
    pub fn respond<T>(self, result: Result<PageResponse<T>, FetchError>) -> FetchResponse<T> {
        FetchResponse {
            token: self.token,
            query: self.query,
            result,
        }
    }

    /// Run the fetcher on the current thread and package the result.
    pub fn run<T, P>(self, fetcher: &P) -> FetchResponse<T>
    where
        P: PageFetcher<T> + ?Sized,
    {
        let result = fetcher.fetch_page(&self.query);
        self.respond(result)
    }
}

/// A finished request on its way back to the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse<T> {
    /// Token the request was dispatched with.
    pub token: RequestToken,
    /// The query that was run.
    pub query: SearchQuery,
    /// Page or failure.
    pub result: Result<PageResponse<T>, FetchError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_fetchers() {
        let fetcher = |q: &SearchQuery| -> Result<PageResponse<String>, FetchError> {
            Ok(PageResponse::last(vec![format!("{}@{}", q.text(), q.offset())]))
        };
        let ticket = FetchTicket::new(
            RequestToken::new(3),
            SearchQuery::new("rust", 20, 10),
            CancelToken::new(),
        );
        let response = ticket.run(&fetcher);
        assert_eq!(response.token, RequestToken::new(3));
        assert_eq!(
            response.result,
            Ok(PageResponse::last(vec!["rust@20".to_string()]))
        );
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let ticket = FetchTicket::new(
            RequestToken::new(1),
            SearchQuery::first_page("", 5),
            token.clone(),
        );
        assert!(!ticket.is_cancelled());
        token.cancel();
        assert!(ticket.is_cancelled());
        assert!(ticket.cancel_token().is_cancelled());
    }

    #[test]
    fn respond_keeps_query() {
        let ticket = FetchTicket::new(
            RequestToken::new(9),
            SearchQuery::new("go", 0, 3),
            CancelToken::new(),
        );
        let response: FetchResponse<u8> = ticket.respond(Err(FetchError::network("down")));
        assert_eq!(response.query.text(), "go");
        assert!(response.result.is_err());
    }
}
