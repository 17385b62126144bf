#![forbid(unsafe_code)]

//! Deterministic fetchers for tests.
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-helpers` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rselect_core::error::FetchError;
use rselect_core::query::{PageResponse, SearchQuery};

use crate::fetch::PageFetcher;

/// Serves pages out of in-memory result sets keyed by query text.
///
/// Unknown texts return an empty last page. Queued failures are returned
/// before any page, one per call.
#[derive(Debug)]
pub struct ScriptedFetcher<T> {
    results: HashMap<String, Vec<T>>,
    delays: HashMap<String, Duration>,
    failures: Mutex<VecDeque<FetchError>>,
}

impl<T: Clone> Default for ScriptedFetcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ScriptedFetcher<T> {
    /// Fetcher with no result sets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            delays: HashMap::new(),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Full result set for `text`; pages are sliced from it.
    #[must_use]
    pub fn with_results(mut self, text: impl Into<String>, items: Vec<T>) -> Self {
        self.results.insert(text.into(), items);
        self
    }

    /// Sleep before answering `text`, to force out-of-order arrival.
    #[must_use]
    pub fn with_delay(mut self, text: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(text.into(), delay);
        self
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: FetchError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    /// Answer synchronously, ignoring configured delays.
    pub fn page(&self, query: &SearchQuery) -> Result<PageResponse<T>, FetchError> {
        if let Some(err) = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return Err(err);
        }

        let Some(all) = self.results.get(query.text()) else {
            return Ok(PageResponse::last(Vec::new()));
        };
        let items: Vec<T> = all
            .iter()
            .skip(query.offset())
            .take(query.limit())
            .cloned()
            .collect();
        let is_last_page = query.offset().saturating_add(items.len()) >= all.len();
        Ok(PageResponse {
            items,
            is_last_page,
        })
    }
}

impl<T: Clone + Send + Sync> PageFetcher<T> for ScriptedFetcher<T> {
    fn fetch_page(&self, query: &SearchQuery) -> Result<PageResponse<T>, FetchError> {
        if let Some(delay) = self.delays.get(query.text()) {
            thread::sleep(*delay);
        }
        self.page(query)
    }
}

/// Wraps a fetcher and records every query it runs.
pub struct RecordingFetcher<T> {
    inner: Arc<dyn PageFetcher<T>>,
    log: Arc<Mutex<Vec<SearchQuery>>>,
}

impl<T> RecordingFetcher<T> {
    /// Record calls made to `inner`.
    pub fn new<P>(inner: P) -> Self
    where
        P: PageFetcher<T> + 'static,
    {
        Self {
            inner: Arc::new(inner),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of the call log, usable after the fetcher is moved into
    /// an executor.
    #[must_use]
    pub fn log(&self) -> Arc<Mutex<Vec<SearchQuery>>> {
        Arc::clone(&self.log)
    }

    /// Queries run so far.
    #[must_use]
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<T> PageFetcher<T> for RecordingFetcher<T> {
    fn fetch_page(&self, query: &SearchQuery) -> Result<PageResponse<T>, FetchError> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.clone());
        self.inner.fetch_page(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item-{i}")).collect()
    }

    #[test]
    fn pages_are_sliced_and_terminated() {
        let fetcher = ScriptedFetcher::new().with_results("", names(5));
        let first = fetcher.page(&SearchQuery::new("", 0, 2)).expect("page");
        assert_eq!(first.items, names(2));
        assert!(!first.is_last_page);

        let last = fetcher.page(&SearchQuery::new("", 4, 2)).expect("page");
        assert_eq!(last.items, vec!["item-4".to_string()]);
        assert!(last.is_last_page);
    }

    #[test]
    fn unknown_text_is_empty_last_page() {
        let fetcher: ScriptedFetcher<String> = ScriptedFetcher::new();
        let page = fetcher.page(&SearchQuery::first_page("nope", 10)).expect("page");
        assert!(page.items.is_empty());
        assert!(page.is_last_page);
    }

    #[test]
    fn queued_failure_is_returned_once() {
        let fetcher = ScriptedFetcher::new().with_results("a", names(1));
        fetcher.fail_next(FetchError::server(503, "busy"));
        let q = SearchQuery::first_page("a", 10);
        assert!(fetcher.page(&q).is_err());
        assert!(fetcher.page(&q).is_ok());
    }

    #[test]
    fn recording_fetcher_logs_queries() {
        let recorder = RecordingFetcher::new(ScriptedFetcher::new().with_results("a", names(3)));
        let log = recorder.log();
        recorder
            .fetch_page(&SearchQuery::new("a", 0, 2))
            .expect("page");
        recorder
            .fetch_page(&SearchQuery::new("a", 2, 2))
            .expect("page");
        assert_eq!(recorder.calls(), 2);
        assert_eq!(log.lock().expect("log").len(), 2);
        assert_eq!(recorder.queries()[1].offset(), 2);
    }
}
