#![forbid(unsafe_code)]

//! Remote search-select controller.
//!
//! [`RemoteSelect`] turns query text into a paginated, de-duplicated option
//! list that stays correct when responses arrive late or out of order. It is
//! a plain state machine: commands return a [`Dispatch`] describing the work
//! to do, and finished work comes back through [`RemoteSelect::apply`].
//!
//! # Usage
//!
//! ```
//! use rselect_core::query::PageResponse;
//! use rselect_runtime::controller::{ApplyOutcome, Dispatch, RemoteSelect};
//!
//! let mut select: RemoteSelect<String> = RemoteSelect::new(10);
//!
//! let Dispatch::Fetch(ticket) = select.search("py") else { unreachable!() };
//! assert!(select.state().loading());
//!
//! let response = ticket.respond(Ok(PageResponse::last(vec!["python".to_string()])));
//! assert!(matches!(select.apply(response), ApplyOutcome::Applied { added: 1 }));
//! assert_eq!(select.state().options(), ["python".to_string()]);
//! assert!(!select.state().has_more());
//! ```
//!
//! # Ordering
//!
//! Every dispatch takes a fresh, strictly larger [`RequestToken`]. A response
//! is applied only when its token equals the latest one; anything else was
//! superseded and is dropped without touching options, `loading` or `error`.
//! Arrival order therefore never matters, only dispatch order.
//!
//! # Invariants
//!
//! 1. `options` never holds two items with the same identity key.
//! 2. `latest_request_token` never decreases, including across `reset`.
//! 3. `has_more` is false after a page that is marked last or comes back
//!    shorter than the limit.
//! 4. `loading` is true iff the latest dispatch went to the network and has
//!    not been answered.
//! 5. A failure leaves `options` untouched.
//!
//! # Cache
//!
//! When a [`SharedQueryCache`] is attached, a fresh entry for the dispatched
//! `(text, offset)` is applied synchronously through the same merge path as
//! a live response ([`Dispatch::Cached`]). Every successful live page is
//! written through. Removing the cache changes latency only.

use std::collections::HashSet;

use rselect_core::cache::SharedQueryCache;
use rselect_core::error::{ErrorKind, FetchError};
use rselect_core::identity::{Identified, IdentityFn};
use rselect_core::query::{RequestToken, SearchQuery};
use tracing::{debug, trace, warn};
use web_time::Instant;

use crate::config::SelectConfig;
use crate::fetch::{CancelToken, FetchResponse, FetchTicket};

/// Read-only view of a controller for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState<T> {
    options: Vec<T>,
    loading: bool,
    has_more: bool,
    error: Option<FetchError>,
    current_text: String,
    current_offset: usize,
    latest_request_token: RequestToken,
    answered: bool,
}

impl<T> Default for ControllerState<T> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            loading: false,
            has_more: false,
            error: None,
            current_text: String::new(),
            current_offset: 0,
            latest_request_token: RequestToken::ZERO,
            answered: false,
        }
    }
}

impl<T> ControllerState<T> {
    /// Accumulated options, in server order across pages.
    #[inline]
    pub fn options(&self) -> &[T] {
        &self.options
    }

    /// Whether the latest dispatch is still waiting for the network.
    #[inline]
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Whether `load_more` would fetch another page.
    #[inline]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Failure of the latest answered request, if it failed.
    #[inline]
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Text of the current query.
    #[inline]
    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    /// Offset of the last page merged into `options`.
    #[inline]
    pub fn current_offset(&self) -> usize {
        self.current_offset
    }

    /// Token of the most recent dispatch.
    #[inline]
    pub fn latest_request_token(&self) -> RequestToken {
        self.latest_request_token
    }

    /// Whether a page for the current query has been merged.
    ///
    /// Distinguishes "no results" from "nothing searched yet".
    #[inline]
    pub fn answered(&self) -> bool {
        self.answered
    }

    /// Whether nothing has been searched since creation or reset.
    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.loading && !self.answered && self.error.is_none()
    }
}

/// Result of a command.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Run this ticket and feed the response to [`RemoteSelect::apply`].
    Fetch(FetchTicket),
    /// Served from the cache and already applied.
    Cached {
        /// Token of the dispatch.
        token: RequestToken,
        /// Items newly added to `options`.
        added: usize,
    },
    /// Nothing was dispatched.
    Skipped(SkipReason),
}

impl Dispatch {
    /// The ticket, if this dispatch needs the network.
    #[must_use]
    pub fn into_ticket(self) -> Option<FetchTicket> {
        match self {
            Self::Fetch(ticket) => Some(ticket),
            _ => None,
        }
    }

    /// Whether a new request was issued (network or cache).
    #[inline]
    pub fn is_dispatched(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

/// Why a command did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A fetch is already in flight; `load_more` is not queued.
    Loading,
    /// The last page has been reached.
    Exhausted,
    /// `retry` without a preceding failure.
    NothingToRetry,
}

/// What `apply` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Page merged into `options`.
    Applied {
        /// Items newly added after de-duplication.
        added: usize,
    },
    /// Failure recorded in `error`; options kept.
    Failed(ErrorKind),
    /// Superseded response dropped.
    Stale {
        /// Token of the dropped response.
        token: RequestToken,
        /// Token that superseded it.
        current: RequestToken,
    },
}

impl ApplyOutcome {
    /// Whether the response changed state.
    #[inline]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Requests issued (network and cache).
    pub dispatched: u64,
    /// Dispatches answered from the cache.
    pub cache_hits: u64,
    /// Live responses merged.
    pub applied: u64,
    /// Live responses that failed.
    pub failures: u64,
    /// Superseded responses dropped.
    pub stale_discarded: u64,
}

#[derive(Debug)]
struct InFlight {
    token: RequestToken,
    cancel: CancelToken,
}

/// Paginated, token-guarded option list for one lookup field.
#[derive(Debug)]
pub struct RemoteSelect<T> {
    state: ControllerState<T>,
    limit: usize,
    /// Page size to adopt at the next `search`.
    pending_limit: Option<usize>,
    identity: IdentityFn<T>,
    /// Identity keys currently in `options`.
    seen: HashSet<String>,
    cache: Option<SharedQueryCache<T>>,
    in_flight: Option<InFlight>,
    last_failed: Option<SearchQuery>,
    cancel_superseded: bool,
    stats: ControllerStats,
}

impl<T: Identified + Clone + 'static> RemoteSelect<T> {
    /// Controller with the given page size, no cache, and the type's own
    /// identity keys.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::with_identity(limit, IdentityFn::of_identified())
    }

    /// Controller configured from a [`SelectConfig`], with a private cache
    /// when the configuration enables one.
    #[must_use]
    pub fn from_config(config: &SelectConfig) -> Self {
        let mut select = Self::new(config.page_limit);
        select.cancel_superseded = config.cancel_superseded;
        if config.cache_enabled() {
            select.cache = Some(config.build_cache());
        }
        select
    }
}

impl<T: Clone> RemoteSelect<T> {
    /// Controller with a custom identity extractor.
    #[must_use]
    pub fn with_identity(limit: usize, identity: IdentityFn<T>) -> Self {
        Self {
            state: ControllerState::default(),
            limit: limit.max(1),
            pending_limit: None,
            identity,
            seen: HashSet::new(),
            cache: None,
            in_flight: None,
            last_failed: None,
            cancel_superseded: true,
            stats: ControllerStats::default(),
        }
    }

    /// Attach a (possibly shared) cache.
    #[must_use]
    pub fn with_cache(mut self, cache: SharedQueryCache<T>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run without a cache.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Enable or disable flipping the cancel flag of superseded requests.
    #[must_use]
    pub fn with_cancel_superseded(mut self, enabled: bool) -> Self {
        self.cancel_superseded = enabled;
        self
    }

    /// Start a new query from the first page.
    ///
    /// Clears `options`, `has_more` and `error`. An empty `text` is a valid
    /// "browse all" query.
    pub fn search(&mut self, text: impl Into<String>) -> Dispatch {
        self.search_at(text, Instant::now())
    }

    /// [`search`](Self::search) at a specific time (for testing).
    pub fn search_at(&mut self, text: impl Into<String>, now: Instant) -> Dispatch {
        let text = text.into();
        if let Some(limit) = self.pending_limit.take() {
            self.limit = limit;
        }

        self.state.current_text.clone_from(&text);
        self.state.current_offset = 0;
        self.state.options.clear();
        self.seen.clear();
        self.state.has_more = false;
        self.state.error = None;
        self.state.answered = false;
        self.last_failed = None;

        debug!(target: "rselect.controller", text = %text, limit = self.limit, "search");
        self.dispatch(SearchQuery::first_page(text, self.limit), now)
    }

    /// Fetch the page after the last merged one, same text.
    ///
    /// No-op while loading or after the last page.
    pub fn load_more(&mut self) -> Dispatch {
        self.load_more_at(Instant::now())
    }

    /// [`load_more`](Self::load_more) at a specific time (for testing).
    pub fn load_more_at(&mut self, now: Instant) -> Dispatch {
        if self.state.loading {
            trace!(target: "rselect.controller", "load_more skipped: loading");
            return Dispatch::Skipped(SkipReason::Loading);
        }
        if !self.state.has_more {
            trace!(target: "rselect.controller", "load_more skipped: exhausted");
            return Dispatch::Skipped(SkipReason::Exhausted);
        }

        let query = SearchQuery::new(
            self.state.current_text.clone(),
            self.state.current_offset.saturating_add(self.limit),
            self.limit,
        );
        self.dispatch(query, now)
    }

    /// Re-dispatch the last failed request with a fresh token.
    pub fn retry(&mut self) -> Dispatch {
        self.retry_at(Instant::now())
    }

    /// [`retry`](Self::retry) at a specific time (for testing).
    pub fn retry_at(&mut self, now: Instant) -> Dispatch {
        let Some(query) = self.last_failed.take() else {
            return Dispatch::Skipped(SkipReason::NothingToRetry);
        };
        self.state.error = None;
        debug!(target: "rselect.controller", query = %query, "retry");
        self.dispatch(query, now)
    }

    /// Apply a finished request.
    pub fn apply(&mut self, response: FetchResponse<T>) -> ApplyOutcome {
        self.apply_at(response, Instant::now())
    }

    /// [`apply`](Self::apply) at a specific time (for testing).
    pub fn apply_at(&mut self, response: FetchResponse<T>, now: Instant) -> ApplyOutcome {
        let current = self.state.latest_request_token;
        if response.token != current {
            self.stats.stale_discarded += 1;
            debug!(
                target: "rselect.controller",
                token = response.token.get(),
                current = current.get(),
                query = %response.query,
                "stale response discarded"
            );
            return ApplyOutcome::Stale {
                token: response.token,
                current,
            };
        }

        self.in_flight = None;
        let FetchResponse { token, query, result } = response;
        match result {
            Ok(page) => {
                self.stats.applied += 1;
                if let Some(cache) = &self.cache {
                    cache.put_at(query.key(), page.clone().stamp(token), now);
                }
                let added = self.merge(&query, page.items, page.is_last_page);
                trace!(
                    target: "rselect.controller",
                    token = token.get(),
                    query = %query,
                    added,
                    has_more = self.state.has_more,
                    "page applied"
                );
                ApplyOutcome::Applied { added }
            }
            Err(err) => {
                self.stats.failures += 1;
                warn!(
                    target: "rselect.controller",
                    token = token.get(),
                    query = %query,
                    kind = err.kind().as_str(),
                    error = %err,
                    "fetch failed"
                );
                let kind = err.kind();
                self.state.error = Some(err);
                self.state.loading = false;
                self.last_failed = Some(query);
                ApplyOutcome::Failed(kind)
            }
        }
    }

    /// Return to the freshly mounted state.
    ///
    /// Any in-flight request is superseded: its response will be stale.
    pub fn reset(&mut self) {
        self.supersede_in_flight();
        let token = self.state.latest_request_token.next();
        self.state = ControllerState {
            latest_request_token: token,
            ..ControllerState::default()
        };
        self.seen.clear();
        self.last_failed = None;
        debug!(target: "rselect.controller", token = token.get(), "reset");
    }

    /// Change the page size from the next `search` on.
    pub fn set_limit(&mut self, limit: usize) {
        self.pending_limit = Some(limit.max(1));
    }

    /// Current page size.
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Read-only state.
    #[inline]
    pub fn state(&self) -> &ControllerState<T> {
        &self.state
    }

    /// Owned copy of the state.
    #[must_use]
    pub fn snapshot(&self) -> ControllerState<T> {
        self.state.clone()
    }

    /// Identity extractor in use.
    #[inline]
    pub fn identity(&self) -> &IdentityFn<T> {
        &self.identity
    }

    /// Attached cache, if any.
    #[inline]
    pub fn cache(&self) -> Option<&SharedQueryCache<T>> {
        self.cache.as_ref()
    }

    /// Whether `retry` would dispatch.
    #[inline]
    pub fn can_retry(&self) -> bool {
        self.last_failed.is_some()
    }

    /// Counters since creation.
    #[inline]
    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    fn dispatch(&mut self, query: SearchQuery, now: Instant) -> Dispatch {
        self.supersede_in_flight();
        let token = self.state.latest_request_token.next();
        self.state.latest_request_token = token;
        self.last_failed = None;
        self.stats.dispatched += 1;

        let cached = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get_at(&query.key(), now));
        if let Some(page) = cached {
            self.stats.cache_hits += 1;
            let added = self.merge(&query, page.items, page.is_last_page);
            debug!(
                target: "rselect.controller",
                token = token.get(),
                query = %query,
                added,
                "served from cache"
            );
            return Dispatch::Cached { token, added };
        }

        let cancel = CancelToken::new();
        self.in_flight = Some(InFlight {
            token,
            cancel: cancel.clone(),
        });
        self.state.loading = true;
        trace!(target: "rselect.controller", token = token.get(), query = %query, "dispatch");
        Dispatch::Fetch(FetchTicket::new(token, query, cancel))
    }

    fn supersede_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            if self.cancel_superseded {
                in_flight.cancel.cancel();
            }
            trace!(
                target: "rselect.controller",
                token = in_flight.token.get(),
                "request superseded"
            );
        }
        self.state.loading = false;
    }

    /// Merge a page: offset 0 replaces, later offsets append. Returns the
    /// number of items added.
    fn merge(&mut self, query: &SearchQuery, items: Vec<T>, is_last_page: bool) -> usize {
        if query.is_first_page() {
            self.state.options.clear();
            self.seen.clear();
        }

        let received = items.len();
        let before = self.state.options.len();
        for item in items {
            if self.seen.insert(self.identity.key_of(&item)) {
                self.state.options.push(item);
            }
        }

        self.state.current_offset = query.offset();
        self.state.has_more = !(is_last_page || received < query.limit());
        self.state.error = None;
        self.state.loading = false;
        self.state.answered = true;
        self.state.options.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rselect_core::query::PageResponse;
    use std::time::Duration;

    fn items(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{prefix}-{i}")).collect()
    }

    fn ticket(dispatch: Dispatch) -> FetchTicket {
        match dispatch {
            Dispatch::Fetch(ticket) => ticket,
            other => panic!("expected a fetch, got {other:?}"),
        }
    }

    #[test]
    fn fresh_controller_is_idle() {
        let select: RemoteSelect<String> = RemoteSelect::new(10);
        let state = select.state();
        assert!(state.is_idle());
        assert_eq!(state.latest_request_token(), RequestToken::ZERO);
        assert_eq!(state.current_text(), "");
    }

    #[test]
    fn search_sets_loading_and_stamps_token() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(10);
        let t = ticket(select.search("py"));
        assert_eq!(t.token(), RequestToken::new(1));
        assert_eq!(t.query(), &SearchQuery::new("py", 0, 10));
        assert!(select.state().loading());
        assert_eq!(select.state().current_text(), "py");
    }

    #[test]
    fn full_page_keeps_has_more_and_short_page_ends_it() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(3);
        let t = ticket(select.search("a"));
        select.apply(t.respond(Ok(PageResponse::new(items("a", 0..3)))));
        assert!(select.state().has_more());

        let t = ticket(select.load_more());
        assert_eq!(t.query().offset(), 3);
        select.apply(t.respond(Ok(PageResponse::new(items("a", 3..5)))));
        assert!(!select.state().has_more());
        assert_eq!(select.state().options().len(), 5);
        assert_eq!(select.state().current_offset(), 3);

        assert!(matches!(
            select.load_more(),
            Dispatch::Skipped(SkipReason::Exhausted)
        ));
    }

    #[test]
    fn last_page_flag_ends_pagination() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(2);
        let t = ticket(select.search(""));
        select.apply(t.respond(Ok(PageResponse::last(items("x", 0..2)))));
        assert!(!select.state().has_more());
    }

    #[test]
    fn stale_response_is_discarded_silently() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(10);
        let py = ticket(select.search("py"));
        let java = ticket(select.search("java"));

        let java_outcome = select.apply(java.respond(Ok(PageResponse::new(items("java", 0..3)))));
        assert_eq!(java_outcome, ApplyOutcome::Applied { added: 3 });

        let py_outcome = select.apply(py.respond(Err(FetchError::network("late"))));
        assert_eq!(
            py_outcome,
            ApplyOutcome::Stale {
                token: RequestToken::new(1),
                current: RequestToken::new(2)
            }
        );
        assert!(select.state().error().is_none());
        assert_eq!(select.state().options(), items("java", 0..3).as_slice());
        assert_eq!(select.stats().stale_discarded, 1);
    }

    #[test]
    fn stale_response_does_not_clear_loading() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(10);
        let first = ticket(select.search("a"));
        let _second = ticket(select.search("ab"));
        select.apply(first.respond(Ok(PageResponse::new(items("a", 0..10)))));
        assert!(select.state().loading());
        assert!(select.state().options().is_empty());
    }

    #[test]
    fn superseded_ticket_is_cancelled() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(10);
        let first = ticket(select.search("a"));
        let second = ticket(select.search("ab"));
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn cancellation_can_be_disabled() {
        let mut select: RemoteSelect<String> =
            RemoteSelect::new(10).with_cancel_superseded(false);
        let first = ticket(select.search("a"));
        let _ = select.search("ab");
        assert!(!first.is_cancelled());
    }

    #[test]
    fn load_more_while_loading_is_a_no_op() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(2);
        let t = ticket(select.search("a"));
        select.apply(t.respond(Ok(PageResponse::new(items("a", 0..2)))));

        let _page2 = ticket(select.load_more());
        let before = select.snapshot();
        assert!(matches!(
            select.load_more(),
            Dispatch::Skipped(SkipReason::Loading)
        ));
        assert_eq!(select.snapshot(), before);
        assert_eq!(select.stats().dispatched, 2);
    }

    #[test]
    fn overlapping_pages_are_deduplicated() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(3);
        let t = ticket(select.search("a"));
        select.apply(t.respond(Ok(PageResponse::new(items("a", 0..3)))));
        let t = ticket(select.load_more());
        let outcome = select.apply(t.respond(Ok(PageResponse::new(items("a", 2..5)))));

        assert_eq!(outcome, ApplyOutcome::Applied { added: 2 });
        assert_eq!(select.state().options(), items("a", 0..5).as_slice());
        // Received a full page, so more may follow.
        assert!(select.state().has_more());
    }

    #[test]
    fn duplicates_within_one_page_are_dropped() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(10);
        let t = ticket(select.search("a"));
        let page = vec!["x".to_string(), "y".to_string(), "x".to_string()];
        select.apply(t.respond(Ok(PageResponse::new(page))));
        assert_eq!(select.state().options(), ["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn failure_keeps_options_and_records_error() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(2);
        let t = ticket(select.search("a"));
        select.apply(t.respond(Ok(PageResponse::new(items("a", 0..2)))));

        let t = ticket(select.load_more());
        let outcome = select.apply(t.respond(Err(FetchError::network("reset"))));
        assert_eq!(outcome, ApplyOutcome::Failed(ErrorKind::Network));
        assert_eq!(select.state().options(), items("a", 0..2).as_slice());
        assert!(!select.state().loading());
        assert_eq!(select.state().error().map(FetchError::kind), Some(ErrorKind::Network));
        assert!(select.can_retry());
    }

    #[test]
    fn retry_redispatches_failed_query_with_fresh_token() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(2);
        let t = ticket(select.search("a"));
        select.apply(t.respond(Ok(PageResponse::new(items("a", 0..2)))));
        let failed = ticket(select.load_more());
        let failed_token = failed.token();
        select.apply(failed.respond(Err(FetchError::server(502, "bad gateway"))));

        let again = ticket(select.retry());
        assert!(again.token() > failed_token);
        assert_eq!(again.query().offset(), 2);
        assert!(select.state().error().is_none());
        assert!(select.state().loading());

        select.apply(again.respond(Ok(PageResponse::last(items("a", 2..3)))));
        assert_eq!(select.state().options().len(), 3);
        assert!(!select.can_retry());
        assert!(matches!(
            select.retry(),
            Dispatch::Skipped(SkipReason::NothingToRetry)
        ));
    }

    #[test]
    fn retry_of_first_page_replaces() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(5);
        let t = ticket(select.search("a"));
        select.apply(t.respond(Err(FetchError::timeout("10s"))));
        let t = ticket(select.retry());
        assert_eq!(t.query().offset(), 0);
        select.apply(t.respond(Ok(PageResponse::last(items("a", 0..2)))));
        assert_eq!(select.state().options(), items("a", 0..2).as_slice());
    }

    #[test]
    fn empty_search_after_text_resets_pagination() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(2);
        let t = ticket(select.search("py"));
        select.apply(t.respond(Ok(PageResponse::new(items("py", 0..2)))));
        let t = ticket(select.load_more());
        select.apply(t.respond(Ok(PageResponse::new(items("py", 2..4)))));
        assert_eq!(select.state().current_offset(), 2);

        let t = ticket(select.search(""));
        assert_eq!(t.query().offset(), 0);
        assert!(select.state().options().is_empty());
        assert!(!select.state().has_more());
        assert_eq!(select.state().current_offset(), 0);
    }

    #[test]
    fn empty_result_is_terminal_not_error() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(10);
        let t = ticket(select.search("zzz"));
        select.apply(t.respond(Ok(PageResponse::new(Vec::new()))));
        let state = select.state();
        assert!(state.options().is_empty());
        assert!(!state.has_more());
        assert!(state.error().is_none());
        assert!(!state.loading());
    }

    #[test]
    fn cache_hit_skips_network_and_matches_live_result() {
        let cache = SharedQueryCache::new(Duration::from_secs(300), 32);
        let mut select: RemoteSelect<String> = RemoteSelect::new(10).with_cache(cache);
        let t0 = Instant::now();

        let t = ticket(select.search_at("py", t0));
        select.apply_at(t.respond(Ok(PageResponse::new(items("py", 0..4)))), t0);
        let live = select.snapshot();

        let again = select.search_at("py", t0 + Duration::from_secs(1));
        assert!(matches!(again, Dispatch::Cached { added: 4, .. }));
        assert_eq!(select.state().options(), live.options());
        assert_eq!(select.state().has_more(), live.has_more());
        assert!(!select.state().loading());
        assert_eq!(select.stats().cache_hits, 1);
    }

    #[test]
    fn expired_cache_entry_goes_back_to_network() {
        let cache = SharedQueryCache::new(Duration::from_secs(60), 32);
        let mut select: RemoteSelect<String> = RemoteSelect::new(10).with_cache(cache);
        let t0 = Instant::now();

        let t = ticket(select.search_at("py", t0));
        select.apply_at(t.respond(Ok(PageResponse::new(items("py", 0..4)))), t0);
        assert!(matches!(
            select.search_at("py", t0 + Duration::from_secs(61)),
            Dispatch::Fetch(_)
        ));
    }

    #[test]
    fn cache_hit_supersedes_in_flight_request() {
        let cache = SharedQueryCache::new(Duration::from_secs(300), 32);
        let mut select: RemoteSelect<String> = RemoteSelect::new(10).with_cache(cache);
        let t0 = Instant::now();

        let t = ticket(select.search_at("a", t0));
        select.apply_at(t.respond(Ok(PageResponse::last(items("a", 0..1)))), t0);

        let slow = ticket(select.search_at("ab", t0));
        assert!(matches!(select.search_at("a", t0), Dispatch::Cached { .. }));
        assert!(!select.state().loading());

        let outcome = select.apply_at(slow.respond(Ok(PageResponse::new(items("ab", 0..10)))), t0);
        assert!(outcome.is_stale());
        assert_eq!(select.state().options(), items("a", 0..1).as_slice());
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = SharedQueryCache::new(Duration::from_secs(300), 32);
        let mut select: RemoteSelect<String> =
            RemoteSelect::new(10).with_cache(cache.clone());
        let t = ticket(select.search("a"));
        select.apply(t.respond(Err(FetchError::server(500, "boom"))));
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn reset_supersedes_in_flight_and_keeps_token_monotonic() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(10);
        let t = ticket(select.search("py"));
        select.reset();

        assert!(select.state().is_idle());
        assert_eq!(select.state().latest_request_token(), RequestToken::new(2));
        assert!(t.is_cancelled());

        let outcome = select.apply(t.respond(Ok(PageResponse::new(items("py", 0..3)))));
        assert!(outcome.is_stale());
        assert!(select.state().options().is_empty());

        let next = ticket(select.search("go"));
        assert_eq!(next.token(), RequestToken::new(3));
    }

    #[test]
    fn set_limit_applies_at_next_search() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(10);
        let t = ticket(select.search("a"));
        select.apply(t.respond(Ok(PageResponse::new(items("a", 0..10)))));
        select.set_limit(5);

        let more = ticket(select.load_more());
        assert_eq!(more.query().limit(), 10);
        let fresh = ticket(select.search("b"));
        assert_eq!(fresh.query().limit(), 5);
        assert_eq!(select.limit(), 5);
    }

    #[test]
    fn cached_page_of_another_size_is_refetched() {
        let cache = SharedQueryCache::new(Duration::from_secs(300), 32);
        let mut select: RemoteSelect<String> = RemoteSelect::new(10).with_cache(cache);
        let t0 = Instant::now();
        let t = ticket(select.search_at("a", t0));
        select.apply_at(t.respond(Ok(PageResponse::new(items("a", 0..10)))), t0);

        select.set_limit(5);
        let again = ticket(select.search_at("a", t0));
        assert_eq!(again.query().limit(), 5);
        assert_eq!(select.stats().cache_hits, 0);
    }

    #[test]
    fn custom_identity_controls_deduplication() {
        let by_lower = IdentityFn::new(|s: &String| s.to_lowercase());
        let mut select = RemoteSelect::with_identity(10, by_lower);
        let t = ticket(select.search("x"));
        let page = vec!["Rust".to_string(), "RUST".to_string(), "Go".to_string()];
        select.apply(t.respond(Ok(PageResponse::last(page))));
        assert_eq!(select.state().options(), ["Rust".to_string(), "Go".to_string()]);
    }

    #[test]
    fn from_config_builds_private_cache() {
        let config = SelectConfig::default().with_page_limit(7);
        let select: RemoteSelect<String> = RemoteSelect::from_config(&config);
        assert_eq!(select.limit(), 7);
        assert!(select.cache().is_some());

        let no_cache = SelectConfig::default().with_cache_capacity(0);
        let select: RemoteSelect<String> = RemoteSelect::from_config(&no_cache);
        assert!(select.cache().is_none());
    }
}
