#![forbid(unsafe_code)]

//! Event-loop glue for one lookup field.
//!
//! [`SearchSession`] owns a [`DebounceGate`], a [`RemoteSelect`] and a
//! [`FetchExecutor`] and wires them the way a host loop needs them:
//!
//! ```text
//! keystroke ──► input() ──► gate ──(settled)──► controller.search()
//!                                                   │
//!                        cache hit ◄────────────────┤
//!                                                   ▼
//!                                         executor.spawn(ticket)
//!                                                   │
//! pump() ◄──────────── channel ◄────────────────────┘
//!   └─► controller.apply(response)
//! ```
//!
//! The host calls [`tick`](SearchSession::tick) and
//! [`pump`](SearchSession::pump) from its loop, sleeping at most
//! [`next_deadline`](SearchSession::next_deadline) between iterations.

use std::sync::Arc;
use std::time::Duration;

use rselect_core::debounce::{DebounceAction, DebounceGate};
use rselect_core::identity::Identified;
use rselect_core::query::RequestToken;
use tracing::{debug, trace};
use web_time::Instant;

use crate::config::SelectConfig;
use crate::controller::{ApplyOutcome, ControllerState, Dispatch, RemoteSelect};
use crate::executor::FetchExecutor;
use crate::fetch::PageFetcher;

/// Debounced, background-fetching search field.
#[derive(Debug)]
pub struct SearchSession<T> {
    gate: DebounceGate,
    select: RemoteSelect<T>,
    executor: FetchExecutor<T>,
}

impl<T> SearchSession<T>
where
    T: Identified + Clone + Send + 'static,
{
    /// Session with every part configured from `config`.
    pub fn new<P>(config: &SelectConfig, fetcher: P) -> Self
    where
        P: PageFetcher<T> + 'static,
    {
        Self::from_parts(
            DebounceGate::new(config.debounce_config()),
            RemoteSelect::from_config(config),
            FetchExecutor::new(fetcher),
        )
    }

    /// Session sharing a fetcher with other sessions.
    pub fn with_shared_fetcher(config: &SelectConfig, fetcher: Arc<dyn PageFetcher<T>>) -> Self {
        Self::from_parts(
            DebounceGate::new(config.debounce_config()),
            RemoteSelect::from_config(config),
            FetchExecutor::from_arc(fetcher),
        )
    }
}

impl<T> SearchSession<T>
where
    T: Clone + Send + 'static,
{
    /// Session from pre-built parts (custom identity, shared cache).
    pub fn from_parts(gate: DebounceGate, select: RemoteSelect<T>, executor: FetchExecutor<T>) -> Self {
        Self {
            gate,
            select,
            executor,
        }
    }

    /// Record a keystroke. Returns the token of a search started because
    /// of it (zero delay or a reached hard deadline).
    pub fn input(&mut self, text: impl Into<String>) -> Option<RequestToken> {
        self.input_at(text, Instant::now())
    }

    /// [`input`](Self::input) at a specific time (for testing).
    pub fn input_at(&mut self, text: impl Into<String>, now: Instant) -> Option<RequestToken> {
        let action = self.gate.notify_at(text, now);
        self.on_gate(action, now)
    }

    /// Advance the debounce timer. Returns the token of a search started by
    /// a settled quiet period.
    pub fn tick(&mut self) -> Option<RequestToken> {
        self.tick_at(Instant::now())
    }

    /// [`tick`](Self::tick) at a specific time (for testing).
    pub fn tick_at(&mut self, now: Instant) -> Option<RequestToken> {
        let action = self.gate.tick_at(now);
        self.on_gate(action, now)
    }

    /// Search the pending text now instead of waiting (Enter key).
    pub fn submit(&mut self) -> Option<RequestToken> {
        let now = Instant::now();
        let action = self.gate.flush();
        self.on_gate(action, now)
    }

    /// Search `text` immediately, dropping any pending keystrokes.
    pub fn search_now(&mut self, text: impl Into<String>) -> Option<RequestToken> {
        self.gate.cancel();
        let dispatch = self.select.search(text);
        self.run(dispatch)
    }

    /// Fetch the next page (scroll threshold reached).
    pub fn load_more(&mut self) -> Option<RequestToken> {
        let dispatch = self.select.load_more();
        self.run(dispatch)
    }

    /// Retry the last failure (inline error indicator).
    pub fn retry(&mut self) -> Option<RequestToken> {
        let dispatch = self.select.retry();
        self.run(dispatch)
    }

    /// Apply every response that has arrived.
    pub fn pump(&mut self) -> Vec<ApplyOutcome> {
        let responses = self.executor.poll();
        if responses.is_empty() {
            return Vec::new();
        }
        trace!(target: "rselect.session", count = responses.len(), "pumping responses");
        responses
            .into_iter()
            .map(|response| self.select.apply(response))
            .collect()
    }

    /// Block until the latest request is answered or `timeout` elapses.
    ///
    /// Returns whether the field is idle (not loading).
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if !self.select.state().loading() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if let Some(response) = self.executor.recv_timeout(deadline - now) {
                self.select.apply(response);
            }
        }
    }

    /// Detach the field: drop pending keystrokes and supersede any request.
    pub fn unmount(&mut self) {
        let dropped = self.gate.cancel();
        self.select.reset();
        debug!(target: "rselect.session", dropped_pending = dropped, "unmounted");
    }

    /// How long the host may sleep before the next `tick` matters.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.gate.time_until_settled(now)
    }

    /// Controller state for rendering.
    #[inline]
    pub fn state(&self) -> &ControllerState<T> {
        self.select.state()
    }

    /// The controller.
    #[inline]
    pub fn select(&self) -> &RemoteSelect<T> {
        &self.select
    }

    /// Mutable controller, for `set_limit` and friends.
    #[inline]
    pub fn select_mut(&mut self) -> &mut RemoteSelect<T> {
        &mut self.select
    }

    /// The debounce gate.
    #[inline]
    pub fn gate(&self) -> &DebounceGate {
        &self.gate
    }

    /// The executor.
    #[inline]
    pub fn executor(&self) -> &FetchExecutor<T> {
        &self.executor
    }

    fn on_gate(&mut self, action: DebounceAction, now: Instant) -> Option<RequestToken> {
        let text = action.settled()?;
        debug!(target: "rselect.session", text = %text, "input settled");
        let dispatch = self.select.search_at(text, now);
        self.run(dispatch)
    }

    fn run(&mut self, dispatch: Dispatch) -> Option<RequestToken> {
        match dispatch {
            Dispatch::Fetch(ticket) => {
                let token = ticket.token();
                self.executor.spawn(ticket);
                Some(token)
            }
            Dispatch::Cached { token, .. } => Some(token),
            Dispatch::Skipped(reason) => {
                trace!(target: "rselect.session", ?reason, "nothing dispatched");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rselect_core::error::FetchError;
    use rselect_core::query::{PageResponse, SearchQuery};

    fn catalog(q: &SearchQuery) -> Result<PageResponse<String>, FetchError> {
        let all: Vec<String> = ["python", "pytest", "java", "javascript", "go"]
            .iter()
            .filter(|name| name.starts_with(q.text()))
            .map(|name| (*name).to_string())
            .collect();
        let page: Vec<String> = all.iter().skip(q.offset()).take(q.limit()).cloned().collect();
        let is_last = q.offset() + page.len() >= all.len();
        Ok(PageResponse {
            items: page,
            is_last_page: is_last,
        })
    }

    fn config() -> SelectConfig {
        SelectConfig::default()
            .with_page_limit(2)
            .with_debounce(Duration::from_millis(100))
    }

    #[test]
    fn keystrokes_settle_into_one_search() {
        let mut session: SearchSession<String> = SearchSession::new(&config(), catalog);
        let t0 = Instant::now();

        assert_eq!(session.input_at("p", t0), None);
        assert_eq!(session.input_at("py", t0 + Duration::from_millis(50)), None);
        assert_eq!(session.tick_at(t0 + Duration::from_millis(100)), None);

        let token = session.tick_at(t0 + Duration::from_millis(160));
        assert_eq!(token, Some(RequestToken::new(1)));
        assert!(session.wait_idle(Duration::from_secs(5)));
        assert_eq!(session.state().options(), ["python".to_string(), "pytest".to_string()]);
        assert!(!session.state().has_more());
    }

    #[test]
    fn load_more_appends_next_page() {
        let mut session: SearchSession<String> = SearchSession::new(&config(), catalog);
        session.search_now("");
        assert!(session.wait_idle(Duration::from_secs(5)));
        assert!(session.state().has_more());

        assert_eq!(session.load_more(), Some(RequestToken::new(2)));
        assert!(session.wait_idle(Duration::from_secs(5)));
        assert_eq!(session.state().options().len(), 4);
    }

    #[test]
    fn repeated_search_is_served_from_cache() {
        let mut session: SearchSession<String> = SearchSession::new(&config(), catalog);
        session.search_now("ja");
        assert!(session.wait_idle(Duration::from_secs(5)));

        session.search_now("go");
        assert!(session.wait_idle(Duration::from_secs(5)));
        session.search_now("ja");
        assert!(!session.state().loading());
        assert_eq!(session.select().stats().cache_hits, 1);
        assert_eq!(session.executor().pending(), 0);
    }

    #[test]
    fn unmount_drops_pending_input() {
        let mut session: SearchSession<String> = SearchSession::new(&config(), catalog);
        let t0 = Instant::now();
        session.input_at("py", t0);
        session.unmount();

        assert_eq!(session.tick_at(t0 + Duration::from_secs(1)), None);
        assert!(session.state().is_idle());
        assert_eq!(session.next_deadline(t0), None);
    }

    #[test]
    fn failure_then_retry() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let flaky = move |q: &SearchQuery| -> Result<PageResponse<String>, FetchError> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(FetchError::timeout("slow"))
            } else {
                catalog(q)
            }
        };

        let mut session: SearchSession<String> = SearchSession::new(&config(), flaky);
        session.search_now("go");
        assert!(session.wait_idle(Duration::from_secs(5)));
        assert!(session.state().error().is_some());

        assert!(session.retry().is_some());
        assert!(session.wait_idle(Duration::from_secs(5)));
        assert!(session.state().error().is_none());
        assert_eq!(session.state().options(), ["go".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
