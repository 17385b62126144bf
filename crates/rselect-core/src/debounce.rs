#![forbid(unsafe_code)]

//! Keystroke debouncing.
//!
//! [`DebounceGate`] turns a rapid stream of text changes into a single
//! trigger once input has been quiet for [`DebounceConfig::delay`]. It owns
//! no timer thread: the event loop calls [`DebounceGate::tick`] (or sleeps
//! for [`DebounceGate::time_until_settled`]) and receives
//! [`DebounceAction::Settled`] exactly once per quiet period.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use rselect_core::debounce::{DebounceAction, DebounceConfig, DebounceGate};
//! use rselect_core::Instant;
//!
//! let mut gate = DebounceGate::new(DebounceConfig::default());
//! let t0 = Instant::now();
//!
//! gate.notify_at("p", t0);
//! gate.notify_at("py", t0 + Duration::from_millis(100));
//! assert_eq!(gate.tick_at(t0 + Duration::from_millis(200)), DebounceAction::None);
//!
//! let settled = gate.tick_at(t0 + Duration::from_millis(400));
//! assert_eq!(settled, DebounceAction::Settled("py".to_string()));
//! assert_eq!(gate.tick_at(t0 + Duration::from_millis(900)), DebounceAction::None);
//! ```
//!
//! # Invariants
//!
//! - **Latest-wins**: only the final text of a burst is delivered.
//! - **Once per expiry**: a quiet period settles at most once.
//! - **No late delivery**: nothing settles after [`DebounceGate::cancel`].
//! - **Bounded latency** (opt-in): with `max_wait` set, a pending text settles
//!   no later than `max_wait` after the first keystroke of its burst.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `delay = 0` | Settle on `notify` |
//! | `max_wait < delay` | `max_wait` wins |
//! | `tick` with nothing pending | Return `None` |

use std::fmt;
use std::time::Duration;

use web_time::Instant;

use crate::clock::duration_since_or_zero;

/// Default quiet period.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// Configuration for the debounce gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Quiet period after the last keystroke.
    pub delay: Duration,
    /// Hard deadline measured from the first keystroke of a burst.
    pub max_wait: Option<Duration>,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            max_wait: None,
        }
    }
}

impl DebounceConfig {
    /// Set the quiet period.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set or clear the hard deadline.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// What the caller should do after feeding the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceAction {
    /// Nothing to do.
    None,
    /// Text is pending; keep ticking.
    Pending,
    /// Input settled on this text; run the query.
    Settled(String),
}

impl DebounceAction {
    /// The settled text, if any.
    #[must_use]
    pub fn settled(self) -> Option<String> {
        match self {
            Self::Settled(text) => Some(text),
            _ => None,
        }
    }
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// `notify` calls.
    pub notified: u64,
    /// Quiet periods that settled.
    pub settled: u64,
    /// Pending texts dropped by `cancel`.
    pub cancelled: u64,
    /// Settles forced by `max_wait`.
    pub forced: u64,
}

type OnSettled = Box<dyn FnMut(&str) + Send>;

/// Trailing-edge debouncer for search text.
pub struct DebounceGate {
    config: DebounceConfig,
    /// Latest text (latest wins).
    pending: Option<String>,
    /// First keystroke of the current burst.
    burst_start: Option<Instant>,
    /// Most recent keystroke.
    last_event: Option<Instant>,
    on_settled: Option<OnSettled>,
    stats: DebounceStats,
}

impl fmt::Debug for DebounceGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceGate")
            .field("config", &self.config)
            .field("pending", &self.pending)
            .field("burst_start", &self.burst_start)
            .field("last_event", &self.last_event)
            .field("on_settled", &self.on_settled.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}

impl DebounceGate {
    /// Create a gate with the given configuration.
    #[must_use]
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            pending: None,
            burst_start: None,
            last_event: None,
            on_settled: None,
            stats: DebounceStats::default(),
        }
    }

    /// Bind a callback invoked once per settled quiet period.
    #[must_use]
    pub fn with_on_settled<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_settled = Some(Box::new(callback));
        self
    }

    /// Configuration in use.
    #[inline]
    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    /// Record a text change.
    pub fn notify(&mut self, text: impl Into<String>) -> DebounceAction {
        self.notify_at(text, Instant::now())
    }

    /// Record a text change at a specific time (for testing).
    pub fn notify_at(&mut self, text: impl Into<String>, now: Instant) -> DebounceAction {
        self.stats.notified += 1;
        self.pending = Some(text.into());
        self.last_event = Some(now);
        let burst_start = *self.burst_start.get_or_insert(now);

        if self.config.delay.is_zero() {
            return self.settle(false);
        }

        if let Some(max_wait) = self.config.max_wait
            && duration_since_or_zero(now, burst_start) >= max_wait
        {
            return self.settle(true);
        }

        DebounceAction::Pending
    }

    /// Poll the gate (call from the event loop).
    pub fn tick(&mut self) -> DebounceAction {
        self.tick_at(Instant::now())
    }

    /// Poll the gate at a specific time (for testing).
    pub fn tick_at(&mut self, now: Instant) -> DebounceAction {
        let (Some(last_event), Some(burst_start)) = (self.last_event, self.burst_start) else {
            return DebounceAction::None;
        };
        if self.pending.is_none() {
            return DebounceAction::None;
        }

        if let Some(max_wait) = self.config.max_wait
            && duration_since_or_zero(now, burst_start) >= max_wait
        {
            return self.settle(true);
        }

        if duration_since_or_zero(now, last_event) >= self.config.delay {
            return self.settle(false);
        }

        DebounceAction::None
    }

    /// Settle immediately (e.g. the user pressed Enter).
    ///
    /// Returns `None` when nothing is pending.
    pub fn flush(&mut self) -> DebounceAction {
        if self.pending.is_none() {
            return DebounceAction::None;
        }
        self.settle(false)
    }

    /// Drop any pending text. Returns whether something was dropped.
    ///
    /// Call on unmount or explicit reset; nothing settles afterwards until
    /// the next `notify`.
    pub fn cancel(&mut self) -> bool {
        self.burst_start = None;
        self.last_event = None;
        let dropped = self.pending.take().is_some();
        if dropped {
            self.stats.cancelled += 1;
            crate::trace!(target: "rselect.debounce", "pending text cancelled");
        }
        dropped
    }

    /// Time until the pending text settles, or `None` when idle.
    pub fn time_until_settled(&self, now: Instant) -> Option<Duration> {
        self.pending.as_ref()?;
        let last_event = self.last_event?;
        let burst_start = self.burst_start?;

        let quiet = self
            .config
            .delay
            .saturating_sub(duration_since_or_zero(now, last_event));
        let remaining = match self.config.max_wait {
            Some(max_wait) => {
                quiet.min(max_wait.saturating_sub(duration_since_or_zero(now, burst_start)))
            }
            None => quiet,
        };
        Some(remaining)
    }

    /// Check if text is pending.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending text, if any.
    #[inline]
    pub fn pending_text(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Counters since creation.
    #[inline]
    pub fn stats(&self) -> DebounceStats {
        self.stats
    }

    fn settle(&mut self, forced: bool) -> DebounceAction {
        self.burst_start = None;
        self.last_event = None;
        let Some(text) = self.pending.take() else {
            return DebounceAction::None;
        };

        self.stats.settled += 1;
        if forced {
            self.stats.forced += 1;
        }
        crate::trace!(target: "rselect.debounce", text = %text, forced, "input settled");

        if let Some(callback) = self.on_settled.as_mut() {
            callback(&text);
        }
        DebounceAction::Settled(text)
    }
}
