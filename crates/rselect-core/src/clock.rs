#![forbid(unsafe_code)]

//! Monotonic time helpers shared by the cache and the debounce gate.

use std::time::Duration;

use web_time::Instant;

/// `now - earlier`, or zero when `earlier` is in the future.
///
/// Callers pass explicit timestamps, so an out-of-order `now` must not panic.
#[inline]
pub(crate) fn duration_since_or_zero(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::ZERO)
}
