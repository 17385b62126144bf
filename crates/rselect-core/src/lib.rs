#![forbid(unsafe_code)]

//! Core: query model, identity keys, fetch errors, the page cache and the
//! debounce gate.
//!
//! Nothing in this crate performs I/O or spawns threads. Time-dependent
//! types take an explicit `now` in their `_at` methods so they can be driven
//! deterministically from tests or from a host event loop.

pub mod cache;
mod clock;
pub mod debounce;
pub mod error;
pub mod identity;
pub mod logging;
pub mod query;

pub use cache::{CacheStats, QueryCache, SharedQueryCache};
pub use debounce::{DebounceAction, DebounceConfig, DebounceGate, DebounceStats};
pub use error::{ErrorKind, FetchError};
pub use identity::{Identified, IdentityFn, Labeled};
pub use query::{PageResponse, RequestToken, ResultPage, SearchKey, SearchQuery};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, trace, warn};

/// Re-exported so callers can build timestamps for the `_at` methods.
pub use web_time::Instant;
