#![forbid(unsafe_code)]

//! rselect Runtime
//!
//! Stateful half of a remote search-select field: the controller that owns
//! the option list, the fetch collaborator seam, and the executor that runs
//! fetches off the event-loop thread.
//!
//! # Key Components
//!
//! - [`RemoteSelect`] - token-guarded, paginated, de-duplicating controller
//! - [`ControllerState`] - read-only view for rendering
//! - [`PageFetcher`] - trait for the host's HTTP client
//! - [`FetchExecutor`] - background-thread fetch tasks with a response channel
//! - [`SearchSession`] - debounce gate + controller + executor glue
//! - [`SelectConfig`] - defaults and environment overrides
//!
//! # How it fits
//! `rselect-core` supplies the pure pieces (queries, cache, debounce);
//! this crate adds ordering, lifecycle and threads. Rendering helpers and
//! selection binding live in `rselect-widgets`.

pub mod config;
pub mod controller;
pub mod executor;
pub mod fetch;
pub mod session;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use config::{ConfigError, DEFAULT_PAGE_LIMIT, SelectConfig};
pub use controller::{
    ApplyOutcome, ControllerState, ControllerStats, Dispatch, RemoteSelect, SkipReason,
};
pub use executor::FetchExecutor;
pub use fetch::{CancelToken, FetchResponse, FetchTicket, PageFetcher};
pub use session::SearchSession;
