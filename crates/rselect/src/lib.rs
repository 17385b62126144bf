#![forbid(unsafe_code)]

//! rselect public facade crate.
//!
//! Re-exports the controller, session and widget helpers from the internal
//! crates, adds the catalog lookups of the course admin console, and offers
//! a small prelude for day-to-day usage.

pub mod catalog;

// --- Core re-exports -------------------------------------------------------

pub use rselect_core::{
    CacheStats, DebounceAction, DebounceConfig, DebounceGate, ErrorKind, FetchError, Identified,
    IdentityFn, Instant, Labeled, PageResponse, RequestToken, SearchQuery, SharedQueryCache,
};

// --- Runtime re-exports ----------------------------------------------------

pub use rselect_runtime::{
    ApplyOutcome, CancelToken, ConfigError, ControllerState, ControllerStats, Dispatch,
    FetchExecutor, FetchResponse, FetchTicket, PageFetcher, RemoteSelect, SearchSession,
    SelectConfig, SkipReason,
};

// --- Widget re-exports -----------------------------------------------------

#[cfg(feature = "widgets")]
pub use rselect_widgets::{
    HighlightState, MultiSelectionBinding, MultiSelectionChanged, OptionRow, SelectStatus,
    SelectionBinding, SelectionChanged,
};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::catalog::{Category, Course, Language, LookupKind, Teacher};
    pub use crate::{
        ControllerState, Dispatch, FetchError, Identified, Labeled, PageFetcher, PageResponse,
        RemoteSelect, SearchQuery, SearchSession, SelectConfig,
    };

    #[cfg(feature = "widgets")]
    pub use crate::{HighlightState, SelectStatus, SelectionBinding};

    pub use crate::{core, runtime};
    #[cfg(feature = "widgets")]
    pub use crate::widgets;
}

pub use rselect_core as core;
pub use rselect_runtime as runtime;
#[cfg(feature = "widgets")]
pub use rselect_widgets as widgets;
