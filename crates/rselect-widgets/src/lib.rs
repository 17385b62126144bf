#![forbid(unsafe_code)]

//! Presentation helpers for remote search-select fields.
//!
//! - [`SelectionBinding`] / [`MultiSelectionBinding`] - bound form value,
//!   pinned rows and change events
//! - [`OptionRow`] - one renderable dropdown entry
//! - [`HighlightState`] - keyboard highlight and infinite-scroll trigger
//! - [`SelectStatus`] - inline loading / empty / error indicator
//!
//! Nothing here draws; hosts map rows and status onto their own widgets.

pub mod highlight;
pub mod rows;
pub mod selection;
pub mod status;

pub use highlight::{DEFAULT_LOAD_THRESHOLD, HighlightState};
pub use rows::{OptionRow, display_width, truncate_label};
pub use selection::{
    MultiSelectionBinding, MultiSelectionChanged, SelectionBinding, SelectionChanged,
};
pub use status::SelectStatus;
