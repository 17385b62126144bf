#![forbid(unsafe_code)]

//! Option rows: what a dropdown renders for each entry.
//!
//! Labels are measured in terminal cells (grapheme clusters, wide CJK
//! glyphs counted as two) so that rows can be fitted to a fixed column.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const ELLIPSIS: &str = "…";

/// One renderable entry of a select dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    /// Identity key of the entity behind the row.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Row matches the bound value.
    pub selected: bool,
    /// Bound value shown although the server did not return it.
    pub pinned: bool,
}

impl OptionRow {
    /// A plain, unselected row.
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            selected: false,
            pinned: false,
        }
    }

    /// Mark the row as selected.
    #[must_use]
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Mark the row as pinned.
    #[must_use]
    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    /// Label cut to `max_width` cells, with an ellipsis when cut.
    #[must_use]
    pub fn fitted_label(&self, max_width: usize) -> String {
        truncate_label(&self.label, max_width)
    }
}

/// Display width of `text` in terminal cells.
#[inline]
#[must_use]
pub fn display_width(text: &str) -> usize {
    text.width()
}

/// Truncate `text` to at most `max_width` cells, ending in `…` when cut.
///
/// Never splits a grapheme cluster.
#[must_use]
pub fn truncate_label(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if display_width(text) <= max_width {
        return text.to_string();
    }

    let ellipsis_width = ELLIPSIS.width();
    if max_width <= ellipsis_width {
        return ELLIPSIS.to_string();
    }
    let target = max_width - ellipsis_width;

    let mut out = String::new();
    let mut width = 0usize;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if width + w > target {
            break;
        }
        out.push_str(grapheme);
        width += w;
    }
    out.push_str(ELLIPSIS);
    out
}
