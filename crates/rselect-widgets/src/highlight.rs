#![forbid(unsafe_code)]

//! Keyboard highlight and infinite-scroll trigger for a dropdown.

use rselect_runtime::controller::ControllerState;

/// Rows from the end at which the next page is requested.
pub const DEFAULT_LOAD_THRESHOLD: usize = 3;

/// Highlighted row and scroll offset of an open dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightState {
    /// Index of the highlighted row, if any.
    pub highlighted: Option<usize>,
    /// First visible row.
    pub offset: usize,
    /// Distance from the end that triggers `load_more`.
    pub threshold: usize,
}

impl Default for HighlightState {
    fn default() -> Self {
        Self {
            highlighted: None,
            offset: 0,
            threshold: DEFAULT_LOAD_THRESHOLD,
        }
    }
}

impl HighlightState {
    /// Set the load threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Highlight a row, or `None` to clear.
    pub fn highlight(&mut self, index: Option<usize>) {
        self.highlighted = index;
        if index.is_none() {
            self.offset = 0;
        }
    }

    /// Move to the next row.
    ///
    /// If nothing is highlighted, highlights the first row. Clamps to the
    /// last row.
    pub fn move_down(&mut self, row_count: usize) {
        if row_count == 0 {
            return;
        }
        let next = match self.highlighted {
            Some(i) => (i + 1).min(row_count - 1),
            None => 0,
        };
        self.highlighted = Some(next);
    }

    /// Move to the previous row. Clamps to 0.
    pub fn move_up(&mut self) {
        let prev = match self.highlighted {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.highlighted = Some(prev);
    }

    /// Jump to the first row.
    pub fn home(&mut self, row_count: usize) {
        self.highlighted = (row_count > 0).then_some(0);
        self.offset = 0;
    }

    /// Jump to the last row.
    pub fn end(&mut self, row_count: usize) {
        self.highlighted = row_count.checked_sub(1);
    }

    /// Keep the highlight inside `row_count` rows (the list shrank after a
    /// new search).
    pub fn clamp(&mut self, row_count: usize) {
        if row_count == 0 {
            self.highlighted = None;
            self.offset = 0;
            return;
        }
        if let Some(i) = self.highlighted {
            self.highlighted = Some(i.min(row_count - 1));
        }
        self.offset = self.offset.min(row_count - 1);
    }

    /// Adjust `offset` so the highlighted row is inside a viewport of
    /// `height` rows.
    pub fn scroll_into_view(&mut self, height: usize) {
        let Some(i) = self.highlighted else {
            return;
        };
        if height == 0 {
            return;
        }
        if i < self.offset {
            self.offset = i;
        } else if i >= self.offset + height {
            self.offset = i + 1 - height;
        }
    }

    /// Whether the highlight is within `threshold` rows of the end.
    #[must_use]
    pub fn near_end(&self, row_count: usize) -> bool {
        match self.highlighted {
            Some(i) => i + self.threshold >= row_count.saturating_sub(1),
            None => false,
        }
    }

    /// Whether the host should call `load_more` now: near the end, more
    /// pages exist and nothing is loading.
    #[must_use]
    pub fn wants_more<T>(&self, state: &ControllerState<T>, row_count: usize) -> bool {
        state.has_more() && !state.loading() && self.near_end(row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rselect_core::query::PageResponse;
    use rselect_runtime::controller::{Dispatch, RemoteSelect};

    #[test]
    fn move_down_from_nothing_highlights_first() {
        let mut h = HighlightState::default();
        h.move_down(5);
        assert_eq!(h.highlighted, Some(0));
    }

    #[test]
    fn move_down_clamps_and_empty_is_noop() {
        let mut h = HighlightState::default();
        h.move_down(0);
        assert_eq!(h.highlighted, None);
        h.highlight(Some(3));
        h.move_down(4);
        assert_eq!(h.highlighted, Some(3));
    }

    #[test]
    fn move_up_clamps_at_zero() {
        let mut h = HighlightState::default();
        h.highlight(Some(0));
        h.move_up();
        assert_eq!(h.highlighted, Some(0));
    }

    #[test]
    fn clamp_after_shrink() {
        let mut h = HighlightState {
            highlighted: Some(9),
            offset: 6,
            threshold: 3,
        };
        h.clamp(4);
        assert_eq!(h.highlighted, Some(3));
        assert_eq!(h.offset, 3);
        h.clamp(0);
        assert_eq!(h.highlighted, None);
        assert_eq!(h.offset, 0);
    }

    #[test]
    fn scroll_into_view_follows_highlight() {
        let mut h = HighlightState::default();
        h.highlight(Some(7));
        h.scroll_into_view(5);
        assert_eq!(h.offset, 3);
        h.highlight(Some(1));
        h.scroll_into_view(5);
        assert_eq!(h.offset, 1);
    }

    #[test]
    fn home_and_end() {
        let mut h = HighlightState::default();
        h.end(6);
        assert_eq!(h.highlighted, Some(5));
        h.home(6);
        assert_eq!(h.highlighted, Some(0));
        h.end(0);
        assert_eq!(h.highlighted, None);
    }

    #[test]
    fn near_end_uses_threshold() {
        let mut h = HighlightState::default().with_threshold(2);
        h.highlight(Some(6));
        assert!(!h.near_end(10));
        h.highlight(Some(7));
        assert!(h.near_end(10));
    }

    #[test]
    fn wants_more_respects_controller_state() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(4);
        let Dispatch::Fetch(t) = select.search("") else {
            panic!("expected fetch");
        };
        let page: Vec<String> = (0..4).map(|i| i.to_string()).collect();
        select.apply(t.respond(Ok(PageResponse::new(page))));

        let mut h = HighlightState::default();
        h.highlight(Some(3));
        assert!(h.wants_more(select.state(), 4));

        let _loading = select.load_more();
        assert!(!h.wants_more(select.state(), 4));
    }
}
