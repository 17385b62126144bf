#![forbid(unsafe_code)]

//! Inline status line under a search-select field.

use std::fmt;

use rselect_core::error::ErrorKind;
use rselect_runtime::controller::ControllerState;

/// What the field should tell the user right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectStatus {
    /// Nothing searched yet.
    Idle,
    /// A request is in flight.
    Loading {
        /// Options are already shown; a further page is coming.
        more: bool,
    },
    /// The query matched nothing.
    Empty,
    /// Options are available.
    Ready {
        /// Options shown.
        count: usize,
        /// More pages exist.
        has_more: bool,
    },
    /// The latest request failed.
    Error {
        /// User-facing message.
        message: String,
        /// Failure class.
        kind: ErrorKind,
        /// Offer a retry action.
        retryable: bool,
    },
}

impl SelectStatus {
    /// Project a controller state.
    ///
    /// Loading wins over a stale error so that a retry shows progress.
    #[must_use]
    pub fn of<T>(state: &ControllerState<T>) -> Self {
        if state.loading() {
            return Self::Loading {
                more: !state.options().is_empty(),
            };
        }
        if let Some(err) = state.error() {
            return Self::Error {
                message: err.user_message(),
                kind: err.kind(),
                retryable: err.is_retryable(),
            };
        }
        if state.options().is_empty() {
            return if state.answered() {
                Self::Empty
            } else {
                Self::Idle
            };
        }
        Self::Ready {
            count: state.options().len(),
            has_more: state.has_more(),
        }
    }

    /// Whether the retry action should be shown.
    #[inline]
    #[must_use]
    pub fn offers_retry(&self) -> bool {
        matches!(self, Self::Error { retryable: true, .. })
    }

    /// Whether this is an error status.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for SelectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => Ok(()),
            Self::Loading { more: false } => write!(f, "Searching…"),
            Self::Loading { more: true } => write!(f, "Loading more…"),
            Self::Empty => write!(f, "No results"),
            Self::Ready {
                count: 1,
                has_more: false,
            } => write!(f, "1 result"),
            Self::Ready {
                count,
                has_more: false,
            } => write!(f, "{count} results"),
            Self::Ready {
                count,
                has_more: true,
            } => write!(f, "{count}+ results"),
            Self::Error { message, .. } => f.write_str(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rselect_core::error::FetchError;
    use rselect_core::query::PageResponse;
    use rselect_runtime::controller::{Dispatch, RemoteSelect};
    use rselect_runtime::fetch::FetchTicket;

    fn fetch(d: Dispatch) -> FetchTicket {
        d.into_ticket().expect("fetch")
    }

    #[test]
    fn fresh_field_is_idle() {
        let select: RemoteSelect<String> = RemoteSelect::new(5);
        assert_eq!(SelectStatus::of(select.state()), SelectStatus::Idle);
        assert_eq!(SelectStatus::Idle.to_string(), "");
    }

    #[test]
    fn loading_first_page_then_more() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(2);
        let t = fetch(select.search("a"));
        assert_eq!(
            SelectStatus::of(select.state()),
            SelectStatus::Loading { more: false }
        );
        select.apply(t.respond(Ok(PageResponse::new(vec!["a".into(), "b".into()]))));
        assert_eq!(
            SelectStatus::of(select.state()),
            SelectStatus::Ready {
                count: 2,
                has_more: true
            }
        );
        assert_eq!(SelectStatus::of(select.state()).to_string(), "2+ results");

        let _more = fetch(select.load_more());
        assert_eq!(
            SelectStatus::of(select.state()),
            SelectStatus::Loading { more: true }
        );
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(5);
        let t = fetch(select.search("zzz"));
        select.apply(t.respond(Ok(PageResponse::new(Vec::new()))));
        let status = SelectStatus::of(select.state());
        assert_eq!(status, SelectStatus::Empty);
        assert!(!status.is_error());
        assert_eq!(status.to_string(), "No results");
    }

    #[test]
    fn error_offers_retry() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(5);
        let t = fetch(select.search("a"));
        select.apply(t.respond(Err(FetchError::network("reset"))));
        let status = SelectStatus::of(select.state());
        assert!(status.offers_retry());
        assert_eq!(status.to_string(), "Could not reach the server.");
    }

    #[test]
    fn client_error_shows_message_without_retry() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(5);
        let t = fetch(select.search("a"));
        select.apply(t.respond(Err(FetchError::server(400, "Query too short"))));
        let status = SelectStatus::of(select.state());
        assert!(status.is_error());
        assert!(!status.offers_retry());
        assert_eq!(status.to_string(), "Query too short");
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut select: RemoteSelect<String> = RemoteSelect::new(5);
        let t = fetch(select.search("zzz"));
        select.apply(t.respond(Ok(PageResponse::new(Vec::new()))));
        select.reset();
        assert_eq!(SelectStatus::of(select.state()), SelectStatus::Idle);
    }

    #[test]
    fn single_result_wording() {
        let status = SelectStatus::Ready {
            count: 1,
            has_more: false,
        };
        assert_eq!(status.to_string(), "1 result");
    }
}
