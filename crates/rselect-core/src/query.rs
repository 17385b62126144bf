#![forbid(unsafe_code)]

//! Query, cache key, dispatch token and page types.
//!
//! A [`SearchQuery`] is built once per fetch attempt and never mutated. The
//! controller stamps every dispatch with a fresh [`RequestToken`]; a response
//! carrying anything other than the latest token is stale.
//!
//! # Pagination
//!
//! Pages are addressed by `(text, offset)`. Changing the text restarts the
//! progression at offset 0:
//!
//! ```
//! use rselect_core::query::SearchQuery;
//!
//! let first = SearchQuery::first_page("py", 10);
//! let second = first.next_page();
//! assert_eq!(second.offset(), 10);
//! assert_eq!(second.text(), "py");
//! assert_eq!(second.key().offset, 10);
//! ```

use core::fmt;

/// Strictly increasing sequence number assigned when a fetch is dispatched.
///
/// Ordering follows dispatch order, never arrival order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// The token of a controller that has not dispatched anything yet.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw sequence number.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw sequence number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The token that follows this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One page request: free text plus an offset/limit window.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    text: String,
    offset: usize,
    limit: usize,
}

impl SearchQuery {
    /// Create a query. A zero `limit` is raised to 1.
    #[must_use]
    pub fn new(text: impl Into<String>, offset: usize, limit: usize) -> Self {
        Self {
            text: text.into(),
            offset,
            limit: limit.max(1),
        }
    }

    /// Query for the first page of `text`.
    #[must_use]
    pub fn first_page(text: impl Into<String>, limit: usize) -> Self {
        Self::new(text, 0, limit)
    }

    /// Query for the page right after this one, same text and limit.
    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            text: self.text.clone(),
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }

    /// The free-text part. May be empty ("browse all").
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Index of the first requested item.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Page size, always at least 1.
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether this is the first page of its text.
    #[inline]
    pub fn is_first_page(&self) -> bool {
        self.offset == 0
    }

    /// Cache key for this page.
    #[must_use]
    pub fn key(&self) -> SearchKey {
        SearchKey::new(self.text.clone(), self.offset, self.limit)
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{}..+{}]", self.text, self.offset, self.limit)
    }
}

/// Cache key: the `(text, offset, limit)` of a page.
///
/// The limit is part of the key: a page fetched with a different page size
/// holds a different slice and implies a different `has_more`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SearchKey {
    /// Query text.
    pub text: String,
    /// Page offset.
    pub offset: usize,
    /// Page size the entry was fetched with.
    pub limit: usize,
}

impl SearchKey {
    /// Create a key.
    #[must_use]
    pub fn new(text: impl Into<String>, offset: usize, limit: usize) -> Self {
        Self {
            text: text.into(),
            offset,
            limit,
        }
    }
}

/// What a fetch collaborator hands back for one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageResponse<T> {
    /// Items in server order.
    pub items: Vec<T>,
    /// Server says there is nothing after this page.
    pub is_last_page: bool,
}

impl<T> PageResponse<T> {
    /// A page that may have successors.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            is_last_page: false,
        }
    }

    /// A page the server marked as final.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            is_last_page: true,
        }
    }

    /// Attach the dispatch token.
    #[must_use]
    pub fn stamp(self, requested_at: RequestToken) -> ResultPage<T> {
        ResultPage {
            items: self.items,
            requested_at,
            is_last_page: self.is_last_page,
        }
    }
}

/// A response stamped with the token of the dispatch that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultPage<T> {
    /// Items in server order.
    pub items: Vec<T>,
    /// Token assigned when the request was dispatched.
    pub requested_at: RequestToken,
    /// Server says there is nothing after this page.
    pub is_last_page: bool,
}

impl<T> ResultPage<T> {
    /// Number of items on the page.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the page has no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A page ends pagination when the server says so or when it came back
    /// shorter than requested.
    #[inline]
    pub fn ends_pagination(&self, limit: usize) -> bool {
        self.is_last_page || self.items.len() < limit
    }

    /// Drop the token, keeping items and the last-page flag.
    #[must_use]
    pub fn into_response(self) -> PageResponse<T> {
        PageResponse {
            items: self.items,
            is_last_page: self.is_last_page,
        }
    }
}
