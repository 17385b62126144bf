#![forbid(unsafe_code)]

//! Identity keys for option de-duplication and selection equality.
//!
//! Two options are "the same" when their identity keys match, regardless of
//! whether they are the same object or carry the same label. Entity types
//! implement [`Identified`]; call sites that need a different key (say, a
//! slug instead of the numeric id) pass an [`IdentityFn`] instead.

use std::fmt;
use std::sync::Arc;

/// A type with a stable identity key.
pub trait Identified {
    /// Stable key, e.g. the entity id.
    fn identity_key(&self) -> String;
}

/// A type with a human-readable label for option lists.
pub trait Labeled {
    /// Text shown for this option.
    fn label(&self) -> String;
}

impl Identified for String {
    fn identity_key(&self) -> String {
        self.clone()
    }
}

impl Labeled for String {
    fn label(&self) -> String {
        self.clone()
    }
}

/// Shared identity extractor.
pub struct IdentityFn<T> {
    extract: Arc<dyn Fn(&T) -> String + Send + Sync>,
}

impl<T> IdentityFn<T> {
    /// Wrap an extraction closure.
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            extract: Arc::new(extract),
        }
    }

    /// Key of `item`.
    #[inline]
    pub fn key_of(&self, item: &T) -> String {
        (self.extract)(item)
    }

    /// Whether two items share a key.
    #[inline]
    pub fn same(&self, a: &T, b: &T) -> bool {
        self.key_of(a) == self.key_of(b)
    }
}

impl<T: Identified + 'static> IdentityFn<T> {
    /// Extractor that defers to [`Identified::identity_key`].
    #[must_use]
    pub fn of_identified() -> Self {
        Self::new(T::identity_key)
    }
}

impl<T: Identified + 'static> Default for IdentityFn<T> {
    fn default() -> Self {
        Self::of_identified()
    }
}

impl<T> Clone for IdentityFn<T> {
    fn clone(&self) -> Self {
        Self {
            extract: Arc::clone(&self.extract),
        }
    }
}

impl<T> fmt::Debug for IdentityFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityFn").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Course {
        id: u32,
        title: &'static str,
    }

    impl Identified for Course {
        fn identity_key(&self) -> String {
            self.id.to_string()
        }
    }

    #[test]
    fn default_extractor_uses_trait() {
        let id = IdentityFn::<Course>::default();
        let c = Course { id: 7, title: "Rust" };
        assert_eq!(id.key_of(&c), "7");
    }

    #[test]
    fn equality_ignores_other_fields() {
        let id = IdentityFn::<Course>::of_identified();
        let a = Course { id: 1, title: "Old" };
        let b = Course { id: 1, title: "Renamed" };
        assert!(id.same(&a, &b));
        assert_ne!(a.title, b.title);
    }

    #[test]
    fn custom_extractor_overrides_trait() {
        let by_title = IdentityFn::new(|c: &Course| c.title.to_lowercase());
        let a = Course { id: 1, title: "Go" };
        let b = Course { id: 2, title: "GO" };
        assert!(by_title.same(&a, &b));
        assert!(!IdentityFn::<Course>::of_identified().same(&a, &b));
    }
}
