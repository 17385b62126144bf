#![forbid(unsafe_code)]

//! Result cache for memoizing fetched pages.
//!
//! [`QueryCache`] stores [`ResultPage`]s keyed by [`SearchKey`] so that a
//! repeated `(text, offset, limit)` inside the freshness window skips the network.
//! It is purely a latency optimization: dropping every entry (or the whole
//! cache) never changes what a controller ends up showing.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use rselect_core::cache::QueryCache;
//! use rselect_core::query::{PageResponse, RequestToken, SearchKey};
//!
//! let mut cache = QueryCache::new(Duration::from_secs(300), 64);
//! let key = SearchKey::new("py", 0, 20);
//! cache.put(key.clone(), PageResponse::last(vec!["python"]).stamp(RequestToken::new(1)));
//!
//! let hit = cache.get(&key).expect("fresh entry");
//! assert_eq!(hit.items, vec!["python"]);
//! ```
//!
//! # Invalidation Strategies
//!
//! ## Freshness window (automatic)
//!
//! Entries older than the window are misses and are dropped on access.
//!
//! ## Generation-based
//!
//! [`QueryCache::invalidate_all()`] bumps the generation in O(1). Every entry
//! stored under an older generation becomes a miss. Call it after a mutation
//! that affects search results (a course was renamed, a category deleted).
//!
//! ## Prefix-based
//!
//! [`QueryCache::invalidate_prefix()`] drops entries whose text starts with a
//! prefix. Fast typing leaves one entry per keystroke; pruning the abandoned
//! family keeps memory bounded.
//!
//! # Cache Eviction
//!
//! When at capacity, expired and stale-generation entries are dropped first,
//! then the least frequently used entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use web_time::Instant;

use crate::clock::duration_since_or_zero;
use crate::query::{ResultPage, SearchKey};

/// Default freshness window (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of cached pages.
pub const DEFAULT_CAPACITY: usize = 256;

/// Cached page with metadata for expiry and eviction.
#[derive(Clone, Debug)]
struct CacheEntry<T> {
    page: ResultPage<T>,
    /// Generation when this entry was stored.
    generation: u64,
    stored_at: Instant,
    /// Access count for LFU eviction.
    access_count: u32,
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of entries currently in the cache.
    pub entries: usize,
    /// Total cache hits since creation or last reset.
    pub hits: u64,
    /// Total cache misses since creation or last reset.
    pub misses: u64,
    /// Hit rate as a fraction (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Page cache with a freshness window, generation invalidation and LFU
/// eviction.
///
/// A capacity of zero disables storage; every lookup misses.
#[derive(Debug)]
pub struct QueryCache<T> {
    entries: HashMap<SearchKey, CacheEntry<T>>,
    ttl: Duration,
    generation: u64,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl<T: Clone> QueryCache<T> {
    /// Create a cache with the given freshness window and capacity.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries.min(1024)),
            ttl,
            generation: 0,
            max_entries,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a fresh page.
    pub fn get(&mut self, key: &SearchKey) -> Option<ResultPage<T>> {
        self.get_at(key, Instant::now())
    }

    /// Look up a fresh page at a specific time (for testing).
    ///
    /// Misses when the key is absent, was stored under an older generation,
    /// or is older than the freshness window. Expired entries are removed.
    pub fn get_at(&mut self, key: &SearchKey, now: Instant) -> Option<ResultPage<T>> {
        let generation = self.generation;
        let ttl = self.ttl;
        let fresh = match self.entries.get_mut(key) {
            Some(entry)
                if entry.generation == generation
                    && duration_since_or_zero(now, entry.stored_at) < ttl =>
            {
                entry.access_count = entry.access_count.saturating_add(1);
                Some(entry.page.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        };

        match fresh {
            Some(page) => {
                self.hits += 1;
                crate::trace!(target: "rselect.cache", text = %key.text, offset = key.offset, "cache hit");
                Some(page)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a page, overwriting any previous entry for the key.
    pub fn put(&mut self, key: SearchKey, page: ResultPage<T>) {
        self.put_at(key, page, Instant::now());
    }

    /// Store a page at a specific time (for testing).
    pub fn put_at(&mut self, key: SearchKey, page: ResultPage<T>, now: Instant) {
        if self.max_entries == 0 {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.purge_expired_at(now);
            if self.entries.len() >= self.max_entries {
                self.evict_lfu();
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                page,
                generation: self.generation,
                stored_at: now,
                access_count: 1,
            },
        );
    }

    /// Invalidate all entries by bumping the generation.
    ///
    /// This is an O(1) operation; entries are not immediately removed.
    #[inline]
    pub fn invalidate_all(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Remove every entry whose text starts with `prefix`.
    ///
    /// Returns the number of removed entries. An empty prefix removes
    /// everything.
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.text.starts_with(prefix));
        let removed = before - self.entries.len();
        if removed > 0 {
            crate::debug!(target: "rselect.cache", prefix, removed, "prefix invalidated");
        }
        removed
    }

    /// Remove expired and stale-generation entries.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Remove expired and stale-generation entries at a specific time.
    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let generation = self.generation;
        let ttl = self.ttl;
        self.entries.retain(|_, e| {
            e.generation == generation && duration_since_or_zero(now, e.stored_at) < ttl
        });
        before - self.entries.len()
    }

    /// Get current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Reset statistics counters to zero.
    #[inline]
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    /// Clear all entries from the cache.
    ///
    /// Unlike [`invalidate_all()`], this immediately frees memory.
    ///
    /// [`invalidate_all()`]: QueryCache::invalidate_all
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Freshness window.
    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the current number of entries in the cache.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the maximum capacity of the cache.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Evict the least frequently used entry.
    fn evict_lfu(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.access_count)
            .map(|(k, _)| k.clone())
        {
            self.entries.remove(&key);
        }
    }
}

impl<T: Clone> Default for QueryCache<T> {
    /// Five-minute window, 256 entries.
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

/// Cloneable handle to one cache shared by several controllers.
///
/// All widgets of the same lookup kind (every category picker on a page,
/// say) can share one handle. Each controller still owns its own state.
#[derive(Debug)]
pub struct SharedQueryCache<T> {
    inner: Arc<Mutex<QueryCache<T>>>,
}

impl<T> Clone for SharedQueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> SharedQueryCache<T> {
    /// Create a new shared cache.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self::from_cache(QueryCache::new(ttl, max_entries))
    }

    /// Share an existing cache.
    #[must_use]
    pub fn from_cache(cache: QueryCache<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueryCache<T>> {
        // A panic while holding the lock leaves the map consistent; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// See [`QueryCache::get_at`].
    pub fn get_at(&self, key: &SearchKey, now: Instant) -> Option<ResultPage<T>> {
        self.lock().get_at(key, now)
    }

    /// See [`QueryCache::put_at`].
    pub fn put_at(&self, key: SearchKey, page: ResultPage<T>, now: Instant) {
        self.lock().put_at(key, page, now);
    }

    /// See [`QueryCache::invalidate_all`].
    pub fn invalidate_all(&self) {
        self.lock().invalidate_all();
    }

    /// See [`QueryCache::invalidate_prefix`].
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.lock().invalidate_prefix(prefix)
    }

    /// See [`QueryCache::clear`].
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// See [`QueryCache::stats`].
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    /// Number of handles (controllers plus owner) sharing this cache.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T: Clone> Default for SharedQueryCache<T> {
    fn default() -> Self {
        Self::from_cache(QueryCache::default())
    }
}
