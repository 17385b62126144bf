#![forbid(unsafe_code)]

//! Search-select configuration.
//!
//! [`SelectConfig`] collects every tunable of a lookup field: page size,
//! debounce timing and cache policy. Build it with [`Default`] plus the
//! `with_*` builders, or read overrides from the environment.
//!
//! # Env Var Contract
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `RSELECT_PAGE_LIMIT` | items per page | 20 |
//! | `RSELECT_DEBOUNCE_MS` | quiet period | 300 |
//! | `RSELECT_DEBOUNCE_MAX_WAIT_MS` | hard deadline, `0` = off | off |
//! | `RSELECT_CACHE_TTL_SECS` | freshness window | 300 |
//! | `RSELECT_CACHE_CAPACITY` | cached pages, `0` = no cache | 256 |
//! | `RSELECT_CANCEL_SUPERSEDED` | skip fetches that were superseded before they started | true |
//!
//! # Invariants
//!
//! - Parsing never fails: unparsable values fall back to the default and
//!   are logged at `warn`.
//! - `from_env` reads each variable once; the result is deterministic for a
//!   given environment.

use std::env;
use std::fmt;
use std::time::Duration;

use rselect_core::cache::{DEFAULT_CAPACITY, DEFAULT_TTL, SharedQueryCache};
use rselect_core::debounce::{DEFAULT_DELAY, DebounceConfig};

/// Default page size.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Configuration for one search-select field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectConfig {
    /// Items requested per page.
    pub page_limit: usize,
    /// Quiet period before a keystroke burst triggers a search.
    pub debounce: Duration,
    /// Optional hard deadline for the debounce gate.
    pub debounce_max_wait: Option<Duration>,
    /// Cache freshness window.
    pub cache_ttl: Duration,
    /// Maximum cached pages; zero disables the cache.
    pub cache_capacity: usize,
    /// Flip the cancel flag of superseded requests.
    pub cancel_superseded: bool,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            debounce: DEFAULT_DELAY,
            debounce_max_wait: None,
            cache_ttl: DEFAULT_TTL,
            cache_capacity: DEFAULT_CAPACITY,
            cancel_superseded: true,
        }
    }
}

/// Invalid explicit configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `page_limit` must be positive.
    ZeroPageLimit,
    /// The cache is enabled but entries would expire immediately.
    ZeroCacheTtl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPageLimit => write!(f, "page_limit must be greater than zero"),
            Self::ZeroCacheTtl => write!(
                f,
                "cache_ttl must be non-zero while cache_capacity is non-zero"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SelectConfig {
    /// Parse overrides from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse overrides from an arbitrary variable source.
    ///
    /// `lookup` returns the raw value of a variable, if set.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let page_limit = parse_var(&lookup, "RSELECT_PAGE_LIMIT", |v| {
            v.parse::<usize>().ok().filter(|n| *n > 0)
        })
        .unwrap_or(defaults.page_limit);

        let debounce = parse_var(&lookup, "RSELECT_DEBOUNCE_MS", |v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.debounce);

        let debounce_max_wait =
            parse_var(&lookup, "RSELECT_DEBOUNCE_MAX_WAIT_MS", |v| v.parse::<u64>().ok())
                .and_then(|ms| (ms > 0).then(|| Duration::from_millis(ms)))
                .or(defaults.debounce_max_wait);

        let cache_ttl = parse_var(&lookup, "RSELECT_CACHE_TTL_SECS", |v| {
            v.parse::<u64>().ok().filter(|n| *n > 0)
        })
        .map(Duration::from_secs)
        .unwrap_or(defaults.cache_ttl);

        let cache_capacity = parse_var(&lookup, "RSELECT_CACHE_CAPACITY", |v| {
            v.parse::<usize>().ok()
        })
        .unwrap_or(defaults.cache_capacity);

        let cancel_superseded =
            parse_var(&lookup, "RSELECT_CANCEL_SUPERSEDED", parse_bool)
                .unwrap_or(defaults.cancel_superseded);

        Self {
            page_limit,
            debounce,
            debounce_max_wait,
            cache_ttl,
            cache_capacity,
            cancel_superseded,
        }
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }

    /// Set the debounce quiet period.
    #[must_use]
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    /// Set or clear the debounce hard deadline.
    #[must_use]
    pub fn with_debounce_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.debounce_max_wait = max_wait;
        self
    }

    /// Set the cache freshness window.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the cache capacity; zero disables caching.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Enable or disable cooperative cancellation of superseded requests.
    #[must_use]
    pub fn with_cancel_superseded(mut self, enabled: bool) -> Self {
        self.cancel_superseded = enabled;
        self
    }

    /// Check an explicitly built configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 {
            return Err(ConfigError::ZeroPageLimit);
        }
        if self.cache_capacity > 0 && self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroCacheTtl);
        }
        Ok(())
    }

    /// Whether a cache should be created at all.
    #[inline]
    pub fn cache_enabled(&self) -> bool {
        self.cache_capacity > 0
    }

    /// Debounce gate settings.
    #[must_use]
    pub fn debounce_config(&self) -> DebounceConfig {
        DebounceConfig::default()
            .with_delay(self.debounce)
            .with_max_wait(self.debounce_max_wait)
    }

    /// Build a cache with this configuration's window and capacity.
    #[must_use]
    pub fn build_cache<T: Clone>(&self) -> SharedQueryCache<T> {
        SharedQueryCache::new(self.cache_ttl, self.cache_capacity)
    }
}

fn parse_var<F, T, P>(lookup: &F, name: &str, parse: P) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(name)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!(
            target: "rselect.config",
            var = name,
            value = %raw,
            "ignoring invalid configuration value"
        );
    }
    parsed
}

fn parse_bool(value: &str) -> Option<bool> {
    if value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no")
    {
        Some(false)
    } else {
        None
    }
}
