//! Stale-tolerant read-through cache
//!
//! Holds the last complete value of one query. A fresh value is served without
//! touching the source; an expired one triggers a refresh, and a failed refresh
//! falls back to the previous value (flagged stale) or, on a cold start, to a neutral
//! default. Source errors never reach the caller.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The last successfully computed value
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// Result of a complete refresh
    value: V,
    /// When that refresh finished
    computed_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// Whether the entry is younger than `ttl` at `now`
    ///
    /// An entry from the future (clock skew) counts as fresh.
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.computed_at).to_std() {
            Ok(age) => age < ttl,
            Err(_) => true,
        }
    }
}

/// Result of a cache read, tagged with how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRead<V> {
    /// Served from a live entry or a refresh that just succeeded
    Fresh(V),
    /// Refresh failed; this is the last good value
    Stale(V),
    /// Refresh failed and nothing was ever cached; this is the neutral default
    DefaultFallback(V),
}

impl<V> CacheRead<V> {
    pub fn value(&self) -> &V {
        match self {
            Self::Fresh(v) | Self::Stale(v) | Self::DefaultFallback(v) => v,
        }
    }

    pub fn into_value(self) -> V {
        match self {
            Self::Fresh(v) | Self::Stale(v) | Self::DefaultFallback(v) => v,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::DefaultFallback(_))
    }
}

/// Single-entry cache with TTL freshness and stale fallback
///
/// The entry sits behind an async mutex held for the whole check-refresh-replace
/// sequence, so overlapping reads on one instance never run two refreshes at once:
/// the second reader waits and is served the first reader's result. Separate
/// instances (separate processes) share nothing.
#[derive(Debug)]
pub struct StaleCache<V> {
    ttl: Duration,
    neutral_default: V,
    entry: Mutex<Option<CacheEntry<V>>>,
}

impl<V: Clone> StaleCache<V> {
    /// Creates an empty cache
    ///
    /// # Arguments
    /// * `ttl` - Age after which the entry is refreshed on the next read
    /// * `neutral_default` - Value served when a refresh fails before any succeeded
    pub fn new(ttl: Duration, neutral_default: V) -> Self {
        Self {
            ttl,
            neutral_default,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// When the current entry was computed, if there is one
    pub async fn computed_at(&self) -> Option<DateTime<Utc>> {
        self.entry.lock().await.as_ref().map(|e| e.computed_at)
    }

    /// Reads the cached value, refreshing it first if it has expired
    ///
    /// `refresh` must produce a complete value or fail; only `Ok` values are
    /// stored. On failure the entry (including its `computed_at`) is left as it
    /// was, so the next read tries again.
    pub async fn get_with<F, Fut, E>(&self, now: DateTime<Utc>, refresh: F) -> CacheRead<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        let mut entry = self.entry.lock().await;

        if let Some(current) = entry.as_ref() {
            if current.is_fresh(now, self.ttl) {
                return CacheRead::Fresh(current.value.clone());
            }
        }

        match refresh().await {
            Ok(value) => {
                info!(computed_at = %now, "cache refreshed");
                *entry = Some(CacheEntry {
                    value: value.clone(),
                    computed_at: now,
                });
                CacheRead::Fresh(value)
            }
            Err(e) => match entry.as_ref() {
                Some(previous) => {
                    warn!(
                        error = %e,
                        computed_at = %previous.computed_at,
                        "refresh failed, serving stale value"
                    );
                    CacheRead::Stale(previous.value.clone())
                }
                None => {
                    warn!(error = %e, "refresh failed with empty cache, serving neutral default");
                    CacheRead::DefaultFallback(self.neutral_default.clone())
                }
            },
        }
    }
}
