//! Suspense-compatible request cache.
//!
//! [`SuspenseCache`] memoizes asynchronous reads by [`CacheKey`]. The first
//! read of a key starts the fetch and stores it as a shared future; every
//! later read of the same key gets a clone of that future, whether it is
//! still in flight (coalescing) or already settled. Failed fetches stay
//! cached as failures until invalidated.
//!
//! There is no eviction and no expiry. Entries leave the cache only through
//! [`invalidate`](SuspenseCache::invalidate), which never blocks: a fetch
//! already in flight keeps running for whoever awaits it, and the next read
//! of the key issues a fresh fetch.
//!
//! [`CacheStats`] tracks fetches, hits, coalesced reads and invalidations.
//!
//! # Examples
//!
//! ```
//! use async_navigator::cache::{CacheKey, SuspenseCache};
//! use futures::{future, FutureExt};
//!
//! let cache: SuspenseCache<u32> = SuspenseCache::new();
//! let key = CacheKey::new("answer");
//!
//! let first = cache.read(key.clone(), || future::ok(42).boxed_local());
//! let second = cache.read(key, || unreachable!("coalesced"));
//!
//! assert_eq!(pollster::block_on(first), Ok(42));
//! assert_eq!(pollster::block_on(second), Ok(42));
//! assert_eq!(cache.stats().fetches, 1);
//! ```

use crate::error::FetchError;
use crate::location::QueryParams;
use crate::{debug_log, trace_log};
use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Future produced by a fetch.
pub type FetchFuture<V> = LocalBoxFuture<'static, Result<V, FetchError>>;

/// Cached read handle. Cloning it does not issue a new fetch.
pub type SharedRead<V> = Shared<FetchFuture<V>>;

/// Cache key: a resource kind plus normalized parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: String,
    params: QueryParams,
}

impl CacheKey {
    /// Key for `kind` with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: QueryParams::new(),
        }
    }

    /// Add a parameter.
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Resource kind
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Parameters
    pub fn params(&self) -> &QueryParams {
        &self.params
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(&self.kind)
        } else {
            write!(f, "{}?{}", self.kind, self.params.to_query_string())
        }
    }
}

/// Counters tracking cache effectiveness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that issued a fetch.
    pub fetches: usize,
    /// Reads served from an existing entry.
    pub hits: usize,
    /// Hits whose entry was still in flight.
    pub coalesced: usize,
    /// Calls to [`SuspenseCache::invalidate`].
    pub invalidations: usize,
}

impl CacheStats {
    /// Return the hit rate as a value in `0.0..=1.0`.
    ///
    /// Returns `0.0` if no reads have been performed.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.fetches;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Result of a non-suspending read.
pub enum ReadState<V> {
    /// The entry has settled.
    Ready(Result<V, FetchError>),
    /// The entry is in flight; await the handle to resume.
    Suspended(SharedRead<V>),
}

impl<V> ReadState<V> {
    /// Check if the read would suspend
    pub fn is_suspended(&self) -> bool {
        matches!(self, ReadState::Suspended(_))
    }
}

struct CacheEntry<V> {
    read: SharedRead<V>,
    /// Cache generation at the time the fetch was issued
    generation: u64,
}

struct CacheInner<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    generation: u64,
    stats: CacheStats,
}

/// Coalescing cache of asynchronous reads.
///
/// Cloning produces another handle to the same cache.
pub struct SuspenseCache<V> {
    inner: Rc<RefCell<CacheInner<V>>>,
}

impl<V> Clone for SuspenseCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + 'static> SuspenseCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(CacheInner {
                entries: HashMap::new(),
                generation: 0,
                stats: CacheStats::default(),
            })),
        }
    }

    /// Read `key`, calling `fetch` only if no entry exists.
    ///
    /// `fetch` must not touch this cache.
    pub fn read<F>(&self, key: CacheKey, fetch: F) -> SharedRead<V>
    where
        F: FnOnce() -> FetchFuture<V>,
    {
        if let Some(read) = self.lookup(&key) {
            return read;
        }

        let read = fetch().shared();
        let inner = &mut *self.inner.borrow_mut();
        inner.stats.fetches += 1;
        debug_log!("Cache miss for '{}', fetching", key);
        inner.entries.insert(
            key,
            CacheEntry {
                read: read.clone(),
                generation: inner.generation,
            },
        );
        read
    }

    /// Read `key` without suspending.
    ///
    /// The read is started (or joined) and polled once. If that settles it,
    /// the result comes back as [`ReadState::Ready`]; otherwise the caller
    /// gets [`ReadState::Suspended`] to await.
    pub fn read_state<F>(&self, key: CacheKey, fetch: F) -> ReadState<V>
    where
        F: FnOnce() -> FetchFuture<V>,
    {
        let read = self.read(key, fetch);
        if let Some(result) = read.peek() {
            return ReadState::Ready(result.clone());
        }
        match read.clone().now_or_never() {
            Some(result) => ReadState::Ready(result),
            None => ReadState::Suspended(read),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<SharedRead<V>> {
        let inner = &mut *self.inner.borrow_mut();
        let entry = inner.entries.get(key)?;
        inner.stats.hits += 1;
        if entry.read.peek().is_none() {
            inner.stats.coalesced += 1;
            trace_log!("Cache hit for '{}' (in flight, coalesced)", key);
        } else {
            trace_log!("Cache hit for '{}'", key);
        }
        Some(entry.read.clone())
    }

    /// Settled value of `key`, if any. Never fetches.
    pub fn peek(&self, key: &CacheKey) -> Option<Result<V, FetchError>> {
        let inner = self.inner.borrow();
        inner.entries.get(key)?.read.peek().cloned()
    }

    /// Check if an entry exists for `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    /// Generation at which the entry for `key` was fetched.
    pub fn entry_generation(&self, key: &CacheKey) -> Option<u64> {
        self.inner
            .borrow()
            .entries
            .get(key)
            .map(|entry| entry.generation)
    }

    /// Remove matching entries.
    ///
    /// - no `kind`: every entry
    /// - `kind` only: every entry of that kind
    /// - `kind` and `params`: the one exact entry
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, kind: Option<&str>, params: Option<&QueryParams>) -> usize {
        let inner = &mut *self.inner.borrow_mut();
        let before = inner.entries.len();
        match (kind, params) {
            (None, _) => inner.entries.clear(),
            (Some(kind), None) => inner.entries.retain(|key, _| key.kind != kind),
            (Some(kind), Some(params)) => {
                inner
                    .entries
                    .retain(|key, _| !(key.kind == kind && &key.params == params));
            }
        }
        inner.generation += 1;
        inner.stats.invalidations += 1;
        let removed = before - inner.entries.len();
        debug_log!(
            "Cache invalidated ({:?}, {:?}): {} entries removed, generation {}",
            kind,
            params,
            removed,
            inner.generation
        );
        removed
    }

    /// Remove every entry.
    pub fn clear(&self) -> usize {
        self.invalidate(None, None)
    }

    /// Number of entries, settled or in flight.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Return `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.borrow().stats.clone()
    }

    /// Reset all counters to zero.
    pub fn reset_stats(&self) {
        self.inner.borrow_mut().stats = CacheStats::default();
    }
}

impl<V: Clone + 'static> Default for SuspenseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that can drop cached data so the next read re-fetches.
pub trait Revalidate {
    /// Drop everything this revalidator owns.
    fn revalidate(&self);
}

impl<V: Clone + 'static> Revalidate for SuspenseCache<V> {
    fn revalidate(&self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::future;
    use std::cell::Cell;

    fn counting_fetch(counter: &Rc<Cell<usize>>, value: u32) -> impl FnOnce() -> FetchFuture<u32> {
        let counter = Rc::clone(counter);
        move || {
            counter.set(counter.get() + 1);
            future::ok::<u32, FetchError>(value).boxed_local()
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = SuspenseCache::new();
        let fetches = Rc::new(Cell::new(0));
        let key = CacheKey::new("lessons").param("tab", "all");

        assert_eq!(pollster::block_on(cache.read(key.clone(), counting_fetch(&fetches, 1))), Ok(1));
        assert_eq!(pollster::block_on(cache.read(key.clone(), counting_fetch(&fetches, 2))), Ok(1));

        assert_eq!(fetches.get(), 1);
        let stats = cache.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.coalesced, 0);
        assert!((stats.hit_rate() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_in_flight_reads_coalesce() {
        let cache: SuspenseCache<u32> = SuspenseCache::new();
        let key = CacheKey::new("lessons");
        let (tx, rx) = oneshot::channel::<u32>();

        let first = cache.read(key.clone(), move || {
            async move { rx.await.map_err(|_| FetchError::Cancelled { endpoint: "/lessons".into() }) }
                .boxed_local()
        });
        let second = cache.read(key.clone(), || unreachable!("second fetch issued"));

        assert!(cache.peek(&key).is_none());
        assert!(cache.read_state(key.clone(), || unreachable!()).is_suspended());

        tx.send(7).unwrap();
        assert_eq!(pollster::block_on(second), Ok(7));
        assert_eq!(pollster::block_on(first), Ok(7));
        assert_eq!(cache.stats().coalesced, 2);
        assert_eq!(cache.peek(&key), Some(Ok(7)));
    }

    #[test]
    fn test_failure_stays_cached_until_invalidated() {
        let cache: SuspenseCache<u32> = SuspenseCache::new();
        let key = CacheKey::new("lessons");
        let read = cache.read(key.clone(), || {
            future::err(FetchError::failed("/lessons", "offline")).boxed_local()
        });
        assert!(pollster::block_on(read).is_err());

        match cache.read_state(key.clone(), || unreachable!()) {
            ReadState::Ready(result) => assert!(result.is_err()),
            ReadState::Suspended(_) => panic!("settled failure should not suspend"),
        }

        cache.invalidate(Some("lessons"), None);
        let read = cache.read(key, || future::ok(3).boxed_local());
        assert_eq!(pollster::block_on(read), Ok(3));
    }

    #[test]
    fn test_invalidate_scopes() {
        let cache: SuspenseCache<u32> = SuspenseCache::new();
        let all = CacheKey::new("lessons").param("tab", "all");
        let done = CacheKey::new("lessons").param("tab", "done");
        let user = CacheKey::new("user");
        for key in [&all, &done, &user] {
            let _ = cache.read(key.clone(), || future::ok(0).boxed_local());
        }
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.invalidate(Some("lessons"), Some(done.params())), 1);
        assert!(cache.contains(&all));
        assert!(!cache.contains(&done));

        assert_eq!(cache.invalidate(Some("lessons"), None), 1);
        assert!(cache.contains(&user));

        assert_eq!(cache.invalidate(None, None), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 3);
    }

    #[test]
    fn test_entry_generation_advances() {
        let cache: SuspenseCache<u32> = SuspenseCache::new();
        let key = CacheKey::new("lessons");
        let _ = cache.read(key.clone(), || future::ok(0).boxed_local());
        assert_eq!(cache.entry_generation(&key), Some(0));

        cache.revalidate();
        let _ = cache.read(key.clone(), || future::ok(0).boxed_local());
        assert_eq!(cache.entry_generation(&key), Some(1));
    }

    #[test]
    fn test_invalidate_does_not_cancel_in_flight_read() {
        let cache: SuspenseCache<u32> = SuspenseCache::new();
        let key = CacheKey::new("lessons");
        let (tx, rx) = oneshot::channel::<u32>();
        let read = cache.read(key.clone(), move || {
            async move { rx.await.map_err(|_| FetchError::Cancelled { endpoint: "/lessons".into() }) }
                .boxed_local()
        });

        cache.clear();
        tx.send(5).unwrap();
        assert_eq!(pollster::block_on(read), Ok(5));
        assert!(!cache.contains(&key));
    }

    #[test]
    fn test_key_display() {
        let key = CacheKey::new("lessons").param("tab", "wip").param("search", "async");
        assert_eq!(key.to_string(), "lessons?search=async&tab=wip");
        assert_eq!(CacheKey::new("user").to_string(), "user");
    }
}
