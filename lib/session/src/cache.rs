//! Read-through cache with per-entry lifetimes and tag-based eviction.
//!
//! Each key owns a [`OnceCell`], so concurrent readers of a missing key wait
//! on a single computation instead of racing to fill it. A computation that
//! fails leaves the key empty for the next caller. Tags let unrelated code
//! evict every entry derived from, say, one session or one user without
//! knowing the keys.
//!
//! Expired entries are dropped by [`TaggedCache::purge_expired`] and also
//! swept opportunistically whenever the number of keys doubles, so a flood
//! of short-lived entries cannot outgrow the live set between purges.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

/// A freshly computed value together with how long and under which tags to
/// keep it.
#[derive(Debug, Clone)]
pub struct Cached<V> {
    /// The value handed back to every reader until the entry expires.
    pub value: V,
    /// How long the entry stays live, before any cache-wide cap.
    pub ttl: Duration,
    /// Tags for [`TaggedCache::invalidate_tag`].
    pub tags: Vec<String>,
}

impl<V> Cached<V> {
    /// An untagged entry living for `ttl`.
    #[must_use]
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            ttl,
            tags: Vec::new(),
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
    tags: Vec<String>,
}

type Slot<V> = Arc<OnceCell<Entry<V>>>;

/// Key count below which inserts never trigger a sweep.
const MIN_SWEEP_THRESHOLD: usize = 64;

struct Inner<V> {
    slots: HashMap<String, Slot<V>>,
    tags: HashMap<String, HashSet<String>>,
    sweep_threshold: usize,
}

impl<V> Inner<V> {
    /// Removes expired entries and empty slots nobody is computing.
    fn sweep(&mut self, now: Instant) -> usize {
        let dead: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| match slot.get() {
                Some(entry) => entry.expires_at <= now,
                None => Arc::strong_count(slot) == 1,
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &dead {
            self.remove_key(key);
        }
        self.sweep_threshold = (self.slots.len() * 2).max(MIN_SWEEP_THRESHOLD);
        dead.len()
    }

    /// Removes `key` only if it still maps to `slot`.
    fn remove_if_current(&mut self, key: &str, slot: &Slot<V>) {
        if self
            .slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            self.remove_key(key);
        }
    }

    fn remove_key(&mut self, key: &str) -> bool {
        let Some(slot) = self.slots.remove(key) else {
            return false;
        };
        if let Some(entry) = slot.get() {
            for tag in &entry.tags {
                if let Some(keys) = self.tags.get_mut(tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tags.remove(tag);
                    }
                }
            }
        }
        true
    }
}

/// Keyed cache of `V` values.
pub struct TaggedCache<V> {
    inner: Mutex<Inner<V>>,
    max_ttl: Option<Duration>,
}

impl<V> Default for TaggedCache<V> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<V> TaggedCache<V> {
    /// Creates an empty cache. When `max_ttl` is set, no entry lives longer
    /// than it regardless of the lifetime its computation asked for.
    #[must_use]
    pub fn new(max_ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: HashMap::new(),
                tags: HashMap::new(),
                sweep_threshold: MIN_SWEEP_THRESHOLD,
            }),
            max_ttl,
        }
    }

    /// Evicts one key. Returns whether it was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.inner.lock().await.remove_key(key)
    }

    /// Evicts every key carrying `tag`, returning how many were removed.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let Some(keys) = inner.tags.remove(tag) else {
            return 0;
        };
        let mut removed = 0;
        for key in &keys {
            if inner.remove_key(key) {
                removed += 1;
            }
        }
        removed
    }

    /// Drops entries whose lifetime has passed and abandoned empty slots,
    /// returning how many keys were removed.
    pub async fn purge_expired(&self) -> usize {
        self.inner.lock().await.sweep(Instant::now())
    }

    /// Number of keys currently held, including ones still being computed.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V: Clone> TaggedCache<V> {
    /// Returns the live value for `key`, computing and storing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the computation's error unchanged; nothing is cached then.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Cached<V>, E>>,
    {
        let slot = {
            let mut inner = self.inner.lock().await;
            let now = Instant::now();
            match inner.slots.get(key) {
                Some(slot) if slot.get().is_none_or(|entry| entry.expires_at > now) => {
                    slot.clone()
                }
                _ => {
                    inner.remove_key(key);
                    if inner.slots.len() >= inner.sweep_threshold {
                        inner.sweep(now);
                    }
                    let slot: Slot<V> = Arc::new(OnceCell::new());
                    inner.slots.insert(key.to_string(), slot.clone());
                    slot
                }
            }
        };

        let mut computed = false;
        let result = slot
            .get_or_try_init(|| async {
                computed = true;
                let fresh = compute().await?;
                let ttl = match self.max_ttl {
                    Some(cap) => fresh.ttl.min(cap),
                    None => fresh.ttl,
                };
                Ok::<_, E>(Entry {
                    value: fresh.value,
                    expires_at: Instant::now() + ttl,
                    tags: fresh.tags,
                })
            })
            .await;
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                if !slot.initialized() {
                    self.inner.lock().await.remove_if_current(key, &slot);
                }
                return Err(e);
            }
        };

        if computed {
            let mut inner = self.inner.lock().await;
            // Skip tagging when an invalidation already dropped this slot.
            let still_current = inner
                .slots
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &slot));
            if still_current {
                for tag in &entry.tags {
                    inner
                        .tags
                        .entry(tag.clone())
                        .or_default()
                        .insert(key.to_string());
                }
            }
        }

        Ok(entry.value.clone())
    }
}
