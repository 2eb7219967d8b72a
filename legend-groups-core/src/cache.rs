//! In-process caches in front of the store.
//!
//! - [`PrefixCache`]: resolved display prefix per player, bounded LRU. An
//!   entry remembers the earliest expiry among the memberships it was
//!   computed from and stops answering at that instant.
//! - [`LanguageCache`]: chosen language code per player, bounded LRU.
//! - [`SignRegistry`]: registered sign locations, loaded once and kept in
//!   step with add/remove.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};

use crate::types::{PlayerId, SignLocation};

fn capacity(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}

// ---------------------------------------------------------------------------
// Prefix cache
// ---------------------------------------------------------------------------

/// A cached prefix and how long it stays correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPrefix {
    /// Prefix with `&` color codes.
    pub prefix: String,
    /// Earliest membership expiry; `None` if every membership is permanent.
    pub valid_until: Option<DateTime<Utc>>,
}

impl CachedPrefix {
    /// Whether the entry may still be served at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map_or(true, |until| now < until)
    }
}

/// Bounded player → prefix cache.
///
/// Every invalidation bumps a generation counter. A lookup that reads the
/// store reads the generation first and writes back with
/// [`insert_if_current`](Self::insert_if_current), so a result computed
/// before a concurrent join, leave, edit or delete is never cached.
#[derive(Debug)]
pub struct PrefixCache {
    inner: Mutex<PrefixEntries>,
}

#[derive(Debug)]
struct PrefixEntries {
    entries: LruCache<PlayerId, CachedPrefix>,
    generation: u64,
}

impl PrefixCache {
    /// Create a cache holding at most `max_entries` players (minimum 1).
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(PrefixEntries {
                entries: LruCache::new(capacity(max_entries)),
                generation: 0,
            }),
        }
    }

    /// The cached prefix, if present and still valid at `now`. Stale entries
    /// are dropped.
    pub fn get(&self, player: &PlayerId, now: DateTime<Utc>) -> Option<String> {
        let mut cache = self.inner.lock();
        let fresh = cache
            .entries
            .get(player)
            .map(|entry| entry.is_valid_at(now).then(|| entry.prefix.clone()))?;
        if fresh.is_none() {
            cache.entries.pop(player);
        }
        fresh
    }

    /// Current invalidation generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Store a prefix unconditionally.
    pub fn insert(&self, player: PlayerId, entry: CachedPrefix) {
        self.inner.lock().entries.put(player, entry);
    }

    /// Store a prefix computed after reading `generation`, unless an
    /// invalidation happened since. Returns whether the entry was stored.
    pub fn insert_if_current(&self, player: PlayerId, generation: u64, entry: CachedPrefix) -> bool {
        let mut cache = self.inner.lock();
        if cache.generation != generation {
            return false;
        }
        cache.entries.put(player, entry);
        true
    }

    /// Drop one player's entry.
    pub fn invalidate(&self, player: &PlayerId) {
        let mut cache = self.inner.lock();
        cache.generation = cache.generation.wrapping_add(1);
        cache.entries.pop(player);
    }

    /// Drop every entry (after a group edit or delete).
    pub fn clear(&self) {
        let mut cache = self.inner.lock();
        cache.generation = cache.generation.wrapping_add(1);
        cache.entries.clear();
    }

    /// Number of cached players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Language cache
// ---------------------------------------------------------------------------

/// Bounded player → language code cache.
#[derive(Debug)]
pub struct LanguageCache {
    inner: Mutex<LruCache<PlayerId, String>>,
}

impl LanguageCache {
    /// Create a cache holding at most `max_entries` players (minimum 1).
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity(max_entries))),
        }
    }

    /// Cached code for `player`.
    pub fn get(&self, player: &PlayerId) -> Option<String> {
        self.inner.lock().get(player).cloned()
    }

    /// Remember `player`'s code.
    pub fn insert(&self, player: PlayerId, code: String) {
        self.inner.lock().put(player, code);
    }

    /// Forget `player`'s code.
    pub fn invalidate(&self, player: &PlayerId) {
        self.inner.lock().pop(player);
    }
}

// ---------------------------------------------------------------------------
// Sign registry
// ---------------------------------------------------------------------------

/// Registered sign locations, empty until first loaded from the store.
///
/// Adds and removes that arrive before the first load are queued and
/// replayed on top of the loaded list, so a change committed while the
/// load was reading the store is not lost.
#[derive(Debug, Default)]
pub struct SignRegistry {
    inner: RwLock<SignState>,
}

#[derive(Debug, Default)]
struct SignState {
    loaded: Option<HashSet<SignLocation>>,
    /// `(location, added)` in arrival order.
    pending: Vec<(SignLocation, bool)>,
}

impl SignState {
    fn apply(&mut self, location: SignLocation, added: bool) {
        match self.loaded.as_mut() {
            Some(set) if added => {
                set.insert(location);
            }
            Some(set) => {
                set.remove(&location);
            }
            None => self.pending.push((location, added)),
        }
    }
}

impl SignRegistry {
    /// Create an unloaded registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the registry has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.inner.read().loaded.is_some()
    }

    /// Fill the registry from `signs` plus any queued changes. A registry
    /// that is already loaded is left alone. Returns whether this call
    /// loaded it.
    pub fn load(&self, signs: impl IntoIterator<Item = SignLocation>) -> bool {
        let mut state = self.inner.write();
        if state.loaded.is_some() {
            return false;
        }
        state.loaded = Some(signs.into_iter().collect());
        for (location, added) in std::mem::take(&mut state.pending) {
            state.apply(location, added);
        }
        true
    }

    /// All signs, or `None` if not loaded yet.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<SignLocation>> {
        self.inner.read().loaded.as_ref().map(|set| set.iter().cloned().collect())
    }

    /// Whether `location` is registered. `None` if not loaded yet.
    #[must_use]
    pub fn contains(&self, location: &SignLocation) -> Option<bool> {
        self.inner.read().loaded.as_ref().map(|set| set.contains(location))
    }

    /// Record an added sign.
    pub fn insert(&self, location: SignLocation) {
        self.inner.write().apply(location, true);
    }

    /// Record a removed sign.
    pub fn remove(&self, location: &SignLocation) {
        self.inner.write().apply(location.clone(), false);
    }
}
