//! Injectable TTL cache.
//!
//! Built once at startup and handed to whoever needs it; there is no
//! process-global instance. Entries expire after the single configured TTL.
//! A zero TTL makes the cache a no-op. Expired entries are swept on insert and
//! the entry count is capped, oldest expiry evicted first.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Time source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Entry cap used unless [`TtlCache::with_max_entries`] says otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

pub struct TtlCache<K, V> {
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, (V, Instant)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Returns the value and its expiry, if present and not yet expired.
    pub fn get_with_expiry(&self, key: &K) -> Option<(V, Instant)> {
        if !self.is_enabled() {
            return None;
        }
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > now => Some((value.clone(), *expires_at)),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_with_expiry(key).map(|(value, _)| value)
    }

    pub fn insert(&self, key: K, value: V) {
        if !self.is_enabled() {
            return;
        }
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        entries.retain(|_, (_, expires_at)| *expires_at > now);

        if !entries.contains_key(&key) {
            while entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, (_, expires_at))| *expires_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => entries.remove(&k),
                    None => break,
                };
            }
        }
        entries.insert(key, (value, now + self.ttl));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<String, u32> = TtlCache::with_clock(Duration::from_secs(10), clock.clone());

        cache.insert("a".into(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        clock.advance(Duration::from_secs(9));
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_disables() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::ZERO);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn expiry_is_reported() {
        let clock = Arc::new(ManualClock::new());
        let start = clock.now();
        let cache: TtlCache<&str, u32> = TtlCache::with_clock(Duration::from_secs(5), clock.clone());
        cache.insert("a", 7);
        let (value, expires_at) = cache.get_with_expiry(&"a").unwrap();
        assert_eq!(value, 7);
        assert_eq!(expires_at, start + Duration::from_secs(5));
    }

    #[test]
    fn insert_sweeps_expired_entries() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<String, u32> = TtlCache::with_clock(Duration::from_secs(30), clock.clone());
        for i in 0..1000 {
            cache.insert(format!("p{i}/"), i);
        }
        assert_eq!(cache.len(), 1000);

        clock.advance(Duration::from_secs(3600));
        cache.insert("fresh/".into(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"fresh/".to_string()), Some(1));
    }

    #[test]
    fn entry_count_is_capped() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<&str, u32> =
            TtlCache::with_clock(Duration::from_secs(60), clock.clone()).with_max_entries(2);
        cache.insert("a", 1);
        clock.advance(Duration::from_secs(1));
        cache.insert("b", 2);
        clock.advance(Duration::from_secs(1));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"c"), Some(3));

        // Refreshing an existing key never evicts.
        cache.insert("b", 20);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"c"), Some(3));
    }
}
