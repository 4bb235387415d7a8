//! Eviction Module
//!
//! Victim selection for capacity-driven eviction under LRU, FIFO and LFU.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::CacheEntry;
use crate::error::CacheError;

// == Eviction Policy ==
/// Rule used to choose which entry leaves the cache when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least recently accessed entry goes first
    #[default]
    Lru,
    /// Oldest inserted entry goes first
    Fifo,
    /// Least frequently accessed entry goes first, oldest insertion on ties
    Lfu,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "LRU",
            EvictionPolicy::Fifo => "FIFO",
            EvictionPolicy::Lfu => "LFU",
        }
    }

    /// Ranks an entry; the smallest rank is evicted first.
    fn rank(&self, entry: &CacheEntry) -> (u64, u64) {
        match self {
            EvictionPolicy::Lru => (entry.last_access(), 0),
            EvictionPolicy::Fifo => (entry.inserted_at, 0),
            EvictionPolicy::Lfu => (entry.access_count(), entry.inserted_at),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LRU" => Ok(EvictionPolicy::Lru),
            "FIFO" => Ok(EvictionPolicy::Fifo),
            "LFU" => Ok(EvictionPolicy::Lfu),
            other => Err(CacheError::Config(format!(
                "invalid cache strategy: {}",
                other
            ))),
        }
    }
}

// == Access Clock ==
/// Monotonic logical clock ordering inserts and accesses.
///
/// Wall-clock time is too coarse to order operations issued in the same
/// instant, so recency and insertion order use this counter instead.
#[derive(Debug, Default)]
pub struct AccessClock {
    now: AtomicU64,
}

impl AccessClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock and returns the new tick.
    pub fn tick(&self) -> u64 {
        self.now.fetch_add(1, Ordering::Relaxed) + 1
    }
}

// == Select Victim ==
/// Picks the entry to evict under `policy`.
///
/// Equal ranks fall back to the lexicographically smallest key. Returns None
/// only when there are no entries.
pub fn select_victim<'a, I>(policy: EvictionPolicy, entries: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a String, &'a CacheEntry)>,
{
    entries
        .into_iter()
        .min_by(|(ka, a), (kb, b)| policy.rank(a).cmp(&policy.rank(b)).then_with(|| ka.cmp(kb)))
        .map(|(key, _)| key.as_str())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Value;
    use std::collections::HashMap;

    fn entries(specs: &[(&str, u64)]) -> HashMap<String, CacheEntry> {
        specs
            .iter()
            .map(|(key, tick)| (key.to_string(), CacheEntry::new(Value::from("v"), None, *tick)))
            .collect()
    }

    #[test]
    fn test_policy_from_str_case_insensitive() {
        assert_eq!("lru".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert_eq!("Fifo".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Fifo);
        assert_eq!(" LFU ".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lfu);
        assert!("random".parse::<EvictionPolicy>().is_err());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = AccessClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(b > a);
    }

    #[test]
    fn test_select_victim_empty() {
        let map: HashMap<String, CacheEntry> = HashMap::new();
        assert_eq!(select_victim(EvictionPolicy::Lru, &map), None);
    }

    #[test]
    fn test_fifo_picks_oldest_insert() {
        let map = entries(&[("b", 2), ("a", 1), ("c", 3)]);
        // Touching does not change FIFO order
        map["a"].touch(10);
        assert_eq!(select_victim(EvictionPolicy::Fifo, &map), Some("a"));
    }

    #[test]
    fn test_lru_picks_least_recent_access() {
        let map = entries(&[("a", 1), ("b", 2), ("c", 3)]);
        map["a"].touch(4);
        assert_eq!(select_victim(EvictionPolicy::Lru, &map), Some("b"));
    }

    #[test]
    fn test_lfu_picks_least_frequent_then_oldest() {
        let map = entries(&[("a", 1), ("b", 2), ("c", 3)]);
        map["a"].touch(4);
        // b and c share the lowest count; b was inserted first
        assert_eq!(select_victim(EvictionPolicy::Lfu, &map), Some("b"));
    }

    #[test]
    fn test_ties_break_on_smallest_key() {
        let map = entries(&[("zeta", 1), ("alpha", 1), ("mid", 1)]);
        assert_eq!(select_victim(EvictionPolicy::Lru, &map), Some("alpha"));
        assert_eq!(select_victim(EvictionPolicy::Fifo, &map), Some("alpha"));
        assert_eq!(select_victim(EvictionPolicy::Lfu, &map), Some("alpha"));
    }
}
