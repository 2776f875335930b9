//! Hierarchical, pattern-invalidatable LRU cache.
//!
//! Keys are `:`-delimited strings (`pod:{pod}:stream:{path}:meta`). Besides
//! the flat `hashlink::LruCache` used for O(1) point lookups (the same
//! crate and data structure the teacher uses for its own file-data cache,
//! see `cache::file_data`), each pool keeps a parallel prefix tree over the
//! `:`-segments so that `<prefix>:*` can be invalidated in time proportional
//! to the number of keys removed rather than the size of the pool.

pub mod pools;
mod tree;

use std::time::{Duration, Instant};

use hashlink::LruCache;
use parking_lot::Mutex;
use tree::TreeNode;

pub trait CacheValue: Clone + Send + Sync + 'static {
    /// Admission-policy size estimate: UTF-16 length * 2 for strings, 8 for
    /// numbers/dates, raw byte length for buffers, JSON-serialized length *
    /// 2 for objects (spec's four size classes).
    fn estimated_size(&self) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub current_size: usize,
    pub entry_count: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid cache pattern: {0}")]
    InvalidPattern(String),
}

enum Pattern {
    Literal(String),
    Prefix(Vec<String>),
}

fn classify_pattern(pattern: &str) -> Result<Pattern, PatternError> {
    let star_count = pattern.matches('*').count();
    if star_count == 0 {
        return Ok(Pattern::Literal(pattern.to_string()));
    }
    if star_count > 1 || !pattern.ends_with(":*") {
        return Err(PatternError::InvalidPattern(pattern.to_string()));
    }
    let prefix = &pattern[..pattern.len() - 2];
    if prefix.is_empty() || prefix.contains('*') {
        return Err(PatternError::InvalidPattern(pattern.to_string()));
    }
    Ok(Pattern::Prefix(prefix.split(':').map(String::from).collect()))
}

struct Entry<V> {
    value: V,
    size: usize,
    inserted_at: Instant,
}

struct Inner<V> {
    lru: LruCache<String, Entry<V>>,
    tree: TreeNode,
    stats: CacheStats,
}

pub struct HierarchicalCache<V: CacheValue> {
    inner: Mutex<Inner<V>>,
    max_entries: usize,
    max_value_bytes: usize,
    ttl: Duration,
}

impl<V: CacheValue> HierarchicalCache<V> {
    pub fn new(max_entries: usize, max_value_bytes: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                lru: LruCache::new_unbounded(),
                tree: TreeNode::default(),
                stats: CacheStats::default(),
            }),
            max_entries,
            max_value_bytes,
            ttl,
        }
    }

    /// Fetches a value, moving it to the head of the LRU list. Expired
    /// entries are evicted on access and counted as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.lru.get(key) {
            if entry.inserted_at.elapsed() > self.ttl {
                let removed = inner.lru.remove(key);
                if let Some(entry) = removed {
                    inner.stats.current_size -= entry.size;
                }
                inner.tree.remove(&segments(key));
                inner.stats.misses += 1;
                return None;
            }
            let value = entry.value.clone();
            inner.stats.hits += 1;
            return Some(value);
        }
        inner.stats.misses += 1;
        None
    }

    /// Attempts to admit `value` under `key`. Returns `false` (no-op) if
    /// the value violates the pool's size cap.
    pub fn set(&self, key: &str, value: V) -> bool {
        let size = value.estimated_size();
        if size > self.max_value_bytes {
            return false;
        }
        let mut inner = self.inner.lock();
        if let Some(old) = inner.lru.remove(key) {
            inner.stats.current_size -= old.size;
        } else {
            inner.tree.insert(&segments(key), key.to_string());
        }
        inner.stats.current_size += size;
        inner.lru.insert(
            key.to_string(),
            Entry {
                value,
                size,
                inserted_at: Instant::now(),
            },
        );
        while inner.lru.len() > self.max_entries {
            if let Some((evicted_key, entry)) = inner.lru.remove_lru() {
                inner.stats.current_size -= entry.size;
                inner.stats.evictions += 1;
                inner.tree.remove(&segments(&evicted_key));
            } else {
                break;
            }
        }
        inner.stats.entry_count = inner.lru.len();
        true
    }

    /// Removes every key whose segment-sequence starts with `pattern`'s
    /// prefix (for a `<prefix>:*` pattern), or the single literal key (for
    /// a pattern with no wildcard). Returns the number of keys removed.
    pub fn invalidate(&self, pattern: &str) -> Result<usize, PatternError> {
        let parsed = classify_pattern(pattern)?;
        let mut inner = self.inner.lock();
        let removed_keys = match parsed {
            Pattern::Literal(key) => {
                if inner.tree.remove(&segments(&key)) {
                    vec![key]
                } else {
                    vec![]
                }
            }
            Pattern::Prefix(prefix) => inner.tree.remove_subtree(&prefix),
        };
        for key in &removed_keys {
            if let Some(entry) = inner.lru.remove(key) {
                inner.stats.current_size -= entry.size;
            }
        }
        inner.stats.entry_count = inner.lru.len();
        Ok(removed_keys.len())
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats;
        stats.entry_count = inner.lru.len();
        stats
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.tree = TreeNode::default();
        inner.stats = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn segments(key: &str) -> Vec<String> {
    key.split(':').map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Str(String);
    impl CacheValue for Str {
        fn estimated_size(&self) -> usize {
            self.0.len() * 2
        }
    }

    fn cache() -> HierarchicalCache<Str> {
        HierarchicalCache::new(10, 1024, Duration::from_secs(60))
    }

    #[test]
    fn set_then_get_hits() {
        let c = cache();
        assert!(c.set("pod:alice:meta", Str("v".into())));
        assert_eq!(c.get("pod:alice:meta").map(|s| s.0), Some("v".to_string()));
        assert_eq!(c.stats().hits, 1);
    }

    #[test]
    fn miss_increments_counter() {
        let c = cache();
        assert!(c.get("missing").is_none());
        assert_eq!(c.stats().misses, 1);
    }

    #[test]
    fn admission_rejects_oversized_value() {
        let c = HierarchicalCache::<Str>::new(10, 4, Duration::from_secs(60));
        assert!(!c.set("k", Str("too long".into())));
        assert!(c.get("k").is_none());
    }

    #[test]
    fn lru_evicts_oldest_entry_only() {
        let c = HierarchicalCache::<Str>::new(2, 1024, Duration::from_secs(60));
        c.set("a", Str("1".into()));
        c.set("b", Str("2".into()));
        c.set("c", Str("3".into()));
        assert!(c.get("a").is_none());
        assert!(c.get("b").is_some());
        assert!(c.get("c").is_some());
        assert_eq!(c.stats().evictions, 1);
    }

    #[test]
    fn prefix_invalidation_removes_only_matching_subtree() {
        let c = cache();
        c.set("pod:alice:stream:notes:record:a:data", Str("1".into()));
        c.set("pod:alice:stream:notes:record:b:data", Str("2".into()));
        c.set("pod:alice:stream:other:record:c:data", Str("3".into()));

        let removed = c.invalidate("pod:alice:stream:notes:*").unwrap();
        assert_eq!(removed, 2);
        assert!(c.get("pod:alice:stream:notes:record:a:data").is_none());
        assert!(c.get("pod:alice:stream:notes:record:b:data").is_none());
        assert!(c.get("pod:alice:stream:other:record:c:data").is_some());
    }

    #[test]
    fn rejects_malformed_patterns() {
        let c = cache();
        assert!(c.invalidate("pod:*:stream:*").is_err());
        assert!(c.invalidate("pod:*:meta").is_err());
    }

    #[test]
    fn literal_key_pattern_deletes_single_entry() {
        let c = cache();
        c.set("pod:alice:meta", Str("v".into()));
        let removed = c.invalidate("pod:alice:meta").unwrap();
        assert_eq!(removed, 1);
        assert!(c.get("pod:alice:meta").is_none());
    }
}
