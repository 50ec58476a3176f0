//! LRU cache for compiled policy patterns
//!
//! Compiling a template is the dominant cost of a decision when many
//! candidates share the same patterns. The cache is an optimization only:
//! `pattern::match_any` gives identical answers without it.

use super::pattern::{compile, CompiledPattern, Delimiters};
use crate::error::Result;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cache key for a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    template: String,
    delimiters: Delimiters,
}

/// Thread-safe LRU cache of compiled patterns
pub struct PatternCache {
    cache: Mutex<LruCache<CacheKey, Arc<CompiledPattern>>>,
}

impl PatternCache {
    /// Create a new pattern cache with given capacity
    ///
    /// Returns `None` for a zero capacity, meaning "no cache".
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(PatternCache {
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Get a compiled pattern, compiling and storing it on a miss
    ///
    /// Compile failures are not cached.
    pub fn get_or_compile(
        &self,
        template: &str,
        delimiters: Delimiters,
    ) -> Result<Arc<CompiledPattern>> {
        let key = CacheKey {
            template: template.to_string(),
            delimiters,
        };

        if let Some(hit) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(hit));
        }

        // Compile outside the lock; a concurrent miss just compiles twice
        let compiled = Arc::new(compile(template, delimiters)?);
        self.cache.lock().put(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Same contract as `pattern::match_any`, reusing compiled patterns
    pub fn match_any(
        &self,
        templates: &[String],
        delimiters: Delimiters,
        candidate: &str,
    ) -> Result<bool> {
        for template in templates {
            if self.get_or_compile(template, delimiters)?.is_match(candidate) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Number of cached patterns
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_zero_capacity_is_no_cache() {
        assert!(PatternCache::new(0).is_none());
    }

    #[test]
    fn test_cache_basic() {
        let cache = PatternCache::new(10).unwrap();
        assert!(cache.is_empty());

        let first = cache
            .get_or_compile("article:<[0-9]+>", Delimiters::default())
            .unwrap();
        let second = cache
            .get_or_compile("article:<[0-9]+>", Delimiters::default())
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let cache = PatternCache::new(2).unwrap();

        let a = cache.get_or_compile("a", Delimiters::default()).unwrap();
        cache.get_or_compile("b", Delimiters::default()).unwrap();
        cache.get_or_compile("c", Delimiters::default()).unwrap(); // Should evict "a"

        assert_eq!(cache.len(), 2);
        let a_again = cache.get_or_compile("a", Delimiters::default()).unwrap();
        assert!(!Arc::ptr_eq(&a, &a_again));
    }

    #[test]
    fn test_cache_keys_include_delimiters() {
        let cache = PatternCache::new(10).unwrap();

        let angle = cache
            .get_or_compile("x{1}", Delimiters::default())
            .unwrap();
        let brace = cache
            .get_or_compile("x{1}", Delimiters::new('{', '}'))
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(angle.is_match("x{1}"));
        assert!(brace.is_match("x1"));
    }

    #[test]
    fn test_compile_errors_not_cached() {
        let cache = PatternCache::new(10).unwrap();
        assert!(cache.get_or_compile("<[", Delimiters::default()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_match_any_agrees_with_uncached() {
        let cache = PatternCache::new(4).unwrap();
        let list = templates(&["edit", "view:<.*>", "delete"]);

        for candidate in ["edit", "view:", "view:all", "Delete", "create"] {
            let cached = cache
                .match_any(&list, Delimiters::default(), candidate)
                .unwrap();
            let uncached =
                super::super::pattern::match_any(&list, Delimiters::default(), candidate)
                    .unwrap();
            assert_eq!(cached, uncached, "candidate {candidate}");
        }
    }

    #[test]
    fn test_cache_clear() {
        let cache = PatternCache::new(10).unwrap();

        cache.get_or_compile("read", Delimiters::default()).unwrap();
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 10);
    }
}
