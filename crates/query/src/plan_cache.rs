//! Descriptor cache for avoiding repeated parsing.
//!
//! Parsing is deterministic, so a query string always compiles to an equal
//! descriptor while the schema is unchanged. The cache keeps the most
//! recently used compiled descriptors keyed by their source text.

use crate::ast::QueryDescriptor;
use crate::error::ParseError;
use crate::parser::parse;
use hashbrown::HashMap;
use rivulet_core::schema::SchemaRegistry;
use std::sync::Arc;
use tracing::trace;

struct CacheEntry {
    descriptor: Arc<QueryDescriptor>,
    last_access: u64,
}

/// LRU cache of compiled descriptors keyed by query text.
pub struct QueryCache {
    cache: HashMap<String, CacheEntry>,
    /// Maximum number of entries; 0 disables caching.
    max_size: usize,
    /// Global access counter for LRU tracking.
    access_counter: u64,
    hits: u64,
    misses: u64,
}

impl QueryCache {
    /// Creates a cache with the given maximum size.
    pub fn new(max_size: usize) -> Self {
        Self {
            cache: HashMap::new(),
            max_size,
            access_counter: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Creates a cache with the default size (64 entries).
    pub fn default_size() -> Self {
        Self::new(64)
    }

    /// Gets a cached descriptor.
    pub fn get(&mut self, query: &str) -> Option<Arc<QueryDescriptor>> {
        self.access_counter += 1;
        match self.cache.get_mut(query) {
            Some(entry) => {
                entry.last_access = self.access_counter;
                self.hits += 1;
                Some(entry.descriptor.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts a descriptor, evicting the least recently used entry when full.
    pub fn insert(&mut self, query: &str, descriptor: Arc<QueryDescriptor>) {
        if self.max_size == 0 {
            return;
        }
        if self.cache.len() >= self.max_size && !self.cache.contains_key(query) {
            self.evict_lru();
        }
        self.access_counter += 1;
        self.cache.insert(
            query.to_string(),
            CacheEntry {
                descriptor,
                last_access: self.access_counter,
            },
        );
    }

    /// Returns the cached descriptor for `query`, parsing it on a miss.
    ///
    /// Parse errors are returned and not cached.
    pub fn compile(
        &mut self,
        query: &str,
        registry: &SchemaRegistry,
    ) -> Result<Arc<QueryDescriptor>, ParseError> {
        if let Some(descriptor) = self.get(query) {
            return Ok(descriptor);
        }
        let descriptor = Arc::new(parse(query, registry)?);
        trace!(query, misses = self.misses, "compiled descriptor");
        self.insert(query, descriptor.clone());
        Ok(descriptor)
    }

    fn evict_lru(&mut self) {
        let lru_key = self
            .cache
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(k, _)| k.clone());

        if let Some(key) = lru_key {
            trace!(query = %key, "evicting cached descriptor");
            self.cache.remove(&key);
        }
    }

    /// Clears the cache and its statistics.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Returns the number of cached descriptors.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Returns cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::default_size()
    }
}
