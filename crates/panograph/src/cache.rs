//! Cache abstractions for fetched panorama nodes.
//!
//! This module provides a `Cache` trait and implementations for keeping
//! recently-fetched nodes around, reducing round trips when the vehicle
//! revisits a panorama or a speculative prefetch is re-requested.
//!
//! # Implementations
//!
//! - [`MemoryCache`]: In-memory cache with an entry-count limit
//! - [`NoCache`]: Passthrough implementation that caches nothing

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, RwLock},
};

use crate::error::Result;
use crate::types::{PanoId, PanoramaNode};

/// Future type for cache get operations.
pub type GetFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<PanoramaNode>>> + Send + 'a>>;

/// Future type for cache put/remove operations.
pub type CacheFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A cache for decoded panorama nodes, keyed by node id.
///
/// Coordinate lookups are never cached: the nearest node to a coordinate can
/// change with the search radius, so only id-addressed nodes are stored.
pub trait Cache: Send + Sync {
    /// Get a node from the cache.
    ///
    /// Returns `Ok(Some(node))` if cached, `Ok(None)` if not, or an error if
    /// the cache operation itself failed.
    fn get(&self, id: &PanoId) -> GetFuture<'_>;

    /// Store a node in the cache under its own id.
    fn put(&self, node: PanoramaNode) -> CacheFuture<'_>;

    /// Remove a node from the cache.
    fn remove(&self, id: &PanoId) -> CacheFuture<'_>;

    /// Clear all cached nodes.
    fn clear(&self) -> CacheFuture<'_>;
}

/// A cache that stores nothing (passthrough).
#[derive(Debug, Clone, Default)]
pub struct NoCache;

impl NoCache {
    /// Create a new no-op cache.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Cache for NoCache {
    fn get(&self, _id: &PanoId) -> GetFuture<'_> {
        Box::pin(async { Ok(None) })
    }

    fn put(&self, _node: PanoramaNode) -> CacheFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn remove(&self, _id: &PanoId) -> CacheFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> CacheFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// An in-memory node cache with least-recently-inserted eviction.
///
/// Nodes are small (ids, headings, labels), so the limit is an entry count
/// rather than a byte budget.
#[derive(Debug)]
pub struct MemoryCache {
    inner: Arc<RwLock<MemoryCacheInner>>,
    max_entries: usize,
}

#[derive(Debug, Default)]
struct MemoryCacheInner {
    entries: HashMap<PanoId, PanoramaNode>,
    /// Insertion order for eviction.
    order: Vec<PanoId>,
}

/// Default entry limit; enough for a long drive without unbounded growth.
const DEFAULT_MAX_ENTRIES: usize = 256;

impl MemoryCache {
    /// Create a new memory cache with the default entry limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a new memory cache holding at most `max_entries` nodes.
    #[must_use]
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryCacheInner::default())),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of cached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryCache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            max_entries: self.max_entries,
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, id: &PanoId) -> GetFuture<'_> {
        let inner = self.inner.read().unwrap();
        let result = inner.entries.get(id).cloned();
        Box::pin(async move { Ok(result) })
    }

    fn put(&self, node: PanoramaNode) -> CacheFuture<'_> {
        let mut inner = self.inner.write().unwrap();
        let id = node.id.clone();

        // Replace in place if already present.
        if inner.entries.remove(&id).is_some() {
            inner.order.retain(|k| k != &id);
        }

        // Evict the oldest entries to stay under the limit.
        while inner.entries.len() >= self.max_entries && !inner.order.is_empty() {
            let oldest = inner.order.remove(0);
            inner.entries.remove(&oldest);
        }

        inner.entries.insert(id.clone(), node);
        inner.order.push(id);

        Box::pin(async { Ok(()) })
    }

    fn remove(&self, id: &PanoId) -> CacheFuture<'_> {
        let mut inner = self.inner.write().unwrap();
        if inner.entries.remove(id).is_some() {
            inner.order.retain(|k| k != id);
        }
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> CacheFuture<'_> {
        let mut inner = self.inner.write().unwrap();
        inner.entries.clear();
        inner.order.clear();
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> PanoramaNode {
        PanoramaNode {
            id: PanoId::new(id),
            links: vec![],
            heading: 0.0,
            pitch: 0.0,
            location_name: None,
        }
    }

    #[tokio::test]
    async fn test_no_cache() {
        let cache = NoCache::new();

        cache.put(node("a")).await.unwrap();
        assert!(cache.get(&PanoId::new("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_basic() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());

        cache.put(node("a")).await.unwrap();
        assert_eq!(cache.len(), 1);

        let got = cache.get(&PanoId::new("a")).await.unwrap();
        assert_eq!(got.map(|n| n.id), Some(PanoId::new("a")));
        assert!(cache.get(&PanoId::new("b")).await.unwrap().is_none());

        cache.remove(&PanoId::new("a")).await.unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_memory_cache_eviction() {
        let cache = MemoryCache::with_max_entries(2);

        cache.put(node("a")).await.unwrap();
        cache.put(node("b")).await.unwrap();
        // Inserting a third evicts the oldest ("a").
        cache.put(node("c")).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&PanoId::new("a")).await.unwrap().is_none());
        assert!(cache.get(&PanoId::new("b")).await.unwrap().is_some());
        assert!(cache.get(&PanoId::new("c")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_cache_replace() {
        let cache = MemoryCache::with_max_entries(2);

        cache.put(node("a")).await.unwrap();
        let mut updated = node("a");
        updated.heading = 90.0;
        cache.put(updated).await.unwrap();

        assert_eq!(cache.len(), 1);
        let got = cache.get(&PanoId::new("a")).await.unwrap().unwrap();
        assert_eq!(got.heading, 90.0);
    }

    #[tokio::test]
    async fn test_memory_cache_clear() {
        let cache = MemoryCache::new();
        cache.put(node("a")).await.unwrap();
        cache.put(node("b")).await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.is_empty());
    }
}
