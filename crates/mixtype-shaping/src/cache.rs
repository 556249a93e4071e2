//! LRU cache of shaped paragraphs
//!
//! Keyed by everything that changes the output: the text, the resolved base
//! face, the pixel size and the language and feature settings. Values are
//! the finished runs, which are immutable and cheap to clone.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use mixtype_core::{FaceId, GlyphRun};

/// Identifies one `shape` call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapingCacheKey {
    pub text: String,
    pub face: FaceId,
    /// Pixel size as raw bits, so the key can be hashed
    pub size_bits: u32,
    pub language: Option<String>,
    pub features: Vec<(String, u32)>,
}

impl ShapingCacheKey {
    pub fn new(
        text: &str,
        face: FaceId,
        size: f32,
        language: Option<&str>,
        features: &[(String, u32)],
    ) -> Self {
        Self {
            text: text.to_string(),
            face,
            size_bits: size.to_bits(),
            language: language.map(str::to_string),
            features: features.to_vec(),
        }
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe LRU of shaping results
pub struct ShapingCache {
    entries: Mutex<LruCache<ShapingCacheKey, Vec<GlyphRun>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ShapingCache {
    /// `None` when `capacity` is zero, which means caching is off
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn get(&self, key: &ShapingCacheKey) -> Option<Vec<GlyphRun>> {
        let found = self.entries.lock().get(key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, key: ShapingCacheKey, runs: Vec<GlyphRun>) {
        self.entries.lock().put(key, runs);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().len(),
        }
    }
}
