use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::media::{FrameDecoder, MediaProbe, PreviewFrame, ProbedMedia};
use crate::time::seconds_to_micros;

/// Default number of cached frames.
pub const DEFAULT_CACHE_CAPACITY: usize = 96;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PreviewCacheKey {
    path: PathBuf,
    source_micros: i64,
}

/// LRU cache for decoded frames keyed by path and source time.
///
/// Source times are compared at microsecond precision, so neighbouring
/// frames never share an entry at any frame rate.
///
/// # Example
/// ```
/// use std::sync::Arc;
///
/// use engine::PreviewFrame;
/// use engine::cache::PreviewFrameCache;
///
/// let mut cache = PreviewFrameCache::new(8);
/// cache.insert(
///     "demo.mp4",
///     1.5,
///     PreviewFrame {
///         width: 2,
///         height: 2,
///         bytes: Arc::from(vec![0; 16]),
///     },
/// );
///
/// assert!(cache.get("demo.mp4", 1.5).is_some());
/// assert!(cache.get("demo.mp4", 1.5 + 1.0 / 60.0).is_none());
/// ```
#[derive(Debug)]
pub struct PreviewFrameCache {
    capacity: usize,
    entries: HashMap<PreviewCacheKey, PreviewFrame>,
    lru_order: VecDeque<PreviewCacheKey>,
}

impl PreviewFrameCache {
    /// Creates a preview cache.
    ///
    /// `capacity` must be positive.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "preview cache capacity must be positive");
        Self {
            capacity,
            entries: HashMap::new(),
            lru_order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns one cached frame and marks it as recently used.
    pub fn get(&mut self, path: impl AsRef<Path>, source_seconds: f64) -> Option<PreviewFrame> {
        let key = self.make_key(path.as_ref(), source_seconds);
        let frame = self.entries.get(&key)?.clone();
        self.touch(&key);
        Some(frame)
    }

    /// Inserts or updates one cached frame.
    pub fn insert(&mut self, path: impl AsRef<Path>, source_seconds: f64, frame: PreviewFrame) {
        let key = self.make_key(path.as_ref(), source_seconds);
        self.entries.insert(key.clone(), frame);
        self.touch(&key);
        self.evict_if_needed();
    }

    fn make_key(&self, path: &Path, source_seconds: f64) -> PreviewCacheKey {
        PreviewCacheKey {
            path: path.to_path_buf(),
            source_micros: seconds_to_micros(source_seconds).max(0),
        }
    }

    fn touch(&mut self, key: &PreviewCacheKey) {
        if let Some(index) = self.lru_order.iter().position(|existing| existing == key) {
            let _ = self.lru_order.remove(index);
        }
        self.lru_order.push_back(key.clone());
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.lru_order.pop_front() else {
                break;
            };
            let _ = self.entries.remove(&oldest);
        }
    }
}

impl Default for PreviewFrameCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Frame decoder that serves repeated requests from a [`PreviewFrameCache`].
///
/// Failed decodes are not cached. Probing is passed through.
#[derive(Debug)]
pub struct CachedDecoder<D> {
    inner: D,
    cache: Mutex<PreviewFrameCache>,
}

impl<D> CachedDecoder<D> {
    pub fn new(inner: D, cache: PreviewFrameCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
        }
    }
}

impl<D> FrameDecoder for CachedDecoder<D>
where
    D: FrameDecoder + Sync,
{
    async fn decode_frame(&self, path: &Path, at_seconds: f64) -> Result<PreviewFrame> {
        if let Some(frame) = self.cache.lock().await.get(path, at_seconds) {
            debug!(at_seconds, path = ?path, "preview cache hit");
            return Ok(frame);
        }

        debug!(at_seconds, path = ?path, "preview cache miss");
        let frame = self.inner.decode_frame(path, at_seconds).await?;
        self.cache
            .lock()
            .await
            .insert(path, at_seconds, frame.clone());
        Ok(frame)
    }
}

impl<D> MediaProbe for CachedDecoder<D>
where
    D: MediaProbe + Sync,
{
    async fn probe(&self, path: &Path) -> Result<ProbedMedia> {
        self.inner.probe(path).await
    }
}
