//! Chapter cache with coalesced fetching
//!
//! Chapters are cached for the life of the coordinator (114 entries at most,
//! never evicted). Concurrent requests for the same chapter share one
//! underlying fetch; the pending map only holds a weak handle to it, so a
//! fetch nobody awaits any more is dropped and its request aborted.

use crate::content::{Chapter, ChapterNumber};
use crate::error::NoorError;
use crate::fetcher::ChapterSource;
use futures_util::future::{BoxFuture, Shared, WeakShared};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default bound on a single chapter fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(6000);

type ChapterResult = Result<Arc<Chapter>, NoorError>;
type PendingFetch = Shared<BoxFuture<'static, ChapterResult>>;

#[derive(Default)]
struct CacheMaps {
    chapters: HashMap<ChapterNumber, Arc<Chapter>>,
    pending: HashMap<ChapterNumber, WeakShared<BoxFuture<'static, ChapterResult>>>,
    // Bumped by `clear()`; fetches started under an older epoch leave the maps alone.
    epoch: u64,
}

fn lock(maps: &Mutex<CacheMaps>) -> MutexGuard<'_, CacheMaps> {
    maps.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ChapterCoordinator {
    source: Arc<dyn ChapterSource>,
    maps: Arc<Mutex<CacheMaps>>,
    timeout: Duration,
}

impl ChapterCoordinator {
    pub fn new(source: Arc<dyn ChapterSource>, timeout: Duration) -> Self {
        Self {
            source,
            maps: Arc::new(Mutex::new(CacheMaps::default())),
            timeout,
        }
    }

    /// Cached chapter, or the result of the (single, shared) fetch for it.
    pub async fn get_chapter(&self, number: ChapterNumber) -> ChapterResult {
        let fetch = {
            let mut maps = lock(&self.maps);
            if let Some(chapter) = maps.chapters.get(&number) {
                tracing::debug!(chapter = %number, "chapter cache hit");
                return Ok(Arc::clone(chapter));
            }

            match maps.pending.get(&number).and_then(WeakShared::upgrade) {
                Some(pending) => {
                    tracing::debug!(chapter = %number, "joining in-flight chapter fetch");
                    pending
                }
                None => {
                    let fetch = self.start_fetch(number, maps.epoch);
                    if let Some(weak) = fetch.downgrade() {
                        maps.pending.insert(number, weak);
                    }
                    fetch
                }
            }
        };

        fetch.await
    }

    fn start_fetch(&self, number: ChapterNumber, epoch: u64) -> PendingFetch {
        let source = Arc::clone(&self.source);
        let maps = Arc::clone(&self.maps);
        let timeout = self.timeout;

        async move {
            tracing::info!(chapter = %number, "fetching chapter");
            let result = match tokio::time::timeout(timeout, source.fetch_chapter(number)).await {
                Ok(Ok(raw)) => Chapter::from_raw(number, raw).map(Arc::new),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(NoorError::timeout()),
            };

            let mut guard = lock(&maps);
            let current = guard.epoch == epoch;
            if current {
                guard.pending.remove(&number);
            }
            match result {
                Ok(chapter) if current => {
                    let cached = guard.chapters.entry(number).or_insert(chapter);
                    Ok(Arc::clone(cached))
                }
                Ok(chapter) => {
                    tracing::debug!(chapter = %number, "cache cleared during fetch, result not cached");
                    Ok(chapter)
                }
                Err(e) => {
                    tracing::warn!(chapter = %number, error = %e, "chapter fetch failed");
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }

    pub fn is_cached(&self, number: ChapterNumber) -> bool {
        lock(&self.maps).chapters.contains_key(&number)
    }

    /// (cached chapters, fetches in flight)
    pub fn stats(&self) -> (usize, usize) {
        let maps = lock(&self.maps);
        let live = maps
            .pending
            .values()
            .filter(|weak| weak.upgrade().is_some())
            .count();
        (maps.chapters.len(), live)
    }

    /// Empty the cache. Fetches already in flight still answer their own
    /// callers but no longer populate the cache.
    pub fn clear(&self) {
        let mut maps = lock(&self.maps);
        maps.epoch += 1;
        maps.chapters.clear();
        maps.pending.clear();
    }
}
