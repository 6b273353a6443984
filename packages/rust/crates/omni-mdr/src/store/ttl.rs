//! Time-bounded, single-flight snapshot cache.
//!
//! A snapshot is fresh while it is younger than the TTL and no invalidation
//! happened since its build started. Only one build runs at a time; callers
//! queued behind a build take its result even if an invalidation landed
//! meanwhile, and the next caller after that triggers exactly one rebuild.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::{MdrError, Result};

struct Snapshot<T> {
    value: Arc<T>,
    built_at: Instant,
    generation: u64,
}

pub(crate) struct TtlCache<T> {
    name: &'static str,
    ttl: Duration,
    slot: RwLock<Option<Snapshot<T>>>,
    generation: AtomicU64,
    completed: AtomicU64,
    gate: Mutex<()>,
}

impl<T> TtlCache<T> {
    pub(crate) fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: RwLock::new(None),
            generation: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            gate: Mutex::new(()),
        }
    }

    /// Mark the current snapshot stale; it is still kept as a fallback.
    pub(crate) fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Successful builds so far.
    pub(crate) fn builds(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn fresh(&self) -> Option<Arc<T>> {
        let generation = self.generation.load(Ordering::Acquire);
        let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|snap| snap.generation == generation && snap.built_at.elapsed() < self.ttl)
            .map(|snap| Arc::clone(&snap.value))
    }

    fn latest(&self) -> Option<Arc<T>> {
        let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|snap| Arc::clone(&snap.value))
    }

    /// Return a fresh snapshot, building one if needed.
    ///
    /// A failed build falls back to the previous snapshot when there is one.
    pub(crate) async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.fresh() {
            return Ok(value);
        }
        let observed = self.completed.load(Ordering::Acquire);
        let _guard = self.gate.lock().await;
        if self.completed.load(Ordering::Acquire) != observed
            && let Some(value) = self.latest()
        {
            return Ok(value);
        }
        if let Some(value) = self.fresh() {
            return Ok(value);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let started = Instant::now();
        match build().await {
            Ok(value) => {
                let value = Arc::new(value);
                {
                    let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
                    *slot = Some(Snapshot {
                        value: Arc::clone(&value),
                        built_at: started,
                        generation,
                    });
                }
                self.completed.fetch_add(1, Ordering::AcqRel);
                tracing::debug!(
                    cache = self.name,
                    elapsed_ms = started.elapsed().as_millis(),
                    "index rebuilt"
                );
                Ok(value)
            }
            Err(err) => match self.latest() {
                Some(previous) => {
                    tracing::warn!(cache = self.name, error = %err, "rebuild failed; serving previous snapshot");
                    Ok(previous)
                }
                None => Err(MdrError::IndexUnavailable {
                    index: self.name,
                    reason: err.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::Notify;

    use super::*;

    #[tokio::test]
    async fn fresh_snapshot_is_reused_until_invalidated() -> Result<()> {
        let cache: TtlCache<usize> = TtlCache::new("test", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let build = || async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) };
        assert_eq!(*cache.get_or_build(build).await?, 1);
        assert_eq!(*cache.get_or_build(build).await?, 1);
        cache.invalidate();
        assert_eq!(*cache.get_or_build(build).await?, 2);
        assert_eq!(cache.builds(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn invalidations_during_build_coalesce_into_one_rebuild() -> Result<()> {
        let cache: TtlCache<u32> = TtlCache::new("test", Duration::from_secs(60));
        let started = Notify::new();
        let release = Notify::new();
        let (started, release) = (&started, &release);

        let leader = cache.get_or_build(|| async move {
            started.notify_one();
            release.notified().await;
            Ok(1)
        });
        let waiter = || cache.get_or_build(|| async { Ok(99) });
        let queued = async {
            // The leader holds the gate from here on.
            started.notified().await;
            let invalidate_and_release = async {
                for _ in 0..3 {
                    cache.invalidate();
                }
                release.notify_one();
            };
            let (first, second, ()) = tokio::join!(waiter(), waiter(), invalidate_and_release);
            (first, second)
        };
        let (leader, (first, second)) = tokio::join!(leader, queued);

        // Everyone queued behind the build takes it, stale or not.
        assert_eq!((*leader?, *first?, *second?), (1, 1, 1));
        assert_eq!(cache.builds(), 1);

        assert_eq!(*cache.get_or_build(|| async { Ok(2) }).await?, 2);
        assert_eq!(*cache.get_or_build(|| async { Ok(3) }).await?, 2);
        assert_eq!(cache.builds(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn expired_snapshot_is_rebuilt() -> Result<()> {
        let cache: TtlCache<u8> = TtlCache::new("test", Duration::ZERO);
        cache.get_or_build(|| async { Ok(1) }).await?;
        assert_eq!(*cache.get_or_build(|| async { Ok(2) }).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn failed_rebuild_serves_previous_snapshot() -> Result<()> {
        let cache: TtlCache<u8> = TtlCache::new("test", Duration::from_secs(60));
        cache.get_or_build(|| async { Ok(7) }).await?;
        cache.invalidate();
        let value = cache
            .get_or_build(|| async { Err(MdrError::Config("boom".into())) })
            .await?;
        assert_eq!(*value, 7);
        Ok(())
    }

    #[tokio::test]
    async fn first_failure_is_index_unavailable() {
        let cache: TtlCache<u8> = TtlCache::new("search", Duration::from_secs(60));
        let result = cache
            .get_or_build(|| async { Err(MdrError::Config("boom".into())) })
            .await;
        assert!(matches!(
            result,
            Err(MdrError::IndexUnavailable { index: "search", .. })
        ));
    }
}
