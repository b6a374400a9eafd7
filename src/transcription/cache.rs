//! Content-addressed memoization of transcription results
//!
//! Keys are a SHA-256 digest over the audio bytes plus the canonical JSON
//! serialization of the transcription options, so identical media with
//! identical options resolves to the stored result without a second
//! upstream call. Entries live for a fixed TTL and the cache is capacity
//! bounded; expiry is enforced on lookup with a periodic background sweep
//! rather than per-entry timers.

use super::{TranscribeError, TranscriptionOptions, TranscriptionResult};
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Read-only cache observability snapshot
#[derive(Debug, Clone, Copy)]
pub struct CacheStatus {
    /// Number of live entries
    pub size: u64,
    /// Total lookups answered from the cache
    pub hits: u64,
}

/// Process-lifetime transcription cache.
///
/// Constructed once at startup and threaded through the application state;
/// never an ambient singleton.
#[derive(Clone)]
pub struct TranscriptionCache {
    /// Moka cache storing key -> shared result with automatic TTL
    cache: Cache<String, Arc<TranscriptionResult>>,
    /// Counter of lookups served without an upstream call
    hits: Arc<AtomicU64>,
}

impl TranscriptionCache {
    /// Creates a cache with the given TTL and capacity bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use scribe_bot::transcription::cache::TranscriptionCache;
    ///
    /// let cache = TranscriptionCache::new(
    ///     86_400, // 24 hour TTL
    ///     10_000, // max 10k entries
    /// );
    /// ```
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            hits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Deterministic digest over the audio content and its processing
    /// options. `serde_json` serializes struct fields in declaration
    /// order, which makes the options serialization canonical.
    fn cache_key(audio: &[u8], options: &TranscriptionOptions) -> String {
        let mut hasher = Sha256::new();
        hasher.update(audio);
        hasher.update(b":");
        hasher.update(
            serde_json::to_string(options)
                .unwrap_or_default()
                .as_bytes(),
        );
        format!("{:x}", hasher.finalize())
    }

    /// Returns the cached result for (audio, options) or invokes `compute`
    /// and stores its result.
    ///
    /// A hit never invokes `compute`. A miss invokes it exactly once for
    /// this request; concurrent identical requests may each compute
    /// redundantly, which is accepted over holding a lock across the
    /// upstream call.
    ///
    /// # Errors
    ///
    /// Propagates the `compute` failure; nothing is cached in that case.
    pub async fn get_or_compute<F, Fut>(
        &self,
        audio: &[u8],
        options: &TranscriptionOptions,
        compute: F,
    ) -> Result<Arc<TranscriptionResult>, TranscribeError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<TranscriptionResult, TranscribeError>>,
    {
        let key = Self::cache_key(audio, options);

        if let Some(result) = self.cache.get(&key).await {
            let hits = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(key = %key, hits, "Transcription cache hit");
            return Ok(result);
        }

        debug!(key = %key, "Transcription cache miss");
        let result = Arc::new(compute().await?);
        self.cache.insert(key, Arc::clone(&result)).await;
        Ok(result)
    }

    /// Runs pending eviction work. Called by the background sweep loop so
    /// expired entries are reclaimed even when the cache sits idle.
    pub async fn run_maintenance(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Returns the current size and hit count.
    ///
    /// Useful for monitoring and health checks.
    pub async fn status(&self) -> CacheStatus {
        // Entry counts are only exact after pending tasks have run
        self.cache.run_pending_tasks().await;
        CacheStatus {
            size: self.cache.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }
}
