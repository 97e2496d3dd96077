//! Persistent response cache
//!
//! A content-addressed, type-aware cache sitting in front of all outbound
//! model calls. Entries live in two on-disk buckets (`text/` and `audio/`),
//! one JSON file per key, with a single stats file at the store root. The
//! whole root is a stable unit an external backup tool can export as one
//! snapshot.
//!
//! Fault policy: a cache fault never escalates past a miss. Unreadable or
//! corrupt entries count as misses, write failures are logged and
//! swallowed, and the primary operation always proceeds.

pub mod key;
pub mod memo;
pub mod snapshot;
pub mod value;

#[cfg(test)]
mod tests;

pub use key::{derive_key, memo_context};
pub use memo::Memoizer;
pub use value::CacheValue;

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// A named partition of the cache store with its own key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Text-generation responses
    Text,
    /// Synthesized audio payloads
    Audio,
}

impl Bucket {
    /// Directory name of this bucket under the store root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Bucket::Text => "text",
            Bucket::Audio => "audio",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// On-disk form of a single cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EntryFile {
    pub prompt: String,
    pub context: String,
    pub response: serde_json::Value,
    pub encoding: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted hit/miss counters, stored in `stats.json` at the store root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub total_entries: u64,
    pub language: String,
}

impl Counters {
    fn empty(language: &str) -> Self {
        Self {
            hits: 0,
            misses: 0,
            total_entries: 0,
            language: language.to_string(),
        }
    }
}

/// Cache statistics with derived fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits observed
    pub hits: u64,
    /// Number of cache misses observed
    pub misses: u64,
    /// Number of entries currently stored across both buckets
    pub total_entries: u64,
    /// Hit percentage, rounded to two decimals; 0 with no observations
    pub hit_rate: f64,
    /// On-disk size of all entries in megabytes, rounded to two decimals
    pub cache_size_mb: f64,
    /// Namespace/language of the store
    pub language: String,
}

/// File-based cache with text/audio buckets and basic stats.
///
/// Keys are a pure function of `(language, prompt, context)` via
/// [`derive_key`]. Each entry is written whole-file through a scratch file
/// in the store's `tmp/` subdirectory and atomically renamed into place, so
/// concurrent readers never observe a partial entry. Counter updates are
/// read-modify-write and may lose updates under concurrency; that is an
/// accepted tradeoff, not a correctness requirement.
#[derive(Debug)]
pub struct PersistentCache {
    root: PathBuf,
    language: String,
}

impl PersistentCache {
    /// Open (creating if needed) a cache store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>, language: impl Into<String>) -> CoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let language = language.into();

        for dir in [
            root.clone(),
            root.join(Bucket::Text.dir_name()),
            root.join(Bucket::Audio.dir_name()),
            root.join("tmp"),
        ] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                CoreError::Io(format!("failed to create cache directory {}: {e}", dir.display()))
            })?;
        }

        let cache = Self { root, language };
        if fs::metadata(cache.stats_path()).await.is_err() {
            cache.save_counters(&Counters::empty(&cache.language)).await;
        }
        Ok(cache)
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The namespace/language this store keys under.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Retrieve a cached payload.
    ///
    /// Any failure along the way (missing file, unreadable file, malformed
    /// JSON, unknown encoding) counts a miss and returns `None`, never an
    /// error.
    pub async fn get(&self, prompt: &str, context: &str, bucket: Bucket) -> Option<CacheValue> {
        let key = derive_key(&self.language, prompt, context);
        let path = self.entry_path(bucket, &key);

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(_) => {
                self.record(|c| c.misses += 1).await;
                return None;
            }
        };

        let decoded = serde_json::from_str::<EntryFile>(&raw)
            .ok()
            .and_then(|entry| CacheValue::decode(&entry.response));

        match decoded {
            Some(value) => {
                self.record(|c| c.hits += 1).await;
                Some(value)
            }
            None => {
                warn!("cache read failure for {}: corrupt entry", path.display());
                self.record(|c| c.misses += 1).await;
                None
            }
        }
    }

    /// Persist a payload.
    ///
    /// Write failures are logged and swallowed: a cache-write failure must
    /// never break the primary operation. A later `set` with the same key
    /// overwrites. After a successful write `total_entries` is recomputed
    /// by counting stored entries, so the count self-heals after manual
    /// deletion.
    pub async fn set(&self, prompt: &str, response: &CacheValue, context: &str, bucket: Bucket) {
        let key = derive_key(&self.language, prompt, context);
        let path = self.entry_path(bucket, &key);

        let entry = EntryFile {
            prompt: prompt.to_string(),
            context: context.to_string(),
            response: response.encode(),
            encoding: "structured".to_string(),
            language: self.language.clone(),
            created_at: Utc::now(),
        };

        let serialized = match serde_json::to_string_pretty(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("cache write failure for {}: {e}", path.display());
                return;
            }
        };

        if let Err(e) = self.write_atomic(&path, serialized.as_bytes()).await {
            warn!("cache write failure for {}: {e}", path.display());
            return;
        }

        let total = self.count_entries().await;
        self.record(|c| c.total_entries = total).await;
    }

    /// Current statistics, including derived hit rate and on-disk size.
    pub async fn stats(&self) -> CacheStats {
        let counters = self.load_counters().await;
        let observations = counters.hits + counters.misses;
        let hit_rate = if observations == 0 {
            0.0
        } else {
            round2(counters.hits as f64 / observations as f64 * 100.0)
        };

        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            total_entries: counters.total_entries,
            hit_rate,
            cache_size_mb: round2(self.disk_size().await as f64 / (1024.0 * 1024.0)),
            language: counters.language,
        }
    }

    /// Delete all entries in `bucket`, or in both buckets when `None`, and
    /// reset the counters. Individual file deletions are best-effort.
    pub async fn clear(&self, bucket: Option<Bucket>) {
        let buckets = match bucket {
            Some(b) => vec![b],
            None => vec![Bucket::Text, Bucket::Audio],
        };
        for b in buckets {
            self.clear_dir(&self.root.join(b.dir_name())).await;
        }
        self.save_counters(&Counters::empty(&self.language)).await;
    }

    // ------------------------------------------------------------------ //
    // Internal helpers
    // ------------------------------------------------------------------ //

    pub(crate) fn entry_path(&self, bucket: Bucket, cache_key: &str) -> PathBuf {
        self.root.join(bucket.dir_name()).join(format!("{cache_key}.json"))
    }

    pub(crate) fn stats_path(&self) -> PathBuf {
        self.root.join("stats.json")
    }

    pub(crate) fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Write a whole file through the scratch directory and rename into
    /// place, so readers never see a partially written entry.
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "entry".to_string());
        let scratch = self.tmp_dir().join(format!("{}.{}", uuid::Uuid::new_v4(), file_name));
        fs::write(&scratch, contents).await?;
        fs::rename(&scratch, path).await
    }

    async fn load_counters(&self) -> Counters {
        match fs::read_to_string(self.stats_path()).await {
            Ok(raw) => serde_json::from_str(&raw)
                .unwrap_or_else(|_| Counters::empty(&self.language)),
            Err(_) => Counters::empty(&self.language),
        }
    }

    async fn save_counters(&self, counters: &Counters) {
        let serialized = match serde_json::to_string_pretty(counters) {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to serialize cache stats: {e}");
                return;
            }
        };
        if let Err(e) = self.write_atomic(&self.stats_path(), serialized.as_bytes()).await {
            warn!("failed to write cache stats: {e}");
        }
    }

    /// Read-modify-write a counter mutation. Lost updates under concurrent
    /// writers are accepted.
    async fn record(&self, mutate: impl FnOnce(&mut Counters)) {
        let mut counters = self.load_counters().await;
        mutate(&mut counters);
        self.save_counters(&counters).await;
    }

    async fn count_entries(&self) -> u64 {
        let mut total = 0;
        for bucket in [Bucket::Text, Bucket::Audio] {
            total += self.count_dir(&self.root.join(bucket.dir_name())).await;
        }
        total
    }

    async fn count_dir(&self, dir: &Path) -> u64 {
        let mut count = 0;
        if let Ok(mut entries) = fs::read_dir(dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path().extension().is_some_and(|ext| ext == "json") {
                    count += 1;
                }
            }
        }
        count
    }

    async fn disk_size(&self) -> u64 {
        let mut total = 0;
        for bucket in [Bucket::Text, Bucket::Audio] {
            let dir = self.root.join(bucket.dir_name());
            if let Ok(mut entries) = fs::read_dir(&dir).await {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    if entry.path().extension().is_some_and(|ext| ext == "json") {
                        if let Ok(meta) = entry.metadata().await {
                            total += meta.len();
                        }
                    }
                }
            }
        }
        total
    }

    async fn clear_dir(&self, dir: &Path) {
        let Ok(mut entries) = fs::read_dir(dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Err(e) = fs::remove_file(&path).await {
                    warn!("failed to delete cache file {}: {e}", path.display());
                } else {
                    debug!("deleted cache file {}", path.display());
                }
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
