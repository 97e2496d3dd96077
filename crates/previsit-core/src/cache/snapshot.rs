//! Cache snapshot export/import
//!
//! Packages the entire store root (entries in both buckets plus the stats
//! file) into a single gzip-compressed JSON bundle for backup or transfer.
//! The store's `tmp/` scratch subdirectory is never included.

use super::{Bucket, Counters, PersistentCache};
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotBundle {
    language: String,
    created_at: DateTime<Utc>,
    stats: Counters,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    bucket: Bucket,
    key: String,
    /// Raw entry file JSON, carried opaquely so import reproduces files
    /// byte-compatible with what the store wrote.
    entry: serde_json::Value,
}

impl PersistentCache {
    /// Export the whole store into a compressed archive in the OS temp
    /// directory and return its path.
    ///
    /// Failures come back as a descriptive [`CoreError::Snapshot`] rather
    /// than raising past the caller; export is user-triggered and
    /// retryable.
    pub async fn create_snapshot(&self) -> CoreResult<PathBuf> {
        let mut entries = Vec::new();
        for bucket in [Bucket::Text, Bucket::Audio] {
            self.collect_bucket(bucket, &mut entries).await?;
        }

        let bundle = SnapshotBundle {
            language: self.language().to_string(),
            created_at: Utc::now(),
            stats: self.load_counters().await,
            entries,
        };

        let serialized = serde_json::to_string(&bundle)
            .map_err(|e| CoreError::snapshot(format!("failed to serialize snapshot: {e}")))?;
        let compressed = compress(serialized.as_bytes())
            .map_err(|e| CoreError::snapshot(format!("failed to compress snapshot: {e}")))?;

        let archive_path = std::env::temp_dir().join(self.snapshot_file_name());
        if fs::metadata(&archive_path).await.is_ok() {
            fs::remove_file(&archive_path).await.map_err(|e| {
                CoreError::snapshot(format!("failed to replace previous snapshot: {e}"))
            })?;
        }
        fs::write(&archive_path, compressed).await.map_err(|e| {
            CoreError::snapshot(format!("failed to write snapshot archive: {e}"))
        })?;

        info!(
            "exported cache snapshot with {} entries to {}",
            bundle.entries.len(),
            archive_path.display()
        );
        Ok(archive_path)
    }

    /// Restore a snapshot archive into this store, overwriting entries that
    /// share a key and replacing the stats file.
    pub async fn import_snapshot(&self, archive: &Path) -> CoreResult<usize> {
        let compressed = fs::read(archive)
            .await
            .map_err(|e| CoreError::snapshot(format!("failed to read snapshot archive: {e}")))?;
        let serialized = decompress(&compressed)
            .map_err(|e| CoreError::snapshot(format!("failed to decompress snapshot: {e}")))?;
        let bundle: SnapshotBundle = serde_json::from_str(&serialized)
            .map_err(|e| CoreError::snapshot(format!("malformed snapshot bundle: {e}")))?;

        let imported = bundle.entries.len();
        for item in bundle.entries {
            let path = self.entry_path(item.bucket, &item.key);
            let contents = serde_json::to_string_pretty(&item.entry)
                .map_err(|e| CoreError::snapshot(format!("malformed snapshot entry: {e}")))?;
            fs::write(&path, contents).await.map_err(|e| {
                CoreError::snapshot(format!("failed to restore entry {}: {e}", item.key))
            })?;
        }
        self.save_counters(&bundle.stats).await;

        info!("imported cache snapshot with {imported} entries from {}", archive.display());
        Ok(imported)
    }

    /// Archive name, unique per store root so two stores on one host never
    /// clobber each other's exports; repeated exports of the same store
    /// overwrite.
    fn snapshot_file_name(&self) -> String {
        let root_key = super::derive_key("snapshot", &self.root().to_string_lossy(), "");
        format!("previsit-cache-{}.json.gz", &root_key[..12])
    }

    async fn collect_bucket(
        &self,
        bucket: Bucket,
        out: &mut Vec<SnapshotEntry>,
    ) -> CoreResult<()> {
        let dir = self.root().join(bucket.dir_name());
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            CoreError::snapshot(format!("failed to read bucket {}: {e}", dir.display()))
        })?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            CoreError::snapshot(format!("failed to scan bucket {}: {e}", dir.display()))
        })? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path).await.map_err(|e| {
                CoreError::snapshot(format!("failed to read entry {}: {e}", path.display()))
            })?;
            let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
                CoreError::snapshot(format!("corrupt entry {}: {e}", path.display()))
            })?;
            out.push(SnapshotEntry {
                bucket,
                key: stem.to_string(),
                entry: value,
            });
        }
        Ok(())
    }
}

fn compress(content: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    encoder.finish()
}

fn decompress(compressed: &[u8]) -> std::io::Result<String> {
    let mut decoder = GzDecoder::new(compressed);
    let mut decompressed = String::new();
    decoder.read_to_string(&mut decompressed)?;
    Ok(decompressed)
}
