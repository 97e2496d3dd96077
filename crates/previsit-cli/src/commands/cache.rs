//! Cache inspection and management

use crate::args::CacheAction;
use anyhow::{Context, Result};
use previsit_core::config::AppConfig;

/// Dispatch a cache subcommand.
pub async fn run(config: AppConfig, action: CacheAction) -> Result<()> {
    let cache = super::open_cache(&config).await?;

    match action {
        CacheAction::Stats => {
            let stats = cache.stats().await;
            println!("language:      {}", stats.language);
            println!("entries:       {}", stats.total_entries);
            println!("hits:          {}", stats.hits);
            println!("misses:        {}", stats.misses);
            println!("hit rate:      {}%", stats.hit_rate);
            println!("size on disk:  {} MB", stats.cache_size_mb);
        }
        CacheAction::Clear { bucket } => {
            cache.clear(bucket.map(Into::into)).await;
            match bucket {
                Some(bucket) => println!("cleared {bucket:?} bucket"),
                None => println!("cleared both buckets"),
            }
        }
        CacheAction::Export { out } => {
            let archive = cache.create_snapshot().await?;
            let destination = match out {
                Some(out) => {
                    tokio::fs::copy(&archive, &out)
                        .await
                        .context("failed to copy snapshot to destination")?;
                    out
                }
                None => archive,
            };
            println!("snapshot written to {}", destination.display());
        }
        CacheAction::Import { path } => {
            let imported = cache.import_snapshot(&path).await?;
            println!("restored {imported} entries from {}", path.display());
        }
    }
    Ok(())
}
