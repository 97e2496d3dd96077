//! Cache system tests

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::{CoreError, CoreResult};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::fs;

    async fn temp_cache() -> (tempfile::TempDir, PersistentCache) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = PersistentCache::open(dir.path(), "en").await.expect("cache");
        (dir, cache)
    }

    #[test]
    fn key_derivation_is_deterministic() {
        let a = derive_key("en", "prompt", "context");
        let b = derive_key("en", "prompt", "context");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        // Any differing component changes the key.
        assert_ne!(a, derive_key("de", "prompt", "context"));
        assert_ne!(a, derive_key("en", "prompt2", "context"));
        assert_ne!(a, derive_key("en", "prompt", "context2"));
    }

    #[test]
    fn memo_context_is_stable_for_equal_args() {
        let first = memo_context("synthesize", &("hello", "Aoede"));
        let second = memo_context("synthesize", &("hello", "Aoede"));
        assert_eq!(first, second);
        assert_ne!(first, memo_context("synthesize", &("hello", "Puck")));
        assert_ne!(first, memo_context("other_fn", &("hello", "Aoede")));
    }

    #[test]
    fn values_round_trip_exactly() {
        let mut map = BTreeMap::new();
        map.insert("text".to_string(), CacheValue::Text("hällo wörld".to_string()));
        map.insert("count".to_string(), CacheValue::Int(-42));
        map.insert("ratio".to_string(), CacheValue::Float(0.25));
        map.insert("flag".to_string(), CacheValue::Bool(true));
        map.insert("nothing".to_string(), CacheValue::Null);
        map.insert(
            "audio".to_string(),
            CacheValue::Bytes(vec![0x00, 0xff, 0x7f, 0x80, 0x01]),
        );
        let value = CacheValue::List(vec![
            CacheValue::Map(map),
            CacheValue::Tuple(vec![
                CacheValue::Bytes((0..=255).collect()),
                CacheValue::Text("audio/mpeg".to_string()),
            ]),
            CacheValue::List(vec![CacheValue::List(vec![CacheValue::Int(1)])]),
            CacheValue::Opaque("<unprintable handle>".to_string()),
        ]);

        let decoded = CacheValue::decode(&value.encode()).expect("decode");
        assert_eq!(decoded, value);
    }

    #[test]
    fn list_and_tuple_keep_distinct_tags() {
        let list = CacheValue::List(vec![CacheValue::Int(1)]).encode();
        let tuple = CacheValue::Tuple(vec![CacheValue::Int(1)]).encode();
        assert_eq!(list["__type"], "list");
        assert_eq!(tuple["__type"], "tuple");
        assert_ne!(
            CacheValue::decode(&list).unwrap(),
            CacheValue::decode(&tuple).unwrap()
        );
    }

    #[test]
    fn malformed_wire_shapes_fail_decode() {
        for raw in [
            serde_json::json!({"__type": "bytes", "data": "not-base64!!!"}),
            serde_json::json!({"__type": "unknown", "data": 1}),
            serde_json::json!({"no_tag": true}),
            serde_json::json!([1, 2, 3]),
        ] {
            assert!(CacheValue::decode(&raw).is_none(), "decoded {raw}");
        }
    }

    #[tokio::test]
    async fn miss_then_hit_with_stats() {
        let (_dir, cache) = temp_cache().await;

        assert!(cache.get("prompt", "ctx", Bucket::Text).await.is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);

        let value = CacheValue::Text("cached response".to_string());
        cache.set("prompt", &value, "ctx", Bucket::Text).await;

        let hit = cache.get("prompt", "ctx", Bucket::Text).await;
        assert_eq!(hit, Some(value));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_rate, 50.0);
        assert!(stats.cache_size_mb >= 0.0);
    }

    #[tokio::test]
    async fn buckets_have_independent_key_spaces() {
        let (_dir, cache) = temp_cache().await;

        let value = CacheValue::Text("text payload".to_string());
        cache.set("prompt", &value, "ctx", Bucket::Text).await;

        // Identical prompt and context in the other bucket is still a miss.
        assert!(cache.get("prompt", "ctx", Bucket::Audio).await.is_none());
        assert!(cache.get("prompt", "ctx", Bucket::Text).await.is_some());
    }

    #[tokio::test]
    async fn corrupt_entry_counts_as_a_miss() {
        let (_dir, cache) = temp_cache().await;

        let key = derive_key("en", "prompt", "ctx");
        fs::write(cache.entry_path(Bucket::Text, &key), b"{ not json")
            .await
            .unwrap();

        assert!(cache.get("prompt", "ctx", Bucket::Text).await.is_none());

        // Valid JSON with an undecodable payload is equally a miss.
        fs::write(
            cache.entry_path(Bucket::Text, &key),
            serde_json::json!({
                "prompt": "prompt",
                "context": "ctx",
                "response": {"__type": "unknown", "data": 1},
                "encoding": "structured",
                "language": "en",
                "created_at": "2026-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .await
        .unwrap();
        assert!(cache.get("prompt", "ctx", Bucket::Text).await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn total_entries_self_heals_after_out_of_band_deletion() {
        let (_dir, cache) = temp_cache().await;

        cache
            .set("a", &CacheValue::Text("1".to_string()), "", Bucket::Text)
            .await;
        cache
            .set("b", &CacheValue::Text("2".to_string()), "", Bucket::Text)
            .await;
        assert_eq!(cache.stats().await.total_entries, 2);

        // Delete one entry behind the store's back.
        let key = derive_key("en", "a", "");
        fs::remove_file(cache.entry_path(Bucket::Text, &key)).await.unwrap();

        // The next set recounts instead of incrementing.
        cache
            .set("c", &CacheValue::Text("3".to_string()), "", Bucket::Audio)
            .await;
        assert_eq!(cache.stats().await.total_entries, 2);
    }

    #[tokio::test]
    async fn overwriting_a_key_keeps_one_entry() {
        let (_dir, cache) = temp_cache().await;

        cache
            .set("p", &CacheValue::Text("old".to_string()), "ctx", Bucket::Text)
            .await;
        cache
            .set("p", &CacheValue::Text("new".to_string()), "ctx", Bucket::Text)
            .await;

        assert_eq!(
            cache.get("p", "ctx", Bucket::Text).await,
            Some(CacheValue::Text("new".to_string()))
        );
        assert_eq!(cache.stats().await.total_entries, 1);
    }

    #[tokio::test]
    async fn clear_respects_bucket_boundaries() {
        let (_dir, cache) = temp_cache().await;

        cache
            .set("t", &CacheValue::Text("text".to_string()), "", Bucket::Text)
            .await;
        cache
            .set("a", &CacheValue::Bytes(vec![1, 2, 3]), "", Bucket::Audio)
            .await;

        cache.clear(Some(Bucket::Text)).await;
        assert!(cache.get("t", "", Bucket::Text).await.is_none());
        assert!(cache.get("a", "", Bucket::Audio).await.is_some());

        cache.clear(None).await;
        assert!(cache.get("a", "", Bucket::Audio).await.is_none());
    }

    #[tokio::test]
    async fn clear_resets_counters() {
        let (_dir, cache) = temp_cache().await;

        cache
            .set("p", &CacheValue::Text("v".to_string()), "", Bucket::Text)
            .await;
        cache.get("p", "", Bucket::Text).await;
        cache.get("missing", "", Bucket::Text).await;

        cache.clear(None).await;
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn snapshot_round_trips_into_a_fresh_store() {
        let (_dir, cache) = temp_cache().await;

        let audio = CacheValue::Tuple(vec![
            CacheValue::Bytes(vec![9, 8, 7]),
            CacheValue::Text("audio/mpeg".to_string()),
        ]);
        cache
            .set("q1", &CacheValue::Text("answer".to_string()), "ctx", Bucket::Text)
            .await;
        cache.set("q1", &audio, "ctx", Bucket::Audio).await;

        let archive = cache.create_snapshot().await.expect("snapshot");

        let restore_dir = tempfile::tempdir().expect("tempdir");
        let restored = PersistentCache::open(restore_dir.path(), "en").await.expect("cache");
        let imported = restored.import_snapshot(&archive).await.expect("import");
        assert_eq!(imported, 2);

        assert_eq!(
            restored.get("q1", "ctx", Bucket::Text).await,
            Some(CacheValue::Text("answer".to_string()))
        );
        assert_eq!(restored.get("q1", "ctx", Bucket::Audio).await, Some(audio));

        let _ = fs::remove_file(&archive).await;
    }

    #[tokio::test]
    async fn memoizer_invokes_the_function_once() {
        let (_dir, cache) = temp_cache().await;
        let memo = Memoizer::new(Arc::new(cache), Bucket::Text);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let result = memo
                .call("expensive", &("arg",), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(CacheValue::Text("result".to_string()))
                })
                .await
                .unwrap();
            assert_eq!(result, CacheValue::Text("result".to_string()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn memoizer_does_not_store_failures() {
        let (_dir, cache) = temp_cache().await;
        let memo = Memoizer::new(Arc::new(cache), Bucket::Text);
        let calls = Arc::new(AtomicUsize::new(0));

        let attempt = |fail: bool| {
            let calls = calls.clone();
            let memo = memo.clone();
            async move {
                memo.call("flaky", &("arg",), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if fail {
                        Err(CoreError::upstream("transient failure"))
                    } else {
                        Ok(CacheValue::Text("recovered".to_string()))
                    }
                })
                .await
            }
        };

        assert!(attempt(true).await.is_err());
        // The failure was not cached; the retry invokes the function again
        // and its success is what gets stored.
        assert_eq!(
            attempt(false).await.unwrap(),
            CacheValue::Text("recovered".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn read_only_lookup_never_invokes_anything() {
        let (_dir, cache) = temp_cache().await;
        let cache = Arc::new(cache);
        let memo = Memoizer::new(cache.clone(), Bucket::Audio);

        // Empty cache: the sentinel is None, and nothing ran to produce it.
        assert!(memo.lookup("expensive", &("arg",)).await.is_none());

        // A value stored through the full path is visible to the read-only
        // path, because both share the same key derivation.
        let stored: CoreResult<CacheValue> = memo
            .call("expensive", &("arg",), || async {
                Ok(CacheValue::Bytes(vec![1, 2, 3]))
            })
            .await;
        assert!(stored.is_ok());
        assert_eq!(
            memo.lookup("expensive", &("arg",)).await,
            Some(CacheValue::Bytes(vec![1, 2, 3]))
        );
    }

    #[tokio::test]
    async fn snapshot_excludes_the_scratch_directory() {
        let (_dir, cache) = temp_cache().await;

        cache
            .set("p", &CacheValue::Text("v".to_string()), "", Bucket::Text)
            .await;
        // A stray scratch file must not leak into the export.
        fs::write(cache.tmp_dir().join("leftover.json"), b"{}").await.unwrap();

        let archive = cache.create_snapshot().await.expect("snapshot");
        let restore_dir = tempfile::tempdir().expect("tempdir");
        let restored = PersistentCache::open(restore_dir.path(), "en").await.expect("cache");
        assert_eq!(restored.import_snapshot(&archive).await.expect("import"), 1);

        let _ = fs::remove_file(&archive).await;
    }
}
