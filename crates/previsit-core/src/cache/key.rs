//! Cache key derivation
//!
//! Key derivation is a standalone pure function so the cache store, the
//! memoization wrapper, and the read-only lookup path all share one
//! contract instead of reaching into each other's internals.

use sha2::{Digest, Sha256};

/// Derive the content-addressed key for a cache slot.
///
/// The key is the hex SHA-256 digest of `"{namespace}:{prompt}:{context}"`.
/// Identical inputs always map to the identical fixed-width key, regardless
/// of call order. `namespace` disambiguates otherwise-identical prompts
/// across language or feature variants; `context` must capture every
/// parameter besides the prompt that affects the result.
pub fn derive_key(namespace: &str, prompt: &str, context: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(prompt.as_bytes());
    hasher.update(b":");
    hasher.update(context.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the context string for a memoized call: the function identity plus
/// its serialized arguments.
///
/// Serialization uses `serde_json`, which preserves struct field order, so
/// the same logical arguments always produce the same context. Arguments
/// that fail to serialize fall back to their `Debug` form rather than
/// erroring out of a cache lookup.
pub fn memo_context<A>(fn_name: &str, args: &A) -> String
where
    A: serde::Serialize + std::fmt::Debug,
{
    match serde_json::to_string(args) {
        Ok(serialized) => format!("{fn_name}:{serialized}"),
        Err(_) => format!("{fn_name}:{args:?}"),
    }
}
