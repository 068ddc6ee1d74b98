use std::{collections::HashMap, future::Future, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{
    future,
    stream::{self, BoxStream},
    StreamExt,
};
use serde::{de::DeserializeOwned, Serialize};
use storage::CacheStore;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::outcome::Outcome;

/// Persistence of serialized responses, keyed by a cache key.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, payload: &str) -> Result<()>;
}

pub struct MissingResponseCache;

#[async_trait]
impl ResponseCache for MissingResponseCache {
    async fn read(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn write(&self, _key: &str, _payload: &str) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ResponseCache for CacheStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load(key).await?.map(|cached| cached.payload))
    }

    async fn write(&self, key: &str, payload: &str) -> Result<()> {
        self.store(key, payload).await
    }
}

/// Process-local cache, used when no disk cache is configured.
#[derive(Default)]
pub struct MemoryResponseCache {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, payload: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }
}

pub fn post_cache_key(id: &str) -> String {
    format!("post_{id}")
}

pub const POSTS_CACHE_KEY: &str = "posts";

/// Cached value for `key`, if one is stored and still decodes as `T`.
/// Cache problems are logged and treated as a miss.
pub async fn read_cached<T>(cache: &dyn ResponseCache, key: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    let payload = match cache.read(key).await {
        Ok(Some(payload)) => payload,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, "cache: read failed: {err:#}");
            return None;
        }
    };
    match serde_json::from_str(&payload) {
        Ok(value) => {
            debug!(key, "cache: hit");
            Some(value)
        }
        Err(err) => {
            warn!(key, "cache: discarding undecodable entry: {err}");
            None
        }
    }
}

pub async fn write_cached<T>(cache: &dyn ResponseCache, key: &str, value: &T)
where
    T: Serialize,
{
    let written = match serde_json::to_string(value).context("failed to encode response for cache")
    {
        Ok(payload) => cache.write(key, &payload).await,
        Err(err) => Err(err),
    };
    if let Err(err) = written {
        warn!(key, "cache: write failed: {err:#}");
    }
}

/// Lazily emits the cached value for `key` (when present) followed by the
/// outcome of `fetch`. A successful fetch is written back to the cache.
pub fn cached_then_network<T, F, Fut>(
    cache: Arc<dyn ResponseCache>,
    key: String,
    fetch: F,
) -> BoxStream<'static, Outcome<T>>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let cached = {
        let cache = Arc::clone(&cache);
        let key = key.clone();
        stream::once(async move { read_cached::<T>(cache.as_ref(), &key).await })
            .filter_map(|cached| future::ready(cached.map(Outcome::Success)))
    };
    let fresh = stream::once(async move {
        let result = fetch().await;
        match &result {
            Ok(value) => write_cached(cache.as_ref(), &key, value).await,
            Err(err) => warn!(key = %key, "network: fetch failed: {err:#}"),
        }
        Outcome::from_result(result)
    });
    cached.chain(fresh).boxed()
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
