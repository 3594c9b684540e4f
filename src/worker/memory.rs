use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use dashmap::DashMap;
use http::Method;

use super::{
    request::{CacheRequest, CachedResponse},
    storage::{Cache, CacheStorage, check_cacheable},
};
use crate::error::{Error, Result};

/// In-process cache storage.
///
/// Entries live as long as the process. Reads and writes of a single key
/// are atomic, there are no transactions across keys.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: DashMap<String, Arc<MemoryCache>>,
    sequence: AtomicU64,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, cache_name: &str) -> Result<Arc<dyn Cache>> {
        if cache_name.is_empty() {
            return Err(Error::EmptyCacheName);
        }
        let cache: Arc<dyn Cache> = self
            .caches
            .entry(cache_name.to_string())
            .or_insert_with(|| {
                let created = self.sequence.fetch_add(1, Ordering::Relaxed);
                Arc::new(MemoryCache::new(cache_name, created))
            })
            .clone();
        Ok(cache)
    }

    async fn has(&self, cache_name: &str) -> Result<bool> {
        Ok(self.caches.contains_key(cache_name))
    }

    async fn delete(&self, cache_name: &str) -> Result<bool> {
        Ok(self.caches.remove(cache_name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut names = self
            .caches
            .iter()
            .map(|entry| (entry.value().created, entry.key().clone()))
            .collect::<Vec<_>>();
        names.sort_unstable();
        Ok(names.into_iter().map(|(_, name)| name).collect())
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    sequence: u64,
    request: CacheRequest,
    response: CachedResponse,
}

impl StoredEntry {
    fn answers(&self, request: &CacheRequest) -> bool {
        self.response
            .vary()
            .matches(&self.request.headers, &request.headers)
    }
}

#[derive(Debug)]
pub struct MemoryCache {
    name: String,
    created: u64,
    entries: DashMap<String, StoredEntry>,
    sequence: AtomicU64,
}

impl MemoryCache {
    fn new(name: &str, created: u64) -> Self {
        Self {
            name: name.to_string(),
            created,
            entries: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &CacheRequest) -> Result<Option<CachedResponse>> {
        if request.method != Method::GET {
            return Ok(None);
        }
        let response = self
            .entries
            .get(&request.cache_key())
            .filter(|entry| entry.answers(request))
            .map(|entry| entry.response.clone());
        Ok(response)
    }

    async fn put(&self, request: &CacheRequest, response: CachedResponse) -> Result<()> {
        check_cacheable(request, &response)?;
        let entry = StoredEntry {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            request: request.descriptor(),
            response,
        };
        self.entries.insert(request.cache_key(), entry);
        Ok(())
    }

    async fn delete(&self, request: &CacheRequest) -> Result<bool> {
        if request.method != Method::GET {
            return Ok(false);
        }
        let removed = self
            .entries
            .remove_if(&request.cache_key(), |_, entry| entry.answers(request));
        Ok(removed.is_some())
    }

    async fn keys(&self) -> Result<Vec<CacheRequest>> {
        let mut entries = self
            .entries
            .iter()
            .map(|entry| (entry.sequence, entry.request.clone()))
            .collect::<Vec<_>>();
        entries.sort_unstable_by_key(|(sequence, _)| *sequence);
        Ok(entries.into_iter().map(|(_, request)| request).collect())
    }
}

#[cfg(test)]
mod tests {
    use http::{
        HeaderValue, StatusCode,
        header::{ACCEPT_LANGUAGE, VARY},
    };
    use reqwest::Url;

    use super::*;

    fn request(path: &str) -> CacheRequest {
        let scope = Url::parse("http://origin.test/").unwrap();
        CacheRequest::resolve(&scope, path).unwrap()
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let storage = MemoryCacheStorage::new();
        let first = storage.open("pages-cache-v1").await.unwrap();
        first.put(&request("/"), CachedResponse::ok("root")).await.unwrap();

        let second = storage.open("pages-cache-v1").await.unwrap();
        assert_eq!(second.keys().await.unwrap().len(), 1);
        assert_eq!(storage.keys().await.unwrap(), vec!["pages-cache-v1"]);
    }

    #[tokio::test]
    async fn open_rejects_empty_name() {
        let storage = MemoryCacheStorage::new();
        assert!(matches!(
            storage.open("").await,
            Err(Error::EmptyCacheName)
        ));
    }

    #[tokio::test]
    async fn storage_keys_in_creation_order() {
        let storage = MemoryCacheStorage::new();
        for name in ["pages-cache-v0", "pages-cache-v1", "api-cache"] {
            storage.open(name).await.unwrap();
        }
        storage.open("pages-cache-v0").await.unwrap();
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["pages-cache-v0", "pages-cache-v1", "api-cache"]
        );
    }

    #[tokio::test]
    async fn storage_delete() {
        let storage = MemoryCacheStorage::new();
        storage.open("pages-cache-v0").await.unwrap();
        assert!(storage.has("pages-cache-v0").await.unwrap());
        assert!(storage.delete("pages-cache-v0").await.unwrap());
        assert!(!storage.has("pages-cache-v0").await.unwrap());
        assert!(!storage.delete("pages-cache-v0").await.unwrap());
    }

    #[tokio::test]
    async fn put_overwrites_and_moves_to_end() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("c").await.unwrap();
        cache.put(&request("/"), CachedResponse::ok("v1")).await.unwrap();
        cache.put(&request("/about"), CachedResponse::ok("about")).await.unwrap();
        cache.put(&request("/"), CachedResponse::ok("v2")).await.unwrap();

        let keys = cache.keys().await.unwrap();
        let urls = keys.iter().map(|r| r.url.as_str()).collect::<Vec<_>>();
        assert_eq!(urls, vec!["http://origin.test/about", "http://origin.test/"]);
        assert_eq!(
            cache.match_request(&request("/")).await.unwrap(),
            Some(CachedResponse::ok("v2"))
        );
    }

    #[tokio::test]
    async fn match_ignores_fragment_and_other_methods() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("c").await.unwrap();
        cache.put(&request("/docs"), CachedResponse::ok("docs")).await.unwrap();

        let with_fragment = request("/docs#section");
        assert!(cache.match_request(&with_fragment).await.unwrap().is_some());

        let other_query = request("/docs?page=2");
        assert!(cache.match_request(&other_query).await.unwrap().is_none());

        let head = CacheRequest::new(Method::HEAD, request("/docs").url);
        assert!(cache.match_request(&head).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_rejects_uncacheable_pairs() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("c").await.unwrap();
        let post = CacheRequest::new(Method::POST, request("/form").url);
        assert!(cache.put(&post, CachedResponse::ok("x")).await.is_err());

        let partial = CachedResponse::new(StatusCode::PARTIAL_CONTENT);
        assert!(cache.put(&request("/video"), partial).await.is_err());
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn vary_selects_entry() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("c").await.unwrap();
        let english = request("/").with_header(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        let response = CachedResponse::ok("hello")
            .with_header(VARY, HeaderValue::from_static("Accept-Language"));
        cache.put(&english, response.clone()).await.unwrap();

        assert_eq!(cache.match_request(&english).await.unwrap(), Some(response));

        let french = request("/").with_header(ACCEPT_LANGUAGE, HeaderValue::from_static("fr"));
        assert!(cache.match_request(&french).await.unwrap().is_none());
        assert!(!cache.delete(&french).await.unwrap());
        assert!(cache.delete(&english).await.unwrap());
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_request_has_no_body() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("c").await.unwrap();
        let request = request("/").with_body("ignored");
        cache.put(&request, CachedResponse::ok("root")).await.unwrap();
        let keys = cache.keys().await.unwrap();
        assert!(keys[0].body.is_empty());
    }
}
