use std::{collections::HashSet, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use futures::future::try_join_all;
use http::{Method, StatusCode};
use tracing::debug;

use super::{
    fetch::Fetcher,
    request::{CacheRequest, CachedResponse, Vary},
};
use crate::error::{Error, Result};

/// Origin scoped set of named caches
#[async_trait]
pub trait CacheStorage: Send + Sync + Debug {
    /// Open the cache named `cache_name`, creating it when absent
    async fn open(&self, cache_name: &str) -> Result<Arc<dyn Cache>>;

    async fn has(&self, cache_name: &str) -> Result<bool>;

    /// Delete a whole cache, returns whether it existed
    async fn delete(&self, cache_name: &str) -> Result<bool>;

    /// Names of all caches, in creation order
    async fn keys(&self) -> Result<Vec<String>>;
}

/// A named store of request to response snapshots
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn match_request(&self, request: &CacheRequest) -> Result<Option<CachedResponse>>;

    /// Store `response` under `request`, replacing any previous entry
    async fn put(&self, request: &CacheRequest, response: CachedResponse) -> Result<()>;

    /// Remove the entry matching `request`, returns whether one was removed
    async fn delete(&self, request: &CacheRequest) -> Result<bool>;

    /// Stored requests, in insertion order
    async fn keys(&self) -> Result<Vec<CacheRequest>>;
}

/// Check that a request/response pair may be stored
pub fn check_cacheable(request: &CacheRequest, response: &CachedResponse) -> Result<()> {
    if request.method != Method::GET {
        return Err(Error::MethodNotCacheable(request.method.clone()));
    }
    if response.status == StatusCode::PARTIAL_CONTENT {
        return Err(Error::PartialResponse);
    }
    if response.vary() == Vary::Any {
        return Err(Error::VaryWildcard);
    }
    Ok(())
}

/// Fetch every request and store the responses in `cache`.
///
/// All fetches run concurrently. Nothing is stored unless every fetch
/// succeeded with a 2xx status. Two requests for the same entry are
/// rejected before anything is fetched.
pub async fn add_all(
    cache: &dyn Cache,
    fetcher: &dyn Fetcher,
    requests: &[CacheRequest],
) -> Result<()> {
    let mut seen = HashSet::with_capacity(requests.len());
    for request in requests {
        let key = request.cache_key();
        if !seen.insert(key.clone()) {
            return Err(Error::DuplicateRequest { url: key });
        }
    }

    let responses = try_join_all(requests.iter().map(|request| fetch_asset(fetcher, request))).await?;
    for (request, response) in requests.iter().zip(responses) {
        cache.put(request, response).await?;
        debug!("Cached asset {} in {}", request.url, cache.name());
    }
    Ok(())
}

async fn fetch_asset(fetcher: &dyn Fetcher, request: &CacheRequest) -> Result<CachedResponse> {
    let response = fetcher.fetch(request).await?;
    if !response.status.is_success() {
        return Err(Error::BadAssetResponse {
            url: request.url.to_string(),
            status: response.status,
        });
    }
    check_cacheable(request, &response)?;
    Ok(response)
}
