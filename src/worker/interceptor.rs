use std::sync::Arc;

use futures::future::try_join_all;
use reqwest::Url;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    fetch::Fetcher,
    request::{CacheRequest, CachedResponse},
    retention::Retention,
    storage::{Cache, CacheStorage, add_all},
};
use crate::{consts::assets_default, error::Result};

/// Everything one worker version needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Name of the cache this version owns
    pub cache_name: String,
    /// Base url that asset paths and intercepted requests resolve against
    pub scope: Url,
    /// Paths stored during install
    pub assets: Vec<String>,
    pub retention: Retention,
}

impl WorkerConfig {
    pub fn new(cache_name: impl Into<String>, scope: Url) -> Self {
        Self {
            cache_name: cache_name.into(),
            scope,
            assets: assets_default(),
            retention: Retention::default(),
        }
    }

    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    pub fn asset_requests(&self) -> Result<Vec<CacheRequest>> {
        self.assets
            .iter()
            .map(|path| CacheRequest::resolve(&self.scope, path))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "HIT",
            ResponseSource::Network => "MISS",
        }
    }
}

/// Background refresh started for a cache hit
#[derive(Debug)]
pub struct Revalidation(JoinHandle<Result<CachedResponse>>);

impl Revalidation {
    /// Wait until the refresh finished, returns the fresh response
    pub async fn settled(self) -> Result<CachedResponse> {
        self.0.await?
    }
}

/// Outcome of an intercepted request
#[derive(Debug)]
pub struct Intercepted {
    pub response: CachedResponse,
    pub source: ResponseSource,
    revalidation: Option<Revalidation>,
}

impl Intercepted {
    pub(crate) fn network(response: CachedResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
            revalidation: None,
        }
    }

    /// The refresh of a cache hit. Dropping it does not stop the refresh.
    pub fn take_revalidation(&mut self) -> Option<Revalidation> {
        self.revalidation.take()
    }
}

/// Pre-caches assets on install, answers requests stale-while-revalidate
/// and cleans up caches on activate.
#[derive(Debug)]
pub struct CacheInterceptor {
    config: WorkerConfig,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheInterceptor {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            config,
            storage,
            fetcher,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Store every asset in the worker's cache, all or nothing
    pub async fn install(&self) -> Result<()> {
        info!("Attempting to install service worker and cache static assets");
        let requests = self.config.asset_requests()?;
        let cache = self.storage.open(&self.config.cache_name).await?;
        add_all(cache.as_ref(), self.fetcher.as_ref(), &requests).await?;
        info!(
            "Cached {} static assets in {}",
            requests.len(),
            self.config.cache_name
        );
        Ok(())
    }

    /// Answer `request` from the cache when possible.
    ///
    /// A network fetch is always started. It refreshes the cache in the
    /// background on a hit and is awaited on a miss, its failure is
    /// returned unchanged in that case.
    pub async fn handle_fetch(&self, request: CacheRequest) -> Result<Intercepted> {
        let cache = self.storage.open(&self.config.cache_name).await?;
        let cached = cache.match_request(&request).await?;
        let url = request.url.clone();
        let refresh = tokio::spawn(revalidate(cache, self.fetcher.clone(), request));

        match cached {
            Some(response) => {
                debug!("Cache hit {}", url);
                Ok(Intercepted {
                    response,
                    source: ResponseSource::Cache,
                    revalidation: Some(Revalidation(refresh)),
                })
            }
            None => {
                debug!("Cache miss {}", url);
                let response = refresh.await??;
                Ok(Intercepted::network(response))
            }
        }
    }

    /// Delete every cache the retention policy selects, returns their names
    pub async fn activate(&self) -> Result<Vec<String>> {
        let names = self.storage.keys().await?;
        let removed = names
            .into_iter()
            .filter(|name| {
                self.config
                    .retention
                    .should_remove(name, &self.config.cache_name)
            })
            .collect::<Vec<_>>();
        try_join_all(removed.iter().map(|name| self.storage.delete(name))).await?;
        Ok(removed)
    }
}

async fn revalidate(
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn Fetcher>,
    request: CacheRequest,
) -> Result<CachedResponse> {
    let response = match fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(err) => {
            debug!("Network fetch {} failed: {}", request.url, err);
            return Err(err);
        }
    };
    if let Err(err) = cache.put(&request, response.clone()).await {
        warn!(
            "Failed to store {} {} in {}: {}",
            request.method,
            request.url,
            cache.name(),
            err
        );
    }
    Ok(response)
}
