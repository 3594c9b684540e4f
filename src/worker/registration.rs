use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{
    fetch::Fetcher,
    interceptor::{CacheInterceptor, Intercepted, WorkerConfig},
    request::CacheRequest,
    storage::CacheStorage,
};
use crate::error::Result;

/// Lifecycle of the most recently registered worker version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed, or the version was replaced
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(state)
    }
}

/// Drives worker versions through install and activate, and routes
/// requests to the active one.
///
/// Only one registration runs at a time. While a new version installs
/// the previous one keeps answering requests.
#[derive(Debug)]
pub struct Registration {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    active: RwLock<Option<Arc<CacheInterceptor>>>,
    state: RwLock<WorkerState>,
    installing: Mutex<()>,
}

impl Registration {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            storage,
            fetcher,
            active: RwLock::new(None),
            state: RwLock::new(WorkerState::Parsed),
            installing: Mutex::new(()),
        }
    }

    /// Install and activate a new worker version.
    ///
    /// When install fails the version becomes redundant, the previously
    /// active one stays in place and the error is returned.
    pub async fn register(&self, config: WorkerConfig) -> Result<Arc<CacheInterceptor>> {
        let _lock = self.installing.lock().await;
        let cache_name = config.cache_name.clone();
        let worker = Arc::new(CacheInterceptor::new(
            config,
            self.storage.clone(),
            self.fetcher.clone(),
        ));

        self.set_state(WorkerState::Installing);
        if let Err(err) = worker.install().await {
            error!("Failed to install worker for {}: {}", cache_name, err);
            self.set_state(WorkerState::Redundant);
            return Err(err);
        }
        self.set_state(WorkerState::Installed);

        self.set_state(WorkerState::Activating);
        match worker.activate().await {
            Ok(removed) if !removed.is_empty() => {
                info!("Removed caches {:?}", removed);
            }
            Ok(_) => {}
            Err(err) => {
                warn!("Failed to clean up caches for {}: {}", cache_name, err);
            }
        }
        *self.active.write() = Some(worker.clone());
        self.set_state(WorkerState::Activated);
        info!("Worker for {} activated", cache_name);

        Ok(worker)
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write() = state;
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    pub fn active(&self) -> Option<Arc<CacheInterceptor>> {
        self.active.read().clone()
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Route `request` through the active worker. Without one the request
    /// goes straight to the network.
    pub async fn handle_fetch(&self, request: CacheRequest) -> Result<Intercepted> {
        match self.active() {
            Some(worker) => worker.handle_fetch(request).await,
            None => {
                let response = self.fetcher.fetch(&request).await?;
                Ok(Intercepted::network(response))
            }
        }
    }
}
