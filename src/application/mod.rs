use std::net::SocketAddr;
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result};
use axum_server::Handle;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::Settings;
use crate::consts::{ARCH, COMMIT, COMPILER, NAME, OS, VERSION};
use crate::http::{AppState, shutdown_servers, start_servers};
use crate::utils::init_logger;
use crate::worker::{HttpFetcher, MemoryCacheStorage, Registration};

pub type ServerHandles = Arc<Mutex<Vec<Handle<SocketAddr>>>>;

/// 初始化日志系统，返回的 guard 需要一直持有
pub fn initialize_logger(settings: &Settings) -> Result<WorkerGuard> {
    let guard = init_logger(settings.log_level.as_str(), settings.log_folder.as_str())
        .with_context(|| "Failed to initialize logger")?;
    info!("{} v{} ({})", NAME, VERSION, COMMIT);
    info!("Compiler: {}", COMPILER);
    info!("OS: {} {}", OS, ARCH);
    debug!("Configuration: {:?}", settings);
    Ok(guard)
}

/// Install and activate the configured worker against a fresh store
pub async fn build_registration(settings: &Settings) -> Result<Arc<Registration>> {
    let fetcher = HttpFetcher::new(settings.worker.fetch_timeout())
        .with_context(|| "Failed to build network client")?;
    let registration = Registration::new(Arc::new(MemoryCacheStorage::new()), Arc::new(fetcher));
    let config = settings.worker.worker_config()?;
    registration
        .register(config)
        .await
        .with_context(|| format!("Failed to install worker {}", settings.worker.cache_name))?;
    Ok(Arc::new(registration))
}

/// 启动初始服务器实例
pub async fn start_initial_servers(
    settings: &Settings,
    registration: Arc<Registration>,
) -> Result<ServerHandles> {
    let state = AppState {
        scope: settings.worker.scope()?,
        registration,
    };
    let handles = start_servers(settings.host.clone(), state).await;
    Ok(Arc::new(Mutex::new(handles)))
}

/// 处理配置文件变更的回调函数
///
/// A new worker version is registered first. Servers are only restarted
/// when it activated, otherwise the running version keeps serving.
pub async fn handle_config_change(
    result: crate::error::Result<Settings>,
    registration: Arc<Registration>,
    handles: ServerHandles,
) {
    let new_settings = match result {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to reload config file: {:?}", e);
            return;
        }
    };
    info!("Config file reloaded successfully");

    let state = match reload_worker(&new_settings, registration).await {
        Ok(state) => state,
        Err(e) => {
            error!("Keeping current worker: {:?}", e);
            return;
        }
    };

    info!("Config file changed, restarting servers to apply new config...");
    let mut current_handles = handles.lock().await;
    shutdown_servers(&mut current_handles).await;
    *current_handles = start_servers(new_settings.host, state).await;
    info!("All servers have been restarted successfully");
}

async fn reload_worker(settings: &Settings, registration: Arc<Registration>) -> Result<AppState> {
    let config = settings.worker.worker_config()?;
    let scope = config.scope.clone();
    registration.register(config).await?;
    Ok(AppState {
        scope,
        registration,
    })
}

/// 优雅关闭服务器和配置监听器
pub async fn shutdown_application(handles: ServerHandles, stop_tx: mpsc::Sender<()>) {
    info!("Received shutdown signal, closing servers...");

    // 优雅关闭所有服务器
    let mut current_handles = handles.lock().await;
    shutdown_servers(&mut current_handles).await;

    // 停止配置监听
    if let Err(err) = stop_tx.send(()) {
        error!("Failed to send stop signal to config watcher: {:?}", err);
    }

    info!("Application shutdown complete");
}
