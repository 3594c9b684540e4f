use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{Router, extract::DefaultBodyLimit, middleware};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use http::StatusCode;
use reqwest::Url;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, info};

use crate::{
    config::SettingHost,
    consts::{MAX_BODY_SIZE, SHUTDOWN_GRACE_SECS},
    middlewares::{add_version, logging_route},
    worker::Registration,
};

pub mod error;
// 拦截所有请求
pub mod intercept;

/// Shared by every handler of a front server
#[derive(Clone, Debug)]
pub struct AppState {
    /// Origin the intercepted requests are resolved against
    pub scope: Url,
    pub registration: Arc<Registration>,
}

/// Router answering every path through the worker
///
/// ## Arguments
///
/// `state`: worker registration and origin
/// `timeout`: seconds before a request is answered with SERVICE_UNAVAILABLE
pub fn app(state: AppState, timeout: u16) -> Router {
    let router = Router::new()
        .fallback(intercept::intercept)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(add_version))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::SERVICE_UNAVAILABLE,
                    Duration::from_secs(timeout.into()),
                )),
        );

    logging_route(router)
}

/// 优雅关闭所有服务器
pub async fn shutdown_servers(handles: &mut Vec<Handle<SocketAddr>>) {
    for handle in handles.iter() {
        handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
    }
    handles.clear();
    info!("All servers have been signaled to shut down");
}

/// 启动所有服务器
///
/// 单个服务器启动失败会被记录为错误日志，不会影响其他服务器的启动
pub async fn start_servers(hosts: Vec<SettingHost>, state: AppState) -> Vec<Handle<SocketAddr>> {
    let mut handles = Vec::new();
    for host in hosts {
        let server_addr = format!("{}:{}", host.ip, host.port);
        match make_server(host, state.clone()).await {
            Ok(handle) => {
                handles.push(handle);
                info!("Server instance started on {}", server_addr);
            }
            Err(e) => {
                error!(
                    "Failed to start server instance on {}: {:?}",
                    server_addr, e
                );
            }
        }
    }
    handles
}

pub async fn make_server(
    host: SettingHost,
    state: AppState,
) -> anyhow::Result<Handle<SocketAddr>> {
    debug!("make_server start with host: {:?}", host);
    let router = app(state, host.timeout);

    let addr = format!("{}:{}", host.ip, host.port);
    let addr: SocketAddr = addr.parse()?;

    let handle = Handle::new();
    let handle_clone = handle.clone();

    // 生成一个任务来运行服务器
    tokio::spawn(async move {
        let result = if host.ssl {
            match (host.certificate, host.certificate_key) {
                (Some(cert), Some(key)) => {
                    debug!("Certificate: {} Certificate key: {}", cert, key);
                    match RustlsConfig::from_pem_file(&cert, &key).await {
                        Ok(rustls_config) => {
                            info!("Listening on https://{}", addr);
                            axum_server::bind_rustls(addr, rustls_config)
                                .handle(handle_clone)
                                .serve(router.into_make_service())
                                .await
                                .map_err(anyhow::Error::from)
                        }
                        Err(e) => Err(anyhow::Error::from(e)),
                    }
                }
                _ => Err(anyhow!("SSL enabled but certificate or key missing")),
            }
        } else {
            info!("Listening on http://{}", addr);
            axum_server::bind(addr)
                .handle(handle_clone)
                .serve(router.into_make_service())
                .await
                .map_err(anyhow::Error::from)
        };
        if let Err(e) = result {
            error!("Server on {} stopped: {:?}", addr, e);
        }
    });

    Ok(handle)
}
