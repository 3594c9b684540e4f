//! 集成测试的公共辅助函数和工具

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use swcache::application::{ServerHandles, build_registration, start_initial_servers};
use swcache::config::Settings;
use swcache::worker::Registration;

/// 测试服务器配置
#[derive(Debug)]
pub struct TestServerConfig {
    pub origin: String,
    pub cache_name: String,
    pub fetch_timeout: Option<u64>,
    pub timeout: u16,
}

impl TestServerConfig {
    pub fn new(origin: &MockServer) -> Self {
        Self {
            origin: format!("{}/", origin.uri()),
            cache_name: "pages-cache-v1".to_string(),
            fetch_timeout: None,
            timeout: 75,
        }
    }

    /// 生成配置文件内容，端口为 0 由系统分配
    pub fn to_toml(&self) -> String {
        let mut content = String::new();
        content.push_str("log_level = \"debug\"\n\n");
        content.push_str("[worker]\n");
        content.push_str(&format!("cache_name = \"{}\"\n", self.cache_name));
        content.push_str(&format!("origin = \"{}\"\n", self.origin));
        if let Some(fetch_timeout) = self.fetch_timeout {
            content.push_str(&format!("fetch_timeout = {fetch_timeout}\n"));
        }
        content.push_str("\n[[host]]\n");
        content.push_str("ip = \"127.0.0.1\"\n");
        content.push_str("port = 0\n");
        content.push_str(&format!("timeout = {}\n", self.timeout));
        content
    }
}

/// 创建临时配置文件用于测试，TempDir 需要在测试期间一直持有
pub fn create_temp_config(config: &TestServerConfig) -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, config.to_toml())?;
    Ok((temp_dir, config_path))
}

/// 启动一个模拟源站，提供默认的预缓存资源
pub async fn start_origin() -> MockServer {
    let server = MockServer::start().await;
    mount_assets(&server, "root v1", "index v1").await;
    server
}

pub async fn mount_assets(server: &MockServer, root: &str, index: &str) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("vary", "Accept-Encoding")
                .set_body_raw(root, "text/html"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("vary", "Accept-Encoding")
                .set_body_raw(index, "text/html"),
        )
        .mount(server)
        .await;
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub registration: Arc<Registration>,
    pub handles: ServerHandles,
    _config_dir: TempDir,
}

/// 启动测试服务器
pub async fn start_test_server(config: &TestServerConfig) -> Result<TestServer> {
    let (config_dir, config_path) = create_temp_config(config)?;
    let settings = Settings::new(&config_path)?;

    let registration = build_registration(&settings).await?;
    let handles = start_initial_servers(&settings, registration.clone()).await?;
    let handle = handles
        .lock()
        .await
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no server started"))?;
    let addr = get_server_addr(&handle).await;

    Ok(TestServer {
        addr,
        registration,
        handles,
        _config_dir: config_dir,
    })
}

/// 获取服务器实际监听地址
pub async fn get_server_addr(handle: &axum_server::Handle<SocketAddr>) -> SocketAddr {
    handle.listening().await.expect("Server not listening")
}

/// 发送HTTP请求到测试服务器
pub async fn send_test_request(addr: SocketAddr, path: &str) -> Result<reqwest::Response> {
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;
    let url = format!("http://{}{}", addr, path);

    client.get(&url).send().await.map_err(Into::into)
}

pub fn cache_status(res: &reqwest::Response) -> &str {
    res.headers()
        .get("x-cache-status")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
