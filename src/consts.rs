use std::env;

use const_format::concatcp;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const OS: &str = env::consts::OS;
pub const ARCH: &str = env::consts::ARCH;
pub const COMPILER: &str = env!("SW_COMPILER");
pub const COMMIT: &str = env!("SW_COMMIT");

/// Sent to the origin when the intercepted request has no user agent
pub const USER_AGENT: &str = concatcp!(NAME, "/", VERSION);

/// Request and response bodies are buffered up to this size
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Grace period for in-flight requests when a server is shut down
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

// config defaults
pub const CACHE_NAME: &str = "pages-cache-v1";
pub fn cache_name_default() -> String {
    CACHE_NAME.to_string()
}

pub const ASSETS: [&str; 2] = ["/", "index.html"];
pub fn assets_default() -> Vec<String> {
    ASSETS.map(|a| a.to_string()).to_vec()
}

pub const TIMEOUT_DEFAULT: u16 = 75;
pub fn timeout_default() -> u16 {
    TIMEOUT_DEFAULT
}

pub const LOG_LEVEL: &str = "info";
pub fn log_level_default() -> String {
    LOG_LEVEL.to_string()
}

pub const LOG_FOLDER: &str = "./logs";
pub fn log_folder_default() -> String {
    LOG_FOLDER.to_string()
}
