use std::io;

use http::{Method, StatusCode};

#[allow(clippy::enum_variant_names)]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // from
    #[error("failed io {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode toml {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to fetch from network {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("background task failed {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("internal error {0}")]
    Any(#[from] anyhow::Error),

    // cache store
    #[error("cache name cannot be empty")]
    EmptyCacheName,
    #[error("request method {0} cannot be cached")]
    MethodNotCacheable(Method),
    #[error("partial response cannot be cached")]
    PartialResponse,
    #[error("response with `Vary: *` cannot be cached")]
    VaryWildcard,
    #[error("asset {url} responded with {status}")]
    BadAssetResponse { url: String, status: StatusCode },
    #[error("duplicate request {url}")]
    DuplicateRequest { url: String },

    // network
    #[error("fetch {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("response body of {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },

    // config
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid config: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = anyhow::Result<T, E>;
