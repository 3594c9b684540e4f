use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use bytes::BytesMut;
use http::HeaderMap;
use reqwest::Client;
use tracing::debug;

use super::request::{CacheRequest, CachedResponse};
use crate::{
    consts::{MAX_BODY_SIZE, USER_AGENT},
    error::{Error, Result},
    utils::copy_headers,
};

/// Network side of the interceptor: issue a request, get a response or a
/// failure
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse>;
}

/// Fetcher backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// No timeout means a hung origin hangs the fetch
    timeout: Option<Duration>,
    /// Largest response body kept in memory
    max_body: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            timeout,
            max_body: MAX_BODY_SIZE,
        })
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.max_body = limit;
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse> {
        debug!("fetch {} {}", request.method, request.url);

        let mut headers = HeaderMap::new();
        copy_headers(&request.headers, &mut headers);
        let mut forward_req = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if let Some(timeout) = self.timeout {
            forward_req = forward_req.timeout(timeout);
        }
        if !request.body.is_empty() {
            forward_req = forward_req.body(request.body.clone());
        }

        let mut res = forward_req.send().await?;
        let status = res.status();
        let too_large = || Error::BodyTooLarge {
            url: request.url.to_string(),
            limit: self.max_body,
        };
        if res
            .content_length()
            .is_some_and(|len| len > self.max_body as u64)
        {
            return Err(too_large());
        }
        let mut headers = HeaderMap::new();
        copy_headers(res.headers(), &mut headers);

        // content-length may be absent or describe the encoded body
        let mut body = BytesMut::new();
        while let Some(chunk) = res.chunk().await? {
            if body.len() + chunk.len() > self.max_body {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        let body = body.freeze();
        debug!("fetched {} {} {}", request.method, request.url, status);

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}
