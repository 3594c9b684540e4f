use bytes::Bytes;
use http::{
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    header::{ACCEPT_ENCODING, VARY},
};
use reqwest::Url;

use crate::error::{Error, Result};

/// An outgoing resource request as seen by the interceptor.
///
/// The method, the URL and the headers together describe the request;
/// the body is only forwarded to the network and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CacheRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Build a GET request for `path` relative to `scope`
    ///
    /// ## Arguments
    ///
    /// `scope`: base url of the worker, usually the origin root
    /// `path`: absolute (`/index.html`) or relative (`index.html`) path
    pub fn resolve(scope: &Url, path: &str) -> Result<Self> {
        let url = scope.join(path).map_err(|err| Error::InvalidUrl {
            url: path.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::get(url))
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The url used to look up entries, fragment removed
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }

    /// Same request without its body, as kept next to a stored response
    pub(crate) fn descriptor(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: Bytes::new(),
        }
    }
}

/// Snapshot of a response: status, headers and the fully read body.
///
/// `Bytes` makes a clone cheap, one copy is handed to the caller and
/// another one is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn vary(&self) -> Vary {
        Vary::from_headers(&self.headers)
    }
}

/// Parsed `Vary` response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Vary {
    Nothing,
    Any,
    Headers(Vec<HeaderName>),
}

impl Vary {
    fn from_headers(headers: &HeaderMap) -> Self {
        let mut names = Vec::new();
        for value in headers.get_all(VARY) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for field in value.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                if field == "*" {
                    return Vary::Any;
                }
                if let Ok(name) = HeaderName::from_bytes(field.to_ascii_lowercase().as_bytes()) {
                    names.push(name);
                }
            }
        }
        if names.is_empty() {
            Vary::Nothing
        } else {
            Vary::Headers(names)
        }
    }

    /// Whether a request carrying `request` headers may be answered by an
    /// entry stored for a request that carried `stored` headers.
    ///
    /// `Accept-Encoding` never takes part: content coding is negotiated by
    /// the fetcher and the stored body is already decoded.
    pub(crate) fn matches(&self, stored: &HeaderMap, request: &HeaderMap) -> bool {
        match self {
            Vary::Nothing => true,
            Vary::Any => false,
            Vary::Headers(names) => names
                .iter()
                .filter(|name| **name != ACCEPT_ENCODING)
                .all(|name| {
                    stored
                        .get_all(name)
                        .iter()
                        .eq(request.get_all(name).iter())
                }),
        }
    }
}
