use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, header::{ACCEPT_ENCODING, CONTENT_LENGTH}},
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::{AppState, error::RouteResult};
use crate::{
    utils::copy_headers,
    worker::{CacheRequest, Intercepted},
};

pub const CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

/// Every request reaching the front server goes through the active worker.
///
/// The request path and query are resolved against the worker origin, the
/// response comes either from the cache or from the network.
pub async fn intercept(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> RouteResult<impl IntoResponse> {
    let mut url = state.scope.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    debug!("intercept {} {}", method, url);

    let mut request = CacheRequest::new(method, url).with_body(body);
    copy_headers(&headers, &mut request.headers);
    // the fetcher negotiates its own coding and stores decoded bodies
    request.headers.remove(ACCEPT_ENCODING);

    let intercepted = state.registration.handle_fetch(request).await?;
    Ok(into_response(intercepted))
}

fn into_response(intercepted: Intercepted) -> Response {
    let Intercepted {
        response, source, ..
    } = intercepted;

    let mut res = Response::new(Body::from(response.body));
    *res.status_mut() = response.status;
    let headers = res.headers_mut();
    copy_headers(&response.headers, headers);
    headers.remove(CONTENT_LENGTH);
    headers.insert(CACHE_STATUS, HeaderValue::from_static(source.as_str()));
    res
}
