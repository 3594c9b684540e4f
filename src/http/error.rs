use std::fmt::Display;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use serde_repr::*;
use tracing::{error, warn};

use crate::error::Error;

#[derive(thiserror::Error, Debug)]
pub enum RouteError {
    #[error("{0}")]
    Any(#[from] anyhow::Error),
    #[error("{0}")]
    Worker(#[from] Error),
}

#[derive(Serialize_repr, Deserialize_repr, PartialEq, Debug)]
#[repr(u16)]
pub enum ErrorCode {
    InternalError = 1000,
    BadGateway = 1002,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorCode::*;

        let res = match self {
            InternalError => "服务器内部错误",
            BadGateway => "网络请求失败",
        };
        f.write_str(res)?;
        Ok(())
    }
}

/// Log and return INTERNAL_SERVER_ERROR
fn log_internal_error<T: Display>(err: T) -> (StatusCode, ErrorCode, String) {
    use ErrorCode::*;

    error!("{err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        InternalError,
        "internal server error".to_string(),
    )
}

/// Network failure on a cache miss, the client gets BAD_GATEWAY
fn log_network_error<T: Display>(err: T) -> (StatusCode, ErrorCode, String) {
    warn!("{err}");
    (
        StatusCode::BAD_GATEWAY,
        ErrorCode::BadGateway,
        err.to_string(),
    )
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        use RouteError::*;

        let (status_code, code, err_message) = match self {
            Any(err) => log_internal_error(err),
            Worker(
                err @ (Error::Fetch { .. } | Error::BodyTooLarge { .. } | Error::Reqwest(_)),
            ) => log_network_error(err),
            Worker(err) => log_internal_error(err),
        };
        let body = Json(json!({
            "code": code,
            "message": code.to_string(),
            "error": err_message
        }));
        (status_code, body).into_response()
    }
}

pub type RouteResult<T, E = RouteError> = Result<T, E>;
