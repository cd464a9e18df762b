use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

use crate::error::SearchError;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// token 不正确
#[derive(Debug, Error)]
#[error("鉴权失败")]
pub struct Unauthorized;

/// API错误类型
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if self.0.is::<Unauthorized>() {
            return StatusCode::UNAUTHORIZED;
        }
        match self.0.downcast_ref::<SearchError>() {
            Some(SearchError::ServiceUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Some(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Some(SearchError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            Some(SearchError::UpstreamFailure(_)) => StatusCode::BAD_GATEWAY,
            Some(SearchError::ImageDecode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!("请求失败: {:#}", self.0);
        } else {
            warn!("请求失败: {:#}", self.0);
        }
        (status, Json(json!({ "error": format!("{:#}", self.0) }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
