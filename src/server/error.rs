use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::errors::Error;

/// API错误类型
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl AppError {
    pub fn unauthorized() -> Self {
        Self { status: StatusCode::UNAUTHORIZED, error: anyhow::anyhow!("无效的 token") }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 输入类错误（维数不匹配、退化向量）是客户端的问题
        let status = match self.error.downcast_ref::<Error>() {
            Some(Error::DimensionMismatch { .. } | Error::DegenerateVector) => {
                StatusCode::BAD_REQUEST
            }
            _ => self.status,
        };
        (status, format!("Something went wrong: {}", self.error)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, error: err.into() }
    }
}
