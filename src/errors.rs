// 错误类型定义
// 所有处理器级别的错误在边界处转换为统一的JSON错误信封

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use crate::models::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 必填字段缺失或格式错误，不会调用网关
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 网关返回非2xx或不可解析的响应
    #[error("Upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// 回调验签失败
    #[error("Signature verification failed: {0}")]
    Signature(String),

    /// 缺少必需的环境配置
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 错误信封中的业务码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "40000",
            ApiError::Signature(_) => "40300",
            ApiError::Upstream { .. } => "50200",
            ApiError::Configuration(_) | ApiError::Internal(_) => "50000",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Signature(_) => StatusCode::FORBIDDEN,
            ApiError::Upstream { status, .. } => status
                .filter(|s| *s >= 400)
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ApiError::Configuration(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ApiResponse::error(self.code(), message))
    }
}
