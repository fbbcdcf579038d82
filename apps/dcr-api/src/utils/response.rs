//! HTTP 响应辅助函数
//!
//! 提供统一的错误响应构造函数与注册表错误到 HTTP 状态码的映射：
//! - bad_request_error / not_found_error / precondition_failed_error / internal_error
//! - connection_error：ConnectionError 统一出口
//!
//! 设计原则：
//! - 所有错误返回统一的 ApiResponse 格式
//! - HTTP 状态码与稳定错误码对应
//! - 内部错误细节只进日志，不回给调用方

use api_contract::{ApiResponse, error_codes};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dcr_connection::ConnectionError;

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            error_codes::INVALID_REQUEST,
            message.into(),
        )),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(
            error_codes::RESOURCE_NOT_FOUND,
            "not found",
        )),
    )
        .into_response()
}

/// 先决条件失败错误响应（条件注销的值或版本不匹配）
pub fn precondition_failed_error() -> Response {
    (
        StatusCode::PRECONDITION_FAILED,
        Json(ApiResponse::<()>::error(
            error_codes::PRECONDITION_FAILED,
            "precondition failed",
        )),
    )
        .into_response()
}

/// 内部错误响应
pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error(
            error_codes::INTERNAL_ERROR,
            "internal error",
        )),
    )
        .into_response()
}

/// 注册表错误统一出口
pub fn connection_error(err: ConnectionError) -> Response {
    match err {
        ConnectionError::NotFound => not_found_error(),
        ConnectionError::PreconditionFailed => precondition_failed_error(),
        ConnectionError::InvalidArgument(message) => bad_request_error(message),
        ConnectionError::Internal(_) => {
            tracing::error!(error = %err, "cache failure");
            dcr_telemetry::record_cache_failure();
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use dcr_cache::CacheError;
    use http_body_util::BodyExt;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn not_found_error_contract() {
        let response = not_found_error();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], error_codes::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn precondition_failed_error_contract() {
        let response = precondition_failed_error();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], error_codes::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn connection_error_maps_internal_without_leaking_cause() {
        let response = connection_error(ConnectionError::Internal(CacheError::new(
            "connection refused to 10.0.0.7:6379",
        )));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], error_codes::INTERNAL_ERROR);
        assert_eq!(json["error"]["message"], "internal error");
    }

    #[tokio::test]
    async fn connection_error_maps_invalid_argument() {
        let response =
            connection_error(ConnectionError::InvalidArgument("device_id required".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], error_codes::INVALID_REQUEST);
    }
}
