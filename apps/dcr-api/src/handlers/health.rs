//! 健康与就绪检查 handlers
//!
//! - GET /health - 进程健康（兼容旧探针路径）
//! - GET /livez - 存活检查（注册表存活性等同进程，恒定 OK）
//! - GET /readyz - 就绪检查（逐项执行注册表，任一失败即 503）

use crate::AppState;
use api_contract::{ApiResponse, ReadinessCheckDto, ReadinessReportDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn livez() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn readyz(State(state): State<AppState>) -> Response {
    let report = state.readiness.run().await;
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let dto = ReadinessReportDto {
        ready: report.ready,
        checks: report
            .checks
            .into_iter()
            .map(|check| ReadinessCheckDto {
                name: check.name,
                ready: check.ready,
                details: check.details,
                error: check.error,
            })
            .collect(),
    };
    (status, Json(ApiResponse::success(dto))).into_response()
}
