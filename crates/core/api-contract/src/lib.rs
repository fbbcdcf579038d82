//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 稳定错误码清单（跨调用方对齐）。
pub mod error_codes {
    pub const INVALID_REQUEST: &str = "INVALID.REQUEST";
    pub const RESOURCE_NOT_FOUND: &str = "RESOURCE.NOT_FOUND";
    pub const PRECONDITION_FAILED: &str = "PRECONDITION.FAILED";
    pub const INTERNAL_ERROR: &str = "INTERNAL.ERROR";
}

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 记录最近网关请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLastKnownGatewayRequest {
    pub gateway_id: String,
}

/// 登记命令处理适配器实例请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAdapterInstanceRequest {
    pub adapter_instance_id: String,
}

/// 注销命令处理适配器实例请求体（值匹配才删除）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveAdapterInstanceRequest {
    pub adapter_instance_id: String,
}

/// 单项就绪检查结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessCheckDto {
    pub name: String,
    pub ready: bool,
    pub details: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 就绪检查汇总结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReportDto {
    pub ready: bool,
    pub checks: Vec<ReadinessCheckDto>,
}

/// 指标快照返回结构（MVP）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub gateway_updates: u64,
    pub gateway_lookups_served: u64,
    pub gateway_lookups_missed: u64,
    pub instance_registrations: u64,
    pub instance_removals: u64,
    pub removal_precondition_failures: u64,
    pub instance_lookups_served: u64,
    pub instance_lookups_missed: u64,
    pub cache_failures: u64,
    pub lookup_latency_ms_total: u64,
    pub lookup_latency_ms_count: u64,
}
