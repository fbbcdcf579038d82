//! 设备连接注册表 handlers
//!
//! 提供命令下行路径所需的注册表操作接口：
//! - GET /tenants/{tid}/devices/{did}/last-known-gateway - 查询最近网关
//! - PUT /tenants/{tid}/devices/{did}/last-known-gateway - 记录最近网关
//! - PUT /tenants/{tid}/devices/{did}/adapter-instance - 登记命令处理适配器实例
//! - DELETE /tenants/{tid}/devices/{did}/adapter-instance - 条件注销适配器实例
//! - GET /tenants/{tid}/devices/{did}/adapter-instances?via=gw-1,gw-2 - 解析适配器实例
//!
//! 调用方认证由上游网关完成；标识符合法性由注册表在任何缓存访问前校验。

use crate::AppState;
use crate::utils::normalize_required;
use crate::utils::response::{connection_error, not_found_error, precondition_failed_error};
use api_contract::{
    ApiResponse, RemoveAdapterInstanceRequest, SetAdapterInstanceRequest,
    SetLastKnownGatewayRequest,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dcr_connection::ConnectionError;
use dcr_telemetry::RequestIds;
use domain::{SpanContext, TenantContext};
use std::collections::HashSet;
use std::time::Instant;

#[derive(serde::Deserialize)]
pub struct DevicePath {
    tenant_id: String,
    device_id: String,
}

#[derive(serde::Deserialize)]
pub struct InstancesQuery {
    /// 逗号分隔的可代行网关集合
    via: Option<String>,
}

fn span_from(ids: &RequestIds) -> SpanContext {
    SpanContext::new(ids.trace_id.clone(), Some(ids.request_id.clone()))
}

fn parse_via(raw: Option<String>) -> HashSet<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// 记录设备的最近网关
pub async fn set_last_known_gateway(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    Extension(ids): Extension<RequestIds>,
    Json(req): Json<SetLastKnownGatewayRequest>,
) -> Response {
    let gateway_id = match normalize_required(req.gateway_id, "gatewayId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let ctx = TenantContext::new(path.tenant_id);
    let span = span_from(&ids);
    match state
        .info
        .set_last_known_gateway(&ctx, &path.device_id, &gateway_id, &span)
        .await
    {
        Ok(()) => {
            dcr_telemetry::record_gateway_update();
            (StatusCode::OK, Json(ApiResponse::success(()))).into_response()
        }
        Err(err) => connection_error(err),
    }
}

/// 查询设备的最近网关
pub async fn get_last_known_gateway(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    Extension(ids): Extension<RequestIds>,
) -> Response {
    let ctx = TenantContext::new(path.tenant_id);
    let span = span_from(&ids);
    match state
        .info
        .get_last_known_gateway(&ctx, &path.device_id, &span)
        .await
    {
        Ok(result) => {
            dcr_telemetry::record_gateway_lookup_served();
            (StatusCode::OK, Json(ApiResponse::success(result))).into_response()
        }
        Err(ConnectionError::NotFound) => {
            dcr_telemetry::record_gateway_lookup_missed();
            not_found_error()
        }
        Err(err) => connection_error(err),
    }
}

/// 登记设备的命令处理适配器实例
pub async fn set_adapter_instance(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    Extension(ids): Extension<RequestIds>,
    Json(req): Json<SetAdapterInstanceRequest>,
) -> Response {
    let adapter_instance_id = match normalize_required(req.adapter_instance_id, "adapterInstanceId")
    {
        Ok(value) => value,
        Err(response) => return response,
    };
    let ctx = TenantContext::new(path.tenant_id);
    let span = span_from(&ids);
    match state
        .info
        .set_command_handling_adapter_instance(&ctx, &path.device_id, &adapter_instance_id, &span)
        .await
    {
        Ok(()) => {
            dcr_telemetry::record_instance_registration();
            (StatusCode::OK, Json(ApiResponse::success(()))).into_response()
        }
        Err(err) => connection_error(err),
    }
}

/// 条件注销设备的命令处理适配器实例
///
/// 仅当存储值与请求声称的实例一致且期间未被并发更新才删除；
/// 不一致返回 412，表示该实例已不再持有此设备。
pub async fn remove_adapter_instance(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    Extension(ids): Extension<RequestIds>,
    Json(req): Json<RemoveAdapterInstanceRequest>,
) -> Response {
    let adapter_instance_id = match normalize_required(req.adapter_instance_id, "adapterInstanceId")
    {
        Ok(value) => value,
        Err(response) => return response,
    };
    let ctx = TenantContext::new(path.tenant_id);
    let span = span_from(&ids);
    match state
        .info
        .remove_command_handling_adapter_instance(
            &ctx,
            &path.device_id,
            &adapter_instance_id,
            &span,
        )
        .await
    {
        Ok(()) => {
            dcr_telemetry::record_instance_removal();
            (StatusCode::OK, Json(ApiResponse::success(()))).into_response()
        }
        Err(ConnectionError::PreconditionFailed) => {
            dcr_telemetry::record_removal_precondition_failure();
            precondition_failed_error()
        }
        Err(err) => connection_error(err),
    }
}

/// 解析可处理设备命令的适配器实例
pub async fn get_adapter_instances(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    Query(query): Query<InstancesQuery>,
    Extension(ids): Extension<RequestIds>,
) -> Response {
    let via_gateways = parse_via(query.via);
    let ctx = TenantContext::new(path.tenant_id);
    let span = span_from(&ids);
    let started = Instant::now();
    match state
        .info
        .get_command_handling_adapter_instances(&ctx, &path.device_id, &via_gateways, &span)
        .await
    {
        Ok(result) => {
            dcr_telemetry::record_instance_lookup_served();
            dcr_telemetry::record_lookup_latency_ms(started.elapsed().as_millis() as u64);
            (StatusCode::OK, Json(ApiResponse::success(result))).into_response()
        }
        Err(ConnectionError::NotFound) => {
            dcr_telemetry::record_instance_lookup_missed();
            not_found_error()
        }
        Err(err) => connection_error(err),
    }
}
