//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers。
//! 路由包括：
//! - 健康检查：/health, /livez, /readyz
//! - 指标快照：/metrics
//! - 最近网关：/tenants/{tid}/devices/{did}/last-known-gateway
//! - 适配器实例登记：/tenants/{tid}/devices/{did}/adapter-instance
//! - 适配器实例解析：/tenants/{tid}/devices/{did}/adapter-instances

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, put},
};

/// 创建 API 路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .route("/metrics", get(get_metrics))
        .route(
            "/tenants/:tenant_id/devices/:device_id/last-known-gateway",
            get(get_last_known_gateway).put(set_last_known_gateway),
        )
        .route(
            "/tenants/:tenant_id/devices/:device_id/adapter-instance",
            put(set_adapter_instance).delete(remove_adapter_instance),
        )
        .route(
            "/tenants/:tenant_id/devices/:device_id/adapter-instances",
            get(get_adapter_instances),
        )
}
