//! 设备连接注册表 HTTP API（管理面）与请求追踪 ID。

mod handlers;
mod middleware;
mod routes;
mod utils;

use dcr_cache::{InMemoryRemoteCache, RedisRemoteCache, RemoteCache};
use dcr_config::{AppConfig, CacheBackend};
use dcr_connection::{DeviceConnectionInfo, register_readiness_checks};
use dcr_telemetry::health::ReadinessRegistry;
use dcr_telemetry::init_tracing;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub info: Arc<DeviceConnectionInfo>,
    pub readiness: Arc<ReadinessRegistry>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 远程缓存后端：生产用 Redis，演示与测试可切内存实现
    let cache: Arc<dyn RemoteCache> = match config.cache_backend {
        CacheBackend::Redis => Arc::new(RedisRemoteCache::connect(&config.redis_url)?),
        CacheBackend::Memory => Arc::new(InMemoryRemoteCache::new()),
    };

    let info = Arc::new(
        DeviceConnectionInfo::new(cache.clone())
            .with_gateway_query_threshold(config.gateway_query_threshold),
    );

    // 就绪检查：远程缓存连通性
    let readiness = Arc::new(ReadinessRegistry::new());
    register_readiness_checks(&readiness, cache);

    let state = AppState { info, readiness };

    let app = routes::create_api_router()
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(axum::middleware::from_fn(middleware::request_context));

    tracing::info!(addr = %config.http_addr, "device connection registry listening");
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
