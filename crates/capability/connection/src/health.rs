//! 远程缓存连接的就绪检查。
//!
//! 注册表与远程缓存的连通性决定其能否服务查询，
//! 因此作为就绪检查暴露；存活性等同于宿主进程，不单独提供。

use async_trait::async_trait;
use dcr_cache::RemoteCache;
use dcr_telemetry::health::{ProbeError, ReadinessProbe, ReadinessRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// 缓存连接检查的注册名称。
pub const CACHE_READINESS_CHECK_NAME: &str = "remote-cache-connection";

/// 探测超时上限（毫秒）。超时按未就绪处理。
const CACHE_READINESS_TIMEOUT_MS: u64 = 1000;

/// 远程缓存可用性探测。
pub struct CacheAvailabilityProbe {
    cache: Arc<dyn RemoteCache>,
}

impl CacheAvailabilityProbe {
    pub fn new(cache: Arc<dyn RemoteCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ReadinessProbe for CacheAvailabilityProbe {
    async fn probe(&self) -> Result<HashMap<String, String>, ProbeError> {
        match self.cache.check_availability().await {
            Ok(stats) => Ok(stats.details),
            Err(err) => Err(ProbeError::new(err.to_string())),
        }
    }
}

/// 将缓存连接检查注册到就绪注册表。
pub fn register_readiness_checks(registry: &ReadinessRegistry, cache: Arc<dyn RemoteCache>) {
    registry.register(
        CACHE_READINESS_CHECK_NAME,
        CACHE_READINESS_TIMEOUT_MS,
        Arc::new(CacheAvailabilityProbe::new(cache)),
    );
}
