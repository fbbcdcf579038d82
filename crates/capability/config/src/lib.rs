//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 缓存后端选择。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// 生产环境：Redis 远程缓存
    Redis,
    /// 本地演示与测试：进程内缓存
    Memory,
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub redis_url: String,
    pub cache_backend: CacheBackend,
    pub gateway_query_threshold: usize,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr = env::var("DCR_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let redis_url =
            env::var("DCR_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let cache_backend = read_cache_backend("DCR_CACHE_BACKEND", CacheBackend::Redis)?;
        let gateway_query_threshold = read_usize_with_default("DCR_GATEWAY_QUERY_THRESHOLD", 3)?;

        Ok(Self {
            http_addr,
            redis_url,
            cache_backend,
            gateway_query_threshold,
        })
    }
}

fn read_cache_backend(key: &str, default: CacheBackend) -> Result<CacheBackend, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.to_ascii_lowercase().as_str() {
        "redis" => Ok(CacheBackend::Redis),
        "memory" => Ok(CacheBackend::Memory),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}
