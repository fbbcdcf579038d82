//! 追踪、请求 ID 生成与注册表指标。

pub mod health;

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 基础指标快照（MVP）。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
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

/// 基础指标（MVP）。
pub struct TelemetryMetrics {
    gateway_updates: AtomicU64,
    gateway_lookups_served: AtomicU64,
    gateway_lookups_missed: AtomicU64,
    instance_registrations: AtomicU64,
    instance_removals: AtomicU64,
    removal_precondition_failures: AtomicU64,
    instance_lookups_served: AtomicU64,
    instance_lookups_missed: AtomicU64,
    cache_failures: AtomicU64,
    lookup_latency_ms_total: AtomicU64,
    lookup_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            gateway_updates: AtomicU64::new(0),
            gateway_lookups_served: AtomicU64::new(0),
            gateway_lookups_missed: AtomicU64::new(0),
            instance_registrations: AtomicU64::new(0),
            instance_removals: AtomicU64::new(0),
            removal_precondition_failures: AtomicU64::new(0),
            instance_lookups_served: AtomicU64::new(0),
            instance_lookups_missed: AtomicU64::new(0),
            cache_failures: AtomicU64::new(0),
            lookup_latency_ms_total: AtomicU64::new(0),
            lookup_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            gateway_updates: self.gateway_updates.load(Ordering::Relaxed),
            gateway_lookups_served: self.gateway_lookups_served.load(Ordering::Relaxed),
            gateway_lookups_missed: self.gateway_lookups_missed.load(Ordering::Relaxed),
            instance_registrations: self.instance_registrations.load(Ordering::Relaxed),
            instance_removals: self.instance_removals.load(Ordering::Relaxed),
            removal_precondition_failures: self
                .removal_precondition_failures
                .load(Ordering::Relaxed),
            instance_lookups_served: self.instance_lookups_served.load(Ordering::Relaxed),
            instance_lookups_missed: self.instance_lookups_missed.load(Ordering::Relaxed),
            cache_failures: self.cache_failures.load(Ordering::Relaxed),
            lookup_latency_ms_total: self.lookup_latency_ms_total.load(Ordering::Relaxed),
            lookup_latency_ms_count: self.lookup_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例（MVP）。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录最近网关更新次数。
pub fn record_gateway_update() {
    metrics().gateway_updates.fetch_add(1, Ordering::Relaxed);
}

/// 记录最近网关查询命中次数。
pub fn record_gateway_lookup_served() {
    metrics()
        .gateway_lookups_served
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录最近网关查询未命中次数。
pub fn record_gateway_lookup_missed() {
    metrics()
        .gateway_lookups_missed
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录适配器实例登记次数。
pub fn record_instance_registration() {
    metrics()
        .instance_registrations
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录适配器实例注销次数。
pub fn record_instance_removal() {
    metrics().instance_removals.fetch_add(1, Ordering::Relaxed);
}

/// 记录条件注销失败次数（值或版本不匹配）。
pub fn record_removal_precondition_failure() {
    metrics()
        .removal_precondition_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录实例解析命中次数。
pub fn record_instance_lookup_served() {
    metrics()
        .instance_lookups_served
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录实例解析未命中次数。
pub fn record_instance_lookup_missed() {
    metrics()
        .instance_lookups_missed
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录缓存层故障次数。
pub fn record_cache_failure() {
    metrics().cache_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录实例解析耗时（毫秒）。
pub fn record_lookup_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .lookup_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .lookup_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
