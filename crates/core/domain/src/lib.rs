/// 租户上下文：所有模块共享的执行上下文。
///
/// 注册表的每次操作都以租户为隔离边界，所有缓存键都带租户前缀。
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
}

impl TenantContext {
    /// 构造显式租户的执行上下文。
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
        }
    }
}

impl Default for TenantContext {
    /// 空上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self {
            tenant_id: "".to_string(),
        }
    }
}

/// 追踪跨度上下文：随每次操作透传的不透明追踪值。
///
/// 注册表不解析其内容，只在日志字段中原样携带，供下游追踪系统关联。
#[derive(Debug, Clone)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: Option<String>,
}

impl SpanContext {
    /// 构造携带 trace_id（及可选 span_id）的跨度上下文。
    pub fn new(trace_id: impl Into<String>, span_id: Option<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id,
        }
    }

    /// 无追踪调用方使用的空跨度。
    pub fn empty() -> Self {
        Self {
            trace_id: "".to_string(),
            span_id: None,
        }
    }
}
