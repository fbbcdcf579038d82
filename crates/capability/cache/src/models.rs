//! 缓存数据模型
//!
//! - CacheVersion：条目版本令牌（不透明，仅支持等值比较）
//! - VersionedValue：带版本的条目
//! - CacheStats：后端可用性统计

use std::collections::HashMap;

/// 条目版本令牌。
///
/// 由后端在写入时生成，调用方只能原样回传做等值比较，不得解析其内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheVersion(String);

impl CacheVersion {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 带版本的缓存条目。
#[derive(Debug, Clone)]
pub struct VersionedValue {
    pub value: String,
    pub version: CacheVersion,
}

/// 后端可用性统计（就绪检查时作为不透明元数据附带）。
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub details: HashMap<String, String>,
}
