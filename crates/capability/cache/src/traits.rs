//! 缓存接口 Trait 定义
//!
//! 定义远程键值缓存的异步接口 RemoteCache。
//!
//! 设计原则：
//! - 所有接口返回 CacheError
//! - 使用 async_trait 支持动态分发，真实后端与内存后端可互换
//! - 版本令牌不透明，仅支持等值比较

use crate::error::CacheError;
use crate::models::{CacheStats, CacheVersion, VersionedValue};
use async_trait::async_trait;
use std::collections::HashMap;

/// 远程键值缓存接口
///
/// 注册表解析器面向该接口编程，任何能提供这组能力的后端都可接入。
#[async_trait]
pub trait RemoteCache: Send + Sync {
    /// 无条件写入。完成后在同一会话内满足读己之写。
    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// 读取单键。键缺失返回 `None`。
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// 批量读取。结果只包含命中的键，键缺失不构成错误。
    async fn get_all(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheError>;

    /// 读取单键及其版本令牌。键缺失返回 `None`。
    async fn get_with_version(&self, key: &str) -> Result<Option<VersionedValue>, CacheError>;

    /// 条件删除：当且仅当存储版本与 `version` 相等时原子删除。
    ///
    /// 条目已被并发修改或删除时返回 `false`。
    async fn remove_with_version(
        &self,
        key: &str,
        version: &CacheVersion,
    ) -> Result<bool, CacheError>;

    /// 可用性探测。成功返回后端统计信息，失败表示后端不可达。
    async fn check_availability(&self) -> Result<CacheStats, CacheError>;
}
