//! 注册表错误类型定义

use dcr_cache::CacheError;

/// 注册表操作错误
///
/// 缓存层错误一律折叠为 `Internal`，原因保留用于日志，
/// 不会以底层客户端错误的形态跨出本 crate。
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// 所需映射不存在
    #[error("not found")]
    NotFound,

    /// 条件删除遇到值不匹配或并发更新
    #[error("precondition failed")]
    PreconditionFailed,

    /// 必需标识符缺失或含非法字符
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// 缓存层故障
    #[error("cache failure: {0}")]
    Internal(#[from] CacheError),
}
