//! # DCR Cache 模块
//!
//! 本模块提供远程键值缓存的统一抽象层，是设备连接注册表唯一的共享存储。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：定义 `RemoteCache` 异步 Trait 接口
//! 2. **数据模型层** (`models.rs`)：带版本条目与可用性统计
//! 3. **错误处理层** (`error.rs`)：统一的缓存错误类型
//! 4. **实现层**：
//!    - `in_memory.rs`：内存实现（用于测试和演示）
//!    - `redis.rs`：Redis 实现（生产环境使用）
//!
//! ## 能力集
//!
//! - 单键 put/get（无条件写入，读己之写）
//! - 多键批量 get_all（缺失键不报错，结果只含命中键）
//! - 带版本读取 get_with_version（版本为不透明等值比较令牌）
//! - 条件删除 remove_with_version（版本匹配才删除，乐观并发）
//! - 可用性探测 check_availability（就绪检查使用）
//!
//! ## 设计约束
//!
//! - 所有接口返回 `CacheError`，底层客户端错误不跨 crate 边界外泄
//! - 键的缺失不是错误：`get` 返回 `None`，`get_all` 结果中不出现
//! - 单键的写入顺序由后端串行化；跨键一致性不作保证

pub mod error;
pub mod in_memory;
pub mod models;
pub mod redis;
pub mod traits;

// 导出常用类型到 crate 根目录，方便外部引用
// （redis 模块名与 redis crate 同名，须用 crate:: 前缀消歧）
pub use crate::redis::RedisRemoteCache;
pub use error::*;
pub use in_memory::InMemoryRemoteCache;
pub use models::*;
pub use traits::*;
