//! # DCR Connection 模块
//!
//! 设备连接注册表的核心：回答命令下行路径上的两个问题——
//! 某设备（或代它行事的网关）的命令当前由哪个协议适配器实例处理，
//! 以及最近一次代设备行事的网关是哪一个。
//!
//! ## 模块说明
//!
//! - [`keys`]：两套互不相交的扁平键空间编码（最近网关 / 适配器实例）
//! - [`error`]：对外错误分类（未找到 / 先决条件失败 / 参数非法 / 内部错误）
//! - [`results`]：固定线上形态的查询结果结构
//! - [`info`]：解析器 `DeviceConnectionInfo`，含两种按网关数选择的查询策略
//! - [`health`]：远程缓存连接的就绪检查
//!
//! ## 设计约束
//!
//! - 解析器自身无可变状态，共享状态全部在远程缓存里
//! - 缓存层错误一律折叠为内部错误，原因只进日志不进结果
//! - 解析器内部不做重试，重试策略归调用方

pub mod error;
pub mod health;
pub mod info;
pub mod keys;
pub mod results;

pub use error::*;
pub use health::*;
pub use info::*;
pub use results::*;
