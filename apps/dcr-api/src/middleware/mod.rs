//! 请求级中间件

pub mod context;

pub use context::*;
