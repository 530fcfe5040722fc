//! 共享库
//!
//! 包含条件引擎与命令行工具共用的配置和可观测性基础设施代码。

pub mod config;
pub mod observability;
