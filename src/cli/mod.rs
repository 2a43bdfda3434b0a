//! 命令行接口模块
//!
//! 提供演示程序的CLI参数解析

pub mod args;

// 重新导出主要类型
pub use args::{Args, LogLevel};
