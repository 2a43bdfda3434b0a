//! 配置管理模块
//!
//! 提供key=value配置文件解析、加载和事件驱动的目录缓存

pub mod cache;
pub mod loader;
pub mod parser;

// 重新导出主要类型
pub use cache::ConfigCache;
pub use loader::{regular_files, DirectoryEntry, FileLoader, KeyValueLoader};
pub use parser::ParsedFile;
