//! confwatch - 实时重载的目录配置缓存
//!
//! 监控一个目录下的 key=value 配置文件，在内存中维护每个文件的解析结果：
//! - 跨平台的目录监控（Linux inotify，其他平台 notify）
//! - 初始扫描与实时事件流的合并
//! - 不访问磁盘的并发查询
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod settings;
pub mod watcher;

// 重新导出主要类型
pub use config::{ConfigCache, FileLoader, KeyValueLoader, ParsedFile};
pub use error::{LoadError, SettingsError, WatchError};
pub use watcher::{DirectoryWatcher, FileEvent, FileEventKind, PlatformWatcher};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
