//! 目录监控模块
//!
//! 把各平台的原生文件变更通知统一转换成 [`FileEvent`]，
//! 并在专用后台线程上逐个交给注册的事件处理器。
//!
//! 每个目标平台只编译一个后端：
//! - Linux: inotify + eventfd + poll
//! - 其他平台: `notify` crate 的 `RecommendedWatcher`

pub mod event;
pub mod records;

#[cfg(target_os = "linux")]
pub mod inotify;

#[cfg(not(target_os = "linux"))]
pub mod notify_backend;

use crate::error::WatchError;
use std::path::{Path, PathBuf};

pub use event::{FileEvent, FileEventKind};
pub use records::RecordIter;

/// 事件处理器，在监控线程上被同步调用
pub type EventHandler = Box<dyn Fn(FileEvent) + Send + 'static>;

/// 当前平台的目录监控器实现
#[cfg(target_os = "linux")]
pub type PlatformWatcher = inotify::InotifyWatcher;

/// 当前平台的目录监控器实现
#[cfg(not(target_os = "linux"))]
pub type PlatformWatcher = notify_backend::NotifyWatcher;

/// 目录监控器接口
///
/// 每个实例最多拥有一个后台通知循环。`stop` 返回后保证不会再有处理器调用。
pub trait DirectoryWatcher: Send {
    /// 开始监控目录
    ///
    /// 实例已在运行、目录无法打开或系统通知资源无法分配时返回错误，且不产生副作用。
    fn start(&mut self, path: &Path, handler: EventHandler) -> Result<(), WatchError>;

    /// 通知后台线程退出、等待其结束并释放系统资源
    ///
    /// 未启动或启动失败时调用也是安全的。
    fn stop(&mut self);

    /// 当前监控的目录
    fn watched_directory(&self) -> Option<&Path>;

    /// 是否正在监控
    fn is_active(&self) -> bool {
        self.watched_directory().is_some()
    }
}

/// 已启动实例的拒绝错误
pub(crate) fn already_watching(path: &Path) -> WatchError {
    WatchError::AlreadyWatching {
        path: PathBuf::from(path),
    }
}
