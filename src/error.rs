//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 目录监控错误类型
#[derive(Error, Debug)]
pub enum WatchError {
    /// 实例已经在监控某个目录
    #[error("已经在监控目录: {path}")]
    AlreadyWatching { path: PathBuf },

    /// 无法创建系统通知实例
    #[error("创建文件通知实例失败: {0}")]
    OpenNotifier(#[source] std::io::Error),

    /// 无法为目录注册监控
    #[error("无法监控目录 {path}: {source}")]
    AddWatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 无法创建关闭信号
    #[error("创建关闭信号失败: {0}")]
    ShutdownSignal(#[source] std::io::Error),

    /// 无法启动后台线程
    #[error("启动监控线程失败: {0}")]
    SpawnThread(#[source] std::io::Error),

    /// 无法枚举目录
    #[error("无法读取目录 {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 平台后端错误
    #[error("监控后端错误: {0}")]
    Backend(String),
}

/// 配置文件加载错误类型
#[derive(Error, Debug)]
pub enum LoadError {
    /// 文件读取失败
    #[error("读取文件失败 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 应用设置错误类型
#[derive(Error, Debug)]
pub enum SettingsError {
    /// 设置文件读取失败
    #[error("读取设置文件失败 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 设置文件解析失败
    #[error("设置文件解析失败: {0}")]
    Parse(String),

    /// 设置验证失败
    #[error("设置验证失败: {0}")]
    Invalid(String),
}
