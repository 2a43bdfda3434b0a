//! 命令行参数定义
//!
//! 使用clap定义演示程序的命令行接口，命令行参数覆盖设置文件

use crate::error::SettingsError;
use crate::settings::{default_settings_path, Lookup, Settings};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// confwatch - 实时重载的目录配置缓存
#[derive(Parser, Debug, Clone)]
#[command(
    name = "confwatch",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 设置文件路径
    #[arg(short, long, value_name = "FILE", env = "CONFWATCH_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// 监控的配置目录
    #[arg(short, long, value_name = "DIR", env = "CONFWATCH_DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// 轮询间隔（毫秒）
    #[arg(short, long, value_name = "MILLIS", env = "CONFWATCH_INTERVAL")]
    pub interval: Option<u64>,

    /// 轮询次数，0 表示直到被中断
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub iterations: Option<u64>,

    /// 每轮打印的查询项，可重复
    #[arg(long = "lookup", value_name = "FILE:KEY")]
    pub lookups: Vec<Lookup>,

    /// 日志级别
    #[arg(short, long, value_enum, env = "CONFWATCH_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// 使用JSON格式输出日志
    #[arg(long)]
    pub json_log: bool,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl LogLevel {
    /// 从设置文件中的字符串解析，大小写不敏感
    pub fn parse(level: &str) -> Result<Self, SettingsError> {
        <Self as ValueEnum>::from_str(level, true)
            .map_err(|_| SettingsError::Invalid(format!("未知的日志级别: {level}")))
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl Args {
    /// 获取设置文件路径
    pub fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(default_settings_path)
    }

    /// 用命令行参数覆盖设置并重新验证
    pub fn apply(&self, mut settings: Settings) -> Result<Settings, SettingsError> {
        if let Some(directory) = &self.directory {
            settings.directory = directory.clone();
        }
        if let Some(interval) = self.interval {
            settings.poll_interval_ms = interval;
        }
        if let Some(iterations) = self.iterations {
            settings.iterations = iterations;
        }
        if !self.lookups.is_empty() {
            settings.lookups = self.lookups.clone();
        }
        if let Some(level) = self.log_level {
            settings.log.level = level.to_string();
        }
        if self.json_log {
            settings.log.json = true;
        }

        settings.validate()?;
        LogLevel::parse(&settings.log.level)?;
        Ok(settings)
    }
}
