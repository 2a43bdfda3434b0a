//! 配置文件加载器实现
//!
//! 提供单个配置文件的读取解析和监控目录的枚举

use crate::config::parser::{trim, ParsedFile};
use crate::error::{LoadError, WatchError};
use std::path::{Path, PathBuf};

/// 配置加载器trait，定义单个文件的加载接口
///
/// 在监控线程和调用 `watch_directory` 的线程上被调用，必须线程安全。
pub trait FileLoader: Send + Sync + 'static {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<ParsedFile, LoadError>` - 解析结果或读取错误
    fn load(&self, path: &Path) -> Result<ParsedFile, LoadError>;

    /// 加载配置，无法读取时返回空映射
    fn load_or_default(&self, path: &Path) -> ParsedFile {
        match self.load(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("{e}，使用空配置");
                ParsedFile::default()
            }
        }
    }
}

/// key=value 文本文件加载器
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueLoader;

impl KeyValueLoader {
    pub fn new() -> Self {
        Self
    }
}

impl FileLoader for KeyValueLoader {
    fn load(&self, path: &Path) -> Result<ParsedFile, LoadError> {
        let content = std::fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = ParsedFile::parse(&String::from_utf8_lossy(&content));
        log::debug!("加载配置文件: {} ({} 项)", path.display(), parsed.len());

        Ok(parsed)
    }
}

/// 目录中的一个常规文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// 去除首尾空白后的文件名，即缓存键
    pub filename: String,
    /// 完整路径
    pub path: PathBuf,
}

/// 枚举目录下的常规文件（不递归）
///
/// 子目录、指向目录的符号链接和特殊文件被跳过；单个条目读取失败只记录警告。
pub fn regular_files(directory: &Path) -> Result<Vec<DirectoryEntry>, WatchError> {
    let entries = std::fs::read_dir(directory).map_err(|source| WatchError::ReadDirectory {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("读取目录条目失败 {}: {}", directory.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = trim(&entry.file_name().to_string_lossy()).to_string();
        if filename.is_empty() {
            continue;
        }
        files.push(DirectoryEntry { filename, path });
    }

    Ok(files)
}
