//! 文件变更事件模型

use crate::config::parser::trim;
use std::fmt;

/// 文件变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    /// 文件创建（包括重命名后的新名字）
    Created,
    /// 文件内容变更
    Changed,
    /// 文件删除（包括重命名前的旧名字）
    Removed,
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileEventKind::Created => write!(f, "created"),
            FileEventKind::Changed => write!(f, "changed"),
            FileEventKind::Removed => write!(f, "removed"),
        }
    }
}

/// 文件变更事件
///
/// 文件名相对于被监控目录，构造时已去除首尾空白和NUL字符。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    kind: FileEventKind,
    filename: String,
}

impl FileEvent {
    /// 创建新的文件事件
    pub fn new(kind: FileEventKind, filename: impl AsRef<str>) -> Self {
        Self {
            kind,
            filename: trim(filename.as_ref()).to_string(),
        }
    }

    pub fn created(filename: impl AsRef<str>) -> Self {
        Self::new(FileEventKind::Created, filename)
    }

    pub fn changed(filename: impl AsRef<str>) -> Self {
        Self::new(FileEventKind::Changed, filename)
    }

    pub fn removed(filename: impl AsRef<str>) -> Self {
        Self::new(FileEventKind::Removed, filename)
    }

    /// 变更类型
    pub fn kind(&self) -> FileEventKind {
        self.kind
    }

    /// 相对文件名
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.filename)
    }
}
