//! 演示程序设置
//!
//! TOML设置文件加上命令行/环境变量覆盖

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 设置文件名
pub const SETTINGS_FILE_NAME: &str = "confwatch.toml";

/// 一个查询项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookup {
    /// 文件名（相对于监控目录）
    pub file: String,
    /// 配置键
    pub key: String,
}

impl std::str::FromStr for Lookup {
    type Err = SettingsError;

    /// 解析 `file:key` 格式
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file, key) = s
            .split_once(':')
            .ok_or_else(|| SettingsError::Invalid(format!("查询项格式应为 file:key: {s}")))?;
        Ok(Self {
            file: file.trim().to_string(),
            key: key.trim().to_string(),
        })
    }
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.file, self.key)
    }
}

/// 日志设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// 日志级别
    pub level: String,
    /// 是否使用JSON格式
    pub json: bool,
    /// 日志文件路径，设置后不再输出到控制台
    pub file: Option<PathBuf>,
    /// 按模块覆盖的日志级别，如 `"confwatch::watcher" = "debug"`
    pub modules: HashMap<String, String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
            modules: HashMap::new(),
        }
    }
}

/// 演示程序设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 监控的配置目录
    pub directory: PathBuf,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 轮询次数，0 表示直到被中断
    pub iterations: u64,
    /// 每轮打印的查询项
    pub lookups: Vec<Lookup>,
    /// 日志设置
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("config"),
            poll_interval_ms: 1000,
            iterations: 20,
            lookups: vec![Lookup {
                file: "example".to_string(),
                key: "debug".to_string(),
            }],
            log: LogSettings::default(),
        }
    }
}

impl Settings {
    /// 从TOML文本解析设置
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| SettingsError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// 从文件加载设置，文件不存在时使用默认值
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!("设置文件不存在，使用默认设置: {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// 验证设置
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.directory.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("监控目录不能为空".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid("轮询间隔必须大于0".to_string()));
        }
        for lookup in &self.lookups {
            if lookup.file.is_empty() || lookup.key.is_empty() {
                return Err(SettingsError::Invalid(format!(
                    "查询项的文件名和键不能为空: {lookup}"
                )));
            }
        }
        Ok(())
    }
}

/// 获取默认设置文件路径
///
/// 当前目录存在 `confwatch.toml` 时使用它，否则使用用户配置目录下的文件。
pub fn default_settings_path() -> PathBuf {
    let local = PathBuf::from(SETTINGS_FILE_NAME);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("confwatch").join(SETTINGS_FILE_NAME))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_SETTINGS_TOML: &str = r#"
directory = "/etc/app/conf.d"
poll_interval_ms = 250
iterations = 0

[[lookups]]
file = "example"
key = "port"

[log]
level = "debug"
json = true

[log.modules]
"confwatch::watcher" = "trace"
"#;

    #[test]
    fn test_toml_parsing() {
        let settings = Settings::from_toml(TEST_SETTINGS_TOML).unwrap();

        assert_eq!(settings.directory, PathBuf::from("/etc/app/conf.d"));
        assert_eq!(settings.poll_interval_ms, 250);
        assert_eq!(settings.iterations, 0);
        assert_eq!(settings.lookups[0].key, "port");
        assert_eq!(settings.log.level, "debug");
        assert!(settings.log.json);
        assert_eq!(
            settings.log.modules.get("confwatch::watcher").map(String::as_str),
            Some("trace")
        );
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::from_toml("directory = \"conf\"").unwrap();
        assert_eq!(settings.poll_interval_ms, 1000);
        assert_eq!(settings.log, LogSettings::default());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = Settings::from_toml("poll_interval_ms = 0");
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let result = Settings::from_toml("directory = [");
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join(SETTINGS_FILE_NAME)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_lookup_from_str() {
        let lookup: Lookup = "example : debug".parse().unwrap();
        assert_eq!(lookup.file, "example");
        assert_eq!(lookup.key, "debug");
        assert_eq!(lookup.to_string(), "example::debug");

        assert!("no-separator".parse::<Lookup>().is_err());
    }

    #[test]
    fn test_default_settings_path() {
        let path = default_settings_path();
        assert!(path.to_string_lossy().ends_with(SETTINGS_FILE_NAME));
    }
}
