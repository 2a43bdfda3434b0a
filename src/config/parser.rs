//! key=value 配置文件格式
//!
//! 每行以第一个 `=` 分隔键和值，键和值去除首尾空白后都不能为空，
//! 其他行被静默跳过。

use std::collections::HashMap;

/// 去除首尾空白和NUL字符
pub fn trim(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
}

/// 解析后的单个配置文件
///
/// 每次加载都整体重建，不做增量修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    values: HashMap<String, String>,
}

impl ParsedFile {
    /// 解析配置文本
    pub fn parse(content: &str) -> Self {
        let values = content
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once('=')?;
                let (key, value) = (trim(key), trim(value));
                if key.is_empty() || value.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.to_string()))
            })
            .collect();

        Self { values }
    }

    /// 查询键对应的值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParsedFile {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "debug=on\nport = 8080\n\n# comment-like line without '=' is skipped\n";

    #[test]
    fn test_example_file() {
        let parsed = ParsedFile::parse(EXAMPLE);

        assert_eq!(parsed.get("debug"), Some("on"));
        assert_eq!(parsed.get("port"), Some("8080"));
        assert_eq!(parsed.get("missing"), None);
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_values_are_trimmed() {
        let parsed = ParsedFile::parse("  name \t=\t  value with spaces  \r\n");
        assert_eq!(parsed.get("name"), Some("value with spaces"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let parsed = ParsedFile::parse("no separator\n = value\nkey = \n   =   \n");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_value_keeps_later_separators() {
        let parsed = ParsedFile::parse("url = http://host/?a=b\n");
        assert_eq!(parsed.get("url"), Some("http://host/?a=b"));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let parsed = ParsedFile::parse("k=1\nk=2\n");
        assert_eq!(parsed.get("k"), Some("2"));
    }

    #[test]
    fn test_trim_strips_nul_padding() {
        assert_eq!(trim("\0\0 name \0"), "name");
        assert_eq!(trim(" \0 "), "");
    }

    #[test]
    fn test_from_iterator() {
        let parsed: ParsedFile = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(parsed.get("b"), Some("2"));
        assert_eq!(parsed.iter().count(), 2);
    }
}
