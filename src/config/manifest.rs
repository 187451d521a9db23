//! 依赖清单解析。
//!
//! 清单是扁平的包列表，每行一个包名，可带版本约束。

use crate::errors::LaunchError;
use std::path::Path;

/// 清单中的一条依赖。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub constraint: Option<String>,
}

/// 解析后的依赖清单。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManifest {
    pub requirements: Vec<Requirement>,
    /// 以 `-` 开头的安装器选项行，例如 `--index-url`
    pub options: Vec<String>,
}

impl DependencyManifest {
    /// 读取并解析清单文件。
    ///
    /// # Errors
    ///
    /// 文件不存在时返回 [`LaunchError::ManifestMissing`]。
    pub fn read(path: &Path) -> Result<Self, LaunchError> {
        if !path.is_file() {
            return Err(LaunchError::ManifestMissing {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut manifest = Self::default();

        for line in content.lines() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('-') {
                manifest.options.push(line.to_string());
                continue;
            }

            let split_at = line
                .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | ';' | '[' | '@') || c.is_whitespace())
                .unwrap_or(line.len());
            let (name, rest) = line.split_at(split_at);
            let rest = rest.trim();

            manifest.requirements.push(Requirement {
                name: name.to_string(),
                constraint: (!rest.is_empty()).then(|| rest.to_string()),
            });
        }

        manifest
    }

    pub fn package_names(&self) -> Vec<&str> {
        self.requirements.iter().map(|r| r.name.as_str()).collect()
    }
}

// `#` 只有在行首或空白之后才是注释，URL 片段中的 `#` 不算
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    let start = line
        .char_indices()
        .find(|&(idx, c)| c == '#' && line[..idx].ends_with(char::is_whitespace))
        .map(|(idx, _)| idx);
    match start {
        Some(idx) => &line[..idx],
        None => line,
    }
}
