//! 启动器的配置模块。
//!
//! 该模块负责从 `.env` 文件和进程环境变量加载配置。
//! 配置只在启动时读取一次，之后只读。

pub mod manifest;

use crate::errors::LaunchError;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use tracing::debug;

pub use manifest::{DependencyManifest, Requirement};

/// Wasabi 区域
pub const WASABI_REGION: &str = "WASABI_REGION";
/// Wasabi 访问密钥
pub const WASABI_ACCESS_KEY: &str = "WASABI_ACCESS_KEY";
/// Wasabi 秘密密钥
pub const WASABI_SECRET_KEY: &str = "WASABI_SECRET_KEY";
/// 机器人使用的存储桶
pub const WASABI_BUCKET: &str = "WASABI_BUCKET";
/// 覆盖按区域推导出的端点
pub const WASABI_ENDPOINT: &str = "WASABI_ENDPOINT";

/// 机器人进程运行所需的环境变量。
///
/// 启动器只对缺失项发出警告，真正的校验由机器人自己完成。
pub const BOT_REQUIRED_VARS: &[&str] = &[
    "API_ID",
    "API_HASH",
    "BOT_TOKEN",
    WASABI_ACCESS_KEY,
    WASABI_SECRET_KEY,
    WASABI_BUCKET,
    WASABI_REGION,
];

/// 从配置文件加载的键值对，进程环境变量优先。
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    entries: BTreeMap<String, String>,
}

impl ConfigSource {
    /// 从文件加载配置。
    ///
    /// 与 `dotenvy` 的约定一致：文件中的键如果已存在于进程环境，
    /// 以进程环境中的值为准。
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径。
    /// * `template` - 文件缺失时提示操作员使用的模板路径。
    ///
    /// # Errors
    ///
    /// 文件不存在时返回 [`LaunchError::ConfigMissing`]，
    /// 无法解析时返回 [`LaunchError::ConfigInvalid`]。
    pub fn load(path: &Path, template: &Path) -> Result<Self, LaunchError> {
        if !path.is_file() {
            return Err(LaunchError::ConfigMissing {
                path: path.to_path_buf(),
                template: template.to_path_buf(),
            });
        }

        let invalid = |e: dotenvy::Error| LaunchError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut entries = BTreeMap::new();
        for item in dotenvy::from_path_iter(path).map_err(invalid)? {
            let (key, value) = item.map_err(invalid)?;
            let value = non_blank(env::var(&key).ok()).unwrap_or(value);
            entries.insert(key, value);
        }

        debug!(path = %path.display(), keys = entries.len(), "configuration loaded");
        Ok(Self { entries })
    }

    /// 直接从键值对构造，主要用于测试。
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 读取配置值，空字符串视为未设置。
    ///
    /// 文件中没有的键会回退到进程环境变量。
    pub fn get(&self, key: &str) -> Option<String> {
        non_blank(self.entries.get(key).cloned()).or_else(|| non_blank(env::var(key).ok()))
    }

    /// 文件中的全部键值对，用于传递给子进程。
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 返回机器人所需但未设置的变量名。
    pub fn missing_bot_vars(&self) -> Vec<&'static str> {
        BOT_REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| self.get(key).is_none())
            .collect()
    }
}

/// 连通性探测使用的 Wasabi 配置。
///
/// 各字段在探测前不做校验，缺失的值会在探测时表现为连接失败。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WasabiSettings {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
}

impl WasabiSettings {
    pub fn from_source(source: &ConfigSource) -> Self {
        Self {
            region: source.get(WASABI_REGION),
            access_key: source.get(WASABI_ACCESS_KEY),
            secret_key: source.get(WASABI_SECRET_KEY),
            bucket: source.get(WASABI_BUCKET),
            endpoint: source.get(WASABI_ENDPOINT),
        }
    }

    /// 计算探测使用的端点。
    ///
    /// 优先使用 `WASABI_ENDPOINT`，否则为 `https://s3.<region>.wasabisys.com`。
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            self.region
                .as_ref()
                .map(|region| format!("https://s3.{}.wasabisys.com", region))
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
