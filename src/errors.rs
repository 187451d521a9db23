//! 启动器错误类型。
//!
//! 每个变体都对应一个明确的进程退出码，见 [`LaunchError::exit_code`]。

use std::path::PathBuf;
use thiserror::Error;

/// 启动过程中可能出现的致命错误。
///
/// 连通性探测失败在默认策略下不会产生该错误，
/// 只有 `ProbePolicy::Required` 时才会转换为 [`LaunchError::ProbeFailed`]。
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("required runtime `{runtime}` is not installed or not runnable")]
    RuntimeMissing { runtime: String },

    #[error(
        "configuration file {} not found; create it from {} and fill in your credentials",
        .path.display(),
        .template.display()
    )]
    ConfigMissing { path: PathBuf, template: PathBuf },

    #[error("configuration file {} is malformed: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("dependency manifest {} not found", .path.display())]
    ManifestMissing { path: PathBuf },

    #[error("failed to create isolated environment at {} (exit code {code:?})", .path.display())]
    EnvironmentSetup { path: PathBuf, code: Option<i32> },

    #[error("dependency installation failed (exit code {code:?})")]
    DependencyInstall { code: Option<i32> },

    #[error("storage connectivity probe failed: {0}")]
    ProbeFailed(String),

    #[error("process handoff failed: {0}")]
    Handoff(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    /// 将错误映射为进程退出码。
    ///
    /// 环境创建与依赖安装失败时沿用对应子命令自身的退出码，
    /// 其余前置条件错误统一返回 `1`。
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EnvironmentSetup { code: Some(code), .. }
            | Self::DependencyInstall { code: Some(code) } => *code,
            _ => 1,
        }
    }
}
