//! 启动上下文。
//!
//! 一次启动所需的全部路径和策略都集中在这里，不使用全局状态。

use crate::launch::{Entrypoints, LaunchVariant};
use crate::s3::ProbePolicy;
use crate::utils::path::resolve;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StartupContext {
    /// 项目目录，相对路径都基于它解析
    pub project_dir: PathBuf,
    pub runtime: String,
    pub env_file: PathBuf,
    /// 配置文件缺失时提示使用的模板
    pub env_template: PathBuf,
    pub venv_dir: PathBuf,
    /// 创建环境时清空已有内容
    pub fresh_env: bool,
    pub manifest: PathBuf,
    pub variant: LaunchVariant,
    pub entrypoints: Entrypoints,
    pub probe_policy: ProbePolicy,
    pub probe_timeout: Option<Duration>,
}

impl StartupContext {
    /// 使用默认文件名创建上下文。
    ///
    /// 相对的项目目录会基于当前工作目录转换为绝对路径，
    /// 子进程在项目目录中运行时传给它们的路径仍然有效。
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            project_dir: std::path::absolute(&project_dir).unwrap_or(project_dir),
            runtime: crate::prepare::DEFAULT_RUNTIME.to_string(),
            env_file: PathBuf::from(".env"),
            env_template: PathBuf::from(".env.example"),
            venv_dir: PathBuf::from("venv"),
            fresh_env: false,
            manifest: PathBuf::from("requirements.txt"),
            variant: LaunchVariant::default(),
            entrypoints: Entrypoints::default(),
            probe_policy: ProbePolicy::default(),
            probe_timeout: None,
        }
    }

    /// 基于项目目录解析路径。
    pub fn path(&self, path: &Path) -> PathBuf {
        resolve(&self.project_dir, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = StartupContext::new("/srv/bot");
        assert_eq!(ctx.path(&ctx.env_file), PathBuf::from("/srv/bot/.env"));
        assert_eq!(ctx.path(&ctx.manifest), PathBuf::from("/srv/bot/requirements.txt"));
        assert_eq!(ctx.runtime, "python3");
        assert_eq!(ctx.variant, LaunchVariant::Bot);
        assert_eq!(ctx.probe_policy, ProbePolicy::Advisory);
        assert_eq!(ctx.probe_timeout, None);
    }

    #[test]
    fn test_relative_project_dir_is_absolute() {
        let ctx = StartupContext::new("bot");
        let expected = std::env::current_dir().unwrap().join("bot");

        assert!(ctx.project_dir.is_absolute());
        assert_eq!(ctx.project_dir, expected);
        assert_eq!(ctx.path(&ctx.venv_dir), expected.join("venv"));
    }
}
