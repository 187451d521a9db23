//! 子进程规格定义。

use crate::config::ConfigSource;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// 进程在启动器中的角色。
///
/// 启动器的生命周期跟随前台进程，前台进程退出后后台进程会被停止。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessRole {
    Foreground,
    Background,
}

/// 容器入口的两种变体。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LaunchVariant {
    /// 只在前台运行机器人
    #[default]
    Bot,
    /// 机器人在后台运行，Web 服务在前台运行
    BotWithWeb,
}

/// 机器人与 Web 服务的入口脚本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoints {
    pub bot: PathBuf,
    pub web: PathBuf,
}

impl Default for Entrypoints {
    fn default() -> Self {
        Self {
            bot: PathBuf::from("bot.py"),
            web: PathBuf::from("web_server.py"),
        }
    }
}

/// 一个待启动进程的完整描述。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub name: String,
    pub role: ProcessRole,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, role: ProcessRole, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            role,
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// 按规格启动子进程。
    ///
    /// 子进程继承标准输出和标准错误，句柄被丢弃时子进程会被终止。
    ///
    /// # Errors
    ///
    /// 程序无法执行时返回 IO 错误。
    pub fn spawn(&self) -> io::Result<Child> {
        let mut cmd = Command::new(&self.program);

        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        cmd.spawn()
    }
}

/// 根据入口变体生成要启动的进程列表。
///
/// 配置文件中的键值对会作为环境变量传给每个子进程。
///
/// # 参数
///
/// * `variant` - 入口变体。
/// * `interpreter` - 隔离环境中的解释器。
/// * `entrypoints` - 入口脚本。
/// * `workdir` - 子进程工作目录。
/// * `config` - 已加载的配置。
pub fn plan_processes(
    variant: LaunchVariant,
    interpreter: &Path,
    entrypoints: &Entrypoints,
    workdir: &Path,
    config: &ConfigSource,
) -> Vec<ProcessSpec> {
    let build = |name: &str, role: ProcessRole, script: &Path| {
        config.entries().fold(
            ProcessSpec::new(name, role, interpreter)
                .args([script.to_string_lossy().into_owned()])
                .cwd(workdir),
            |spec, (k, v)| spec.env(k, v),
        )
    };

    match variant {
        LaunchVariant::Bot => vec![build("bot", ProcessRole::Foreground, &entrypoints.bot)],
        LaunchVariant::BotWithWeb => vec![
            build("bot", ProcessRole::Background, &entrypoints.bot),
            build("web", ProcessRole::Foreground, &entrypoints.web),
        ],
    }
}
