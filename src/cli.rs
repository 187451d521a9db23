//! 命令行参数。
//!
//! 所有参数都有默认值，不带参数运行时与原部署脚本的行为一致。

use crate::context::StartupContext;
use crate::launch::{Backoff, Entrypoints, LaunchVariant, RestartMode, RestartPolicy};
use crate::prepare::DEFAULT_RUNTIME;
use crate::s3::ProbePolicy;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "wasabi-bot-launcher")]
#[command(about = "Prepares the environment and launches the Telegram File Bot", long_about = None)]
pub struct Cli {
    /// Project directory containing the bot sources
    #[arg(long, env = "LAUNCHER_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Language runtime used to create the environment
    #[arg(long, env = "LAUNCHER_RUNTIME", default_value = DEFAULT_RUNTIME)]
    pub runtime: String,

    /// Configuration file with the Wasabi credentials
    #[arg(long, env = "LAUNCHER_ENV_FILE", default_value = ".env")]
    pub env_file: PathBuf,

    /// Template suggested when the configuration file is missing
    #[arg(long, env = "LAUNCHER_ENV_TEMPLATE", default_value = ".env.example")]
    pub env_template: PathBuf,

    /// Isolated environment directory
    #[arg(long, env = "LAUNCHER_VENV_DIR", default_value = "venv")]
    pub venv_dir: PathBuf,

    /// Recreate the environment from scratch
    #[arg(long, env = "LAUNCHER_FRESH_ENV")]
    pub fresh_env: bool,

    /// Dependency manifest
    #[arg(long, env = "LAUNCHER_REQUIREMENTS", default_value = "requirements.txt")]
    pub requirements: PathBuf,

    /// Which processes to start
    #[arg(long, env = "LAUNCHER_VARIANT", value_enum, default_value_t = LaunchVariant::Bot)]
    pub variant: LaunchVariant,

    /// Bot entry script
    #[arg(long, env = "LAUNCHER_BOT_ENTRY", default_value = "bot.py")]
    pub bot_entry: PathBuf,

    /// Web server entry script
    #[arg(long, env = "LAUNCHER_WEB_ENTRY", default_value = "web_server.py")]
    pub web_entry: PathBuf,

    /// Whether a failed connectivity probe aborts startup
    #[arg(long, env = "LAUNCHER_PROBE_POLICY", value_enum, default_value_t = ProbePolicy::Advisory)]
    pub probe_policy: ProbePolicy,

    /// Connectivity probe timeout in seconds (no timeout when unset)
    #[arg(long, env = "LAUNCHER_PROBE_TIMEOUT_SECS")]
    pub probe_timeout_secs: Option<u64>,

    /// Restart policy for the launched processes
    #[arg(long, env = "LAUNCHER_RESTART", value_enum, default_value_t = RestartMode::Never)]
    pub restart: RestartMode,

    /// Maximum restarts per process with `--restart on-failure`
    #[arg(long, env = "LAUNCHER_MAX_RESTARTS", default_value = "5")]
    pub max_restarts: u32,

    /// Initial restart delay in seconds
    #[arg(long, env = "LAUNCHER_RESTART_DELAY_SECS", default_value = "1")]
    pub restart_delay_secs: u64,

    /// Maximum restart delay in seconds
    #[arg(long, env = "LAUNCHER_RESTART_MAX_DELAY_SECS", default_value = "300")]
    pub restart_max_delay_secs: u64,

    /// Seconds to wait after SIGTERM before killing a process
    #[arg(long, env = "LAUNCHER_STOP_GRACE_SECS", default_value = "10")]
    pub stop_grace_secs: u64,

    /// Address for the status endpoint (disabled when unset)
    #[arg(long, env = "LAUNCHER_STATUS_ADDR")]
    pub status_addr: Option<SocketAddr>,
}

impl Cli {
    pub fn startup_context(&self) -> StartupContext {
        StartupContext {
            runtime: self.runtime.clone(),
            env_file: self.env_file.clone(),
            env_template: self.env_template.clone(),
            venv_dir: self.venv_dir.clone(),
            fresh_env: self.fresh_env,
            manifest: self.requirements.clone(),
            variant: self.variant,
            entrypoints: Entrypoints {
                bot: self.bot_entry.clone(),
                web: self.web_entry.clone(),
            },
            probe_policy: self.probe_policy,
            probe_timeout: self.probe_timeout_secs.map(Duration::from_secs),
            ..StartupContext::new(&self.project_dir)
        }
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        match self.restart {
            RestartMode::Never => RestartPolicy::Never,
            RestartMode::OnFailure => RestartPolicy::OnFailure {
                max_restarts: self.max_restarts,
                backoff: Backoff {
                    initial_delay: Duration::from_secs(self.restart_delay_secs),
                    max_delay: Duration::from_secs(self.restart_max_delay_secs),
                    ..Backoff::default()
                },
            },
        }
    }
}
