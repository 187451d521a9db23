//! 运行环境准备模块。
//!
//! 负责检查语言运行时、创建隔离环境以及安装依赖清单。
//! 所有步骤都不重试，失败时直接以对应的退出码终止。

use crate::config::{ConfigSource, DependencyManifest, WasabiSettings};
use crate::context::StartupContext;
use crate::errors::LaunchError;
use crate::utils::mask::mask_secret;
use crate::utils::path::venv_interpreter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// 默认的语言运行时
pub const DEFAULT_RUNTIME: &str = "python3";

/// 准备阶段依赖的外部工具链。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// 检查运行时是否可用，返回其版本信息。
    async fn runtime_version(&self) -> Result<String, LaunchError>;

    /// 在 `venv_dir` 创建隔离环境。
    async fn create_environment(&self, venv_dir: &Path, fresh: bool) -> Result<(), LaunchError>;

    /// 使用隔离环境中的解释器安装依赖清单。
    async fn install_dependencies(&self, interpreter: &Path, manifest: &Path) -> Result<(), LaunchError>;
}

/// 基于 Python `venv` 和 `pip` 的工具链实现。
#[derive(Debug, Clone)]
pub struct PythonToolchain {
    runtime: String,
    workdir: PathBuf,
}

impl PythonToolchain {
    pub fn new(runtime: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
            workdir: workdir.into(),
        }
    }
}

#[async_trait]
impl Toolchain for PythonToolchain {
    async fn runtime_version(&self) -> Result<String, LaunchError> {
        let missing = || LaunchError::RuntimeMissing {
            runtime: self.runtime.clone(),
        };

        let output = Command::new(&self.runtime)
            .arg("--version")
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                debug!(runtime = %self.runtime, "runtime check failed: {}", e);
                missing()
            })?;

        if !output.status.success() {
            return Err(missing());
        }

        // Python 2 把版本信息写到 stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let version = if stdout.trim().is_empty() { stderr } else { stdout };
        Ok(version.trim().to_string())
    }

    async fn create_environment(&self, venv_dir: &Path, fresh: bool) -> Result<(), LaunchError> {
        let mut cmd = Command::new(&self.runtime);
        cmd.args(["-m", "venv"]);
        if fresh {
            cmd.arg("--clear");
        }
        cmd.arg(venv_dir).current_dir(&self.workdir).stdin(Stdio::null());

        let status = cmd.status().await?;
        if !status.success() {
            return Err(LaunchError::EnvironmentSetup {
                path: venv_dir.to_path_buf(),
                code: status.code(),
            });
        }
        Ok(())
    }

    async fn install_dependencies(&self, interpreter: &Path, manifest: &Path) -> Result<(), LaunchError> {
        let status = Command::new(interpreter)
            .args(["-m", "pip", "install", "-r"])
            .arg(manifest)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(LaunchError::DependencyInstall {
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// 准备完成后的环境。
#[derive(Debug, Clone)]
pub struct PreparedEnvironment {
    pub config: ConfigSource,
    /// 隔离环境中的解释器
    pub interpreter: PathBuf,
}

/// 依次执行运行时检查、配置检查、环境创建和依赖安装。
///
/// 任一步骤失败都会立即返回，后续步骤不会执行。
///
/// # Errors
///
/// 返回第一个失败步骤对应的 [`LaunchError`]。
pub async fn prepare_environment<T>(
    ctx: &StartupContext,
    toolchain: &T,
) -> Result<PreparedEnvironment, LaunchError>
where
    T: Toolchain + ?Sized,
{
    let version = toolchain.runtime_version().await?;
    info!(%version, "✅ Runtime {} found", ctx.runtime);

    let env_file = ctx.path(&ctx.env_file);
    let config = ConfigSource::load(&env_file, &ctx.path(&ctx.env_template))?;
    info!("✅ Configuration loaded from {}", env_file.display());
    log_config_summary(&config);

    let venv_dir = ctx.path(&ctx.venv_dir);
    info!("📦 Creating isolated environment at {}", venv_dir.display());
    toolchain.create_environment(&venv_dir, ctx.fresh_env).await?;

    let manifest_path = ctx.path(&ctx.manifest);
    let manifest = DependencyManifest::read(&manifest_path)?;
    info!(
        packages = manifest.requirements.len(),
        "📥 Installing dependencies: {}",
        manifest.package_names().join(", ")
    );
    let interpreter = venv_interpreter(&venv_dir);
    toolchain.install_dependencies(&interpreter, &manifest_path).await?;
    info!("✅ Dependencies installed");

    Ok(PreparedEnvironment { config, interpreter })
}

fn log_config_summary(config: &ConfigSource) {
    let settings = WasabiSettings::from_source(config);
    info!(
        region = settings.region.as_deref().unwrap_or("-"),
        bucket = settings.bucket.as_deref().unwrap_or("-"),
        access_key = %settings.access_key.as_deref().map(mask_secret).unwrap_or_default(),
        "☁️ Wasabi settings"
    );

    let missing = config.missing_bot_vars();
    if !missing.is_empty() {
        warn!("⚠️ Missing bot variables: {}", missing.join(", "));
    }
}
