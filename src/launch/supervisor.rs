//! 进程监督器。
//!
//! 每个子进程由独立的 Tokio 任务监督，进程之间没有就绪协调。
//! 启动器的生命周期跟随前台进程。

use crate::errors::LaunchError;
use crate::launch::restart::RestartPolicy;
use crate::launch::spec::{ProcessRole, ProcessSpec};
use crate::status::StatusBoard;
use async_trait::async_trait;
use std::future::Future;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 子进程无法启动时使用的退出码
pub const SPAWN_FAILED_EXIT_CODE: i32 = 127;

/// 收到中断信号后启动器的退出码
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// 发送 SIGTERM 后等待子进程自行退出的默认时长
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// 进程交接接口。
///
/// 返回前台进程的退出码。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, specs: Vec<ProcessSpec>, board: StatusBoard) -> Result<i32, LaunchError>;
}

/// 按重启策略运行子进程的监督器
#[derive(Debug, Clone, Copy)]
pub struct Supervisor {
    policy: RestartPolicy,
    stop_grace: Duration,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(RestartPolicy::default())
    }
}

impl Supervisor {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// 设置停止子进程时 SIGTERM 与强制终止之间的等待时长。
    pub fn with_stop_grace(mut self, stop_grace: Duration) -> Self {
        self.stop_grace = stop_grace;
        self
    }

    /// 启动全部进程并等待前台进程结束。
    ///
    /// 所有进程同时启动、互不等待。前台进程结束（包括重启耗尽）后，
    /// 后台进程会被停止。`shutdown` 完成时停止全部进程。
    ///
    /// # 返回值
    ///
    /// 前台进程的退出码；被中断时为 [`INTERRUPTED_EXIT_CODE`]。
    ///
    /// # Errors
    ///
    /// 没有前台进程或监督任务异常退出时返回 [`LaunchError::Handoff`]。
    pub async fn run<F>(
        &self,
        specs: Vec<ProcessSpec>,
        board: StatusBoard,
        shutdown: F,
    ) -> Result<i32, LaunchError>
    where
        F: Future<Output = ()> + Send,
    {
        let foreground = specs
            .iter()
            .position(|spec| spec.role == ProcessRole::Foreground)
            .ok_or_else(|| LaunchError::Handoff("no foreground process to hand off to".to_string()))?;

        for spec in &specs {
            board.register(&spec.name, spec.role).await;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut handles: Vec<JoinHandle<i32>> = specs
            .into_iter()
            .map(|spec| tokio::spawn(supervise(spec, *self, board.clone(), stop_rx.clone())))
            .collect();
        let mut foreground = handles.remove(foreground);

        tokio::pin!(shutdown);
        let code = tokio::select! {
            joined = &mut foreground => {
                joined.map_err(|e| LaunchError::Handoff(e.to_string()))?
            }
            () = &mut shutdown => {
                info!("🛑 Shutdown requested, stopping all processes");
                let _ = stop_tx.send(true);
                let _ = (&mut foreground).await;
                INTERRUPTED_EXIT_CODE
            }
        };

        let _ = stop_tx.send(true);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("background supervisor task failed: {}", e);
            }
        }

        Ok(code)
    }
}

#[async_trait]
impl ProcessLauncher for Supervisor {
    async fn launch(&self, specs: Vec<ProcessSpec>, board: StatusBoard) -> Result<i32, LaunchError> {
        self.run(specs, board, shutdown_signal()).await
    }
}

/// 监督单个进程直到其不再重启或收到停止信号。
async fn supervise(
    spec: ProcessSpec,
    supervisor: Supervisor,
    board: StatusBoard,
    mut stop: watch::Receiver<bool>,
) -> i32 {
    let policy = supervisor.policy;
    let mut restarts = 0;

    loop {
        if *stop.borrow() {
            return INTERRUPTED_EXIT_CODE;
        }

        let code = match spec.spawn() {
            Ok(mut child) => {
                board.record_start(&spec.name).await;
                info!(process = %spec.name, pid = ?child.id(), "🚀 Process started");

                tokio::select! {
                    status = child.wait() => match status {
                        Ok(status) => exit_code(status),
                        Err(e) => {
                            error!(process = %spec.name, "failed to wait for process: {}", e);
                            1
                        }
                    },
                    _ = stop.changed() => {
                        stop_child(&mut child, supervisor.stop_grace).await;
                        board.record_exit(&spec.name, None).await;
                        info!(process = %spec.name, "Process stopped");
                        return INTERRUPTED_EXIT_CODE;
                    }
                }
            }
            Err(e) => {
                error!(
                    process = %spec.name,
                    "❌ Failed to start {}: {}",
                    spec.program.display(),
                    e
                );
                SPAWN_FAILED_EXIT_CODE
            }
        };

        board.record_exit(&spec.name, Some(code)).await;
        if code == 0 {
            info!(process = %spec.name, "Process exited");
        } else {
            warn!(process = %spec.name, code, "⚠️ Process exited with failure");
        }

        if !policy.should_restart(code, restarts) {
            return code;
        }

        restarts += 1;
        let delay = policy.delay_for_restart(restarts);
        info!(process = %spec.name, restart = restarts, ?delay, "🔁 Restarting process");

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = stop.changed() => return INTERRUPTED_EXIT_CODE,
        }
    }
}

/// 先发送 SIGTERM，超过 `grace` 仍未退出时强制终止。
async fn stop_child(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let pid = child.id().and_then(|pid| i32::try_from(pid).ok());
        if let Some(pid) = pid {
            if kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok() {
                if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                    return;
                }
                warn!(pid, ?grace, "Process ignored SIGTERM, killing it");
            }
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    let _ = child.kill().await;
}

// 被信号终止的进程没有退出码
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// 等待 Ctrl-C 或 SIGTERM。
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
