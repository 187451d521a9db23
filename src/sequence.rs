//! 启动序列。
//!
//! 准备环境 → 连通性探测 → 进程交接，严格按顺序执行一次。

use crate::config::WasabiSettings;
use crate::context::StartupContext;
use crate::errors::LaunchError;
use crate::launch::{ProcessLauncher, plan_processes};
use crate::prepare::{Toolchain, prepare_environment};
use crate::s3::{ProbeOutcome, ProbePolicy, StorageProbe, run_probe};
use crate::status::{LaunchState, StatusBoard};
use tracing::{info, warn};

/// 执行完整的启动序列。
///
/// 探测在默认的 [`ProbePolicy::Advisory`] 策略下不会阻止交接，
/// 只有 [`ProbePolicy::Required`] 时探测失败才会终止启动。
///
/// # 参数
///
/// * `ctx` - 启动上下文。
/// * `toolchain` - 准备阶段使用的工具链。
/// * `make_probe` - 根据配置创建探测实现，只调用一次。
/// * `launcher` - 进程交接实现。
/// * `board` - 状态看板。
///
/// # 返回值
///
/// 前台进程的退出码。
///
/// # Errors
///
/// 准备阶段的任何失败，或 `Required` 策略下的探测失败。
pub async fn run_startup<T, P, F, L>(
    ctx: &StartupContext,
    toolchain: &T,
    make_probe: F,
    launcher: &L,
    board: &StatusBoard,
) -> Result<i32, LaunchError>
where
    T: Toolchain + ?Sized,
    P: StorageProbe,
    F: FnOnce(WasabiSettings) -> P,
    L: ProcessLauncher + ?Sized,
{
    board.set_state(LaunchState::Preparing).await;
    info!("🔧 Setting up Telegram File Bot...");

    let prepared = prepare_environment(ctx, toolchain).await?;

    let settings = WasabiSettings::from_source(&prepared.config);
    let bucket = settings.bucket.clone();
    let probe = make_probe(settings);
    let outcome = run_probe(&probe, bucket.as_deref(), ctx.probe_timeout).await;
    board.set_probe(outcome.clone()).await;

    if let ProbeOutcome::Failed { detail } = outcome {
        match ctx.probe_policy {
            ProbePolicy::Required => return Err(LaunchError::ProbeFailed(detail)),
            ProbePolicy::Advisory => warn!("Continuing startup, the connectivity probe is advisory"),
        }
    }

    board.set_state(LaunchState::Running).await;

    let specs = plan_processes(
        ctx.variant,
        &prepared.interpreter,
        &ctx.entrypoints,
        &ctx.project_dir,
        &prepared.config,
    );
    let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    info!("🚀 Starting {}", names.join(" + "));

    launcher.launch(specs, board.clone()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::supervisor::MockProcessLauncher;
    use crate::launch::{LaunchVariant, ProcessSpec};
    use crate::prepare::MockToolchain;
    use crate::s3::ProbeError;
    use crate::s3::probe::MockStorageProbe;
    use mockall::Sequence;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn project(with_env: bool) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        if with_env {
            std::fs::write(
                dir.path().join(".env"),
                "WASABI_REGION=eu-central-1\nWASABI_ACCESS_KEY=AKIATEST\nWASABI_SECRET_KEY=secret\nWASABI_BUCKET=files\n",
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("requirements.txt"), "pyrogram\nboto3\nflask\n").unwrap();
        dir
    }

    fn ready_toolchain() -> MockToolchain {
        let mut toolchain = MockToolchain::new();
        toolchain
            .expect_runtime_version()
            .returning(|| Ok("Python 3.12.1".to_string()));
        toolchain.expect_create_environment().returning(|_, _| Ok(()));
        toolchain.expect_install_dependencies().returning(|_, _| Ok(()));
        toolchain
    }

    fn probe_returning(ok: bool) -> MockStorageProbe {
        let mut probe = MockStorageProbe::new();
        probe.expect_list_buckets().times(1).returning(move || {
            if ok {
                Ok(vec!["files".to_string()])
            } else {
                Err(ProbeError::Service {
                    code: "InvalidAccessKeyId".to_string(),
                    message: "invalid key".to_string(),
                })
            }
        });
        probe
    }

    fn recording_launcher(seen: Arc<Mutex<Vec<ProcessSpec>>>) -> MockProcessLauncher {
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().times(1).returning(move |specs, _| {
            seen.lock().unwrap().extend(specs);
            Ok(0)
        });
        launcher
    }

    fn unused_probe() -> MockStorageProbe {
        let mut probe = MockStorageProbe::new();
        probe.expect_list_buckets().never();
        probe
    }

    #[tokio::test]
    async fn test_missing_runtime_stops_before_environment() {
        let dir = project(true);
        let ctx = StartupContext::new(dir.path());

        let mut toolchain = MockToolchain::new();
        toolchain.expect_runtime_version().times(1).returning(|| {
            Err(LaunchError::RuntimeMissing {
                runtime: "python3".to_string(),
            })
        });
        toolchain.expect_create_environment().never();
        toolchain.expect_install_dependencies().never();
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();

        let board = StatusBoard::default();
        let err = run_startup(&ctx, &toolchain, |_| unused_probe(), &launcher, &board)
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::RuntimeMissing { .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(board.snapshot().await.state, LaunchState::Preparing);
    }

    #[tokio::test]
    async fn test_missing_config_stops_before_install() {
        let dir = project(false);
        let ctx = StartupContext::new(dir.path());

        let mut toolchain = MockToolchain::new();
        toolchain
            .expect_runtime_version()
            .returning(|| Ok("Python 3.12.1".to_string()));
        toolchain.expect_create_environment().never();
        toolchain.expect_install_dependencies().never();
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();

        let err = run_startup(&ctx, &toolchain, |_| unused_probe(), &launcher, &StatusBoard::default())
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::ConfigMissing { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let dir = project(true);
        let ctx = StartupContext::new(dir.path());
        let venv = dir.path().join("venv");

        let mut seq = Sequence::new();
        let mut toolchain = MockToolchain::new();
        toolchain
            .expect_runtime_version()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok("Python 3.12.1".to_string()));
        let expected_venv = venv.clone();
        toolchain
            .expect_create_environment()
            .withf(move |path, fresh| Path::new(path) == expected_venv.as_path() && !*fresh)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        let expected_manifest = dir.path().join("requirements.txt");
        toolchain
            .expect_install_dependencies()
            .withf(move |interpreter, manifest| {
                interpreter.starts_with(&venv) && Path::new(manifest) == expected_manifest.as_path()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let mut probe = MockStorageProbe::new();
        probe
            .expect_list_buckets()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec!["files".to_string()]));

        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(0));

        let code = run_startup(&ctx, &toolchain, move |_| probe, &launcher, &StatusBoard::default())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_probe_receives_configured_settings() {
        let dir = project(true);
        let ctx = StartupContext::new(dir.path());
        let launcher = recording_launcher(Arc::default());

        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        run_startup(
            &ctx,
            &ready_toolchain(),
            move |settings| {
                *captured.lock().unwrap() = Some(settings);
                probe_returning(true)
            },
            &launcher,
            &StatusBoard::default(),
        )
        .await
        .unwrap();

        let settings = seen.lock().unwrap().clone().unwrap();
        assert_eq!(settings.region.as_deref(), Some("eu-central-1"));
        assert_eq!(settings.bucket.as_deref(), Some("files"));
    }

    #[tokio::test]
    async fn test_failed_probe_still_hands_off() {
        let dir = project(true);
        let ctx = StartupContext::new(dir.path());

        let failed = Arc::new(Mutex::new(Vec::new()));
        let board = StatusBoard::default();
        let code = run_startup(
            &ctx,
            &ready_toolchain(),
            |_| probe_returning(false),
            &recording_launcher(failed.clone()),
            &board,
        )
        .await
        .unwrap();
        assert_eq!(code, 0);

        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.state, LaunchState::Running);
        assert!(matches!(snapshot.probe, Some(ProbeOutcome::Failed { .. })));

        // 成功的探测进入完全相同的交接步骤
        let succeeded = Arc::new(Mutex::new(Vec::new()));
        run_startup(
            &ctx,
            &ready_toolchain(),
            |_| probe_returning(true),
            &recording_launcher(succeeded.clone()),
            &StatusBoard::default(),
        )
        .await
        .unwrap();

        assert_eq!(*failed.lock().unwrap(), *succeeded.lock().unwrap());
    }

    #[tokio::test]
    async fn test_required_probe_blocks_handoff() {
        let dir = project(true);
        let mut ctx = StartupContext::new(dir.path());
        ctx.probe_policy = ProbePolicy::Required;

        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();

        let board = StatusBoard::default();
        let err = run_startup(&ctx, &ready_toolchain(), |_| probe_returning(false), &launcher, &board)
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::ProbeFailed(_)));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(board.snapshot().await.state, LaunchState::Preparing);
    }

    #[tokio::test]
    async fn test_variant_selects_processes() {
        let dir = project(true);
        let mut ctx = StartupContext::new(dir.path());

        ctx.variant = LaunchVariant::Bot;
        let seen = Arc::new(Mutex::new(Vec::new()));
        run_startup(
            &ctx,
            &ready_toolchain(),
            |_| probe_returning(true),
            &recording_launcher(seen.clone()),
            &StatusBoard::default(),
        )
        .await
        .unwrap();
        let names: Vec<String> = seen.lock().unwrap().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["bot"]);

        ctx.variant = LaunchVariant::BotWithWeb;
        let seen = Arc::new(Mutex::new(Vec::new()));
        run_startup(
            &ctx,
            &ready_toolchain(),
            |_| probe_returning(true),
            &recording_launcher(seen.clone()),
            &StatusBoard::default(),
        )
        .await
        .unwrap();
        let names: Vec<String> = seen.lock().unwrap().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["bot", "web"]);
    }

    #[tokio::test]
    async fn test_missing_manifest_stops_before_install() {
        let dir = project(true);
        std::fs::remove_file(dir.path().join("requirements.txt")).unwrap();
        let ctx = StartupContext::new(dir.path());

        let mut toolchain = MockToolchain::new();
        toolchain
            .expect_runtime_version()
            .returning(|| Ok("Python 3.12.1".to_string()));
        toolchain.expect_create_environment().times(1).returning(|_, _| Ok(()));
        toolchain.expect_install_dependencies().never();
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();

        let err = run_startup(&ctx, &toolchain, |_| unused_probe(), &launcher, &StatusBoard::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::ManifestMissing { .. }));
    }

    #[tokio::test]
    async fn test_install_failure_stops_before_probe() {
        let dir = project(true);
        let ctx = StartupContext::new(dir.path());

        let mut toolchain = MockToolchain::new();
        toolchain
            .expect_runtime_version()
            .returning(|| Ok("Python 3.12.1".to_string()));
        toolchain.expect_create_environment().returning(|_, _| Ok(()));
        toolchain
            .expect_install_dependencies()
            .returning(|_, _| Err(LaunchError::DependencyInstall { code: Some(2) }));
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();

        let err = run_startup(&ctx, &toolchain, |_| unused_probe(), &launcher, &StatusBoard::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
