use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

// 导入我们的模块
use wasabi_bot_launcher::cli::Cli;
use wasabi_bot_launcher::launch::Supervisor;
use wasabi_bot_launcher::prepare::PythonToolchain;
use wasabi_bot_launcher::s3::S3Probe;
use wasabi_bot_launcher::{StatusBoard, app, run_startup};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_timer(LocalTime::rfc_3339())
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let ctx = cli.startup_context();
    let board = StatusBoard::default();

    // 状态接口独立运行，不影响启动序列
    if let Some(addr) = cli.status_addr {
        let board = board.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_status(addr, board).await {
                error!("Status server error: {:#}", e);
            }
        });
    }

    let toolchain = PythonToolchain::new(&ctx.runtime, &ctx.project_dir);
    let supervisor = Supervisor::new(cli.restart_policy())
        .with_stop_grace(Duration::from_secs(cli.stop_grace_secs));

    let code = match run_startup(&ctx, &toolchain, S3Probe::new, &supervisor, &board).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {}", e);
            e.exit_code()
        }
    };

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn serve_status(addr: SocketAddr, board: StatusBoard) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status endpoint on {}", addr))?;

    info!("📊 Status endpoint listening on http://{}", addr);
    axum::serve(listener, app(board)).await?;
    Ok(())
}
