//! Telegram 文件机器人启动器库
//!
//! 这是机器人部署脚本的 Rust 实现，主要功能包括：
//! - 检查语言运行时和配置文件
//! - 创建隔离环境并安装依赖
//! - 对 Wasabi 存储做一次连通性探测
//! - 按重启策略启动机器人和 Web 服务进程

pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod launch;
pub mod prepare;
pub mod s3;
pub mod sequence;
pub mod status;
pub mod utils;

pub use context::StartupContext;
pub use errors::LaunchError;
pub use sequence::run_startup;
pub use status::StatusBoard;

use axum::routing::get;
use tower_http::trace::TraceLayer;

/// 创建启动器状态接口的 Axum 应用程序
///
/// # 参数
///
/// * `board` - 启动序列和监督器共享的状态看板
///
/// # Returns
///
/// 返回配置好的Axum Router实例
pub fn app(board: StatusBoard) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/status", get(handlers::handle_status))
        .layer(TraceLayer::new_for_http())
        .with_state(board)
}
