use crate::status::{StatusBoard, StatusSnapshot};
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// 处理存活检查请求
///
/// 只要启动器进程在运行就返回健康状态，与原 Web 服务的 `/health` 保持一致。
///
/// # 请求方法
///
/// GET /health
pub async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// 处理启动状态查询请求
///
/// 返回当前启动状态、连通性探测结果和受监督进程的状态。
///
/// # 请求方法
///
/// GET /status
///
/// # 响应示例
///
/// ```json
/// {
///   "state": "RUNNING",
///   "probe": { "result": "reachable", "bucket_count": 2, "target_bucket": null },
///   "processes": [
///     { "name": "bot", "role": "background", "starts": 1, "running": true, "last_exit_code": null }
///   ]
/// }
/// ```
pub async fn handle_status(State(board): State<StatusBoard>) -> Json<StatusSnapshot> {
    Json(board.snapshot().await)
}
