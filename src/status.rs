//! 启动状态看板。
//!
//! 启动序列和进程监督器把状态写入看板，状态接口从看板读取快照。

use crate::launch::ProcessRole;
use crate::s3::ProbeOutcome;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 启动状态机，只有两个状态。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchState {
    #[default]
    Preparing,
    Running,
}

/// 单个受监督进程的状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub name: String,
    pub role: ProcessRole,
    /// 启动次数，包括重启
    pub starts: u32,
    pub running: bool,
    pub last_exit_code: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    pub state: LaunchState,
    pub probe: Option<ProbeOutcome>,
    pub processes: Vec<ProcessStatus>,
}

/// 共享的状态看板
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl StatusBoard {
    pub async fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn set_state(&self, state: LaunchState) {
        self.inner.write().await.state = state;
    }

    pub async fn set_probe(&self, outcome: ProbeOutcome) {
        self.inner.write().await.probe = Some(outcome);
    }

    /// 登记一个进程，重复登记同名进程不会产生新条目。
    pub async fn register(&self, name: &str, role: ProcessRole) {
        let mut snapshot = self.inner.write().await;
        if snapshot.processes.iter().any(|p| p.name == name) {
            return;
        }
        snapshot.processes.push(ProcessStatus {
            name: name.to_string(),
            role,
            starts: 0,
            running: false,
            last_exit_code: None,
        });
    }

    pub async fn record_start(&self, name: &str) {
        self.update(name, |p| {
            p.starts += 1;
            p.running = true;
        })
        .await;
    }

    pub async fn record_exit(&self, name: &str, code: Option<i32>) {
        self.update(name, |p| {
            p.running = false;
            p.last_exit_code = code;
        })
        .await;
    }

    async fn update(&self, name: &str, f: impl FnOnce(&mut ProcessStatus)) {
        let mut snapshot = self.inner.write().await;
        if let Some(process) = snapshot.processes.iter_mut().find(|p| p.name == name) {
            f(process);
        }
    }
}
