//! 进程交接模块
//!
//! 准备工作完成后，由监督器启动机器人进程（以及可选的 Web 服务进程）。

pub mod restart;
pub mod spec;
pub mod supervisor;

pub use restart::{Backoff, RestartMode, RestartPolicy};
pub use spec::{Entrypoints, LaunchVariant, ProcessRole, ProcessSpec, plan_processes};
pub use supervisor::{ProcessLauncher, Supervisor};
