//! S3模块
//!
//! 该模块负责与 Wasabi（S3 兼容）存储的交互，只包含启动时的连通性探测。

// 声明子模块
pub mod client;
pub mod probe;

// 重新导出常用的类型和函数
pub use client::build_client;
pub use probe::{ProbeError, ProbeOutcome, ProbePolicy, S3Probe, StorageProbe, TargetBucket, run_probe};
