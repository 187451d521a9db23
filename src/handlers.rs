//! HTTP请求处理模块
//!
//! 此模块包含启动器状态接口的处理器：
//! - 存活检查
//! - 启动状态快照

pub mod status;

// 重新导出主要的公共接口
pub use status::{handle_health, handle_status};
