//! 工具函数模块
//!
//! 此模块包含了项目中使用的各种工具函数：
//! - 路径处理工具（虚拟环境解释器定位）
//! - 敏感信息脱敏

pub mod mask;
pub mod path;
