//! Vanguard 工具集
//!
//! 提供日志初始化、工作区路径以及 TOML 配置加载等通用工具。

pub mod config_file;
pub mod init_log;
pub mod workspace_path;
