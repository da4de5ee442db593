// ==========================================
// 机种编码管理系统 - 配置层
// ==========================================
// 职责: 系统配置管理，编码策略读取
// 存储: system_config 表
// ==========================================

pub mod config_manager;
pub mod system_policy;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use system_policy::{PolicyReader, SystemPolicy};
