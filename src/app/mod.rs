// ==========================================
// 机种编码管理系统 - 应用层
// ==========================================
// 职责: 组装仓储/引擎/API，提供统一响应格式的命令入口
// ==========================================

pub mod commands;
pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
