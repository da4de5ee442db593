// ==========================================
// 机种编码管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 编码分配核心 (ProductType → ModelClassification → [CodeClassification] → Code)
// 红线: 每个完整编码只能发放一次，软删除不释放
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 编码规则
pub mod engine;

// 配置层 - 系统配置与编码策略
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建库）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装与命令入口
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AllocationState, AuditAction, DictionaryCategory, OccupancyType};

// 领域实体
pub use domain::{
    AllocationMetadata, CodeClassification, CodeStats, CodeUsageEntry, CodeUsageFilter,
    CodeUsageQuery, ModelClassification, PagedResult, ProductType,
};

// 引擎
pub use engine::{AllocationEngine, ClassificationCatalog, CodeError, CodeLedger, CodeResult};

// 配置
pub use config::{ConfigManager, PolicyReader, SystemPolicy};

// API
pub use api::{ApiError, ApiResponse, ApiResult, CatalogApi, CodeAllocationApi, ConfigApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "机种编码管理系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
