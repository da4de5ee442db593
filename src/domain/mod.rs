// ==========================================
// 机种编码管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod audit;
pub mod catalog;
pub mod code_usage;
pub mod dictionary;
pub mod types;

// 重导出核心类型
pub use audit::{AuditLog, CodePreAllocationLog};
pub use catalog::{CodeClassification, ModelClassification, ModelClassificationPatch, ProductType};
pub use code_usage::{
    AllocationMetadata, ClassificationStats, CodeStats, CodeUsageEntry, CodeUsageFilter,
    CodeUsageQuery, NewCodeUsageEntry, PagedResult,
};
pub use dictionary::DictionaryItem;
pub use types::{AllocationState, AuditAction, DictionaryCategory, OccupancyType};
