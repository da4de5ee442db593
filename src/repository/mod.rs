// ==========================================
// 机种编码管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: *_in 关联函数接收 &Connection，供引擎层在同一事务内组合调用
// ==========================================

pub mod audit_log_repo;
pub mod code_classification_repo;
pub mod code_usage_repo;
pub mod dictionary_repo;
pub mod error;
pub mod model_classification_repo;
pub mod pre_allocation_log_repo;
pub mod product_type_repo;
pub mod sql_utils;

// 重导出核心仓储
pub use audit_log_repo::AuditLogRepository;
pub use code_classification_repo::CodeClassificationRepository;
pub use code_usage_repo::CodeUsageRepository;
pub use dictionary_repo::DictionaryRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use model_classification_repo::ModelClassificationRepository;
pub use pre_allocation_log_repo::PreAllocationLogRepository;
pub use product_type_repo::ProductTypeRepository;
