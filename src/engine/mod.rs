// ==========================================
// 机种编码管理系统 - 引擎层
// ==========================================
// 职责: 实现编码规则，不拼 SQL
// 红线: Engine 不拼 SQL, 多步写操作必须在单个事务内完成
// ==========================================

pub mod allocation;
pub mod catalog;
pub mod code_format;
pub mod error;
pub mod ledger;

// 重导出核心引擎
pub use allocation::AllocationEngine;
pub use catalog::ClassificationCatalog;
pub use code_format::CodeParts;
pub use error::{CodeError, CodeResult};
pub use ledger::CodeLedger;
