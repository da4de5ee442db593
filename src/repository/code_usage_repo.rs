// ==========================================
// 机种编码管理系统 - 编码使用记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: model 唯一性由 ux_code_usage_entry_model 索引保证
// 说明: 状态迁移均为带条件的 UPDATE，影响行数为 0 表示前置状态不满足
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use self::core::CodeUsageRepository;
pub use self::queries::{page_offset, MAX_PAGE_SIZE};
