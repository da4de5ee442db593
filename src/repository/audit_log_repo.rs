// ==========================================
// 机种编码管理系统 - 审计日志数据仓储
// ==========================================
// 红线: 编码状态变更必须记录
// 对齐: audit_log 表
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use self::core::AuditLogRepository;
