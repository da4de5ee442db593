// ==========================================
// 机种编码管理系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 唯一约束冲突必须显式上报为 Duplicate，不得吞掉
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 编码引擎错误类型
#[derive(Error, Debug)]
pub enum CodeError {
    // ===== 资源 =====
    #[error("资源未找到: {entity}(id={id})")]
    NotFound { entity: String, id: String },

    #[error("编码重复: {0}")]
    Duplicate(String),

    // ===== 方案与输入 =====
    #[error("编码方案不匹配: {0}")]
    InvalidScheme(String),

    #[error("数值超出范围: {field}={value}，允许 [{min}, {max}]")]
    Range {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("数据验证失败: {0}")]
    Validation(String),

    #[error("编码格式错误: {0}")]
    Format(String),

    // ===== 状态机 =====
    #[error("编码已分配: {0}")]
    AlreadyAllocated(String),

    #[error("编码已删除: {0}")]
    AlreadyDeleted(String),

    #[error("编码未删除: {0}")]
    NotDeleted(String),

    #[error("存在依赖数据，禁止删除: {0}")]
    HasDependents(String),

    // ===== 预分配 =====
    #[error("预分配失败: {0}")]
    Allocation(String),

    // ===== 基础设施 =====
    #[error(transparent)]
    Repository(RepositoryError),
}

impl CodeError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        CodeError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 调用方是否可以换一个候选值重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, CodeError::Duplicate(_))
    }
}

impl From<RepositoryError> for CodeError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueConstraintViolation(msg) => CodeError::Duplicate(msg),
            RepositoryError::NotFound { entity, id } => CodeError::NotFound { entity, id },
            RepositoryError::FieldValueError { field, message } => {
                CodeError::Validation(format!("{}: {}", field, message))
            }
            other => CodeError::Repository(other),
        }
    }
}

/// Result 类型别名
pub type CodeResult<T> = Result<T, CodeError>;
