// ==========================================
// 机种编码管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换引擎/仓储错误为用户友好的错误消息
// 约定: error_code() 返回稳定错误码，供调用方分支处理
// ==========================================

use crate::engine::error::CodeError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与资源
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("编码重复: {0}")]
    Duplicate(String),

    // ==========================================
    // 编码规则错误
    // ==========================================
    #[error("编码方案不匹配: {0}")]
    InvalidScheme(String),

    #[error("数值超出范围: {0}")]
    RangeError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("编码格式错误: {0}")]
    FormatError(String),

    #[error("编码已分配: {0}")]
    AlreadyAllocated(String),

    #[error("编码已删除: {0}")]
    AlreadyDeleted(String),

    #[error("编码未删除: {0}")]
    NotDeleted(String),

    #[error("存在依赖数据: {0}")]
    HasDependents(String),

    #[error("预分配失败: {0}")]
    AllocationError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Duplicate(_) => "DUPLICATE",
            ApiError::InvalidScheme(_) => "INVALID_SCHEME",
            ApiError::RangeError(_) => "RANGE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::FormatError(_) => "FORMAT_ERROR",
            ApiError::AlreadyAllocated(_) => "ALREADY_ALLOCATED",
            ApiError::AlreadyDeleted(_) => "ALREADY_DELETED",
            ApiError::NotDeleted(_) => "NOT_DELETED",
            ApiError::HasDependents(_) => "HAS_DEPENDENTS",
            ApiError::AllocationError(_) => "ALLOCATION_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::Duplicate(msg),
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::HasDependents(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 CodeError 转换
// ==========================================
impl From<CodeError> for ApiError {
    fn from(err: CodeError) -> Self {
        let message = err.to_string();
        match err {
            CodeError::NotFound { .. } => ApiError::NotFound(message),
            CodeError::Duplicate(_) => ApiError::Duplicate(message),
            CodeError::InvalidScheme(_) => ApiError::InvalidScheme(message),
            CodeError::Range { .. } => ApiError::RangeError(message),
            CodeError::Validation(_) => ApiError::ValidationError(message),
            CodeError::Format(_) => ApiError::FormatError(message),
            CodeError::AlreadyAllocated(_) => ApiError::AlreadyAllocated(message),
            CodeError::AlreadyDeleted(_) => ApiError::AlreadyDeleted(message),
            CodeError::NotDeleted(_) => ApiError::NotDeleted(message),
            CodeError::HasDependents(_) => ApiError::HasDependents(message),
            CodeError::Allocation(_) => ApiError::AllocationError(message),
            CodeError::Repository(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_error_mapping() {
        let err: ApiError = CodeError::InvalidScheme("SLU-".to_string()).into();
        assert_eq!(err.error_code(), "INVALID_SCHEME");

        let err: ApiError = CodeError::Range {
            field: "code".to_string(),
            value: 0,
            min: 1,
            max: 99,
        }
        .into();
        assert_eq!(err.error_code(), "RANGE_ERROR");

        let err: ApiError = CodeError::Repository(RepositoryError::LockError("x".to_string())).into();
        assert_eq!(err.error_code(), "DATABASE_CONNECTION_ERROR");
    }

    #[test]
    fn test_repository_unique_violation_is_duplicate() {
        let err: ApiError = RepositoryError::UniqueConstraintViolation("model".to_string()).into();
        assert_eq!(err.error_code(), "DUPLICATE");
    }
}
