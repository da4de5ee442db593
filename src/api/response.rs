// ==========================================
// 机种编码管理系统 - 统一响应结构
// ==========================================
// 格式: { success, data?, message, errorCode? }
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

/// 统一响应（返回给调用方）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    pub message: String,

    /// 错误码（见 ApiError::error_code）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "操作成功".to_string(),
            error_code: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::ok(data)
        }
    }

    pub fn fail(err: &ApiError) -> Self {
        Self {
            success: false,
            data: None,
            message: err.to_string(),
            error_code: Some(err.error_code().to_string()),
        }
    }
}

impl<T> From<ApiResult<T>> for ApiResponse<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(err) => {
                tracing::warn!("请求失败: code={}, message={}", err.error_code(), err);
                ApiResponse::fail(&err)
            }
        }
    }
}
