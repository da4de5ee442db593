// ==========================================
// 机种编码管理系统 - 审计领域模型
// ==========================================
// 红线: 编码分配、软删除、恢复、预分配必须留痕
// 对齐: audit_log / code_pre_allocation_log 表
// ==========================================

use crate::domain::types::AuditAction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// AuditLog - 审计记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub action: String,      // 存储为字符串，见 AuditAction
    pub entity_type: String, // 如 "CodeUsageEntry"
    pub entity_id: String,
    pub old_value: Option<JsonValue>,
    pub new_value: Option<JsonValue>,
    pub actor: String,
    pub action_ts: NaiveDateTime,
}

impl AuditLog {
    /// 构造一条审计记录（id 与时间戳自动生成）
    pub fn new(
        action: AuditAction,
        entity_type: &str,
        entity_id: impl ToString,
        old_value: Option<JsonValue>,
        new_value: Option<JsonValue>,
        actor: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action: action.to_db_str().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            old_value,
            new_value,
            actor: actor.to_string(),
            action_ts: chrono::Local::now().naive_local(),
        }
    }
}

// ==========================================
// CodePreAllocationLog - 预分配日志
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodePreAllocationLog {
    pub id: i64,
    pub model_classification_id: i64,
    pub code_classification_id: Option<i64>,
    pub model_type: String,
    pub count: i64,
    pub number_digits: i32,
    pub start_code: String,
    pub end_code: String,
    pub actor: String,
    pub created_at: NaiveDateTime,
}

/// 实体类型常量
pub mod entity_types {
    pub const PRODUCT_TYPE: &str = "ProductType";
    pub const MODEL_CLASSIFICATION: &str = "ModelClassification";
    pub const CODE_CLASSIFICATION: &str = "CodeClassification";
    pub const CODE_USAGE_ENTRY: &str = "CodeUsageEntry";
    pub const SYSTEM_CONFIG: &str = "SystemConfig";
    pub const DICTIONARY_ITEM: &str = "DictionaryItem";
}
