// ==========================================
// 机种编码管理系统 - 配置管理 API
// ==========================================
// 职责: 系统配置查询/更新、编码策略读取、客户/工厂字典维护
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::catalog_api::require_non_empty;
use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, PolicyReader, SystemPolicy};
use crate::domain::audit::{entity_types, AuditLog};
use crate::domain::dictionary::DictionaryItem;
use crate::domain::types::{AuditAction, DictionaryCategory};
use crate::repository::{AuditLogRepository, DictionaryRepository};

/// 配置项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================

/// 配置管理API
///
/// 职责：
/// 1. 配置查询（全部、单个）
/// 2. 配置更新（带校验与审计）
/// 3. 字典项维护
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    dictionary_repo: Arc<DictionaryRepository>,
    audit_log_repo: Arc<AuditLogRepository>,
}

impl ConfigApi {
    pub fn new(
        config_manager: Arc<ConfigManager>,
        dictionary_repo: Arc<DictionaryRepository>,
        audit_log_repo: Arc<AuditLogRepository>,
    ) -> Self {
        Self {
            config_manager,
            dictionary_repo,
            audit_log_repo,
        }
    }

    /// 查询所有配置（按 key 排序）
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let snapshot = self.config_manager.get_config_snapshot()?;
        let map: BTreeMap<String, String> = serde_json::from_str(&snapshot)
            .map_err(|e| ApiError::InternalError(format!("配置快照解析失败: {}", e)))?;
        Ok(map
            .into_iter()
            .map(|(key, value)| ConfigItem { key, value })
            .collect())
    }

    pub fn get_config(&self, key: &str) -> ApiResult<Option<ConfigItem>> {
        require_non_empty(key, "配置键")?;
        Ok(self
            .config_manager
            .get_config_value(key)?
            .map(|value| ConfigItem {
                key: key.to_string(),
                value,
            }))
    }

    /// 更新配置
    ///
    /// 仅影响之后生成的编码，已有编码保留各自的位数
    pub fn update_config(&self, key: &str, value: &str, actor: &str) -> ApiResult<()> {
        require_non_empty(key, "配置键")?;
        require_non_empty(actor, "操作人")?;

        let old_value = self.config_manager.get_config_value(key)?;
        self.config_manager.set_config_value(key, value)?;

        self.audit_log_repo.insert(&AuditLog::new(
            AuditAction::Update,
            entity_types::SYSTEM_CONFIG,
            key,
            old_value.map(|v| json!({ "value": v })),
            Some(json!({ "value": value.trim() })),
            actor,
        ))?;
        Ok(())
    }

    /// 当前编码策略
    pub async fn get_policy(&self) -> ApiResult<SystemPolicy> {
        Ok(self.config_manager.load_policy().await?)
    }

    // ===== 字典 =====

    pub fn create_dictionary_item(
        &self,
        category: DictionaryCategory,
        code: &str,
        name: &str,
        actor: &str,
    ) -> ApiResult<DictionaryItem> {
        require_non_empty(code, "字典代码")?;
        require_non_empty(name, "字典名称")?;
        require_non_empty(actor, "操作人")?;

        let item = self.dictionary_repo.create(category, code.trim(), name.trim())?;
        self.audit_log_repo.insert(&AuditLog::new(
            AuditAction::Create,
            entity_types::DICTIONARY_ITEM,
            item.id,
            None,
            serde_json::to_value(&item).ok(),
            actor,
        ))?;
        Ok(item)
    }

    pub fn list_dictionary_items(&self, category: DictionaryCategory) -> ApiResult<Vec<DictionaryItem>> {
        Ok(self.dictionary_repo.list_by_category(category)?)
    }
}
