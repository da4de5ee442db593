// ==========================================
// 机种编码管理系统 - 编码分配 API
// ==========================================
// 职责: 编码预分配、分配、手工创建、修改、软删除/恢复、查询
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::catalog_api::require_non_empty;
use crate::api::error::{ApiError, ApiResult};
use crate::config::PolicyReader;
use crate::domain::audit::{entity_types, AuditLog, CodePreAllocationLog};
use crate::domain::code_usage::{
    AllocationMetadata, ClassificationStats, CodeStats, CodeUsageEntry, CodeUsageFilter,
    CodeUsageQuery, PagedResult,
};
use crate::engine::{AllocationEngine, CodeLedger};
use crate::repository::code_usage_repo::{page_offset, MAX_PAGE_SIZE};
use crate::repository::{AuditLogRepository, PreAllocationLogRepository};

// ==========================================
// 请求结构
// ==========================================

/// 手工创建编码请求（两层方案）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManualRequest {
    pub model_classification_id: i64,
    pub number_part: String,
    pub extension: Option<String>,
    #[serde(default)]
    pub metadata: AllocationMetadata,
}

/// 编码可用性检查请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub model_type: String,
    pub classification_number: Option<i32>,
    pub actual_number: String,
    pub extension: Option<String>,
}

// ==========================================
// CodeAllocationApi - 编码分配 API
// ==========================================
pub struct CodeAllocationApi {
    allocation: Arc<AllocationEngine>,
    ledger: Arc<CodeLedger>,
    policy_reader: Arc<dyn PolicyReader>,
    audit_log_repo: Arc<AuditLogRepository>,
    pre_allocation_log_repo: Arc<PreAllocationLogRepository>,
}

impl CodeAllocationApi {
    pub fn new(
        allocation: Arc<AllocationEngine>,
        ledger: Arc<CodeLedger>,
        policy_reader: Arc<dyn PolicyReader>,
        audit_log_repo: Arc<AuditLogRepository>,
        pre_allocation_log_repo: Arc<PreAllocationLogRepository>,
    ) -> Self {
        Self {
            allocation,
            ledger,
            policy_reader,
            audit_log_repo,
            pre_allocation_log_repo,
        }
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 预分配编码块
    ///
    /// # 参数
    /// - count: 为空时使用策略中的块大小
    pub async fn pre_allocate_block(
        &self,
        model_classification_id: i64,
        code_classification_id: Option<i64>,
        count: Option<i64>,
        actor: &str,
    ) -> ApiResult<Vec<CodeUsageEntry>> {
        require_non_empty(actor, "操作人")?;
        let policy = self.policy_reader.load_policy().await?;
        Ok(self.allocation.pre_allocate_block(
            model_classification_id,
            code_classification_id,
            count.unwrap_or(policy.block_size),
            policy.number_digits,
            actor,
        )?)
    }

    /// 分配编码
    pub async fn allocate(
        &self,
        entry_id: i64,
        metadata: AllocationMetadata,
        actor: &str,
    ) -> ApiResult<CodeUsageEntry> {
        require_non_empty(actor, "操作人")?;
        let policy = self.policy_reader.load_policy().await?;
        Ok(self.allocation.allocate(entry_id, metadata, &policy, actor)?)
    }

    /// 手工创建编码
    pub async fn create_manual(&self, request: CreateManualRequest, actor: &str) -> ApiResult<CodeUsageEntry> {
        require_non_empty(&request.number_part, "流水号")?;
        require_non_empty(actor, "操作人")?;
        let policy = self.policy_reader.load_policy().await?;
        Ok(self.allocation.create_manual(
            request.model_classification_id,
            &request.number_part,
            request.extension.as_deref(),
            request.metadata,
            &policy,
            actor,
        )?)
    }

    /// 修改已分配编码的业务信息
    pub async fn amend(
        &self,
        entry_id: i64,
        metadata: AllocationMetadata,
        actor: &str,
    ) -> ApiResult<CodeUsageEntry> {
        require_non_empty(actor, "操作人")?;
        let policy = self.policy_reader.load_policy().await?;
        Ok(self.allocation.amend(entry_id, metadata, &policy, actor)?)
    }

    pub fn soft_delete(&self, entry_id: i64, reason: &str, actor: &str) -> ApiResult<CodeUsageEntry> {
        require_non_empty(reason, "删除原因")?;
        require_non_empty(actor, "操作人")?;
        Ok(self.ledger.soft_delete(entry_id, reason, actor)?)
    }

    pub fn restore(&self, entry_id: i64, actor: &str) -> ApiResult<CodeUsageEntry> {
        require_non_empty(actor, "操作人")?;
        Ok(self.ledger.restore(entry_id, actor)?)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn check_availability(&self, request: &AvailabilityRequest) -> ApiResult<bool> {
        require_non_empty(&request.model_type, "机型前缀")?;
        require_non_empty(&request.actual_number, "流水号")?;
        Ok(self.allocation.check_availability(
            &request.model_type,
            request.classification_number,
            &request.actual_number,
            request.extension.as_deref(),
        )?)
    }

    pub fn get_stats(
        &self,
        model_classification_id: Option<i64>,
        code_classification_id: Option<i64>,
    ) -> ApiResult<CodeStats> {
        Ok(self.ledger.get_stats(model_classification_id, code_classification_id)?)
    }

    pub fn get_stats_by_code_classification(&self, model_classification_id: i64) -> ApiResult<Vec<ClassificationStats>> {
        Ok(self.ledger.get_stats_by_code_classification(model_classification_id)?)
    }

    pub fn get_paged(&self, query: &CodeUsageQuery) -> ApiResult<PagedResult<CodeUsageEntry>> {
        if query.page < 1 {
            return Err(ApiError::InvalidInput(format!("页码必须从1开始: {}", query.page)));
        }
        if page_offset(query.page, query.page_size.clamp(1, MAX_PAGE_SIZE)).is_none() {
            return Err(ApiError::InvalidInput(format!("页码超出范围: {}", query.page)));
        }
        Ok(self.ledger.get_paged(query)?)
    }

    pub fn get_by_model(&self, model_type: &str, filter: &CodeUsageFilter) -> ApiResult<Vec<CodeUsageEntry>> {
        require_non_empty(model_type, "机型前缀")?;
        Ok(self.ledger.get_by_model(model_type, filter)?)
    }

    pub fn get_by_model_and_code(
        &self,
        model_type: &str,
        classification_number: i32,
        filter: &CodeUsageFilter,
    ) -> ApiResult<Vec<CodeUsageEntry>> {
        require_non_empty(model_type, "机型前缀")?;
        Ok(self
            .ledger
            .get_by_model_and_code(model_type, classification_number, filter)?)
    }

    pub fn get_by_id(&self, id: i64) -> ApiResult<CodeUsageEntry> {
        Ok(self.ledger.get_by_id(id)?)
    }

    pub fn find_by_model(&self, model: &str) -> ApiResult<Option<CodeUsageEntry>> {
        require_non_empty(model, "编码")?;
        Ok(self.ledger.find_by_model(model.trim())?)
    }

    /// 编码记录的审计历史（时间升序）
    pub fn get_entry_history(&self, entry_id: i64) -> ApiResult<Vec<AuditLog>> {
        Ok(self
            .audit_log_repo
            .find_by_entity(entity_types::CODE_USAGE_ENTRY, &entry_id.to_string())?)
    }

    pub fn list_pre_allocation_logs(&self, model_classification_id: i64) -> ApiResult<Vec<CodePreAllocationLog>> {
        Ok(self
            .pre_allocation_log_repo
            .find_by_model_classification(model_classification_id)?)
    }
}
