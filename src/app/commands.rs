// ==========================================
// 机种编码管理系统 - 命令入口
// ==========================================
// 职责: 将 API 调用结果包装为统一响应 { success, data, message, errorCode }
// 约定: 命令参数使用自有类型，便于外部路由层直接反序列化
// ==========================================

use crate::api::{
    ApiResponse, AvailabilityRequest, ConfigItem, CreateManualRequest,
    CreateModelClassificationRequest, DeleteRequest,
};
use crate::app::state::AppState;
use crate::config::SystemPolicy;
use crate::domain::audit::{AuditLog, CodePreAllocationLog};
use crate::domain::catalog::{
    CodeClassification, ModelClassification, ModelClassificationPatch, ProductType,
};
use crate::domain::code_usage::{
    AllocationMetadata, ClassificationStats, CodeStats, CodeUsageEntry, CodeUsageFilter,
    CodeUsageQuery, PagedResult,
};
use crate::domain::dictionary::DictionaryItem;
use crate::domain::types::DictionaryCategory;

/// 序列化响应（供外部路由层直接返回 JSON）
pub fn to_json<T: serde::Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        format!(
            r#"{{"success":false,"message":"序列化失败: {}","errorCode":"INTERNAL_ERROR"}}"#,
            e
        )
    })
}

// ==========================================
// 分类目录
// ==========================================

pub fn create_product_type(
    state: &AppState,
    code: String,
    name: Option<String>,
    actor: String,
) -> ApiResponse<ProductType> {
    state
        .catalog_api
        .create_product_type(&code, name.as_deref(), &actor)
        .into()
}

pub fn update_product_type(
    state: &AppState,
    id: i64,
    name: Option<String>,
    actor: String,
) -> ApiResponse<ProductType> {
    state
        .catalog_api
        .update_product_type(id, name.as_deref(), &actor)
        .into()
}

pub fn list_product_types(state: &AppState) -> ApiResponse<Vec<ProductType>> {
    state.catalog_api.list_product_types().into()
}

pub fn get_product_type(state: &AppState, id: i64) -> ApiResponse<ProductType> {
    state.catalog_api.get_product_type(id).into()
}

pub fn delete_product_type(state: &AppState, id: i64, force: bool, actor: String) -> ApiResponse<()> {
    state.catalog_api.delete_product_type(id, force, &actor).into()
}

pub fn create_model_classification(
    state: &AppState,
    request: CreateModelClassificationRequest,
    actor: String,
) -> ApiResponse<ModelClassification> {
    state
        .catalog_api
        .create_model_classification(&request, &actor)
        .into()
}

pub fn update_model_classification(
    state: &AppState,
    id: i64,
    patch: ModelClassificationPatch,
    actor: String,
) -> ApiResponse<ModelClassification> {
    state
        .catalog_api
        .update_model_classification(id, patch, &actor)
        .into()
}

pub fn list_model_classifications(
    state: &AppState,
    product_type_id: Option<i64>,
) -> ApiResponse<Vec<ModelClassification>> {
    state
        .catalog_api
        .list_model_classifications(product_type_id)
        .into()
}

pub fn get_model_classification(state: &AppState, id: i64) -> ApiResponse<ModelClassification> {
    state.catalog_api.get_model_classification(id).into()
}

pub fn delete_model_classification(
    state: &AppState,
    request: DeleteRequest,
    actor: String,
) -> ApiResponse<usize> {
    state
        .catalog_api
        .delete_model_classification(&request, &actor)
        .into()
}

pub async fn create_code_classification(
    state: &AppState,
    model_classification_id: i64,
    code: String,
    name: String,
    actor: String,
) -> ApiResponse<CodeClassification> {
    state
        .catalog_api
        .create_code_classification(model_classification_id, &code, &name, &actor)
        .await
        .into()
}

pub fn update_code_classification(
    state: &AppState,
    id: i64,
    name: String,
    actor: String,
) -> ApiResponse<CodeClassification> {
    state
        .catalog_api
        .update_code_classification(id, &name, &actor)
        .into()
}

pub fn list_code_classifications(
    state: &AppState,
    model_classification_id: i64,
) -> ApiResponse<Vec<CodeClassification>> {
    state
        .catalog_api
        .list_code_classifications(model_classification_id)
        .into()
}

pub fn delete_code_classification(
    state: &AppState,
    request: DeleteRequest,
    actor: String,
) -> ApiResponse<usize> {
    state
        .catalog_api
        .delete_code_classification(&request, &actor)
        .into()
}

// ==========================================
// 编码分配
// ==========================================

pub async fn pre_allocate_block(
    state: &AppState,
    model_classification_id: i64,
    code_classification_id: Option<i64>,
    count: Option<i64>,
    actor: String,
) -> ApiResponse<Vec<CodeUsageEntry>> {
    state
        .code_allocation_api
        .pre_allocate_block(model_classification_id, code_classification_id, count, &actor)
        .await
        .into()
}

pub async fn allocate_code(
    state: &AppState,
    entry_id: i64,
    metadata: AllocationMetadata,
    actor: String,
) -> ApiResponse<CodeUsageEntry> {
    state
        .code_allocation_api
        .allocate(entry_id, metadata, &actor)
        .await
        .into()
}

pub async fn create_manual_code(
    state: &AppState,
    request: CreateManualRequest,
    actor: String,
) -> ApiResponse<CodeUsageEntry> {
    state
        .code_allocation_api
        .create_manual(request, &actor)
        .await
        .into()
}

pub async fn amend_code(
    state: &AppState,
    entry_id: i64,
    metadata: AllocationMetadata,
    actor: String,
) -> ApiResponse<CodeUsageEntry> {
    state
        .code_allocation_api
        .amend(entry_id, metadata, &actor)
        .await
        .into()
}

pub fn soft_delete_code(
    state: &AppState,
    entry_id: i64,
    reason: String,
    actor: String,
) -> ApiResponse<CodeUsageEntry> {
    state
        .code_allocation_api
        .soft_delete(entry_id, &reason, &actor)
        .into()
}

pub fn restore_code(state: &AppState, entry_id: i64, actor: String) -> ApiResponse<CodeUsageEntry> {
    state.code_allocation_api.restore(entry_id, &actor).into()
}

// ==========================================
// 编码查询
// ==========================================

pub fn check_code_availability(state: &AppState, request: AvailabilityRequest) -> ApiResponse<bool> {
    state.code_allocation_api.check_availability(&request).into()
}

pub fn get_code_stats(
    state: &AppState,
    model_classification_id: Option<i64>,
    code_classification_id: Option<i64>,
) -> ApiResponse<CodeStats> {
    state
        .code_allocation_api
        .get_stats(model_classification_id, code_classification_id)
        .into()
}

pub fn get_code_stats_by_classification(
    state: &AppState,
    model_classification_id: i64,
) -> ApiResponse<Vec<ClassificationStats>> {
    state
        .code_allocation_api
        .get_stats_by_code_classification(model_classification_id)
        .into()
}

pub fn list_codes_paged(state: &AppState, query: CodeUsageQuery) -> ApiResponse<PagedResult<CodeUsageEntry>> {
    state.code_allocation_api.get_paged(&query).into()
}

pub fn list_codes_by_model(
    state: &AppState,
    model_type: String,
    filter: CodeUsageFilter,
) -> ApiResponse<Vec<CodeUsageEntry>> {
    state
        .code_allocation_api
        .get_by_model(&model_type, &filter)
        .into()
}

pub fn list_codes_by_model_and_code(
    state: &AppState,
    model_type: String,
    classification_number: i32,
    filter: CodeUsageFilter,
) -> ApiResponse<Vec<CodeUsageEntry>> {
    state
        .code_allocation_api
        .get_by_model_and_code(&model_type, classification_number, &filter)
        .into()
}

pub fn get_code(state: &AppState, id: i64) -> ApiResponse<CodeUsageEntry> {
    state.code_allocation_api.get_by_id(id).into()
}

pub fn find_code_by_model(state: &AppState, model: String) -> ApiResponse<Option<CodeUsageEntry>> {
    state.code_allocation_api.find_by_model(&model).into()
}

pub fn get_code_history(state: &AppState, entry_id: i64) -> ApiResponse<Vec<AuditLog>> {
    state.code_allocation_api.get_entry_history(entry_id).into()
}

pub fn list_pre_allocation_logs(
    state: &AppState,
    model_classification_id: i64,
) -> ApiResponse<Vec<CodePreAllocationLog>> {
    state
        .code_allocation_api
        .list_pre_allocation_logs(model_classification_id)
        .into()
}

// ==========================================
// 配置与字典
// ==========================================

pub fn list_configs(state: &AppState) -> ApiResponse<Vec<ConfigItem>> {
    state.config_api.list_configs().into()
}

pub fn update_config(state: &AppState, key: String, value: String, actor: String) -> ApiResponse<()> {
    state.config_api.update_config(&key, &value, &actor).into()
}

pub async fn get_policy(state: &AppState) -> ApiResponse<SystemPolicy> {
    state.config_api.get_policy().await.into()
}

pub fn create_dictionary_item(
    state: &AppState,
    category: DictionaryCategory,
    code: String,
    name: String,
    actor: String,
) -> ApiResponse<DictionaryItem> {
    state
        .config_api
        .create_dictionary_item(category, &code, &name, &actor)
        .into()
}

pub fn list_dictionary_items(state: &AppState, category: DictionaryCategory) -> ApiResponse<Vec<DictionaryItem>> {
    state.config_api.list_dictionary_items(category).into()
}
