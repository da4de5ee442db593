// ==========================================
// 机种编码管理系统 - 分类目录 API
// ==========================================
// 职责: 产品类型 / 机型分类 / 代码分类的增删改查
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::PolicyReader;
use crate::domain::catalog::{
    CodeClassification, ModelClassification, ModelClassificationPatch, ProductType,
};
use crate::engine::ClassificationCatalog;

// ==========================================
// 请求结构
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelClassificationRequest {
    #[serde(rename = "type")]
    pub model_type: String,
    pub product_type_id: i64,
    pub has_code_classification: bool,
    #[serde(default)]
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub id: i64,
    #[serde(default)]
    pub force: bool,
    pub reason: Option<String>,
}

// ==========================================
// CatalogApi - 分类目录 API
// ==========================================

/// 分类目录API
///
/// 职责：
/// 1. 参数校验
/// 2. 读取编码策略后调用 ClassificationCatalog
/// 3. 错误转换为 ApiError
pub struct CatalogApi {
    catalog: Arc<ClassificationCatalog>,
    policy_reader: Arc<dyn PolicyReader>,
}

impl CatalogApi {
    pub fn new(catalog: Arc<ClassificationCatalog>, policy_reader: Arc<dyn PolicyReader>) -> Self {
        Self {
            catalog,
            policy_reader,
        }
    }

    // ===== 产品类型 =====

    pub fn create_product_type(&self, code: &str, name: Option<&str>, actor: &str) -> ApiResult<ProductType> {
        require_non_empty(code, "产品类型代码")?;
        require_non_empty(actor, "操作人")?;
        Ok(self.catalog.create_product_type(code, name, actor)?)
    }

    pub fn update_product_type(&self, id: i64, name: Option<&str>, actor: &str) -> ApiResult<ProductType> {
        require_non_empty(actor, "操作人")?;
        Ok(self.catalog.update_product_type(id, name, actor)?)
    }

    pub fn list_product_types(&self) -> ApiResult<Vec<ProductType>> {
        Ok(self.catalog.list_product_types()?)
    }

    pub fn get_product_type(&self, id: i64) -> ApiResult<ProductType> {
        Ok(self.catalog.get_product_type(id)?)
    }

    pub fn delete_product_type(&self, id: i64, force: bool, actor: &str) -> ApiResult<()> {
        require_non_empty(actor, "操作人")?;
        Ok(self.catalog.delete_product_type(id, force, actor)?)
    }

    // ===== 机型分类 =====

    pub fn create_model_classification(
        &self,
        request: &CreateModelClassificationRequest,
        actor: &str,
    ) -> ApiResult<ModelClassification> {
        require_non_empty(&request.model_type, "机型分类前缀")?;
        require_non_empty(actor, "操作人")?;
        Ok(self.catalog.create_model_classification(
            &request.model_type,
            request.product_type_id,
            request.has_code_classification,
            &request.description,
            actor,
        )?)
    }

    pub fn update_model_classification(
        &self,
        id: i64,
        patch: ModelClassificationPatch,
        actor: &str,
    ) -> ApiResult<ModelClassification> {
        require_non_empty(actor, "操作人")?;
        Ok(self.catalog.update_model_classification(id, patch, actor)?)
    }

    pub fn list_model_classifications(&self, product_type_id: Option<i64>) -> ApiResult<Vec<ModelClassification>> {
        Ok(self.catalog.list_model_classifications(product_type_id)?)
    }

    pub fn get_model_classification(&self, id: i64) -> ApiResult<ModelClassification> {
        Ok(self.catalog.get_model_classification(id)?)
    }

    /// 删除机型分类，返回软删除的编码数
    pub fn delete_model_classification(&self, request: &DeleteRequest, actor: &str) -> ApiResult<usize> {
        require_non_empty(actor, "操作人")?;
        Ok(self.catalog.delete_model_classification(
            request.id,
            request.force,
            request.reason.as_deref(),
            actor,
        )?)
    }

    // ===== 代码分类 =====

    /// 创建代码分类（同时预分配编码块）
    pub async fn create_code_classification(
        &self,
        model_classification_id: i64,
        code: &str,
        name: &str,
        actor: &str,
    ) -> ApiResult<CodeClassification> {
        require_non_empty(code, "代码分类代码")?;
        require_non_empty(name, "代码分类名称")?;
        require_non_empty(actor, "操作人")?;

        let policy = self.policy_reader.load_policy().await?;
        Ok(self
            .catalog
            .create_code_classification(model_classification_id, code, name, &policy, actor)?)
    }

    pub fn update_code_classification(&self, id: i64, name: &str, actor: &str) -> ApiResult<CodeClassification> {
        require_non_empty(name, "代码分类名称")?;
        require_non_empty(actor, "操作人")?;
        Ok(self.catalog.update_code_classification(id, name, actor)?)
    }

    pub fn list_code_classifications(&self, model_classification_id: i64) -> ApiResult<Vec<CodeClassification>> {
        Ok(self.catalog.list_code_classifications(model_classification_id)?)
    }

    /// 删除代码分类，返回软删除的编码数
    pub fn delete_code_classification(&self, request: &DeleteRequest, actor: &str) -> ApiResult<usize> {
        require_non_empty(actor, "操作人")?;
        Ok(self.catalog.delete_code_classification(
            request.id,
            request.force,
            request.reason.as_deref(),
            actor,
        )?)
    }
}

/// 非空校验
pub(crate) fn require_non_empty(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}
