// ==========================================
// 机种编码管理系统 - 分类目录
// ==========================================
// 职责: 产品类型 / 机型分类 / 代码分类维护
// 红线: 两层方案不得创建代码分类
// 红线: 已有编码的机型分类，编码方案与前缀不可修改
// 红线: 删除默认 RESTRICT；force 时先软删除全部依赖编码再删除分类
// ==========================================

use crate::config::SystemPolicy;
use crate::db::with_transaction;
use crate::domain::audit::{entity_types, AuditLog};
use crate::domain::catalog::{
    CodeClassification, ModelClassification, ModelClassificationPatch, ProductType,
};
use crate::domain::types::AuditAction;
use crate::engine::allocation::AllocationEngine;
use crate::engine::code_format::extract_numeric_prefix;
use crate::engine::error::{CodeError, CodeResult};
use crate::engine::ledger::CodeLedger;
use crate::repository::{
    AuditLogRepository, CodeClassificationRepository, CodeUsageRepository,
    ModelClassificationRepository, ProductTypeRepository,
};
use rusqlite::Connection;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 代码分类号允许范围
pub const CLASSIFICATION_NUMBER_RANGE: (i32, i32) = (1, 99);

// ==========================================
// ClassificationCatalog - 分类目录
// ==========================================
pub struct ClassificationCatalog {
    conn: Arc<Mutex<Connection>>,
    product_type_repo: Arc<ProductTypeRepository>,
    model_classification_repo: Arc<ModelClassificationRepository>,
    code_classification_repo: Arc<CodeClassificationRepository>,
}

impl ClassificationCatalog {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        product_type_repo: Arc<ProductTypeRepository>,
        model_classification_repo: Arc<ModelClassificationRepository>,
        code_classification_repo: Arc<CodeClassificationRepository>,
    ) -> Self {
        Self {
            conn,
            product_type_repo,
            model_classification_repo,
            code_classification_repo,
        }
    }

    // ==========================================
    // 产品类型
    // ==========================================

    /// 创建产品类型
    ///
    /// # 错误
    /// - Validation: code 非大写字母数字
    /// - Duplicate: code 已存在
    pub fn create_product_type(&self, code: &str, name: Option<&str>, actor: &str) -> CodeResult<ProductType> {
        let code = code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return Err(CodeError::Validation(format!(
                "产品类型代码 {} 必须为大写字母或数字",
                code
            )));
        }
        let name = name.map(str::trim).filter(|s| !s.is_empty());

        let pt = with_transaction(&self.conn, |conn| {
            let pt = ProductTypeRepository::insert_in(conn, code, name)?;
            audit_in(conn, AuditAction::Create, entity_types::PRODUCT_TYPE, pt.id, None, snapshot(&pt), actor)?;
            Ok::<_, CodeError>(pt)
        })?;
        info!("产品类型已创建: code={}", pt.code);
        Ok(pt)
    }

    pub fn update_product_type(&self, id: i64, name: Option<&str>, actor: &str) -> CodeResult<ProductType> {
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        with_transaction(&self.conn, |conn| {
            let before = load_product_type_in(conn, id)?;
            ProductTypeRepository::update_name_in(conn, id, name)?;
            let after = load_product_type_in(conn, id)?;
            audit_in(conn, AuditAction::Update, entity_types::PRODUCT_TYPE, id, snapshot(&before), snapshot(&after), actor)?;
            Ok(after)
        })
    }

    pub fn list_product_types(&self) -> CodeResult<Vec<ProductType>> {
        Ok(self.product_type_repo.list_all()?)
    }

    pub fn get_product_type(&self, id: i64) -> CodeResult<ProductType> {
        self.product_type_repo
            .find_by_id(id)?
            .ok_or_else(|| CodeError::not_found(entity_types::PRODUCT_TYPE, id))
    }

    /// 删除产品类型
    ///
    /// 存在机型分类时默认拒绝；force 时逐个强制删除下属机型分类
    pub fn delete_product_type(&self, id: i64, force: bool, actor: &str) -> CodeResult<()> {
        with_transaction(&self.conn, |conn| {
            let pt = load_product_type_in(conn, id)?;
            let children = ModelClassificationRepository::list_by_product_type_in(conn, id)?;
            if !children.is_empty() && !force {
                warn!("产品类型删除被拒绝: code={}, 机型分类数={}", pt.code, children.len());
                return Err(CodeError::HasDependents(format!(
                    "产品类型 {} 下存在 {} 个机型分类",
                    pt.code,
                    children.len()
                )));
            }

            let reason = format!("产品类型 {} 被删除", pt.code);
            for mc in &children {
                purge_model_classification_in(conn, mc, &reason, actor)?;
            }

            ProductTypeRepository::delete_in(conn, id)?;
            audit_in(conn, AuditAction::Delete, entity_types::PRODUCT_TYPE, id, snapshot(&pt), None, actor)?;
            info!("产品类型已删除: code={}, force={}", pt.code, force);
            Ok(())
        })
    }

    // ==========================================
    // 机型分类
    // ==========================================

    /// 创建机型分类
    ///
    /// # 错误
    /// - Validation: type 为空
    /// - NotFound: 产品类型不存在
    /// - Duplicate: type 已存在
    pub fn create_model_classification(
        &self,
        model_type: &str,
        product_type_id: i64,
        has_code_classification: bool,
        description: &[String],
        actor: &str,
    ) -> CodeResult<ModelClassification> {
        let model_type = model_type.trim();
        if model_type.is_empty() {
            return Err(CodeError::Validation("机型分类前缀不能为空".to_string()));
        }

        let mc = with_transaction(&self.conn, |conn| {
            load_product_type_in(conn, product_type_id)?;
            if ModelClassificationRepository::find_by_type_in(conn, model_type)?.is_some() {
                return Err(CodeError::Duplicate(format!("机型分类 {} 已存在", model_type)));
            }

            let mc = ModelClassificationRepository::insert_in(
                conn,
                model_type,
                product_type_id,
                has_code_classification,
                description,
            )?;
            audit_in(conn, AuditAction::Create, entity_types::MODEL_CLASSIFICATION, mc.id, None, snapshot(&mc), actor)?;
            Ok(mc)
        })?;
        info!(
            "机型分类已创建: type={}, three_layer={}",
            mc.model_type, mc.has_code_classification
        );
        Ok(mc)
    }

    /// 修改机型分类
    ///
    /// # 错误
    /// - InvalidScheme: 已有编码时修改编码方案
    /// - Validation: 已有编码时修改前缀
    pub fn update_model_classification(
        &self,
        id: i64,
        patch: ModelClassificationPatch,
        actor: &str,
    ) -> CodeResult<ModelClassification> {
        with_transaction(&self.conn, |conn| {
            let before = load_model_classification_in(conn, id)?;
            let entry_count = CodeUsageRepository::count_all_by_model_classification_in(conn, id)?;
            let mut updated = before.clone();

            if let Some(flag) = patch.has_code_classification {
                if flag != before.has_code_classification {
                    if entry_count > 0 {
                        return Err(CodeError::InvalidScheme(format!(
                            "机型分类 {} 已有 {} 条编码，编码方案不可修改",
                            before.model_type, entry_count
                        )));
                    }
                    let cc_count = CodeClassificationRepository::list_by_model_classification_in(conn, id)?.len();
                    if !flag && cc_count > 0 {
                        return Err(CodeError::InvalidScheme(format!(
                            "机型分类 {} 下存在代码分类，不能改为两层方案",
                            before.model_type
                        )));
                    }
                    updated.has_code_classification = flag;
                }
            }

            if let Some(model_type) = patch.model_type.as_deref().map(str::trim) {
                if model_type.is_empty() {
                    return Err(CodeError::Validation("机型分类前缀不能为空".to_string()));
                }
                if model_type != before.model_type {
                    if entry_count > 0 {
                        return Err(CodeError::Validation(format!(
                            "机型分类 {} 已有编码，前缀不可修改",
                            before.model_type
                        )));
                    }
                    if ModelClassificationRepository::find_by_type_in(conn, model_type)?.is_some() {
                        return Err(CodeError::Duplicate(format!("机型分类 {} 已存在", model_type)));
                    }
                    updated.model_type = model_type.to_string();
                }
            }

            if let Some(product_type_id) = patch.product_type_id {
                load_product_type_in(conn, product_type_id)?;
                updated.product_type_id = product_type_id;
            }
            if let Some(description) = patch.description {
                updated.description = description;
            }

            ModelClassificationRepository::update_in(conn, &updated)?;
            let after = load_model_classification_in(conn, id)?;
            audit_in(
                conn,
                AuditAction::Update,
                entity_types::MODEL_CLASSIFICATION,
                id,
                snapshot(&before),
                snapshot(&after),
                actor,
            )?;
            Ok(after)
        })
    }

    pub fn list_model_classifications(&self, product_type_id: Option<i64>) -> CodeResult<Vec<ModelClassification>> {
        Ok(self.model_classification_repo.list(product_type_id)?)
    }

    pub fn get_model_classification(&self, id: i64) -> CodeResult<ModelClassification> {
        self.model_classification_repo
            .find_by_id(id)?
            .ok_or_else(|| CodeError::not_found(entity_types::MODEL_CLASSIFICATION, id))
    }

    /// 删除机型分类
    ///
    /// 存在未删除编码或代码分类时默认拒绝；force 时软删除全部编码后删除
    pub fn delete_model_classification(
        &self,
        id: i64,
        force: bool,
        reason: Option<&str>,
        actor: &str,
    ) -> CodeResult<usize> {
        with_transaction(&self.conn, |conn| {
            let mc = load_model_classification_in(conn, id)?;
            let active = CodeUsageRepository::active_ids_by_model_classification_in(conn, id)?;
            let ccs = CodeClassificationRepository::list_by_model_classification_in(conn, id)?;
            if (!active.is_empty() || !ccs.is_empty()) && !force {
                warn!("机型分类删除被拒绝: type={}, 编码数={}", mc.model_type, active.len());
                return Err(CodeError::HasDependents(format!(
                    "机型分类 {} 下存在 {} 条编码、{} 个代码分类",
                    mc.model_type,
                    active.len(),
                    ccs.len()
                )));
            }

            let reason = force_reason(reason, &mc.model_type);
            let deleted = purge_model_classification_in(conn, &mc, &reason, actor)?;
            info!(
                "机型分类已删除: type={}, 软删除编码数={}",
                mc.model_type, deleted
            );
            Ok(deleted)
        })
    }

    // ==========================================
    // 代码分类
    // ==========================================

    /// 创建代码分类，并在同一事务内预分配编码块
    ///
    /// # 错误
    /// - InvalidScheme: 机型分类为两层方案
    /// - Range: code 的数值不在 [1, 99]
    /// - Duplicate: 分类号已被使用
    pub fn create_code_classification(
        &self,
        model_classification_id: i64,
        code: &str,
        name: &str,
        policy: &SystemPolicy,
        actor: &str,
    ) -> CodeResult<CodeClassification> {
        let code = code.trim();
        let name = name.trim();
        if name.is_empty() {
            return Err(CodeError::Validation("代码分类名称不能为空".to_string()));
        }

        let cc = with_transaction(&self.conn, |conn| {
            let mc = load_model_classification_in(conn, model_classification_id)?;
            if !mc.has_code_classification {
                return Err(CodeError::InvalidScheme(format!(
                    "两层方案机型 {} 不支持代码分类",
                    mc.model_type
                )));
            }

            let number = extract_numeric_prefix(code);
            let (min, max) = CLASSIFICATION_NUMBER_RANGE;
            if number < min || number > max {
                return Err(CodeError::Range {
                    field: "code".to_string(),
                    value: number as i64,
                    min: min as i64,
                    max: max as i64,
                });
            }
            if CodeClassificationRepository::find_by_number_in(conn, mc.id, number)?.is_some() {
                return Err(CodeError::Duplicate(format!(
                    "机型分类 {} 下分类号 {} 已存在",
                    mc.model_type, number
                )));
            }

            let cc = CodeClassificationRepository::insert_in(conn, mc.id, code, number, name)?;
            audit_in(conn, AuditAction::Create, entity_types::CODE_CLASSIFICATION, cc.id, None, snapshot(&cc), actor)?;

            AllocationEngine::pre_allocate_block_in(
                conn,
                &mc,
                Some(&cc),
                policy.block_size,
                policy.number_digits,
                actor,
            )?;
            Ok(cc)
        })?;

        info!("代码分类已创建: code={}, number={}", cc.code, cc.number);
        Ok(cc)
    }

    /// 重命名代码分类（code 不可修改）
    pub fn update_code_classification(&self, id: i64, name: &str, actor: &str) -> CodeResult<CodeClassification> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CodeError::Validation("代码分类名称不能为空".to_string()));
        }
        with_transaction(&self.conn, |conn| {
            let before = load_code_classification_in(conn, id)?;
            CodeClassificationRepository::update_name_in(conn, id, name)?;
            let after = load_code_classification_in(conn, id)?;
            audit_in(
                conn,
                AuditAction::Update,
                entity_types::CODE_CLASSIFICATION,
                id,
                snapshot(&before),
                snapshot(&after),
                actor,
            )?;
            Ok(after)
        })
    }

    pub fn list_code_classifications(&self, model_classification_id: i64) -> CodeResult<Vec<CodeClassification>> {
        Ok(self
            .code_classification_repo
            .list_by_model_classification(model_classification_id)?)
    }

    pub fn get_code_classification(&self, id: i64) -> CodeResult<CodeClassification> {
        self.code_classification_repo
            .find_by_id(id)?
            .ok_or_else(|| CodeError::not_found(entity_types::CODE_CLASSIFICATION, id))
    }

    /// 删除代码分类
    ///
    /// 存在未删除编码时默认拒绝；force 时软删除全部编码后删除
    pub fn delete_code_classification(
        &self,
        id: i64,
        force: bool,
        reason: Option<&str>,
        actor: &str,
    ) -> CodeResult<usize> {
        with_transaction(&self.conn, |conn| {
            let cc = load_code_classification_in(conn, id)?;
            let active = CodeUsageRepository::active_ids_by_code_classification_in(conn, id)?;
            if !active.is_empty() && !force {
                warn!("代码分类删除被拒绝: code={}, 编码数={}", cc.code, active.len());
                return Err(CodeError::HasDependents(format!(
                    "代码分类 {} 下存在 {} 条编码",
                    cc.code,
                    active.len()
                )));
            }

            let reason = force_reason(reason, &cc.code);
            for entry_id in &active {
                CodeLedger::soft_delete_in(conn, *entry_id, &reason, actor)?;
            }
            CodeClassificationRepository::delete_in(conn, id)?;
            audit_in(conn, AuditAction::Delete, entity_types::CODE_CLASSIFICATION, id, snapshot(&cc), None, actor)?;
            info!("代码分类已删除: code={}, 软删除编码数={}", cc.code, active.len());
            Ok(active.len())
        })
    }
}

// ==========================================
// 事务内辅助函数
// ==========================================

/// 强制删除机型分类：软删除编码 → 删除代码分类 → 删除机型分类
///
/// 返回软删除的编码数
fn purge_model_classification_in(
    conn: &Connection,
    mc: &ModelClassification,
    reason: &str,
    actor: &str,
) -> CodeResult<usize> {
    let active = CodeUsageRepository::active_ids_by_model_classification_in(conn, mc.id)?;
    for entry_id in &active {
        CodeLedger::soft_delete_in(conn, *entry_id, reason, actor)?;
    }

    for cc in CodeClassificationRepository::list_by_model_classification_in(conn, mc.id)? {
        CodeClassificationRepository::delete_in(conn, cc.id)?;
        audit_in(conn, AuditAction::Delete, entity_types::CODE_CLASSIFICATION, cc.id, snapshot(&cc), None, actor)?;
    }

    ModelClassificationRepository::delete_in(conn, mc.id)?;
    audit_in(conn, AuditAction::Delete, entity_types::MODEL_CLASSIFICATION, mc.id, snapshot(mc), None, actor)?;
    Ok(active.len())
}

fn force_reason(reason: Option<&str>, target: &str) -> String {
    reason
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("所属分类 {} 被删除", target))
}

fn load_product_type_in(conn: &Connection, id: i64) -> CodeResult<ProductType> {
    ProductTypeRepository::find_by_id_in(conn, id)?
        .ok_or_else(|| CodeError::not_found(entity_types::PRODUCT_TYPE, id))
}

fn load_model_classification_in(conn: &Connection, id: i64) -> CodeResult<ModelClassification> {
    ModelClassificationRepository::find_by_id_in(conn, id)?
        .ok_or_else(|| CodeError::not_found(entity_types::MODEL_CLASSIFICATION, id))
}

fn load_code_classification_in(conn: &Connection, id: i64) -> CodeResult<CodeClassification> {
    CodeClassificationRepository::find_by_id_in(conn, id)?
        .ok_or_else(|| CodeError::not_found(entity_types::CODE_CLASSIFICATION, id))
}

fn snapshot<T: serde::Serialize>(value: &T) -> Option<JsonValue> {
    serde_json::to_value(value).ok()
}

fn audit_in(
    conn: &Connection,
    action: AuditAction,
    entity_type: &str,
    entity_id: i64,
    old_value: Option<JsonValue>,
    new_value: Option<JsonValue>,
    actor: &str,
) -> CodeResult<()> {
    AuditLogRepository::insert_in(
        conn,
        &AuditLog::new(action, entity_type, entity_id, old_value, new_value, actor),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ClassificationCatalog, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));
        let catalog = ClassificationCatalog::new(
            shared.clone(),
            Arc::new(ProductTypeRepository::new(shared.clone())),
            Arc::new(ModelClassificationRepository::new(shared.clone())),
            Arc::new(CodeClassificationRepository::new(shared.clone())),
        );
        (catalog, shared)
    }

    #[test]
    fn test_product_type_code_validation() {
        let (catalog, _) = setup();
        assert!(matches!(
            catalog.create_product_type("pcb", None, "tester"),
            Err(CodeError::Validation(_))
        ));
        catalog.create_product_type("PCB", Some("印制板"), "tester").unwrap();
        assert!(matches!(
            catalog.create_product_type("PCB", None, "tester"),
            Err(CodeError::Duplicate(_))
        ));
    }

    #[test]
    fn test_model_classification_requires_product_type() {
        let (catalog, _) = setup();
        let result = catalog.create_model_classification("SLU-", 999, true, &[], "tester");
        assert!(matches!(result, Err(CodeError::NotFound { .. })));
    }

    #[test]
    fn test_code_classification_range_and_duplicate() {
        let (catalog, _) = setup();
        let policy = SystemPolicy::default();
        let pt = catalog.create_product_type("PCB", None, "tester").unwrap();
        let mc = catalog
            .create_model_classification("SLU-", pt.id, true, &[], "tester")
            .unwrap();

        for bad in ["0", "100-超限", "内层"] {
            let result = catalog.create_code_classification(mc.id, bad, "x", &policy, "tester");
            assert!(matches!(result, Err(CodeError::Range { .. })), "code={}", bad);
        }

        catalog.create_code_classification(mc.id, "1-内层", "内层", &policy, "tester").unwrap();
        let result = catalog.create_code_classification(mc.id, "01", "重复", &policy, "tester");
        assert!(matches!(result, Err(CodeError::Duplicate(_))));
    }

    #[test]
    fn test_two_layer_rejects_code_classification() {
        let (catalog, _) = setup();
        let pt = catalog.create_product_type("FPC", None, "tester").unwrap();
        let mc = catalog
            .create_model_classification("PX", pt.id, false, &[], "tester")
            .unwrap();
        let result = catalog.create_code_classification(mc.id, "1", "x", &SystemPolicy::default(), "tester");
        assert!(matches!(result, Err(CodeError::InvalidScheme(_))));
    }

    #[test]
    fn test_delete_product_type_restrict() {
        let (catalog, _) = setup();
        let pt = catalog.create_product_type("PCB", None, "tester").unwrap();
        catalog
            .create_model_classification("PX", pt.id, false, &[], "tester")
            .unwrap();

        assert!(matches!(
            catalog.delete_product_type(pt.id, false, "tester"),
            Err(CodeError::HasDependents(_))
        ));
        catalog.delete_product_type(pt.id, true, "tester").unwrap();
        assert!(catalog.list_product_types().unwrap().is_empty());
        assert!(catalog.list_model_classifications(None).unwrap().is_empty());
    }

    #[test]
    fn test_rename_code_classification() {
        let (catalog, _) = setup();
        let policy = SystemPolicy {
            block_size: 5,
            ..SystemPolicy::default()
        };
        let pt = catalog.create_product_type("PCB", None, "tester").unwrap();
        let mc = catalog
            .create_model_classification("SLU-", pt.id, true, &[], "tester")
            .unwrap();
        let cc = catalog.create_code_classification(mc.id, "2-外层", "外层", &policy, "tester").unwrap();

        let renamed = catalog.update_code_classification(cc.id, "外层板", "tester").unwrap();
        assert_eq!(renamed.name, "外层板");
        assert_eq!(renamed.code, "2-外层");
    }
}
