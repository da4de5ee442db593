// ==========================================
// 机种编码管理系统 - 编码分配引擎
// ==========================================
// 职责: 预分配编码块、分配编码、手工创建编码、修改已分配编码
// 状态机: 未分配 --allocate--> 已分配；两者均可软删除/恢复；不可取消分配
// 红线: 预分配整块成功或整块回滚
// 红线: 唯一性以存储层唯一索引为准，预检查仅用于给出友好错误
// ==========================================

use crate::config::SystemPolicy;
use crate::db::with_transaction;
use crate::domain::audit::{entity_types, AuditLog, CodePreAllocationLog};
use crate::domain::catalog::{CodeClassification, ModelClassification};
use crate::domain::code_usage::{AllocationMetadata, CodeUsageEntry, NewCodeUsageEntry};
use crate::domain::types::{AuditAction, DictionaryCategory};
use crate::engine::code_format::{block_capacity, compose, pad_number, validate_extension};
use crate::engine::error::{CodeError, CodeResult};
use crate::engine::ledger::CodeLedger;
use crate::repository::error::RepositoryError;
use crate::repository::sql_utils::now;
use crate::repository::{
    AuditLogRepository, CodeClassificationRepository, CodeUsageRepository, DictionaryRepository,
    ModelClassificationRepository, PreAllocationLogRepository,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

// ==========================================
// AllocationEngine - 编码分配引擎
// ==========================================
pub struct AllocationEngine {
    conn: Arc<Mutex<Connection>>,
    ledger: Arc<CodeLedger>,
}

impl AllocationEngine {
    pub fn new(conn: Arc<Mutex<Connection>>, ledger: Arc<CodeLedger>) -> Self {
        Self { conn, ledger }
    }

    // ==========================================
    // 预分配
    // ==========================================

    /// 预分配编码块（独立事务）
    ///
    /// # 参数
    /// - `code_classification_id`: 三层方案必填，两层方案必须为空
    /// - `count`: 数量，范围 [1, 10^digits]
    /// - `digits`: 流水号位数
    ///
    /// # 返回
    /// 新生成的未分配编码记录（按流水号升序）
    pub fn pre_allocate_block(
        &self,
        model_classification_id: i64,
        code_classification_id: Option<i64>,
        count: i64,
        digits: i32,
        actor: &str,
    ) -> CodeResult<Vec<CodeUsageEntry>> {
        with_transaction(&self.conn, |conn| {
            let mc = ModelClassificationRepository::find_by_id_in(conn, model_classification_id)?
                .ok_or_else(|| {
                    CodeError::not_found(entity_types::MODEL_CLASSIFICATION, model_classification_id)
                })?;

            let cc = match code_classification_id {
                Some(id) => {
                    let cc = CodeClassificationRepository::find_by_id_in(conn, id)?
                        .ok_or_else(|| CodeError::not_found(entity_types::CODE_CLASSIFICATION, id))?;
                    if cc.model_classification_id != mc.id {
                        return Err(CodeError::Validation(format!(
                            "代码分类 {} 不属于机型分类 {}",
                            cc.code, mc.model_type
                        )));
                    }
                    Some(cc)
                }
                None => None,
            };

            Self::pre_allocate_block_in(conn, &mc, cc.as_ref(), count, digits, actor)
        })
    }

    /// 事务内预分配（供创建代码分类时在同一事务内调用）
    ///
    /// 任一编码已存在即返回 Allocation 错误，由外层事务整体回滚
    pub fn pre_allocate_block_in(
        conn: &Connection,
        mc: &ModelClassification,
        cc: Option<&CodeClassification>,
        count: i64,
        digits: i32,
        actor: &str,
    ) -> CodeResult<Vec<CodeUsageEntry>> {
        let capacity = block_capacity(digits);
        if capacity == 0 {
            return Err(CodeError::Format(format!("位数必须为正数: digits={}", digits)));
        }
        if count < 1 || count > capacity {
            return Err(CodeError::Range {
                field: "count".to_string(),
                value: count,
                min: 1,
                max: capacity,
            });
        }

        match (mc.has_code_classification, cc) {
            (true, None) => {
                return Err(CodeError::InvalidScheme(format!(
                    "三层方案机型 {} 预分配必须指定代码分类",
                    mc.model_type
                )))
            }
            (false, Some(_)) => {
                return Err(CodeError::InvalidScheme(format!(
                    "两层方案机型 {} 不支持代码分类",
                    mc.model_type
                )))
            }
            _ => {}
        }

        let classification_number = cc.map(|c| c.number);
        let mut ids = Vec::with_capacity(count as usize);
        let mut first_model = String::new();
        let mut last_model = String::new();

        for i in 0..count {
            let actual_number = pad_number(i, digits)?;
            let model = compose(&mc.model_type, classification_number, &actual_number, None);

            if CodeUsageRepository::model_exists_in(conn, &model)? {
                warn!("预分配冲突: model={}", model);
                return Err(CodeError::Allocation(format!("编码 {} 已存在", model)));
            }

            let new_entry = NewCodeUsageEntry {
                model: model.clone(),
                model_type: mc.model_type.clone(),
                code_classification_number: classification_number,
                actual_number,
                extension: None,
                model_classification_id: mc.id,
                code_classification_id: cc.map(|c| c.id),
                number_digits: digits,
                metadata: AllocationMetadata::default(),
                is_allocated: false,
            };
            let id = CodeUsageRepository::insert_in(conn, &new_entry).map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => {
                    CodeError::Allocation(format!("编码 {} 已存在", model))
                }
                other => other.into(),
            })?;

            if i == 0 {
                first_model = model.clone();
            }
            last_model = model;
            ids.push(id);
        }

        PreAllocationLogRepository::insert_in(
            conn,
            &CodePreAllocationLog {
                id: 0,
                model_classification_id: mc.id,
                code_classification_id: cc.map(|c| c.id),
                model_type: mc.model_type.clone(),
                count,
                number_digits: digits,
                start_code: first_model.clone(),
                end_code: last_model.clone(),
                actor: actor.to_string(),
                created_at: now(),
            },
        )?;

        let (audit_entity, audit_id) = match cc {
            Some(c) => (entity_types::CODE_CLASSIFICATION, c.id),
            None => (entity_types::MODEL_CLASSIFICATION, mc.id),
        };
        AuditLogRepository::insert_in(
            conn,
            &AuditLog::new(
                AuditAction::PreAllocate,
                audit_entity,
                audit_id,
                None,
                Some(json!({
                    "count": count,
                    "numberDigits": digits,
                    "startCode": first_model,
                    "endCode": last_model,
                })),
                actor,
            ),
        )?;

        info!(
            "预分配完成: model_type={}, count={}, range={}..{}",
            mc.model_type, count, first_model, last_model
        );

        ids.into_iter()
            .map(|id| CodeLedger::load_in(conn, id))
            .collect()
    }

    // ==========================================
    // 分配
    // ==========================================

    /// 分配编码（未分配 → 已分配）
    ///
    /// # 错误
    /// - NotFound / AlreadyAllocated / AlreadyDeleted
    /// - Validation: 扩展后缀非法
    /// - Duplicate: 追加扩展后缀后的编码已存在
    pub fn allocate(
        &self,
        entry_id: i64,
        metadata: AllocationMetadata,
        policy: &SystemPolicy,
        actor: &str,
    ) -> CodeResult<CodeUsageEntry> {
        let meta = metadata.normalized();

        let entry = with_transaction(&self.conn, |conn| {
            let before = CodeLedger::load_in(conn, entry_id)?;
            if before.is_deleted {
                return Err(CodeError::AlreadyDeleted(before.model));
            }
            if before.is_allocated {
                return Err(CodeError::AlreadyAllocated(before.model));
            }

            validate_dictionary_refs_in(conn, &meta)?;
            let model = match meta.extension.as_deref() {
                Some(ext) => {
                    validate_extension(ext, policy.extension_max_length, &policy.extension_excluded_chars)?;
                    let model = compose(
                        &before.model_type,
                        before.code_classification_number,
                        &before.actual_number,
                        Some(ext),
                    );
                    if CodeUsageRepository::model_exists_in(conn, &model)? {
                        return Err(CodeError::Duplicate(model));
                    }
                    model
                }
                None => before.model.clone(),
            };

            let rows = CodeUsageRepository::allocate_in(conn, entry_id, &model, &meta, &now())?;
            if rows == 0 {
                // 并发下已被其他请求分配或删除
                return Err(CodeError::AlreadyAllocated(before.model));
            }

            let after = CodeLedger::load_in(conn, entry_id)?;
            AuditLogRepository::insert_in(
                conn,
                &AuditLog::new(
                    AuditAction::Allocate,
                    entity_types::CODE_USAGE_ENTRY,
                    entry_id,
                    serde_json::to_value(&before).ok(),
                    serde_json::to_value(&after).ok(),
                    actor,
                ),
            )?;
            Ok(after)
        })?;

        info!("编码已分配: model={}, actor={}", entry.model, actor);
        Ok(entry)
    }

    /// 手工创建编码（仅两层方案），直接写入为已分配
    ///
    /// # 参数
    /// - `number_part`: 流水号，必须为 policy.number_digits 位数字
    /// - `extension`: 扩展后缀，优先于 metadata.extension
    pub fn create_manual(
        &self,
        model_classification_id: i64,
        number_part: &str,
        extension: Option<&str>,
        metadata: AllocationMetadata,
        policy: &SystemPolicy,
        actor: &str,
    ) -> CodeResult<CodeUsageEntry> {
        let number_part = number_part.trim();
        let mut meta = metadata;
        if let Some(ext) = extension {
            meta.extension = Some(ext.to_string());
        }
        let meta = meta.normalized();

        let entry = with_transaction(&self.conn, |conn| {
            let mc = ModelClassificationRepository::find_by_id_in(conn, model_classification_id)?
                .ok_or_else(|| {
                    CodeError::not_found(entity_types::MODEL_CLASSIFICATION, model_classification_id)
                })?;
            if mc.has_code_classification {
                return Err(CodeError::InvalidScheme(format!(
                    "三层方案机型 {} 不支持手工创建编码",
                    mc.model_type
                )));
            }

            let digits = policy.number_digits.max(0) as usize;
            if number_part.len() != digits || !number_part.chars().all(|c| c.is_ascii_digit()) {
                return Err(CodeError::Validation(format!(
                    "流水号 {} 必须为 {} 位数字",
                    number_part, digits
                )));
            }
            if let Some(ext) = meta.extension.as_deref() {
                validate_extension(ext, policy.extension_max_length, &policy.extension_excluded_chars)?;
            }
            validate_dictionary_refs_in(conn, &meta)?;

            let model = compose(&mc.model_type, None, number_part, meta.extension.as_deref());
            if CodeUsageRepository::model_exists_in(conn, &model)? {
                return Err(CodeError::Duplicate(model));
            }

            let id = CodeUsageRepository::insert_in(
                conn,
                &NewCodeUsageEntry {
                    model,
                    model_type: mc.model_type.clone(),
                    code_classification_number: None,
                    actual_number: number_part.to_string(),
                    extension: meta.extension.clone(),
                    model_classification_id: mc.id,
                    code_classification_id: None,
                    number_digits: policy.number_digits,
                    metadata: meta.clone(),
                    is_allocated: true,
                },
            )?;

            let created = CodeLedger::load_in(conn, id)?;
            AuditLogRepository::insert_in(
                conn,
                &AuditLog::new(
                    AuditAction::Create,
                    entity_types::CODE_USAGE_ENTRY,
                    id,
                    None,
                    serde_json::to_value(&created).ok(),
                    actor,
                ),
            )?;
            Ok(created)
        })?;

        info!("手工创建编码: model={}, actor={}", entry.model, actor);
        Ok(entry)
    }

    /// 修改已分配编码的业务信息
    ///
    /// metadata 整体替换原业务信息；扩展后缀变化时重新拼装编码并检查唯一性
    pub fn amend(
        &self,
        entry_id: i64,
        metadata: AllocationMetadata,
        policy: &SystemPolicy,
        actor: &str,
    ) -> CodeResult<CodeUsageEntry> {
        let meta = metadata.normalized();

        let entry = with_transaction(&self.conn, |conn| {
            let before = CodeLedger::load_in(conn, entry_id)?;
            if before.is_deleted {
                return Err(CodeError::AlreadyDeleted(before.model));
            }
            if !before.is_allocated {
                return Err(CodeError::Validation(format!(
                    "编码 {} 尚未分配，不能修改",
                    before.model
                )));
            }

            validate_dictionary_refs_in(conn, &meta)?;
            if let Some(ext) = meta.extension.as_deref() {
                if before.extension.as_deref() != Some(ext) {
                    validate_extension(ext, policy.extension_max_length, &policy.extension_excluded_chars)?;
                }
            }

            let model = compose(
                &before.model_type,
                before.code_classification_number,
                &before.actual_number,
                meta.extension.as_deref(),
            );
            if model != before.model && CodeUsageRepository::model_exists_in(conn, &model)? {
                return Err(CodeError::Duplicate(model));
            }

            let mut updated = before.clone();
            updated.model = model;
            updated.extension = meta.extension.clone();
            updated.product_name = meta.product_name.clone();
            updated.description = meta.description.clone();
            updated.occupancy_type = meta.occupancy_type;
            updated.customer_id = meta.customer_id;
            updated.factory_id = meta.factory_id;
            updated.builder = meta.builder.clone();
            updated.requester = meta.requester.clone();
            updated.creation_date = meta.creation_date;
            updated.updated_at = now();

            let rows = CodeUsageRepository::amend_in(conn, &updated)?;
            if rows == 0 {
                return Err(CodeError::AlreadyDeleted(before.model));
            }

            let after = CodeLedger::load_in(conn, entry_id)?;
            AuditLogRepository::insert_in(
                conn,
                &AuditLog::new(
                    AuditAction::Amend,
                    entity_types::CODE_USAGE_ENTRY,
                    entry_id,
                    serde_json::to_value(&before).ok(),
                    serde_json::to_value(&after).ok(),
                    actor,
                ),
            )?;
            Ok(after)
        })?;

        info!("编码信息已修改: model={}, actor={}", entry.model, actor);
        Ok(entry)
    }

    /// 预检查编码是否可用（最终以唯一索引为准）
    pub fn check_availability(
        &self,
        model_type: &str,
        classification_number: Option<i32>,
        actual_number: &str,
        extension: Option<&str>,
    ) -> CodeResult<bool> {
        self.ledger
            .is_code_available(model_type, classification_number, actual_number, extension)
    }
}

/// 校验客户/工厂字典引用
fn validate_dictionary_refs_in(conn: &Connection, meta: &AllocationMetadata) -> CodeResult<()> {
    let refs = [
        (meta.customer_id, DictionaryCategory::Customer),
        (meta.factory_id, DictionaryCategory::Factory),
    ];
    for (id, category) in refs {
        let Some(id) = id else { continue };
        let item = DictionaryRepository::find_by_id_in(conn, id)?
            .ok_or_else(|| CodeError::not_found(entity_types::DICTIONARY_ITEM, id))?;
        if item.category != category {
            return Err(CodeError::Validation(format!(
                "字典项 {} 不是{}",
                id, category
            )));
        }
    }
    Ok(())
}
