// ==========================================
// 机种编码管理系统 - 编码台账
// ==========================================
// 职责: 编码可用性判断、统计、软删除/恢复、查询
// 红线: 软删除不释放 model，编码永久占用
// 红线: 状态变更必须写审计日志
// ==========================================

use crate::db::with_transaction;
use crate::domain::audit::{entity_types, AuditLog};
use crate::domain::code_usage::{
    ClassificationStats, CodeStats, CodeUsageEntry, CodeUsageFilter, CodeUsageQuery, PagedResult,
};
use crate::domain::types::AuditAction;
use crate::engine::code_format::compose;
use crate::engine::error::{CodeError, CodeResult};
use crate::repository::{AuditLogRepository, CodeUsageRepository};
use crate::repository::sql_utils::now;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

// ==========================================
// CodeLedger - 编码台账
// ==========================================
pub struct CodeLedger {
    conn: Arc<Mutex<Connection>>,
    code_usage_repo: Arc<CodeUsageRepository>,
}

impl CodeLedger {
    pub fn new(conn: Arc<Mutex<Connection>>, code_usage_repo: Arc<CodeUsageRepository>) -> Self {
        Self {
            conn,
            code_usage_repo,
        }
    }

    // ==========================================
    // 可用性与统计
    // ==========================================

    /// 判断候选编码是否可用
    ///
    /// 软删除记录同样占用编码，与存储层唯一索引一致
    pub fn is_code_available(
        &self,
        model_type: &str,
        classification_number: Option<i32>,
        actual_number: &str,
        extension: Option<&str>,
    ) -> CodeResult<bool> {
        let extension = extension
            .map(|ext| ext.trim().to_ascii_uppercase())
            .filter(|ext| !ext.is_empty());
        let model = compose(model_type, classification_number, actual_number, extension.as_deref());
        let taken = self.code_usage_repo.model_exists(&model)?;
        debug!("编码可用性检查: model={}, taken={}", model, taken);
        Ok(!taken)
    }

    /// 统计（不含软删除记录）
    pub fn get_stats(
        &self,
        model_classification_id: Option<i64>,
        code_classification_id: Option<i64>,
    ) -> CodeResult<CodeStats> {
        Ok(self
            .code_usage_repo
            .stats(model_classification_id, code_classification_id)?)
    }

    /// 机型分类下各代码分类的剩余编码
    pub fn get_stats_by_code_classification(
        &self,
        model_classification_id: i64,
    ) -> CodeResult<Vec<ClassificationStats>> {
        Ok(self
            .code_usage_repo
            .stats_by_code_classification(model_classification_id)?)
    }

    // ==========================================
    // 软删除 / 恢复
    // ==========================================

    /// 软删除编码记录
    ///
    /// # 错误
    /// - Validation: 原因为空
    /// - NotFound / AlreadyDeleted
    pub fn soft_delete(&self, entry_id: i64, reason: &str, actor: &str) -> CodeResult<CodeUsageEntry> {
        let reason = reason.trim();
        if reason.is_empty() {
            warn!("软删除被拒绝: entry_id={}, 原因为空", entry_id);
            return Err(CodeError::Validation("删除原因不能为空".to_string()));
        }

        let entry = with_transaction(&self.conn, |conn| {
            Self::soft_delete_in(conn, entry_id, reason, actor)
        })?;
        info!("编码已软删除: model={}, actor={}", entry.model, actor);
        Ok(entry)
    }

    /// 事务内软删除（供分类强制删除复用）
    pub fn soft_delete_in(
        conn: &Connection,
        entry_id: i64,
        reason: &str,
        actor: &str,
    ) -> CodeResult<CodeUsageEntry> {
        let before = Self::load_in(conn, entry_id)?;
        if before.is_deleted {
            return Err(CodeError::AlreadyDeleted(before.model));
        }

        let rows = CodeUsageRepository::soft_delete_in(conn, entry_id, reason, &now())?;
        if rows == 0 {
            return Err(CodeError::AlreadyDeleted(before.model));
        }

        let after = Self::load_in(conn, entry_id)?;
        AuditLogRepository::insert_in(
            conn,
            &AuditLog::new(
                AuditAction::SoftDelete,
                entity_types::CODE_USAGE_ENTRY,
                entry_id,
                serde_json::to_value(&before).ok(),
                serde_json::to_value(&after).ok(),
                actor,
            ),
        )?;
        Ok(after)
    }

    /// 恢复软删除的编码记录（分配状态保持不变）
    pub fn restore(&self, entry_id: i64, actor: &str) -> CodeResult<CodeUsageEntry> {
        let entry = with_transaction(&self.conn, |conn| {
            let before = Self::load_in(conn, entry_id)?;
            if !before.is_deleted {
                return Err(CodeError::NotDeleted(before.model));
            }
            // 所属分类被强制删除后外键已置空，恢复会产生无归属的编码
            if before.model_classification_id.is_none() {
                warn!("恢复被拒绝: model={}, 所属机型分类已删除", before.model);
                return Err(CodeError::Validation(format!(
                    "编码 {} 所属机型分类已删除，不可恢复",
                    before.model
                )));
            }
            if before.code_classification_number.is_some() && before.code_classification_id.is_none() {
                warn!("恢复被拒绝: model={}, 所属代码分类已删除", before.model);
                return Err(CodeError::Validation(format!(
                    "编码 {} 所属代码分类已删除，不可恢复",
                    before.model
                )));
            }

            let rows = CodeUsageRepository::restore_in(conn, entry_id, &now())?;
            if rows == 0 {
                return Err(CodeError::NotDeleted(before.model));
            }

            let after = Self::load_in(conn, entry_id)?;
            AuditLogRepository::insert_in(
                conn,
                &AuditLog::new(
                    AuditAction::Restore,
                    entity_types::CODE_USAGE_ENTRY,
                    entry_id,
                    serde_json::to_value(&before).ok(),
                    serde_json::to_value(&after).ok(),
                    actor,
                ),
            )?;
            Ok(after)
        })?;
        info!("编码已恢复: model={}, actor={}", entry.model, actor);
        Ok(entry)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_paged(&self, query: &CodeUsageQuery) -> CodeResult<PagedResult<CodeUsageEntry>> {
        Ok(self.code_usage_repo.find_paged(query)?)
    }

    /// 按机型前缀查询
    pub fn get_by_model(&self, model_type: &str, filter: &CodeUsageFilter) -> CodeResult<Vec<CodeUsageEntry>> {
        Ok(self.code_usage_repo.find_by_model_type(model_type, filter)?)
    }

    /// 按机型前缀 + 分类号查询
    pub fn get_by_model_and_code(
        &self,
        model_type: &str,
        classification_number: i32,
        filter: &CodeUsageFilter,
    ) -> CodeResult<Vec<CodeUsageEntry>> {
        Ok(self
            .code_usage_repo
            .find_by_model_type_and_number(model_type, classification_number, filter)?)
    }

    pub fn get_by_id(&self, id: i64) -> CodeResult<CodeUsageEntry> {
        self.code_usage_repo
            .find_by_id(id)?
            .ok_or_else(|| CodeError::not_found(entity_types::CODE_USAGE_ENTRY, id))
    }

    /// 按完整编码查询（含软删除记录）
    pub fn find_by_model(&self, model: &str) -> CodeResult<Option<CodeUsageEntry>> {
        Ok(self.code_usage_repo.find_by_model(model)?)
    }

    pub(crate) fn load_in(conn: &Connection, entry_id: i64) -> CodeResult<CodeUsageEntry> {
        CodeUsageRepository::find_by_id_in(conn, entry_id)?
            .ok_or_else(|| CodeError::not_found(entity_types::CODE_USAGE_ENTRY, entry_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::code_usage::{AllocationMetadata, NewCodeUsageEntry};
    use crate::repository::{ModelClassificationRepository, ProductTypeRepository};

    fn setup() -> (CodeLedger, Arc<Mutex<Connection>>, i64) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();

        let pt = ProductTypeRepository::insert_in(&conn, "PCB", None).unwrap();
        let mc = ModelClassificationRepository::insert_in(&conn, "PX", pt.id, false, &[]).unwrap();
        let entry_id = CodeUsageRepository::insert_in(
            &conn,
            &NewCodeUsageEntry {
                model: "PX07".to_string(),
                model_type: "PX".to_string(),
                code_classification_number: None,
                actual_number: "07".to_string(),
                extension: None,
                model_classification_id: mc.id,
                code_classification_id: None,
                number_digits: 2,
                metadata: AllocationMetadata::default(),
                is_allocated: true,
            },
        )
        .unwrap();

        let shared = Arc::new(Mutex::new(conn));
        let repo = Arc::new(CodeUsageRepository::new(shared.clone()));
        (CodeLedger::new(shared.clone(), repo), shared, entry_id)
    }

    #[test]
    fn test_is_code_available() {
        let (ledger, _, _) = setup();
        assert!(!ledger.is_code_available("PX", None, "07", None).unwrap());
        assert!(ledger.is_code_available("PX", None, "08", None).unwrap());
    }

    #[test]
    fn test_soft_delete_requires_reason() {
        let (ledger, _, id) = setup();
        assert!(matches!(ledger.soft_delete(id, "  ", "tester"), Err(CodeError::Validation(_))));
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let (ledger, shared, id) = setup();

        let deleted = ledger.soft_delete(id, "重复申请", "tester").unwrap();
        assert!(deleted.is_deleted);
        assert_eq!(deleted.deleted_reason.as_deref(), Some("重复申请"));
        assert!(matches!(
            ledger.soft_delete(id, "again", "tester"),
            Err(CodeError::AlreadyDeleted(_))
        ));
        // 删除期间编码仍被占用
        assert!(!ledger.is_code_available("PX", None, "07", None).unwrap());

        let restored = ledger.restore(id, "tester").unwrap();
        assert!(!restored.is_deleted);
        assert!(restored.is_allocated);
        assert_eq!(restored.deleted_reason, None);
        assert!(matches!(ledger.restore(id, "tester"), Err(CodeError::NotDeleted(_))));

        let audit = AuditLogRepository::new(shared);
        let logs = audit
            .find_by_entity(entity_types::CODE_USAGE_ENTRY, &id.to_string())
            .unwrap();
        let actions: Vec<&str> = logs.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(actions, vec!["SOFT_DELETE", "RESTORE"]);
    }

    #[test]
    fn test_restore_rejects_orphaned_entry() {
        let (ledger, conn, entry_id) = setup();
        ledger.soft_delete(entry_id, "机型停用", "tester").unwrap();
        conn.lock()
            .unwrap()
            .execute("DELETE FROM model_classification", [])
            .unwrap();

        let result = ledger.restore(entry_id, "tester");
        assert!(matches!(result, Err(CodeError::Validation(_))));
        assert!(ledger.get_by_id(entry_id).unwrap().is_deleted);
        assert_eq!(ledger.get_stats(None, None).unwrap().total, 0);
    }

    #[test]
    fn test_missing_entry() {
        let (ledger, _, _) = setup();
        assert!(matches!(ledger.get_by_id(999), Err(CodeError::NotFound { .. })));
        assert!(matches!(ledger.restore(999, "tester"), Err(CodeError::NotFound { .. })));
    }
}
