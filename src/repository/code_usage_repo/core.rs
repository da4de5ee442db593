use crate::domain::code_usage::{AllocationMetadata, CodeStats, CodeUsageEntry, NewCodeUsageEntry};
use crate::domain::types::OccupancyType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{format_date, format_ts, now, parse_date, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub(super) const SELECT_COLUMNS: &str = r#"
    id, model, model_type, code_classification_number, actual_number, extension,
    model_classification_id, code_classification_id, number_digits,
    product_name, description, occupancy_type, customer_id, factory_id,
    builder, requester, creation_date,
    is_allocated, is_deleted, deleted_reason, created_at, updated_at
"#;

// ==========================================
// CodeUsageRepository - 编码使用记录仓储
// ==========================================
pub struct CodeUsageRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CodeUsageRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub(super) fn map_row(row: &Row) -> rusqlite::Result<CodeUsageEntry> {
        Ok(CodeUsageEntry {
            id: row.get(0)?,
            model: row.get(1)?,
            model_type: row.get(2)?,
            code_classification_number: row.get(3)?,
            actual_number: row.get(4)?,
            extension: row.get(5)?,
            model_classification_id: row.get(6)?,
            code_classification_id: row.get(7)?,
            number_digits: row.get(8)?,
            product_name: row.get(9)?,
            description: row.get(10)?,
            occupancy_type: row
                .get::<_, Option<String>>(11)?
                .and_then(|s| OccupancyType::from_db_str(&s)),
            customer_id: row.get(12)?,
            factory_id: row.get(13)?,
            builder: row.get(14)?,
            requester: row.get(15)?,
            creation_date: row
                .get::<_, Option<String>>(16)?
                .and_then(|s| parse_date(&s)),
            is_allocated: row.get(17)?,
            is_deleted: row.get(18)?,
            deleted_reason: row.get(19)?,
            created_at: parse_ts(&row.get::<_, String>(20)?),
            updated_at: parse_ts(&row.get::<_, String>(21)?),
        })
    }

    // ==========================================
    // 写入操作（事务内）
    // ==========================================

    /// 插入编码记录，返回新 id
    ///
    /// model 冲突时返回 UniqueConstraintViolation
    pub fn insert_in(conn: &Connection, entry: &NewCodeUsageEntry) -> RepositoryResult<i64> {
        let ts = format_ts(&now());
        let meta = &entry.metadata;
        conn.execute(
            r#"
            INSERT INTO code_usage_entry (
                model, model_type, code_classification_number, actual_number, extension,
                model_classification_id, code_classification_id, number_digits,
                product_name, description, occupancy_type, customer_id, factory_id,
                builder, requester, creation_date,
                is_allocated, is_deleted, deleted_reason, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                      ?17, 0, NULL, ?18, ?18)
            "#,
            params![
                entry.model,
                entry.model_type,
                entry.code_classification_number,
                entry.actual_number,
                entry.extension,
                entry.model_classification_id,
                entry.code_classification_id,
                entry.number_digits,
                meta.product_name,
                meta.description,
                meta.occupancy_type.map(|t| t.to_db_str()),
                meta.customer_id,
                meta.factory_id,
                meta.builder,
                meta.requester,
                meta.creation_date.as_ref().map(format_date),
                entry.is_allocated,
                ts,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id_in(conn: &Connection, id: i64) -> RepositoryResult<Option<CodeUsageEntry>> {
        let sql = format!("SELECT {} FROM code_usage_entry WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }

    /// 编码是否已被占用（含软删除记录，编码永久保留）
    pub fn model_exists_in(conn: &Connection, model: &str) -> RepositoryResult<bool> {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM code_usage_entry WHERE model = ?1 LIMIT 1",
                params![model],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// 未分配 → 已分配
    ///
    /// 仅当 is_allocated = 0 且 is_deleted = 0 时生效，返回影响行数
    pub fn allocate_in(
        conn: &Connection,
        id: i64,
        model: &str,
        meta: &AllocationMetadata,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE code_usage_entry
            SET model = ?1, extension = ?2,
                product_name = ?3, description = ?4, occupancy_type = ?5,
                customer_id = ?6, factory_id = ?7, builder = ?8, requester = ?9,
                creation_date = ?10, is_allocated = 1, updated_at = ?11
            WHERE id = ?12 AND is_allocated = 0 AND is_deleted = 0
            "#,
            params![
                model,
                meta.extension,
                meta.product_name,
                meta.description,
                meta.occupancy_type.map(|t| t.to_db_str()),
                meta.customer_id,
                meta.factory_id,
                meta.builder,
                meta.requester,
                meta.creation_date.as_ref().map(format_date),
                format_ts(updated_at),
                id,
            ],
        )?;
        Ok(rows)
    }

    /// 修改已分配记录的业务信息
    ///
    /// 仅当 is_allocated = 1 且 is_deleted = 0 时生效，返回影响行数
    pub fn amend_in(conn: &Connection, entry: &CodeUsageEntry) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE code_usage_entry
            SET model = ?1, extension = ?2,
                product_name = ?3, description = ?4, occupancy_type = ?5,
                customer_id = ?6, factory_id = ?7, builder = ?8, requester = ?9,
                creation_date = ?10, updated_at = ?11
            WHERE id = ?12 AND is_allocated = 1 AND is_deleted = 0
            "#,
            params![
                entry.model,
                entry.extension,
                entry.product_name,
                entry.description,
                entry.occupancy_type.map(|t| t.to_db_str()),
                entry.customer_id,
                entry.factory_id,
                entry.builder,
                entry.requester,
                entry.creation_date.as_ref().map(format_date),
                format_ts(&entry.updated_at),
                entry.id,
            ],
        )?;
        Ok(rows)
    }

    /// 软删除（仅对未删除记录生效）
    pub fn soft_delete_in(
        conn: &Connection,
        id: i64,
        reason: &str,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        Ok(conn.execute(
            r#"
            UPDATE code_usage_entry
            SET is_deleted = 1, deleted_reason = ?1, updated_at = ?2
            WHERE id = ?3 AND is_deleted = 0
            "#,
            params![reason, format_ts(updated_at), id],
        )?)
    }

    /// 恢复（仅对已删除记录生效）
    pub fn restore_in(conn: &Connection, id: i64, updated_at: &NaiveDateTime) -> RepositoryResult<usize> {
        Ok(conn.execute(
            r#"
            UPDATE code_usage_entry
            SET is_deleted = 0, deleted_reason = NULL, updated_at = ?1
            WHERE id = ?2 AND is_deleted = 1
            "#,
            params![format_ts(updated_at), id],
        )?)
    }

    /// 机型分类下未删除记录的 id
    pub fn active_ids_by_model_classification_in(
        conn: &Connection,
        model_classification_id: i64,
    ) -> RepositoryResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT id FROM code_usage_entry WHERE model_classification_id = ?1 AND is_deleted = 0 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![model_classification_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// 代码分类下未删除记录的 id
    pub fn active_ids_by_code_classification_in(
        conn: &Connection,
        code_classification_id: i64,
    ) -> RepositoryResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT id FROM code_usage_entry WHERE code_classification_id = ?1 AND is_deleted = 0 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![code_classification_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// 机型分类下全部记录数（含软删除）
    pub fn count_all_by_model_classification_in(
        conn: &Connection,
        model_classification_id: i64,
    ) -> RepositoryResult<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM code_usage_entry WHERE model_classification_id = ?1",
            params![model_classification_id],
            |row| row.get(0),
        )?)
    }

    /// 统计（不含软删除记录）
    pub fn stats_in(
        conn: &Connection,
        model_classification_id: Option<i64>,
        code_classification_id: Option<i64>,
    ) -> RepositoryResult<CodeStats> {
        let (total, allocated): (i64, Option<i64>) = conn.query_row(
            r#"
            SELECT COUNT(*), SUM(CASE WHEN is_allocated = 1 THEN 1 ELSE 0 END)
            FROM code_usage_entry
            WHERE is_deleted = 0
              AND (?1 IS NULL OR model_classification_id = ?1)
              AND (?2 IS NULL OR code_classification_id = ?2)
            "#,
            params![model_classification_id, code_classification_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let allocated = allocated.unwrap_or(0);
        Ok(CodeStats {
            total,
            allocated,
            available: total - allocated,
        })
    }
}
