// ==========================================
// 机种编码管理系统 - 代码分类仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: UNIQUE(model_classification_id, number)
// ==========================================

use crate::domain::catalog::CodeClassification;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{format_ts, now, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str =
    "id, code, number, name, model_classification_id, created_at, updated_at";

// ==========================================
// CodeClassificationRepository - 代码分类仓储
// ==========================================
pub struct CodeClassificationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CodeClassificationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<CodeClassification> {
        Ok(CodeClassification {
            id: row.get(0)?,
            code: row.get(1)?,
            number: row.get(2)?,
            name: row.get(3)?,
            model_classification_id: row.get(4)?,
            created_at: parse_ts(&row.get::<_, String>(5)?),
            updated_at: parse_ts(&row.get::<_, String>(6)?),
        })
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn insert_in(
        conn: &Connection,
        model_classification_id: i64,
        code: &str,
        number: i32,
        name: &str,
    ) -> RepositoryResult<CodeClassification> {
        let ts = now();
        conn.execute(
            r#"
            INSERT INTO code_classification (
                code, number, name, model_classification_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![code, number, name, model_classification_id, format_ts(&ts)],
        )?;
        Ok(CodeClassification {
            id: conn.last_insert_rowid(),
            code: code.to_string(),
            number,
            name: name.to_string(),
            model_classification_id,
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn find_by_id_in(conn: &Connection, id: i64) -> RepositoryResult<Option<CodeClassification>> {
        let sql = format!("SELECT {} FROM code_classification WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }

    pub fn find_by_number_in(
        conn: &Connection,
        model_classification_id: i64,
        number: i32,
    ) -> RepositoryResult<Option<CodeClassification>> {
        let sql = format!(
            "SELECT {} FROM code_classification WHERE model_classification_id = ?1 AND number = ?2",
            SELECT_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![model_classification_id, number], Self::map_row)
            .optional()?)
    }

    pub fn list_by_model_classification_in(
        conn: &Connection,
        model_classification_id: i64,
    ) -> RepositoryResult<Vec<CodeClassification>> {
        let sql = format!(
            "SELECT {} FROM code_classification WHERE model_classification_id = ?1 ORDER BY number ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![model_classification_id], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn update_name_in(conn: &Connection, id: i64, name: &str) -> RepositoryResult<usize> {
        Ok(conn.execute(
            "UPDATE code_classification SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, format_ts(&now()), id],
        )?)
    }

    pub fn delete_in(conn: &Connection, id: i64) -> RepositoryResult<usize> {
        Ok(conn.execute("DELETE FROM code_classification WHERE id = ?1", params![id])?)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<CodeClassification>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, id)
    }

    pub fn list_by_model_classification(
        &self,
        model_classification_id: i64,
    ) -> RepositoryResult<Vec<CodeClassification>> {
        let conn = self.get_conn()?;
        Self::list_by_model_classification_in(&conn, model_classification_id)
    }
}
