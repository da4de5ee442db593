// ==========================================
// 机种编码管理系统 - 机型分类仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 存储: description 以 JSON 数组文本存储
// ==========================================

use crate::domain::catalog::ModelClassification;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{format_ts, now, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str =
    "id, type, description, product_type_id, has_code_classification, created_at, updated_at";

// ==========================================
// ModelClassificationRepository - 机型分类仓储
// ==========================================
pub struct ModelClassificationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ModelClassificationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<ModelClassification> {
        let description_json: String = row.get(2)?;
        Ok(ModelClassification {
            id: row.get(0)?,
            model_type: row.get(1)?,
            description: serde_json::from_str(&description_json).unwrap_or_default(),
            product_type_id: row.get(3)?,
            has_code_classification: row.get(4)?,
            created_at: parse_ts(&row.get::<_, String>(5)?),
            updated_at: parse_ts(&row.get::<_, String>(6)?),
        })
    }

    fn encode_description(description: &[String]) -> RepositoryResult<String> {
        serde_json::to_string(description).map_err(|e| RepositoryError::FieldValueError {
            field: "description".to_string(),
            message: e.to_string(),
        })
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn insert_in(
        conn: &Connection,
        model_type: &str,
        product_type_id: i64,
        has_code_classification: bool,
        description: &[String],
    ) -> RepositoryResult<ModelClassification> {
        let ts = now();
        conn.execute(
            r#"
            INSERT INTO model_classification (
                type, description, product_type_id, has_code_classification,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![
                model_type,
                Self::encode_description(description)?,
                product_type_id,
                has_code_classification,
                format_ts(&ts),
            ],
        )?;
        Ok(ModelClassification {
            id: conn.last_insert_rowid(),
            model_type: model_type.to_string(),
            description: description.to_vec(),
            product_type_id,
            has_code_classification,
            created_at: ts,
            updated_at: ts,
        })
    }

    /// 全量覆盖可变字段
    pub fn update_in(conn: &Connection, mc: &ModelClassification) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE model_classification
            SET type = ?1, description = ?2, product_type_id = ?3,
                has_code_classification = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
            params![
                mc.model_type,
                Self::encode_description(&mc.description)?,
                mc.product_type_id,
                mc.has_code_classification,
                format_ts(&mc.updated_at),
                mc.id,
            ],
        )?;
        Ok(rows)
    }

    pub fn find_by_id_in(conn: &Connection, id: i64) -> RepositoryResult<Option<ModelClassification>> {
        let sql = format!("SELECT {} FROM model_classification WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }

    pub fn find_by_type_in(conn: &Connection, model_type: &str) -> RepositoryResult<Option<ModelClassification>> {
        let sql = format!("SELECT {} FROM model_classification WHERE type = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![model_type], Self::map_row).optional()?)
    }

    pub fn list_by_product_type_in(
        conn: &Connection,
        product_type_id: i64,
    ) -> RepositoryResult<Vec<ModelClassification>> {
        let sql = format!(
            "SELECT {} FROM model_classification WHERE product_type_id = ?1 ORDER BY type ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![product_type_id], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn count_by_product_type_in(conn: &Connection, product_type_id: i64) -> RepositoryResult<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM model_classification WHERE product_type_id = ?1",
            params![product_type_id],
            |row| row.get(0),
        )?)
    }

    pub fn delete_in(conn: &Connection, id: i64) -> RepositoryResult<usize> {
        Ok(conn.execute("DELETE FROM model_classification WHERE id = ?1", params![id])?)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<ModelClassification>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, id)
    }

    pub fn find_by_type(&self, model_type: &str) -> RepositoryResult<Option<ModelClassification>> {
        let conn = self.get_conn()?;
        Self::find_by_type_in(&conn, model_type)
    }

    /// 查询机型分类（可按产品类型过滤）
    pub fn list(&self, product_type_id: Option<i64>) -> RepositoryResult<Vec<ModelClassification>> {
        let conn = self.get_conn()?;
        match product_type_id {
            Some(id) => Self::list_by_product_type_in(&conn, id),
            None => {
                let sql = format!("SELECT {} FROM model_classification ORDER BY type ASC", SELECT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let items = stmt
                    .query_map([], Self::map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(items)
            }
        }
    }
}
