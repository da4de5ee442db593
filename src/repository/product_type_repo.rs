// ==========================================
// 机种编码管理系统 - 产品类型仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: *_in 关联函数接收 &Connection，可在外部事务内调用
// ==========================================

use crate::domain::catalog::ProductType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{format_ts, now, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "id, code, name, created_at, updated_at";

// ==========================================
// ProductTypeRepository - 产品类型仓储
// ==========================================
pub struct ProductTypeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductTypeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<ProductType> {
        Ok(ProductType {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            created_at: parse_ts(&row.get::<_, String>(3)?),
            updated_at: parse_ts(&row.get::<_, String>(4)?),
        })
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 插入产品类型，返回新记录
    pub fn insert_in(conn: &Connection, code: &str, name: Option<&str>) -> RepositoryResult<ProductType> {
        let ts = now();
        conn.execute(
            "INSERT INTO product_type (code, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![code, name, format_ts(&ts)],
        )?;
        let id = conn.last_insert_rowid();
        Ok(ProductType {
            id,
            code: code.to_string(),
            name: name.map(str::to_string),
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn find_by_id_in(conn: &Connection, id: i64) -> RepositoryResult<Option<ProductType>> {
        let sql = format!("SELECT {} FROM product_type WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }

    pub fn update_name_in(conn: &Connection, id: i64, name: Option<&str>) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE product_type SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, format_ts(&now()), id],
        )?;
        Ok(rows)
    }

    pub fn delete_in(conn: &Connection, id: i64) -> RepositoryResult<usize> {
        Ok(conn.execute("DELETE FROM product_type WHERE id = ?1", params![id])?)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<ProductType>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, id)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<ProductType>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM product_type WHERE code = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![code], Self::map_row).optional()?)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<ProductType>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM product_type ORDER BY code ASC", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }
}
