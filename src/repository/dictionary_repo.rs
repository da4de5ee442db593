// ==========================================
// 机种编码管理系统 - 数据字典仓储
// ==========================================

use crate::domain::dictionary::DictionaryItem;
use crate::domain::types::DictionaryCategory;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{format_ts, now, parse_ts};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct DictionaryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DictionaryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<DictionaryItem> {
        let category: String = row.get(1)?;
        Ok(DictionaryItem {
            id: row.get(0)?,
            category: DictionaryCategory::from_db_str(&category).unwrap_or(DictionaryCategory::Customer),
            code: row.get(2)?,
            name: row.get(3)?,
            created_at: parse_ts(&row.get::<_, String>(4)?),
        })
    }

    pub fn create(&self, category: DictionaryCategory, code: &str, name: &str) -> RepositoryResult<DictionaryItem> {
        let conn = self.get_conn()?;
        let ts = now();
        conn.execute(
            "INSERT INTO dictionary_item (category, code, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![category.to_db_str(), code, name, format_ts(&ts)],
        )?;
        Ok(DictionaryItem {
            id: conn.last_insert_rowid(),
            category,
            code: code.to_string(),
            name: name.to_string(),
            created_at: ts,
        })
    }

    pub fn find_by_id_in(conn: &Connection, id: i64) -> RepositoryResult<Option<DictionaryItem>> {
        Ok(conn
            .query_row(
                "SELECT id, category, code, name, created_at FROM dictionary_item WHERE id = ?1",
                params![id],
                Self::map_row,
            )
            .optional()?)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<DictionaryItem>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, id)
    }

    pub fn list_by_category(&self, category: DictionaryCategory) -> RepositoryResult<Vec<DictionaryItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, category, code, name, created_at FROM dictionary_item WHERE category = ?1 ORDER BY code ASC",
        )?;
        let items = stmt
            .query_map(params![category.to_db_str()], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }
}
