use super::core::AuditLogRepository;
use crate::domain::audit::AuditLog;
use crate::repository::error::RepositoryResult;
use crate::repository::sql_utils::parse_ts;
use rusqlite::{params, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str =
    "id, action, entity_type, entity_id, old_value, new_value, actor, action_ts";

impl AuditLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 id 查询单条审计记录
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<AuditLog>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM audit_log WHERE id = ?", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![id], |row| self.map_row(row)) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某实体的全部审计记录（按时间正序）
    pub fn find_by_entity(&self, entity_type: &str, entity_id: &str) -> RepositoryResult<Vec<AuditLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM audit_log WHERE entity_type = ? AND entity_id = ? ORDER BY action_ts ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![entity_type, entity_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询指定操作人的最近审计记录
    pub fn find_by_actor(&self, actor: &str, limit: usize) -> RepositoryResult<Vec<AuditLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM audit_log WHERE actor = ? ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![actor, limit as i64], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询指定动作的最近审计记录
    pub fn find_by_action(&self, action: &str, limit: usize) -> RepositoryResult<Vec<AuditLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM audit_log WHERE action = ? ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![action, limit as i64], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn map_row(&self, row: &Row) -> SqliteResult<AuditLog> {
        Ok(AuditLog {
            id: row.get(0)?,
            action: row.get(1)?,
            entity_type: row.get(2)?,
            entity_id: row.get(3)?,
            old_value: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            new_value: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            actor: row.get(6)?,
            action_ts: parse_ts(&row.get::<_, String>(7)?),
        })
    }
}
