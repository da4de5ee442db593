// ==========================================
// 机种编码管理系统 - 预分配日志仓储
// ==========================================
// 对齐: code_pre_allocation_log 表
// 说明: 写入总在预分配事务内完成（insert_in）
// ==========================================

use crate::domain::audit::CodePreAllocationLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{format_ts, parse_ts};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub struct PreAllocationLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PreAllocationLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<CodePreAllocationLog> {
        Ok(CodePreAllocationLog {
            id: row.get(0)?,
            model_classification_id: row.get(1)?,
            code_classification_id: row.get(2)?,
            model_type: row.get(3)?,
            count: row.get(4)?,
            number_digits: row.get(5)?,
            start_code: row.get(6)?,
            end_code: row.get(7)?,
            actor: row.get(8)?,
            created_at: parse_ts(&row.get::<_, String>(9)?),
        })
    }

    /// 插入预分配日志（id 字段忽略，由数据库生成）
    pub fn insert_in(conn: &Connection, log: &CodePreAllocationLog) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO code_pre_allocation_log (
                model_classification_id, code_classification_id, model_type,
                count, number_digits, start_code, end_code, actor, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                log.model_classification_id,
                log.code_classification_id,
                log.model_type,
                log.count,
                log.number_digits,
                log.start_code,
                log.end_code,
                log.actor,
                format_ts(&log.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 查询机型分类下的预分配历史（按时间倒序）
    pub fn find_by_model_classification(
        &self,
        model_classification_id: i64,
    ) -> RepositoryResult<Vec<CodePreAllocationLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, model_classification_id, code_classification_id, model_type,
                   count, number_digits, start_code, end_code, actor, created_at
            FROM code_pre_allocation_log
            WHERE model_classification_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let logs = stmt
            .query_map(params![model_classification_id], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }
}
