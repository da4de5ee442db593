use crate::domain::audit::AuditLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::format_ts;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AuditLogRepository - 审计日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    /// 创建新的审计日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 在给定连接（或事务）上插入审计记录
    ///
    /// 状态变更与审计记录在同一事务内提交，二者要么同时存在要么同时不存在。
    pub fn insert_in(conn: &Connection, log: &AuditLog) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO audit_log (
                id, action, entity_type, entity_id,
                old_value, new_value, actor, action_ts
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.id,
                log.action,
                log.entity_type,
                log.entity_id,
                log.old_value.as_ref().map(|v| v.to_string()),
                log.new_value.as_ref().map(|v| v.to_string()),
                log.actor,
                format_ts(&log.action_ts),
            ],
        )?;

        Ok(log.id.clone())
    }

    /// 插入审计记录
    pub fn insert(&self, log: &AuditLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_in(&conn, log)
    }

    /// 批量插入审计记录
    pub fn batch_insert(&self, logs: Vec<AuditLog>) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for log in &logs {
            Self::insert_in(&tx, log)?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }
}
