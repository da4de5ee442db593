// ==========================================
// 机种编码管理系统 - SQLite 连接与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 提供幂等建库脚本与事务辅助函数
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开共享连接（仓储层统一使用 Arc<Mutex<Connection>>）
pub fn open_shared_connection(db_path: &str) -> RepositoryResult<Arc<Mutex<Connection>>> {
    let conn = open_sqlite_connection(db_path)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 约束说明：
/// - code_usage_entry.model 为全表唯一：软删除的编码永久占用，不可复用
/// - 分类被强制删除时，编码记录的分类外键置空，编码本身保留
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS system_config (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            description TEXT,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS product_type (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS model_classification (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '[]',
            product_type_id INTEGER NOT NULL
                REFERENCES product_type(id) ON DELETE RESTRICT,
            has_code_classification INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS code_classification (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL,
            number INTEGER NOT NULL CHECK (number BETWEEN 1 AND 99),
            name TEXT NOT NULL,
            model_classification_id INTEGER NOT NULL
                REFERENCES model_classification(id) ON DELETE RESTRICT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (model_classification_id, number)
        );

        CREATE TABLE IF NOT EXISTS dictionary_item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (category, code)
        );

        CREATE TABLE IF NOT EXISTS code_usage_entry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model TEXT NOT NULL,
            model_type TEXT NOT NULL,
            code_classification_number INTEGER,
            actual_number TEXT NOT NULL,
            extension TEXT,
            model_classification_id INTEGER
                REFERENCES model_classification(id) ON DELETE SET NULL,
            code_classification_id INTEGER
                REFERENCES code_classification(id) ON DELETE SET NULL,
            product_name TEXT,
            description TEXT,
            occupancy_type TEXT,
            customer_id INTEGER REFERENCES dictionary_item(id) ON DELETE SET NULL,
            factory_id INTEGER REFERENCES dictionary_item(id) ON DELETE SET NULL,
            builder TEXT,
            requester TEXT,
            creation_date TEXT,
            is_allocated INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            deleted_reason TEXT,
            number_digits INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS ux_code_usage_entry_model
            ON code_usage_entry(model);
        CREATE INDEX IF NOT EXISTS idx_code_usage_entry_mc
            ON code_usage_entry(model_classification_id, is_deleted);
        CREATE INDEX IF NOT EXISTS idx_code_usage_entry_cc
            ON code_usage_entry(code_classification_id, is_deleted);
        CREATE INDEX IF NOT EXISTS idx_code_usage_entry_type
            ON code_usage_entry(model_type, code_classification_number);

        CREATE TABLE IF NOT EXISTS audit_log (
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            actor TEXT NOT NULL,
            action_ts TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_log_entity
            ON audit_log(entity_type, entity_id);

        CREATE TABLE IF NOT EXISTS code_pre_allocation_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model_classification_id INTEGER NOT NULL,
            code_classification_id INTEGER,
            model_type TEXT NOT NULL,
            count INTEGER NOT NULL,
            number_digits INTEGER NOT NULL,
            start_code TEXT NOT NULL,
            end_code TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 在单个事务内执行闭包
///
/// 闭包返回 Err 时事务回滚（Transaction drop 即回滚），返回 Ok 时提交。
/// 使用 IMMEDIATE 事务：多连接并发写入时在 busy_timeout 内排队，而非读后升级写锁失败。
pub fn with_transaction<T, E, F>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<RepositoryError>,
{
    let mut guard = conn
        .lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))?;
    let tx = guard
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(RepositoryError::from)?;
    let value = f(&tx)?;
    tx.commit().map_err(RepositoryError::from)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_read_schema_version_without_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_with_transaction_rolls_back_on_error() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));

        let result: RepositoryResult<()> = with_transaction(&shared, |tx| {
            tx.execute(
                "INSERT INTO system_config (key, value) VALUES ('NumberDigits', '3')",
                [],
            )?;
            Err(RepositoryError::InternalError("boom".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = shared
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM system_config", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
