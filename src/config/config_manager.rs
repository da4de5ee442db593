// ==========================================
// 机种编码管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: system_config 表 (key-value)
// ==========================================

use crate::config::system_policy::{PolicyReader, SystemPolicy};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{format_ts, now};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 流水号位数
    pub const NUMBER_DIGITS: &str = "NumberDigits";

    // 扩展后缀
    pub const EXTENSION_MAX_LENGTH: &str = "ExtensionMaxLength";
    pub const EXTENSION_EXCLUDED_CHARS: &str = "ExtensionExcludedChars";

    // 三层方案预分配块大小
    pub const PRE_ALLOCATION_BLOCK_SIZE: &str = "PreAllocationBlockSize";
}

/// 默认值
pub mod config_defaults {
    pub const NUMBER_DIGITS: &str = "2";
    pub const EXTENSION_MAX_LENGTH: &str = "2";
    pub const EXTENSION_EXCLUDED_CHARS: &str = "IO";
    pub const PRE_ALLOCATION_BLOCK_SIZE: &str = "100";
}

/// 位数允许范围
pub const NUMBER_DIGITS_RANGE: (i32, i32) = (1, 6);

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入缺失的默认配置（已有值不覆盖）
    pub fn seed_defaults(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let defaults = [
            (config_keys::NUMBER_DIGITS, config_defaults::NUMBER_DIGITS, "流水号补零位数"),
            (config_keys::EXTENSION_MAX_LENGTH, config_defaults::EXTENSION_MAX_LENGTH, "扩展后缀最大长度"),
            (config_keys::EXTENSION_EXCLUDED_CHARS, config_defaults::EXTENSION_EXCLUDED_CHARS, "扩展后缀禁用字符"),
            (config_keys::PRE_ALLOCATION_BLOCK_SIZE, config_defaults::PRE_ALLOCATION_BLOCK_SIZE, "三层方案预分配数量"),
        ];

        let mut count = 0;
        for (key, value, description) in defaults {
            count += conn.execute(
                "INSERT OR IGNORE INTO system_config (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![key, value, description, format_ts(&now())],
            )?;
        }
        Ok(count)
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT value FROM system_config WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取整数配置（缺失或格式错误时回退默认值）
    fn get_i32_or_default(&self, key: &str, default: &str) -> RepositoryResult<i32> {
        let raw = self.get_config_or_default(key, default)?;
        match raw.trim().parse::<i32>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!("配置值格式错误，使用默认值: key={}, value={}", key, raw);
                Ok(default.parse().unwrap_or_default())
            }
        }
    }

    /// 写入配置（校验后 UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        validate_config_value(key, value).map_err(|message| RepositoryError::FieldValueError {
            field: key.to_string(),
            message,
        })?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO system_config (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3
            "#,
            params![key, value.trim(), format_ts(&now())],
        )?;
        tracing::info!("配置已更新: {}={}", key, value.trim());
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM system_config ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(json!(config_map).to_string())
    }

    // ===== 编码策略 =====

    /// 获取流水号位数（默认 2）
    pub fn get_number_digits(&self) -> RepositoryResult<i32> {
        self.get_i32_or_default(config_keys::NUMBER_DIGITS, config_defaults::NUMBER_DIGITS)
    }

    pub fn get_extension_max_length(&self) -> RepositoryResult<usize> {
        let v = self.get_i32_or_default(
            config_keys::EXTENSION_MAX_LENGTH,
            config_defaults::EXTENSION_MAX_LENGTH,
        )?;
        Ok(v.max(0) as usize)
    }

    pub fn get_extension_excluded_chars(&self) -> RepositoryResult<Vec<char>> {
        let raw = self.get_config_or_default(
            config_keys::EXTENSION_EXCLUDED_CHARS,
            config_defaults::EXTENSION_EXCLUDED_CHARS,
        )?;
        Ok(raw.chars().filter(|c| !c.is_whitespace() && *c != ',').collect())
    }

    pub fn get_pre_allocation_block_size(&self) -> RepositoryResult<i64> {
        let v = self.get_i32_or_default(
            config_keys::PRE_ALLOCATION_BLOCK_SIZE,
            config_defaults::PRE_ALLOCATION_BLOCK_SIZE,
        )?;
        Ok(v as i64)
    }
}

/// 校验配置值
pub fn validate_config_value(key: &str, value: &str) -> Result<(), String> {
    let value = value.trim();
    match key {
        config_keys::NUMBER_DIGITS => {
            let v: i32 = value.parse().map_err(|_| format!("{} 必须为整数", key))?;
            let (min, max) = NUMBER_DIGITS_RANGE;
            if v < min || v > max {
                return Err(format!("{} 必须在 [{}, {}] 范围内", key, min, max));
            }
            Ok(())
        }
        config_keys::EXTENSION_MAX_LENGTH | config_keys::PRE_ALLOCATION_BLOCK_SIZE => {
            let v: i64 = value.parse().map_err(|_| format!("{} 必须为整数", key))?;
            if v < 1 {
                return Err(format!("{} 必须为正整数", key));
            }
            Ok(())
        }
        config_keys::EXTENSION_EXCLUDED_CHARS => {
            if value.chars().all(|c| c.is_ascii_alphanumeric() || c == ',') {
                Ok(())
            } else {
                Err(format!("{} 只能包含字母数字", key))
            }
        }
        _ => Ok(()),
    }
}

// ==========================================
// PolicyReader 实现
// ==========================================
#[async_trait]
impl PolicyReader for ConfigManager {
    async fn load_policy(&self) -> RepositoryResult<SystemPolicy> {
        Ok(SystemPolicy {
            number_digits: self.get_number_digits()?,
            extension_max_length: self.get_extension_max_length()?,
            extension_excluded_chars: self.get_extension_excluded_chars()?,
            block_size: self.get_pre_allocation_block_size()?,
        })
    }
}
