// ==========================================
// 机种编码管理系统 - SQL 工具模块
// ==========================================
// 职责: 时间格式统一、动态 WHERE 条件构建
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;

/// 时间戳存储格式
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 日期存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 当前本地时间（秒级精度，与存储格式一致）
pub fn now() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    parse_ts(&format_ts(&now))
}

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// 解析时间戳（格式错误时回退到 UNIX 纪元）
pub fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_default()
}

pub fn format_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// 转义 LIKE 通配符
pub fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ==========================================
// WhereBuilder - 动态条件构建
// ==========================================
/// 按需追加 AND 条件，参数与占位符顺序保持一致
#[derive(Debug, Default)]
pub struct WhereBuilder {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加无参数条件
    pub fn push(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    /// 追加带参数条件（条件中的 ? 数量需与 values 一致）
    pub fn push_with(&mut self, condition: &str, values: Vec<Value>) -> &mut Self {
        self.conditions.push(condition.to_string());
        self.params.extend(values);
        self
    }

    /// 生成 WHERE 子句（无条件时返回空串）
    pub fn clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}
