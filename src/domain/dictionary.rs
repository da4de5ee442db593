// ==========================================
// 机种编码管理系统 - 数据字典
// ==========================================
// 客户/工厂字典，编码记录通过 customer_id / factory_id 引用
// ==========================================

use crate::domain::types::DictionaryCategory;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryItem {
    pub id: i64,
    pub category: DictionaryCategory,
    pub code: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}
