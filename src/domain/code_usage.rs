// ==========================================
// 机种编码管理系统 - 编码使用记录领域模型
// ==========================================
// 对齐: code_usage_entry 表
// 红线: model 一经生成永久占用（含软删除）
// ==========================================

use crate::domain::types::{AllocationState, OccupancyType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// CodeUsageEntry - 编码使用记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeUsageEntry {
    pub id: i64,

    // ===== 编码结构 =====
    pub model: String,                           // 完整编码，如 "SLU-105A"
    pub model_type: String,                      // 机型前缀（冗余）
    pub code_classification_number: Option<i32>, // 三层方案的分类号
    pub actual_number: String,                   // 补零后的流水号
    pub extension: Option<String>,               // 扩展后缀
    pub model_classification_id: Option<i64>,    // 分类被强制删除后为 None
    pub code_classification_id: Option<i64>,
    pub number_digits: i32, // 生成时的位数，历史编码不随策略变化

    // ===== 业务元数据 =====
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub occupancy_type: Option<OccupancyType>,
    pub customer_id: Option<i64>,
    pub factory_id: Option<i64>,
    pub builder: Option<String>,
    pub requester: Option<String>,
    pub creation_date: Option<NaiveDate>,

    // ===== 状态 =====
    pub is_allocated: bool,
    pub is_deleted: bool,
    pub deleted_reason: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CodeUsageEntry {
    /// 当前状态机状态
    pub fn state(&self) -> AllocationState {
        AllocationState::from_flags(self.is_allocated, self.is_deleted)
    }

    /// 不含扩展后缀的基础编码
    pub fn base_model(&self) -> String {
        match &self.extension {
            Some(ext) if self.model.ends_with(ext.as_str()) => {
                self.model[..self.model.len() - ext.len()].to_string()
            }
            _ => self.model.clone(),
        }
    }
}

/// 待写入的编码记录（id 与时间戳由仓储生成）
#[derive(Debug, Clone, PartialEq)]
pub struct NewCodeUsageEntry {
    pub model: String,
    pub model_type: String,
    pub code_classification_number: Option<i32>,
    pub actual_number: String,
    pub extension: Option<String>,
    pub model_classification_id: i64,
    pub code_classification_id: Option<i64>,
    pub number_digits: i32,
    pub metadata: AllocationMetadata,
    pub is_allocated: bool,
}

// ==========================================
// AllocationMetadata - 分配时附带的业务信息
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationMetadata {
    pub extension: Option<String>,
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub occupancy_type: Option<OccupancyType>,
    pub customer_id: Option<i64>,
    pub factory_id: Option<i64>,
    pub builder: Option<String>,
    pub requester: Option<String>,
    pub creation_date: Option<NaiveDate>,
}

impl AllocationMetadata {
    /// 去除空白字符串字段，扩展后缀统一为大写
    pub fn normalized(mut self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        self.extension = clean(self.extension).map(|s| s.to_ascii_uppercase());
        self.product_name = clean(self.product_name);
        self.description = clean(self.description);
        self.builder = clean(self.builder);
        self.requester = clean(self.requester);
        self
    }
}

// ==========================================
// 统计
// ==========================================

/// 编码统计（不含软删除记录）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeStats {
    pub total: i64,
    pub allocated: i64,
    pub available: i64,
}

/// 按代码分类汇总的剩余编码
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationStats {
    pub code_classification_id: i64,
    pub code: String,
    pub name: String,
    pub stats: CodeStats,
}

// ==========================================
// 查询
// ==========================================

/// 通用过滤条件（默认排除软删除记录）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeUsageFilter {
    pub is_allocated: Option<bool>,
    pub occupancy_type: Option<OccupancyType>,
    pub keyword: Option<String>,
    pub include_deleted: bool,
}

/// 分页查询条件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeUsageQuery {
    pub model_classification_id: Option<i64>,
    pub code_classification_id: Option<i64>,
    #[serde(flatten)]
    pub filter: CodeUsageFilter,
    pub page: i64,
    pub page_size: i64,
}

impl Default for CodeUsageQuery {
    fn default() -> Self {
        Self {
            model_classification_id: None,
            code_classification_id: None,
            filter: CodeUsageFilter::default(),
            page: 1,
            page_size: 20,
        }
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> PagedResult<T> {
    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        (self.total + self.page_size - 1) / self.page_size
    }
}
