// ==========================================
// 机种编码管理系统 - 分类目录领域模型
// ==========================================
// 层级: ProductType → ModelClassification → [CodeClassification]
// 对齐: product_type / model_classification / code_classification 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductType - 产品类型
// ==========================================
// 顶层类别，如 "PCB"、"FPC"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: i64,
    pub code: String,         // 唯一，大写字母数字
    pub name: Option<String>, // 显示名称
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// ModelClassification - 机型分类
// ==========================================
// 机型前缀，如 "SLU-"
// has_code_classification 选择两层/三层编码方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelClassification {
    pub id: i64,
    #[serde(rename = "type")]
    pub model_type: String,       // 唯一前缀
    pub description: Vec<String>, // 有序描述列表
    pub product_type_id: i64,
    pub has_code_classification: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ModelClassification {
    /// 是否为三层方案（机型 → 代码分类 → 编码）
    pub fn is_three_layer(&self) -> bool {
        self.has_code_classification
    }
}

/// 机型分类更新请求（None 表示不修改）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelClassificationPatch {
    #[serde(rename = "type")]
    pub model_type: Option<String>,
    pub description: Option<Vec<String>>,
    pub product_type_id: Option<i64>,
    pub has_code_classification: Option<bool>,
}

// ==========================================
// CodeClassification - 代码分类
// ==========================================
// 仅三层方案使用，如 "1-内层"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeClassification {
    pub id: i64,
    pub code: String, // 原始代码字符串
    pub number: i32,  // 由 code 推导的数值 [1, 99]
    pub name: String,
    pub model_classification_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
