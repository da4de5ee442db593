// ==========================================
// 机种编码管理系统 - 编码格式
// ==========================================
// 职责: 编码拼装/拆解、流水号补零、扩展后缀校验
// 约束: 纯函数，无 IO
// 格式: model = 机型前缀 + [分类号] + 补零流水号 + [扩展后缀]
//       例: "SLU-" + "1" + "05" + "A" = "SLU-105A"
// ==========================================

use crate::engine::error::{CodeError, CodeResult};
use serde::{Deserialize, Serialize};

/// 编码组成部分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeParts {
    pub model_type: String,
    pub classification_number: Option<i32>,
    pub actual_number: String,
    pub extension: Option<String>,
}

impl CodeParts {
    pub fn compose(&self) -> String {
        compose(
            &self.model_type,
            self.classification_number,
            &self.actual_number,
            self.extension.as_deref(),
        )
    }
}

/// 拼装完整编码
pub fn compose(
    model_type: &str,
    classification_number: Option<i32>,
    actual_number: &str,
    extension: Option<&str>,
) -> String {
    let mut model = String::with_capacity(model_type.len() + actual_number.len() + 4);
    model.push_str(model_type);
    if let Some(n) = classification_number {
        model.push_str(&n.to_string());
    }
    model.push_str(actual_number);
    if let Some(ext) = extension {
        model.push_str(ext);
    }
    model
}

/// 给定位数下可容纳的流水号数量 (10^digits)
pub fn block_capacity(digits: i32) -> i64 {
    if digits <= 0 {
        return 0;
    }
    10_i64.saturating_pow(digits as u32)
}

/// 流水号补零
///
/// # 错误
/// - n < 0
/// - n 超出 digits 位可表示范围
pub fn pad_number(n: i64, digits: i32) -> CodeResult<String> {
    if digits <= 0 {
        return Err(CodeError::Format(format!("位数必须为正数: digits={}", digits)));
    }
    if n < 0 {
        return Err(CodeError::Format(format!("流水号不能为负数: {}", n)));
    }
    if n >= block_capacity(digits) {
        return Err(CodeError::Format(format!(
            "流水号 {} 超出 {} 位可表示范围",
            n, digits
        )));
    }
    Ok(format!("{:0width$}", n, width = digits as usize))
}

/// 提取代码字符串的前导数字
///
/// "1-内层" → 1, "12" → 12, "内层" → 0
pub fn extract_numeric_prefix(code: &str) -> i32 {
    let head = code.trim().split('-').next().unwrap_or("");
    let digits: String = head.chars().take_while(|c| c.is_ascii_digit()).collect();
    // 超长数字串按 0 处理，由调用方做范围校验
    digits.parse::<i32>().unwrap_or(0)
}

/// 校验扩展后缀
///
/// 规则: 非空、不超长、仅 ASCII 字母数字、首字符为字母、不含禁用字符
pub fn validate_extension(ext: &str, max_len: usize, excluded_chars: &[char]) -> CodeResult<()> {
    if ext.is_empty() {
        return Err(CodeError::Validation("扩展后缀不能为空".to_string()));
    }
    if ext.chars().count() > max_len {
        return Err(CodeError::Validation(format!(
            "扩展后缀 {} 超过最大长度 {}",
            ext, max_len
        )));
    }
    if !ext.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(CodeError::Validation(format!(
            "扩展后缀 {} 须以字母开头",
            ext
        )));
    }
    if let Some(c) = ext.chars().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(CodeError::Validation(format!(
            "扩展后缀 {} 含非法字符 '{}'",
            ext, c
        )));
    }
    if let Some(c) = ext
        .chars()
        .find(|c| excluded_chars.iter().any(|x| x.eq_ignore_ascii_case(c)))
    {
        return Err(CodeError::Validation(format!(
            "扩展后缀 {} 含禁用字符 '{}'",
            ext, c
        )));
    }
    Ok(())
}

/// 拆解完整编码
///
/// 三层方案下分类号为 1~2 位数字，按剩余长度推断：
/// 前缀之后的连续数字中，末尾 digits 位为流水号，其余为分类号。
/// 扩展后缀须以字母开头，才能与流水号区分。
pub fn decompose(
    model: &str,
    model_type: &str,
    has_classification: bool,
    digits: i32,
) -> CodeResult<CodeParts> {
    let rest = model.strip_prefix(model_type).ok_or_else(|| {
        CodeError::Format(format!("编码 {} 不以前缀 {} 开头", model, model_type))
    })?;

    let numeric_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let (numeric, extension) = rest.split_at(numeric_len);
    let digits = digits.max(0) as usize;

    if numeric.len() < digits || digits == 0 {
        return Err(CodeError::Format(format!(
            "编码 {} 的数字部分长度不足 {} 位",
            model, digits
        )));
    }

    let (classification_part, actual_number) = numeric.split_at(numeric.len() - digits);
    let classification_number = if has_classification {
        let n: i32 = classification_part.parse().map_err(|_| {
            CodeError::Format(format!("编码 {} 缺少分类号", model))
        })?;
        Some(n)
    } else {
        if !classification_part.is_empty() {
            return Err(CodeError::Format(format!(
                "编码 {} 的流水号应为 {} 位",
                model, digits
            )));
        }
        None
    };

    Ok(CodeParts {
        model_type: model_type.to_string(),
        classification_number,
        actual_number: actual_number.to_string(),
        extension: (!extension.is_empty()).then(|| extension.to_string()),
    })
}
