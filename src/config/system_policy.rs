// ==========================================
// 机种编码管理系统 - 编码策略
// ==========================================
// 职责: 定义引擎调用所需的策略值与读取接口
// 红线: 策略变更不影响已生成编码（每条记录自带 number_digits）
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// SystemPolicy - 编码策略快照
// ==========================================
// 由调用方读取后显式传入引擎
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPolicy {
    pub number_digits: i32,
    pub extension_max_length: usize,
    pub extension_excluded_chars: Vec<char>,
    pub block_size: i64,
}

impl Default for SystemPolicy {
    fn default() -> Self {
        Self {
            number_digits: 2,
            extension_max_length: 2,
            extension_excluded_chars: vec!['I', 'O'],
            block_size: 100,
        }
    }
}

impl SystemPolicy {
    /// 指定位数的默认策略
    pub fn with_digits(number_digits: i32) -> Self {
        Self {
            number_digits,
            ..Self::default()
        }
    }
}

// ==========================================
// PolicyReader Trait
// ==========================================
// 实现者: ConfigManager（从 system_config 表读取）
#[async_trait]
pub trait PolicyReader: Send + Sync {
    /// 读取当前策略（缺失项使用默认值）
    async fn load_policy(&self) -> RepositoryResult<SystemPolicy>;

    /// 获取流水号位数
    ///
    /// # 默认值
    /// - 2
    async fn get_number_digits(&self) -> RepositoryResult<i32> {
        Ok(self.load_policy().await?.number_digits)
    }
}
