// ==========================================
// 机种编码管理系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 占用类型 (Occupancy Type)
// ==========================================
// 已分配编码的业务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyType {
    Planning,  // 规划中
    WorkOrder, // 已下工单
    Pause,     // 暂停
}

impl OccupancyType {
    /// 从字符串解析占用类型（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PLANNING" => Some(OccupancyType::Planning),
            "WORK_ORDER" => Some(OccupancyType::WorkOrder),
            "PAUSE" => Some(OccupancyType::Pause),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OccupancyType::Planning => "PLANNING",
            OccupancyType::WorkOrder => "WORK_ORDER",
            OccupancyType::Pause => "PAUSE",
        }
    }
}

impl fmt::Display for OccupancyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 编码分配状态 (Allocation State)
// ==========================================
// 状态机:
//   Unallocated --allocate--> Allocated
//   Unallocated/Allocated --soft_delete--> Deleted --restore--> 原状态
// 已分配编码不可“反分配”
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationState {
    Unallocated,
    Allocated,
    Deleted,
}

impl AllocationState {
    /// 由存储标志推导状态（删除优先）
    pub fn from_flags(is_allocated: bool, is_deleted: bool) -> Self {
        if is_deleted {
            AllocationState::Deleted
        } else if is_allocated {
            AllocationState::Allocated
        } else {
            AllocationState::Unallocated
        }
    }
}

impl fmt::Display for AllocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationState::Unallocated => write!(f, "UNALLOCATED"),
            AllocationState::Allocated => write!(f, "ALLOCATED"),
            AllocationState::Deleted => write!(f, "DELETED"),
        }
    }
}

// ==========================================
// 字典类别 (Dictionary Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DictionaryCategory {
    Customer, // 客户
    Factory,  // 工厂
}

impl DictionaryCategory {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CUSTOMER" => Some(DictionaryCategory::Customer),
            "FACTORY" => Some(DictionaryCategory::Factory),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DictionaryCategory::Customer => "CUSTOMER",
            DictionaryCategory::Factory => "FACTORY",
        }
    }
}

impl fmt::Display for DictionaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 审计动作 (Audit Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Allocate,
    Amend,
    SoftDelete,
    Restore,
    PreAllocate,
}

impl AuditAction {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Allocate => "ALLOCATE",
            AuditAction::Amend => "AMEND",
            AuditAction::SoftDelete => "SOFT_DELETE",
            AuditAction::Restore => "RESTORE",
            AuditAction::PreAllocate => "PRE_ALLOCATE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy_type_db_roundtrip() {
        for t in [OccupancyType::Planning, OccupancyType::WorkOrder, OccupancyType::Pause] {
            assert_eq!(OccupancyType::from_db_str(t.to_db_str()), Some(t));
        }
        assert_eq!(OccupancyType::from_db_str("work_order"), Some(OccupancyType::WorkOrder));
        assert_eq!(OccupancyType::from_db_str("UNKNOWN"), None);
    }

    #[test]
    fn test_occupancy_type_serde_format() {
        let json = serde_json::to_string(&OccupancyType::WorkOrder).unwrap();
        assert_eq!(json, "\"WORK_ORDER\"");
    }

    #[test]
    fn test_allocation_state_deleted_wins() {
        assert_eq!(AllocationState::from_flags(true, true), AllocationState::Deleted);
        assert_eq!(AllocationState::from_flags(true, false), AllocationState::Allocated);
        assert_eq!(AllocationState::from_flags(false, false), AllocationState::Unallocated);
    }
}
