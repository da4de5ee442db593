// ==========================================
// 机种编码管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供应用层命令调用
// ==========================================

pub mod catalog_api;
pub mod code_allocation_api;
pub mod config_api;
pub mod error;
pub mod response;

// 重导出核心类型
pub use catalog_api::{CatalogApi, CreateModelClassificationRequest, DeleteRequest};
pub use code_allocation_api::{AvailabilityRequest, CodeAllocationApi, CreateManualRequest};
pub use config_api::{ConfigApi, ConfigItem};
pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
