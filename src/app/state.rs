// ==========================================
// 机种编码管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{CatalogApi, CodeAllocationApi, ConfigApi};
use crate::config::{ConfigManager, PolicyReader};
use crate::db;
use crate::engine::{AllocationEngine, ClassificationCatalog, CodeLedger};
use crate::repository::{
    AuditLogRepository, CodeClassificationRepository, CodeUsageRepository, DictionaryRepository,
    ModelClassificationRepository, PreAllocationLogRepository, ProductTypeRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 分类目录API
    pub catalog_api: Arc<CatalogApi>,

    /// 编码分配API
    pub code_allocation_api: Arc<CodeAllocationApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,

    /// 配置管理器（编码策略来源）
    pub config_manager: Arc<ConfigManager>,

    /// 审计日志仓储
    pub audit_log_repo: Arc<AuditLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化 schema、写入缺失的默认配置
    /// 2. 初始化所有Repository与Engine
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        db::init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 基于已初始化 schema 的连接组装状态（测试可直接传入临时库连接）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let product_type_repo = Arc::new(ProductTypeRepository::new(conn.clone()));
        let model_classification_repo = Arc::new(ModelClassificationRepository::new(conn.clone()));
        let code_classification_repo = Arc::new(CodeClassificationRepository::new(conn.clone()));
        let code_usage_repo = Arc::new(CodeUsageRepository::new(conn.clone()));
        let dictionary_repo = Arc::new(DictionaryRepository::new(conn.clone()));
        let audit_log_repo = Arc::new(AuditLogRepository::new(conn.clone()));
        let pre_allocation_log_repo = Arc::new(PreAllocationLogRepository::new(conn.clone()));

        let config_manager = Arc::new(ConfigManager::new(conn.clone()));
        let seeded = config_manager
            .seed_defaults()
            .map_err(|e| format!("默认配置写入失败: {}", e))?;
        if seeded > 0 {
            tracing::info!("已写入 {} 项默认配置", seeded);
        }
        let policy_reader: Arc<dyn PolicyReader> = config_manager.clone();

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let ledger = Arc::new(CodeLedger::new(conn.clone(), code_usage_repo));
        let allocation = Arc::new(AllocationEngine::new(conn.clone(), ledger.clone()));
        let catalog = Arc::new(ClassificationCatalog::new(
            conn.clone(),
            product_type_repo,
            model_classification_repo,
            code_classification_repo,
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let catalog_api = Arc::new(CatalogApi::new(catalog, policy_reader.clone()));
        let code_allocation_api = Arc::new(CodeAllocationApi::new(
            allocation,
            ledger,
            policy_reader,
            audit_log_repo.clone(),
            pre_allocation_log_repo,
        ));
        let config_api = Arc::new(ConfigApi::new(
            config_manager.clone(),
            dictionary_repo,
            audit_log_repo.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            conn,
            catalog_api,
            code_allocation_api,
            config_api,
            config_manager,
            audit_log_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 MODEL_CODE_REGISTRY_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("MODEL_CODE_REGISTRY_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./model_code_registry.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("model-code-registry-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("model-code-registry");

        // best-effort: 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("model_code_registry.db");
        }
    }

    path.to_string_lossy().to_string()
}
