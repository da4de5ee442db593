// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、应用状态组装、基础目录数据
// ==========================================

#![allow(dead_code)]

use std::error::Error;
use std::sync::{Arc, Mutex};

use model_code_registry::app::AppState;
use model_code_registry::db;
use model_code_registry::{ModelClassification, ProductType};
use tempfile::NamedTempFile;

pub const ACTOR: &str = "tester";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 测试环境：临时库 + 完整组装的 AppState
pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub state: AppState,
}

impl TestEnv {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        model_code_registry::logging::init_test();
        let (temp_file, db_path) = create_test_db()?;
        let conn = Arc::new(Mutex::new(db::open_sqlite_connection(&db_path)?));
        let state = AppState::from_connection(db_path.clone(), conn)?;
        Ok(Self {
            _temp_file: temp_file,
            db_path,
            state,
        })
    }

    /// 直接执行计数 SQL（绕过 API 校验结果）
    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.state.conn.lock().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    pub fn product_type(&self, code: &str) -> ProductType {
        self.state
            .catalog_api
            .create_product_type(code, None, ACTOR)
            .unwrap()
    }

    pub fn model_classification(
        &self,
        model_type: &str,
        product_type_id: i64,
        three_layer: bool,
    ) -> ModelClassification {
        self.state
            .catalog_api
            .create_model_classification(
                &model_code_registry::api::CreateModelClassificationRequest {
                    model_type: model_type.to_string(),
                    product_type_id,
                    has_code_classification: three_layer,
                    description: vec![],
                },
                ACTOR,
            )
            .unwrap()
    }
}
