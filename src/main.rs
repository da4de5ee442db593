// ==========================================
// 机种编码管理系统 - 命令行入口
// ==========================================
// 用途: 初始化数据库，输出当前编码策略与全局统计
//
// Usage:
//   model-code-registry [db_path]
//
// 未指定 db_path 时使用 MODEL_CODE_REGISTRY_DB_PATH 或用户数据目录
// ==========================================

use model_code_registry::app::{get_default_db_path, AppState};
use model_code_registry::app::commands;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志系统
    model_code_registry::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", model_code_registry::APP_NAME);
    tracing::info!("系统版本: {}", model_code_registry::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path)?;

    let policy = commands::get_policy(&state).await;
    println!("{}", commands::to_json(&policy));

    let stats = commands::get_code_stats(&state, None, None);
    println!("{}", commands::to_json(&stats));

    Ok(())
}
