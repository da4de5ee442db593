// ==========================================
// 并发分配测试
// ==========================================
// 职责: 多连接同时争用同一编码时，只有一个请求成功
// ==========================================

mod test_helpers;

#[cfg(test)]
mod concurrent_allocation_test {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use model_code_registry::db;
    use model_code_registry::repository::CodeUsageRepository;
    use model_code_registry::{
        AllocationEngine, AllocationMetadata, CodeError, CodeLedger, CodeResult, CodeUsageEntry,
        SystemPolicy,
    };

    use crate::test_helpers::{TestEnv, ACTOR};

    const WORKERS: usize = 8;

    /// 每个工作线程使用独立连接组装分配引擎
    fn engine_for(db_path: &str) -> AllocationEngine {
        let conn = Arc::new(Mutex::new(db::open_sqlite_connection(db_path).unwrap()));
        let repo = Arc::new(CodeUsageRepository::new(conn.clone()));
        let ledger = Arc::new(CodeLedger::new(conn.clone(), repo));
        AllocationEngine::new(conn, ledger)
    }

    fn tally(results: &[CodeResult<CodeUsageEntry>]) -> (usize, usize) {
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let err = results.len() - ok;
        (ok, err)
    }

    #[test]
    fn test_并发手工创建同一编码_仅一个成功() {
        let env = TestEnv::new().unwrap();
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);

        let mut handles = Vec::new();
        for i in 0..WORKERS {
            let db_path = env.db_path.clone();
            let mc_id = mc.id;
            handles.push(thread::spawn(move || {
                let engine = engine_for(&db_path);
                let metadata = AllocationMetadata {
                    product_name: Some(format!("worker-{}", i)),
                    ..Default::default()
                };
                engine.create_manual(mc_id, "42", None, metadata, &SystemPolicy::default(), ACTOR)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let (ok, err) = tally(&results);
        assert_eq!(ok, 1, "results: {:?}", results);
        assert_eq!(err, WORKERS - 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, CodeError::Duplicate(_))));

        assert_eq!(
            env.count("SELECT COUNT(*) FROM code_usage_entry WHERE model = 'PCB-42'"),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_并发分配同一预分配编码_仅一个成功() {
        let env = TestEnv::new().unwrap();
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);
        let block = env
            .state
            .code_allocation_api
            .pre_allocate_block(mc.id, None, Some(3), ACTOR)
            .await
            .unwrap();
        let target_id = block[1].id;

        let tasks = (0..WORKERS).map(|i| {
            let db_path = env.db_path.clone();
            tokio::task::spawn_blocking(move || {
                let engine = engine_for(&db_path);
                let metadata = AllocationMetadata {
                    product_name: Some(format!("worker-{}", i)),
                    ..Default::default()
                };
                engine.allocate(target_id, metadata, &SystemPolicy::default(), ACTOR)
            })
        });
        let results: Vec<_> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let (ok, err) = tally(&results);
        assert_eq!(ok, 1, "results: {:?}", results);
        assert_eq!(err, WORKERS - 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, CodeError::AlreadyAllocated(_))));

        let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
        let stored = env.state.code_allocation_api.get_by_id(target_id).unwrap();
        assert_eq!(stored.product_name, winner.product_name);
        assert_eq!(
            env.count("SELECT COUNT(*) FROM code_usage_entry WHERE is_allocated = 1"),
            1
        );
    }
}
