// ==========================================
// 分类目录集成测试
// ==========================================
// 职责: 编码方案约束、删除限制与强制删除、方案不可变
// ==========================================

mod test_helpers;

#[cfg(test)]
mod catalog_integration_test {
    use model_code_registry::api::{ApiError, CreateManualRequest, DeleteRequest};
    use model_code_registry::domain::catalog::ModelClassificationPatch;
    use model_code_registry::{AllocationMetadata, CodeUsageFilter};

    use crate::test_helpers::{TestEnv, ACTOR};

    fn manual(mc_id: i64, number: &str) -> CreateManualRequest {
        CreateManualRequest {
            model_classification_id: mc_id,
            number_part: number.to_string(),
            extension: None,
            metadata: AllocationMetadata::default(),
        }
    }

    // ==========================================
    // 编码方案约束
    // ==========================================

    #[tokio::test]
    async fn test_两层方案_拒绝代码分类() {
        let env = TestEnv::new().unwrap();
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);

        let result = env
            .state
            .catalog_api
            .create_code_classification(mc.id, "1", "InnerLayer", ACTOR)
            .await;
        assert!(matches!(result, Err(ApiError::InvalidScheme(_))));
        assert_eq!(env.count("SELECT COUNT(*) FROM code_classification"), 0);
    }

    #[tokio::test]
    async fn test_三层方案_预分配必须指定代码分类() {
        let env = TestEnv::new().unwrap();
        let pt = env.product_type("PCB");
        let mc = env.model_classification("SLU-", pt.id, true);

        let result = env
            .state
            .code_allocation_api
            .pre_allocate_block(mc.id, None, Some(5), ACTOR)
            .await;
        assert!(matches!(result, Err(ApiError::InvalidScheme(_))));
    }

    #[tokio::test]
    async fn test_代码分类号_超出范围与重复() {
        let env = TestEnv::new().unwrap();
        let catalog = &env.state.catalog_api;
        let pt = env.product_type("PCB");
        let mc = env.model_classification("SLU-", pt.id, true);

        for bad in ["0", "100", "X1"] {
            let result = catalog.create_code_classification(mc.id, bad, "x", ACTOR).await;
            assert!(matches!(result, Err(ApiError::RangeError(_))), "code={}", bad);
        }

        let cc = catalog
            .create_code_classification(mc.id, "03-Core", "Core", ACTOR)
            .await
            .unwrap();
        assert_eq!(cc.number, 3);
        assert_eq!(cc.code, "03-Core");

        let dup = catalog.create_code_classification(mc.id, "3", "Again", ACTOR).await;
        assert!(matches!(dup, Err(ApiError::Duplicate(_))));
    }

    // ==========================================
    // 方案不可变
    // ==========================================

    #[tokio::test]
    async fn test_已有编码_方案与前缀不可修改() {
        let env = TestEnv::new().unwrap();
        let catalog = &env.state.catalog_api;
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);
        env.state
            .code_allocation_api
            .create_manual(manual(mc.id, "01"), ACTOR)
            .await
            .unwrap();

        let scheme = catalog.update_model_classification(
            mc.id,
            ModelClassificationPatch {
                has_code_classification: Some(true),
                ..Default::default()
            },
            ACTOR,
        );
        assert!(matches!(scheme, Err(ApiError::InvalidScheme(_))));

        let rename = catalog.update_model_classification(
            mc.id,
            ModelClassificationPatch {
                model_type: Some("PCX-".to_string()),
                ..Default::default()
            },
            ACTOR,
        );
        assert!(matches!(rename, Err(ApiError::ValidationError(_))));

        // 描述可修改
        let updated = catalog
            .update_model_classification(
                mc.id,
                ModelClassificationPatch {
                    description: Some(vec!["双面板".to_string(), "FR4".to_string()]),
                    ..Default::default()
                },
                ACTOR,
            )
            .unwrap();
        assert_eq!(updated.description, vec!["双面板", "FR4"]);
        assert!(!updated.has_code_classification);
    }

    #[test]
    fn test_无编码时_方案可修改() {
        let env = TestEnv::new().unwrap();
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);

        let updated = env
            .state
            .catalog_api
            .update_model_classification(
                mc.id,
                ModelClassificationPatch {
                    has_code_classification: Some(true),
                    ..Default::default()
                },
                ACTOR,
            )
            .unwrap();
        assert!(updated.has_code_classification);
    }

    // ==========================================
    // 删除限制与强制删除
    // ==========================================

    #[tokio::test]
    async fn test_删除机型分类_存在编码时拒绝() {
        let env = TestEnv::new().unwrap();
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);
        env.state
            .code_allocation_api
            .create_manual(manual(mc.id, "01"), ACTOR)
            .await
            .unwrap();

        let result = env.state.catalog_api.delete_model_classification(
            &DeleteRequest {
                id: mc.id,
                force: false,
                reason: None,
            },
            ACTOR,
        );
        assert!(matches!(result, Err(ApiError::HasDependents(_))));
        assert!(env.state.catalog_api.get_model_classification(mc.id).is_ok());

        let pt_result = env.state.catalog_api.delete_product_type(pt.id, false, ACTOR);
        assert!(matches!(pt_result, Err(ApiError::HasDependents(_))));
    }

    #[tokio::test]
    async fn test_强制删除机型分类_编码软删除并保留占用() {
        let env = TestEnv::new().unwrap();
        let pt = env.product_type("PCB");
        let mc = env.model_classification("SLU-", pt.id, true);
        env.state
            .catalog_api
            .create_code_classification(mc.id, "1", "InnerLayer", ACTOR)
            .await
            .unwrap();

        let deleted = env
            .state
            .catalog_api
            .delete_model_classification(
                &DeleteRequest {
                    id: mc.id,
                    force: true,
                    reason: Some("产品线停产".to_string()),
                },
                ACTOR,
            )
            .unwrap();
        assert_eq!(deleted, 100);

        assert!(matches!(
            env.state.catalog_api.get_model_classification(mc.id),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(env.count("SELECT COUNT(*) FROM code_classification"), 0);

        // 编码记录保留为软删除，分类外键置空
        assert_eq!(
            env.count("SELECT COUNT(*) FROM code_usage_entry WHERE is_deleted = 1"),
            100
        );
        assert_eq!(
            env.count("SELECT COUNT(*) FROM code_usage_entry WHERE model_classification_id IS NOT NULL"),
            0
        );
        let entry = env
            .state
            .code_allocation_api
            .find_by_model("SLU-100")
            .unwrap()
            .unwrap();
        assert_eq!(entry.deleted_reason.as_deref(), Some("产品线停产"));

        // 所属分类已不存在，恢复会产生无归属编码
        let restore = env.state.code_allocation_api.restore(entry.id, ACTOR);
        assert!(matches!(restore, Err(ApiError::ValidationError(_))));
        assert!(env.state.code_allocation_api.get_by_id(entry.id).unwrap().is_deleted);
        assert_eq!(env.state.code_allocation_api.get_stats(None, None).unwrap().total, 0);

        // 同一前缀重建后，旧编码仍不可再次发放
        let rebuilt = env.model_classification("SLU-", pt.id, true);
        let result = env
            .state
            .catalog_api
            .create_code_classification(rebuilt.id, "1", "InnerLayer", ACTOR)
            .await;
        assert!(matches!(result, Err(ApiError::AllocationError(_))));
    }

    #[tokio::test]
    async fn test_删除代码分类_限制与强制() {
        let env = TestEnv::new().unwrap();
        let catalog = &env.state.catalog_api;
        let pt = env.product_type("PCB");
        let mc = env.model_classification("SLU-", pt.id, true);
        let cc = catalog
            .create_code_classification(mc.id, "4", "Flex", ACTOR)
            .await
            .unwrap();

        let restricted = catalog.delete_code_classification(
            &DeleteRequest {
                id: cc.id,
                force: false,
                reason: None,
            },
            ACTOR,
        );
        assert!(matches!(restricted, Err(ApiError::HasDependents(_))));

        let deleted = catalog
            .delete_code_classification(
                &DeleteRequest {
                    id: cc.id,
                    force: true,
                    reason: None,
                },
                ACTOR,
            )
            .unwrap();
        assert_eq!(deleted, 100);
        assert!(catalog.list_code_classifications(mc.id).unwrap().is_empty());

        let remaining = env
            .state
            .code_allocation_api
            .get_by_model("SLU-", &CodeUsageFilter::default())
            .unwrap();
        assert!(remaining.is_empty());

        // 三层编码失去代码分类后不可恢复
        let orphan = env
            .state
            .code_allocation_api
            .find_by_model("SLU-400")
            .unwrap()
            .unwrap();
        assert_eq!(orphan.model_classification_id, Some(mc.id));
        assert_eq!(orphan.code_classification_id, None);
        let restore = env.state.code_allocation_api.restore(orphan.id, ACTOR);
        assert!(matches!(restore, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_强制删除产品类型_级联机型分类() {
        let env = TestEnv::new().unwrap();
        let pt = env.product_type("PCB");
        let two = env.model_classification("PCB-", pt.id, false);
        env.model_classification("SLU-", pt.id, true);
        env.state
            .code_allocation_api
            .create_manual(manual(two.id, "09"), ACTOR)
            .await
            .unwrap();

        env.state
            .catalog_api
            .delete_product_type(pt.id, true, ACTOR)
            .unwrap();

        assert!(env.state.catalog_api.list_product_types().unwrap().is_empty());
        assert!(env
            .state
            .catalog_api
            .list_model_classifications(None)
            .unwrap()
            .is_empty());
        assert_eq!(
            env.count("SELECT COUNT(*) FROM code_usage_entry WHERE is_deleted = 1"),
            1
        );
    }

    #[test]
    fn test_产品类型代码_大写字母数字() {
        let env = TestEnv::new().unwrap();
        let catalog = &env.state.catalog_api;

        assert!(catalog.create_product_type("pcb", None, ACTOR).is_err());
        assert!(catalog.create_product_type("P-1", None, ACTOR).is_err());
        assert!(matches!(
            catalog.create_product_type("  ", None, ACTOR),
            Err(ApiError::InvalidInput(_))
        ));

        let pt = catalog.create_product_type("FPC2", Some("柔性板"), ACTOR).unwrap();
        let renamed = catalog.update_product_type(pt.id, Some("软板"), ACTOR).unwrap();
        assert_eq!(renamed.name.as_deref(), Some("软板"));
        assert_eq!(renamed.code, "FPC2");
    }
}
