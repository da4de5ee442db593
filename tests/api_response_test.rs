// ==========================================
// 命令层响应测试
// ==========================================
// 职责: 验证统一响应 { success, data, message, errorCode } 的结构与错误码
// ==========================================

mod test_helpers;

#[cfg(test)]
mod api_response_test {
    use model_code_registry::api::{AvailabilityRequest, CreateManualRequest, DeleteRequest};
    use model_code_registry::app::commands;
    use model_code_registry::{AllocationMetadata, CodeUsageQuery, DictionaryCategory, OccupancyType};
    use serde_json::Value;

    use crate::test_helpers::{TestEnv, ACTOR};

    fn parse<T: serde::Serialize>(response: &model_code_registry::ApiResponse<T>) -> Value {
        serde_json::from_str(&commands::to_json(response)).unwrap()
    }

    #[test]
    fn test_成功响应_不含错误码() {
        let env = TestEnv::new().unwrap();
        let response = commands::create_product_type(&env.state, "PCB".to_string(), None, ACTOR.to_string());
        let json = parse(&response);

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["code"], "PCB");
        assert!(json.get("errorCode").is_none());
    }

    #[test]
    fn test_失败响应_携带错误码且无数据() {
        let env = TestEnv::new().unwrap();
        let response = commands::get_model_classification(&env.state, 404);
        let json = parse(&response);

        assert_eq!(json["success"], false);
        assert_eq!(json["errorCode"], "NOT_FOUND");
        assert!(json.get("data").is_none());
        assert!(!json["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_错误码映射() {
        let env = TestEnv::new().unwrap();
        let state = &env.state;
        let pt = env.product_type("PCB");
        let two = env.model_classification("PCB-", pt.id, false);
        let three = env.model_classification("SLU-", pt.id, true);

        let scheme = commands::create_code_classification(
            state,
            two.id,
            "1".to_string(),
            "InnerLayer".to_string(),
            ACTOR.to_string(),
        )
        .await;
        assert_eq!(scheme.error_code.as_deref(), Some("INVALID_SCHEME"));

        let range = commands::create_code_classification(
            state,
            three.id,
            "0".to_string(),
            "Zero".to_string(),
            ACTOR.to_string(),
        )
        .await;
        assert_eq!(range.error_code.as_deref(), Some("RANGE_ERROR"));

        let request = CreateManualRequest {
            model_classification_id: two.id,
            number_part: "05".to_string(),
            extension: None,
            metadata: AllocationMetadata::default(),
        };
        let first = commands::create_manual_code(state, request.clone(), ACTOR.to_string()).await;
        assert!(first.success);
        let dup = commands::create_manual_code(state, request, ACTOR.to_string()).await;
        assert_eq!(dup.error_code.as_deref(), Some("DUPLICATE"));

        let dependents = commands::delete_model_classification(
            state,
            DeleteRequest {
                id: two.id,
                force: false,
                reason: None,
            },
            ACTOR.to_string(),
        );
        assert_eq!(dependents.error_code.as_deref(), Some("HAS_DEPENDENTS"));

        let entry_id = first.data.unwrap().id;
        let blank = commands::soft_delete_code(state, entry_id, "".to_string(), ACTOR.to_string());
        assert_eq!(blank.error_code.as_deref(), Some("INVALID_INPUT"));

        let not_deleted = commands::restore_code(state, entry_id, ACTOR.to_string());
        assert_eq!(not_deleted.error_code.as_deref(), Some("NOT_DELETED"));

        let bad_config = commands::update_config(
            state,
            "NumberDigits".to_string(),
            "9".to_string(),
            ACTOR.to_string(),
        );
        assert!(!bad_config.success);
    }

    #[tokio::test]
    async fn test_可用性检查与分页查询() {
        let env = TestEnv::new().unwrap();
        let state = &env.state;
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);

        let availability = |number: &str| AvailabilityRequest {
            model_type: "PCB-".to_string(),
            classification_number: None,
            actual_number: number.to_string(),
            extension: None,
        };
        assert_eq!(
            commands::check_code_availability(state, availability("20")).data,
            Some(true)
        );

        let block = commands::pre_allocate_block(state, mc.id, None, Some(25), ACTOR.to_string()).await;
        assert_eq!(block.data.map(|b| b.len()), Some(25));
        assert_eq!(
            commands::check_code_availability(state, availability("20")).data,
            Some(false)
        );

        let page = commands::list_codes_paged(
            state,
            CodeUsageQuery {
                model_classification_id: Some(mc.id),
                page: 2,
                page_size: 10,
                ..Default::default()
            },
        )
        .data
        .unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.items[0].model, "PCB-10");
        assert_eq!(page.total_pages(), 3);

        let invalid_page = commands::list_codes_paged(
            state,
            CodeUsageQuery {
                page: 0,
                ..Default::default()
            },
        );
        assert_eq!(invalid_page.error_code.as_deref(), Some("INVALID_INPUT"));

        let overflow_page = commands::list_codes_paged(
            state,
            CodeUsageQuery {
                page: i64::MAX,
                page_size: 500,
                ..Default::default()
            },
        );
        assert_eq!(overflow_page.error_code.as_deref(), Some("INVALID_INPUT"));
    }

    #[tokio::test]
    async fn test_字典引用校验() {
        let env = TestEnv::new().unwrap();
        let state = &env.state;
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);

        let customer = commands::create_dictionary_item(
            state,
            DictionaryCategory::Customer,
            "C001".to_string(),
            "华东客户".to_string(),
            ACTOR.to_string(),
        )
        .data
        .unwrap();

        let block = commands::pre_allocate_block(state, mc.id, None, Some(2), ACTOR.to_string())
            .await
            .data
            .unwrap();

        // 客户 ID 填到工厂字段
        let wrong_category = commands::allocate_code(
            state,
            block[0].id,
            AllocationMetadata {
                factory_id: Some(customer.id),
                ..Default::default()
            },
            ACTOR.to_string(),
        )
        .await;
        assert_eq!(wrong_category.error_code.as_deref(), Some("VALIDATION_ERROR"));

        let allocated = commands::allocate_code(
            state,
            block[0].id,
            AllocationMetadata {
                customer_id: Some(customer.id),
                occupancy_type: Some(OccupancyType::WorkOrder),
                ..Default::default()
            },
            ACTOR.to_string(),
        )
        .await;
        assert!(allocated.success);
        let entry = allocated.data.unwrap();
        assert_eq!(entry.customer_id, Some(customer.id));
        assert_eq!(entry.occupancy_type, Some(OccupancyType::WorkOrder));

        let items = commands::list_dictionary_items(state, DictionaryCategory::Customer)
            .data
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_请求体_驼峰字段反序列化() {
        let env = TestEnv::new().unwrap();
        let state = &env.state;
        let pt = env.product_type("PCB");
        let mc = env.model_classification("PCB-", pt.id, false);

        let body = format!(
            r#"{{"modelClassificationId":{},"numberPart":"05","metadata":{{"productName":"Widget","occupancyType":"WORK_ORDER"}}}}"#,
            mc.id
        );
        let request: CreateManualRequest = serde_json::from_str(&body).unwrap();
        let created = commands::create_manual_code(state, request, ACTOR.to_string()).await;
        assert!(created.success);
        let entry = created.data.unwrap();
        assert_eq!(entry.model, "PCB-05");
        assert_eq!(entry.product_name.as_deref(), Some("Widget"));
        assert_eq!(entry.occupancy_type, Some(OccupancyType::WorkOrder));

        let query: CodeUsageQuery = serde_json::from_str(&format!(
            r#"{{"modelClassificationId":{},"pageSize":5,"isAllocated":true}}"#,
            mc.id
        ))
        .unwrap();
        let page = commands::list_codes_paged(state, query).data.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.page_size, 5);
        assert_eq!(page.items[0].product_name.as_deref(), Some("Widget"));
    }

    #[tokio::test]
    async fn test_编码策略读取() {
        let env = TestEnv::new().unwrap();
        let policy = commands::get_policy(&env.state).await.data.unwrap();
        assert_eq!(policy.number_digits, 2);
        assert_eq!(policy.extension_max_length, 2);
        assert_eq!(policy.block_size, 100);

        let configs = commands::list_configs(&env.state).data.unwrap();
        assert!(configs.iter().any(|c| c.key == "NumberDigits" && c.value == "2"));
    }
}
