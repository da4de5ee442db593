use super::CodeUsageRepository;
use crate::domain::code_usage::{AllocationMetadata, CodeUsageFilter, CodeUsageQuery, NewCodeUsageEntry};
use crate::domain::types::OccupancyType;
use crate::repository::model_classification_repo::ModelClassificationRepository;
use crate::repository::product_type_repo::ProductTypeRepository;
use crate::repository::sql_utils::now;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup() -> (Arc<Mutex<Connection>>, i64) {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    let pt = ProductTypeRepository::insert_in(&conn, "PCB", None).unwrap();
    let mc = ModelClassificationRepository::insert_in(&conn, "ABC-", pt.id, false, &[]).unwrap();
    (Arc::new(Mutex::new(conn)), mc.id)
}

fn new_entry(mc_id: i64, number: &str, allocated: bool) -> NewCodeUsageEntry {
    NewCodeUsageEntry {
        model: format!("ABC-{}", number),
        model_type: "ABC-".to_string(),
        code_classification_number: None,
        actual_number: number.to_string(),
        extension: None,
        model_classification_id: mc_id,
        code_classification_id: None,
        number_digits: 2,
        metadata: AllocationMetadata::default(),
        is_allocated: allocated,
    }
}

#[test]
fn test_insert_and_find_by_model() {
    let (conn, mc_id) = setup();
    let repo = CodeUsageRepository::new(conn.clone());

    let id = CodeUsageRepository::insert_in(&conn.lock().unwrap(), &new_entry(mc_id, "07", false)).unwrap();

    let entry = repo.find_by_model("ABC-07").unwrap().unwrap();
    assert_eq!(entry.id, id);
    assert_eq!(entry.actual_number, "07");
    assert!(!entry.is_allocated);
    assert!(!entry.is_deleted);
}

#[test]
fn test_deleted_model_stays_reserved() {
    let (conn, mc_id) = setup();
    let guard = conn.lock().unwrap();

    let id = CodeUsageRepository::insert_in(&guard, &new_entry(mc_id, "01", true)).unwrap();
    assert_eq!(CodeUsageRepository::soft_delete_in(&guard, id, "停产", &now()).unwrap(), 1);

    assert!(CodeUsageRepository::model_exists_in(&guard, "ABC-01").unwrap());
    let err = CodeUsageRepository::insert_in(&guard, &new_entry(mc_id, "01", true)).unwrap_err();
    assert!(err.is_unique_violation());
}

#[test]
fn test_guarded_transitions() {
    let (conn, mc_id) = setup();
    let guard = conn.lock().unwrap();
    let id = CodeUsageRepository::insert_in(&guard, &new_entry(mc_id, "02", false)).unwrap();

    let meta = AllocationMetadata {
        product_name: Some("Widget".to_string()),
        occupancy_type: Some(OccupancyType::Planning),
        ..Default::default()
    };
    assert_eq!(CodeUsageRepository::allocate_in(&guard, id, "ABC-02", &meta, &now()).unwrap(), 1);
    // 已分配后再次分配不生效
    assert_eq!(CodeUsageRepository::allocate_in(&guard, id, "ABC-02", &meta, &now()).unwrap(), 0);

    assert_eq!(CodeUsageRepository::restore_in(&guard, id, &now()).unwrap(), 0);
    assert_eq!(CodeUsageRepository::soft_delete_in(&guard, id, "r", &now()).unwrap(), 1);
    assert_eq!(CodeUsageRepository::soft_delete_in(&guard, id, "r", &now()).unwrap(), 0);
    assert_eq!(CodeUsageRepository::restore_in(&guard, id, &now()).unwrap(), 1);

    let entry = CodeUsageRepository::find_by_id_in(&guard, id).unwrap().unwrap();
    assert!(entry.is_allocated);
    assert_eq!(entry.deleted_reason, None);
    assert_eq!(entry.occupancy_type, Some(OccupancyType::Planning));
}

#[test]
fn test_stats_exclude_deleted() {
    let (conn, mc_id) = setup();
    {
        let guard = conn.lock().unwrap();
        CodeUsageRepository::insert_in(&guard, &new_entry(mc_id, "01", true)).unwrap();
        CodeUsageRepository::insert_in(&guard, &new_entry(mc_id, "02", false)).unwrap();
        CodeUsageRepository::insert_in(&guard, &new_entry(mc_id, "03", false)).unwrap();
        let deleted = CodeUsageRepository::insert_in(&guard, &new_entry(mc_id, "04", true)).unwrap();
        CodeUsageRepository::soft_delete_in(&guard, deleted, "x", &now()).unwrap();
    }
    let repo = CodeUsageRepository::new(conn);

    let stats = repo.stats(Some(mc_id), None).unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.allocated, 1);
    assert_eq!(stats.available, 2);

    let global = repo.stats(None, None).unwrap();
    assert_eq!(global, stats);
}

#[test]
fn test_find_paged_with_keyword_and_deleted_flag() {
    let (conn, mc_id) = setup();
    {
        let guard = conn.lock().unwrap();
        for i in 0..30 {
            CodeUsageRepository::insert_in(&guard, &new_entry(mc_id, &format!("{:02}", i), false)).unwrap();
        }
        let id = CodeUsageRepository::find_by_id_in(&guard, 1).unwrap().unwrap().id;
        CodeUsageRepository::soft_delete_in(&guard, id, "x", &now()).unwrap();
    }
    let repo = CodeUsageRepository::new(conn);

    let page = repo
        .find_paged(&CodeUsageQuery {
            model_classification_id: Some(mc_id),
            page: 2,
            page_size: 10,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(page.total, 29);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].model, "ABC-11");

    let with_deleted = repo
        .find_paged(&CodeUsageQuery {
            filter: CodeUsageFilter {
                include_deleted: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
    assert_eq!(with_deleted.total, 30);

    let by_keyword = repo
        .find_by_model_type(
            "ABC-",
            &CodeUsageFilter {
                keyword: Some("-2".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(by_keyword.len(), 10);
}

#[test]
fn test_find_paged_rejects_overflowing_page() {
    let (conn, mc_id) = setup();
    let repo = CodeUsageRepository::new(conn.clone());
    CodeUsageRepository::insert_in(&conn.lock().unwrap(), &new_entry(mc_id, "01", false)).unwrap();

    let query = CodeUsageQuery {
        page: i64::MAX,
        page_size: 500,
        ..Default::default()
    };
    let err = repo.find_paged(&query).unwrap_err();
    assert!(matches!(err, crate::repository::RepositoryError::FieldValueError { .. }));

    assert_eq!(super::page_offset(3, 20), Some(40));
    assert_eq!(super::page_offset(i64::MAX, 2), None);
}
