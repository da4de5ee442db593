use super::AuditLogRepository;
use crate::domain::audit::{entity_types, AuditLog};
use crate::domain::types::AuditAction;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_test_log(action: AuditAction, entity_id: i64, actor: &str) -> AuditLog {
    AuditLog::new(
        action,
        entity_types::CODE_USAGE_ENTRY,
        entity_id,
        Some(json!({"is_allocated": false})),
        Some(json!({"is_allocated": true})),
        actor,
    )
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = AuditLogRepository::new(setup_test_db());

    let log = make_test_log(AuditAction::Allocate, 1, "alice");
    let id = repo.insert(&log).unwrap();
    assert_eq!(id, log.id);

    let found = repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.action, "ALLOCATE");
    assert_eq!(found.entity_id, "1");
    assert_eq!(found.new_value, Some(json!({"is_allocated": true})));
}

#[test]
fn test_find_by_entity_keeps_insert_order() {
    let repo = AuditLogRepository::new(setup_test_db());

    repo.insert(&make_test_log(AuditAction::Allocate, 7, "alice")).unwrap();
    repo.insert(&make_test_log(AuditAction::SoftDelete, 7, "bob")).unwrap();
    repo.insert(&make_test_log(AuditAction::Restore, 7, "bob")).unwrap();
    repo.insert(&make_test_log(AuditAction::Allocate, 8, "alice")).unwrap();

    let logs = repo
        .find_by_entity(entity_types::CODE_USAGE_ENTRY, "7")
        .unwrap();
    let actions: Vec<&str> = logs.iter().map(|l| l.action.as_str()).collect();
    assert_eq!(actions, vec!["ALLOCATE", "SOFT_DELETE", "RESTORE"]);
}

#[test]
fn test_find_by_actor_and_action() {
    let repo = AuditLogRepository::new(setup_test_db());

    let count = repo
        .batch_insert(vec![
            make_test_log(AuditAction::Allocate, 1, "alice"),
            make_test_log(AuditAction::Allocate, 2, "alice"),
            make_test_log(AuditAction::SoftDelete, 3, "bob"),
        ])
        .unwrap();
    assert_eq!(count, 3);

    assert_eq!(repo.find_by_actor("alice", 10).unwrap().len(), 2);
    assert_eq!(repo.find_by_action("SOFT_DELETE", 10).unwrap().len(), 1);
    assert_eq!(repo.find_by_actor("alice", 1).unwrap().len(), 1);
}
