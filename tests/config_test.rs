// ==========================================
// ConfigManager integration tests
// ==========================================
// Scope:
// 1. settings read through the shared connection
// 2. settings drive a closure run
// 3. settings snapshot stored in the closure row
// ==========================================


use std::sync::Arc;

use school_closure::app::AppState;
use school_closure::config::{config_keys, ClosureConfigReader, ClosureParams, ConfigManager};
use school_closure::repository::{OutcomeRepository, PeriodClosureRepository};
use school_closure::{ClosureOrchestrator, OutcomeStatus};
use test_helpers::*;

#[tokio::test]
async fn test_empty_setting_table_gives_defaults() {
    let s = Scenario::new();
    let manager = ConfigManager::from_connection(s.conn.clone()).unwrap();

    let params = manager.resolve_params().await.unwrap();

    assert_eq!(params, ClosureParams::default());
}

#[tokio::test]
async fn test_settings_override_defaults() {
    let s = Scenario::new();
    let manager = ConfigManager::from_connection(s.conn.clone()).unwrap();
    manager.set_setting(config_keys::MIN_APPROVAL_GRADE, "12").unwrap();
    manager.set_setting(config_keys::MAX_FAILED_SUBJECTS, " 1 ").unwrap();
    manager.set_setting(config_keys::MIN_PROMOTION_AVERAGE, "abc").unwrap();

    let params = manager.resolve_params().await.unwrap();

    assert_eq!(params.min_approval, 12.0);
    assert_eq!(params.max_failed_subjects, 1);
    // malformed value falls back to the default
    assert_eq!(params.default_min_average, 10.0);
}

#[tokio::test]
async fn test_settings_drive_closure_and_are_snapshotted() {
    let s = Scenario::new();
    let ins = s.enroll("Ana Pérez", 1);
    s.grade_subject(ins, "Matemática", 11.0);
    s.grade_subject(ins, "Historia", 18.0);

    let manager = ConfigManager::from_connection(s.conn.clone()).unwrap();
    manager.set_setting(config_keys::MIN_APPROVAL_GRADE, "12").unwrap();

    let orchestrator = ClosureOrchestrator::new(s.conn.clone(), Arc::new(manager));
    let report = orchestrator.execute(s.period_id, "admin").await.unwrap();
    assert!(report.success);
    assert_eq!(report.stats.pending, 1);

    let conn = s.conn();
    let outcome = OutcomeRepository::new(&conn).find_by_inscription(ins).unwrap().unwrap();
    assert_eq!(outcome.status, OutcomeStatus::PendingSubjects);

    let closure = PeriodClosureRepository::new(&conn)
        .find_by_id(report.closure_id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    let snapshot = closure.snapshot.unwrap();
    assert_eq!(snapshot["settings"]["min_approval_grade"], "12");
    assert_eq!(snapshot["params"]["minApproval"], 12.0);
}

#[test]
fn test_config_snapshot_lists_all_settings() {
    let s = Scenario::new();
    let manager = ConfigManager::from_connection(s.conn.clone()).unwrap();
    manager.set_setting("school_name", "U.E. Libertador").unwrap();
    manager.set_setting(config_keys::MAX_FAILED_SUBJECTS, "2").unwrap();
    manager.set_setting(config_keys::MAX_FAILED_SUBJECTS, "4").unwrap();

    let snapshot = manager.get_config_snapshot().unwrap();

    assert_eq!(snapshot["school_name"], "U.E. Libertador");
    assert_eq!(snapshot["max_failed_subjects"], "4");
    assert_eq!(snapshot.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_app_state_wires_config_into_api() {
    let s = Scenario::new();
    let ins = s.enroll("Luis Gómez", 1);
    s.grade_subject(ins, "Arte", 11.0);
    {
        let conn = s.conn();
        conn.execute(
            "INSERT INTO setting (key, value) VALUES (?1, '15')",
            [config_keys::MIN_PROMOTION_AVERAGE],
        )
        .unwrap();
    }

    let state = AppState::new(s.db_path.clone()).unwrap();
    let rows = state.closure_api.preview(s.period_id).await.unwrap();

    // no failed subject but 11 < 15
    assert_eq!(rows[0].status, Some(OutcomeStatus::PendingSubjects));
    assert_eq!(
        state.config_manager.get_setting(config_keys::MIN_PROMOTION_AVERAGE).unwrap(),
        Some("15".to_string())
    );
}

#[tokio::test]
async fn test_separate_manager_sees_committed_settings() {
    let s = Scenario::new();
    {
        let shared = ConfigManager::from_connection(s.conn.clone()).unwrap();
        shared.set_setting(config_keys::MAX_FAILED_SUBJECTS, "2").unwrap();
    }

    let own = ConfigManager::new(&s.db_path).unwrap();

    assert_eq!(own.get_max_failed_subjects().await.unwrap(), 2);
    assert_eq!(own.get_min_approval_grade().await.unwrap(), 10.0);
}
