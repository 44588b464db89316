// ==========================================
// Closure validation tests
// ==========================================
// Scope:
// 1. blocked terms, next period, active flag, council checklists
// 2. warnings that do not block a closure
// 3. a rejected execute writes nothing
// ==========================================

mod helpers;

use std::sync::Arc;

use helpers::mock_config::MockConfig;
use rusqlite::params;
use school_closure::engine::validate_period;
use school_closure::ClosureOrchestrator;
use test_helpers::*;

#[test]
fn test_ready_period_is_valid() {
    let s = Scenario::new();
    s.enroll("Ana Pérez", 1);

    let conn = s.conn();
    let report = validate_period(&conn, s.period_id).unwrap();

    assert!(report.valid, "errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
    assert!(report.warnings.is_empty());
    assert_eq!(report.next_period_id, Some(s.next_period_id));
}

#[test]
fn test_unblocked_term_is_named() {
    let s = Scenario::new();
    s.enroll("Ana Pérez", 1);
    let conn = s.conn();
    conn.execute(
        "UPDATE term SET is_blocked = 0 WHERE id = ?1",
        params![s.term_ids[1]],
    )
    .unwrap();

    let report = validate_period(&conn, s.period_id).unwrap();

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("Lapso 2"));
}

#[test]
fn test_missing_next_period_is_an_error() {
    let s = Scenario::new();
    s.enroll("Ana Pérez", 1);
    let conn = s.conn();
    conn.execute(
        "UPDATE school_period SET is_active = 1 WHERE id = ?1",
        params![s.next_period_id],
    )
    .unwrap();

    let report = validate_period(&conn, s.period_id).unwrap();

    assert!(!report.valid);
    assert_eq!(report.next_period_id, None);
    assert!(report.errors.iter().any(|e| e.contains("no inactive period")));
}

#[test]
fn test_inactive_period_stops_early() {
    let s = Scenario::new();
    let conn = s.conn();

    let report = validate_period(&conn, s.next_period_id).unwrap();

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("not active"));
}

#[test]
fn test_unknown_period_is_reported_not_raised() {
    let s = Scenario::new();
    let conn = s.conn();

    let report = validate_period(&conn, 777).unwrap();

    assert!(!report.valid);
    assert!(report.errors[0].contains("does not exist"));
}

#[test]
fn test_open_checklist_blocks_closure() {
    let s = Scenario::new();
    s.enroll("Ana Pérez", 1);
    let conn = s.conn();
    insert_checklist(&conn, s.period_id, None, false);
    insert_checklist(&conn, s.period_id, None, false);

    let report = validate_period(&conn, s.period_id).unwrap();

    assert!(!report.valid);
    assert!(report.errors.iter().any(|e| e.contains("2 of 3")));
}

#[test]
fn test_no_checklist_and_no_inscriptions_only_warn() {
    let s = Scenario::new();
    let conn = s.conn();
    conn.execute("DELETE FROM council_checklist", []).unwrap();

    let report = validate_period(&conn, s.period_id).unwrap();

    assert!(report.valid);
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings.iter().any(|w| w.contains("checklists")));
    assert!(report.warnings.iter().any(|w| w.contains("no inscriptions")));
}

#[test]
fn test_period_without_terms_warns() {
    let s = Scenario::new();
    s.enroll("Ana Pérez", 1);
    let conn = s.conn();
    conn.execute("DELETE FROM term WHERE period_id = ?1", params![s.period_id])
        .unwrap();

    let report = validate_period(&conn, s.period_id).unwrap();

    assert!(report.valid);
    assert!(report.warnings.iter().any(|w| w.contains("no terms")));
}

#[tokio::test]
async fn test_rejected_execute_writes_nothing() {
    let s = Scenario::new();
    let ins = s.enroll("Ana Pérez", 1);
    s.grade_subject(ins, "Matemática", 20.0);
    {
        let conn = s.conn();
        conn.execute(
            "UPDATE term SET is_blocked = 0 WHERE id = ?1",
            params![s.term_ids[2]],
        )
        .unwrap();
    }

    let orchestrator = ClosureOrchestrator::new(s.conn.clone(), Arc::new(MockConfig::default()));
    let validation = orchestrator.validate(s.period_id).unwrap();
    let report = orchestrator.execute(s.period_id, "admin").await.unwrap();

    assert!(!validation.valid);
    assert!(!report.success);
    assert_eq!(report.closure_id, None);
    assert_eq!(report.errors, validation.errors);

    let conn = s.conn();
    assert_eq!(count_rows(&conn, "period_closure"), 0);
    assert_eq!(count_rows(&conn, "inscription"), 1);
    assert_eq!(count_rows(&conn, "subject_final_grade"), 0);
    assert_eq!(count_rows(&conn, "student_period_outcome"), 0);
    assert!(period_is_active(&conn, s.period_id));
    assert!(!period_is_active(&conn, s.next_period_id));
}
