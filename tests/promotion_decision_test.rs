// ==========================================
// PromotionDecisionEngine integration tests
// ==========================================
// Scope:
// 1. evaluate persists StudentPeriodOutcome + metadata
// 2. rule lookup and catalog fallback
// 3. carry-over of owed subjects failed again
// ==========================================


use chrono::Utc;
use school_closure::config::ClosureParams;
use school_closure::engine::{GradeAggregator, PromotionDecisionEngine};
use school_closure::repository::{InscriptionRepository, OutcomeRepository};
use school_closure::{OutcomeStatus, PromotionDecision};
use test_helpers::*;

fn evaluate(s: &Scenario, inscription_id: i64) -> PromotionDecision {
    let conn = s.conn();
    let params = ClosureParams::default();
    let inscription = InscriptionRepository::new(&conn)
        .find_by_id(inscription_id)
        .unwrap()
        .unwrap();
    let summary = GradeAggregator::new()
        .summarize(&conn, inscription_id, &params)
        .unwrap();
    PromotionDecisionEngine::new()
        .evaluate(&conn, &inscription, &summary, &params, Utc::now())
        .unwrap()
}

#[test]
fn test_evaluate_persists_outcome_with_metadata() {
    let s = Scenario::new();
    let ins = s.enroll("Ana Pérez", 1);
    s.grade_subject(ins, "Matemática", 9.0);
    s.grade_subject(ins, "Historia", 16.0);

    let decision = evaluate(&s, ins);

    assert_eq!(decision.status, OutcomeStatus::PendingSubjects);
    assert_eq!(decision.failed_subject_count, 1);
    assert_eq!(decision.promotion_grade_id, Some(s.grade(2)));
    assert_eq!(decision.failed_subjects[0].subject_name, "Matemática");

    let conn = s.conn();
    let stored = OutcomeRepository::new(&conn).find_by_inscription(ins).unwrap().unwrap();
    assert_eq!(stored.status, OutcomeStatus::PendingSubjects);
    assert_eq!(stored.final_average, 12.5);
    assert_eq!(stored.failed_subjects, 1);
    assert_eq!(stored.promotion_grade_id, Some(s.grade(2)));
    assert_eq!(stored.graduated_at, None);

    let metadata = stored.metadata.unwrap();
    assert_eq!(metadata.rule_id, None);
    assert_eq!(metadata.min_average, 10.0);
    assert_eq!(metadata.max_failed_subjects, 3);
    assert_eq!(metadata.carried_over_subject_id, None);
}

#[test]
fn test_evaluate_twice_keeps_one_outcome_row() {
    let s = Scenario::new();
    let ins = s.enroll("Luis Gómez", 1);
    s.grade_subject(ins, "Arte", 14.0);

    evaluate(&s, ins);
    evaluate(&s, ins);

    let conn = s.conn();
    assert_eq!(count_rows(&conn, "student_period_outcome"), 1);
}

#[test]
fn test_rule_destination_wins_over_catalog() {
    let s = Scenario::new();
    let ins = s.enroll("Salto", 1);
    s.grade_subject(ins, "Arte", 18.0);
    let rule_id = {
        let conn = s.conn();
        insert_rule(&conn, s.grade(1), Some(s.grade(3)), None, None, false)
    };

    let decision = evaluate(&s, ins);

    assert_eq!(decision.status, OutcomeStatus::Approved);
    assert_eq!(decision.promotion_grade_id, Some(s.grade(3)));
    assert_eq!(decision.rule_id, Some(rule_id));
}

#[test]
fn test_terminal_grade_approval_graduates() {
    let s = Scenario::new();
    let ins = s.enroll("Último Año", 3);
    s.grade_subject(ins, "Filosofía", 15.0);

    let decision = evaluate(&s, ins);

    assert!(decision.is_graduation());
    assert_eq!(decision.promotion_grade_id, None);
}

#[test]
fn test_terminal_grade_pending_still_graduates() {
    let s = Scenario::new();
    let ins = s.enroll("Último Año", 3);
    s.grade_subject(ins, "Filosofía", 15.0);
    s.grade_subject(ins, "Física", 6.0);

    let decision = evaluate(&s, ins);

    assert_eq!(decision.status, OutcomeStatus::PendingSubjects);
    assert!(decision.is_graduation());
    assert_eq!(decision.promotion_grade_id, None);

    let conn = s.conn();
    let stored = OutcomeRepository::new(&conn).find_by_inscription(ins).unwrap().unwrap();
    assert!(stored.graduated_at.is_some());
}

#[test]
fn test_owed_subject_failed_again_sends_back_to_origin_grade() {
    let s = Scenario::new();
    let ins = s.enroll("Arrastre", 2);
    s.grade_subject(ins, "Matemática", 6.0);
    s.grade_subject(ins, "Historia", 18.0);
    let math = {
        let conn = s.conn();
        let student = s.student_of_locked(&conn, ins);
        // first owed in 2023, when the student was in grade 1
        let older_period = insert_period(&conn, "2023-2024", 2023, false);
        insert_inscription(&conn, student, older_period, s.grade(1), Some(s.section_id));
        let math = subject_id(&conn, "Matemática");
        insert_pending(&conn, ins, math, older_period);
        math
    };

    let decision = evaluate(&s, ins);

    // one failed subject alone would leave the student pending
    assert_eq!(decision.failed_subject_count, 1);
    assert_eq!(decision.status, OutcomeStatus::Failed);
    assert_eq!(decision.promotion_grade_id, Some(s.grade(1)));
    assert_eq!(decision.carried_over_subject_id, Some(math));

    let conn = s.conn();
    let stored = OutcomeRepository::new(&conn).find_by_inscription(ins).unwrap().unwrap();
    assert_eq!(stored.status, OutcomeStatus::Failed);
    assert_eq!(stored.metadata.unwrap().carried_over_subject_id, Some(math));
}

#[test]
fn test_owed_subject_without_origin_inscription_repeats_current_grade() {
    let s = Scenario::new();
    let ins = s.enroll("Sin Historial", 2);
    s.grade_subject(ins, "Química", 4.0);
    {
        let conn = s.conn();
        let older_period = insert_period(&conn, "2023-2024", 2023, false);
        insert_pending(&conn, ins, subject_id(&conn, "Química"), older_period);
    }

    let decision = evaluate(&s, ins);

    assert_eq!(decision.status, OutcomeStatus::Failed);
    assert_eq!(decision.promotion_grade_id, Some(s.grade(2)));
}

#[test]
fn test_preview_decision_writes_nothing() {
    let s = Scenario::new();
    let ins = s.enroll("Solo Mirar", 1);
    s.grade_subject(ins, "Arte", 12.0);

    let conn = s.conn();
    let params = ClosureParams::default();
    let inscription = InscriptionRepository::new(&conn).find_by_id(ins).unwrap().unwrap();
    let summary = GradeAggregator::new().summarize(&conn, ins, &params).unwrap();
    let decision = PromotionDecisionEngine::new()
        .preview_decision(&conn, &inscription, &summary, &params, Utc::now())
        .unwrap();

    assert_eq!(decision.status, OutcomeStatus::Approved);
    assert_eq!(count_rows(&conn, "student_period_outcome"), 0);
}
