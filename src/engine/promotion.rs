// ==========================================
// School Closure - promotion decision engine
// ==========================================
// Decision tree:
//   failed == 0 and average >= min_average  -> aprobado
//   failed  > max_failed                    -> reprobado
//   otherwise                               -> materias_pendientes
// Target grade:
//   reprobado -> current grade
//   otherwise -> rule destination, else catalog grade ord+1, else none
// Graduation: any non-failed student left without a destination
// Carry-over: failing again a subject already owed forces reprobado
// and sends the student back to the grade where it was first owed.
// ==========================================

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::config::ClosureParams;
use crate::domain::academic::{Grade, Inscription, TransitionRule};
use crate::domain::grading::GradeSummary;
use crate::domain::outcome::{OwedSubject, PromotionDecision};
use crate::domain::types::OutcomeStatus;
use crate::repository::{
    GradeCatalogRepository, OutcomeRepository, PendingSubjectRepository, RepositoryResult,
};

/// Pure status rule, exposed for direct testing
pub fn determine_status(
    failed_subjects: usize,
    final_average: f64,
    min_average: f64,
    max_failed_subjects: usize,
) -> OutcomeStatus {
    if failed_subjects == 0 && final_average >= min_average {
        OutcomeStatus::Approved
    } else if failed_subjects > max_failed_subjects {
        OutcomeStatus::Failed
    } else {
        OutcomeStatus::PendingSubjects
    }
}

/// Everything a decision needs besides the grade summary
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionInputs {
    pub inscription_id: i64,
    pub current_grade_id: i64,
    pub rule: Option<TransitionRule>,
    /// Catalog grade right after the current one
    pub next_grade: Option<Grade>,
    /// Active debts, oldest origin first
    pub owed: Vec<OwedSubject>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PromotionDecisionEngine;

impl PromotionDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply the decision tree to one inscription
    pub fn decide(
        &self,
        inputs: &DecisionInputs,
        summary: &GradeSummary,
        params: &ClosureParams,
        now: DateTime<Utc>,
    ) -> PromotionDecision {
        let rule = inputs.rule.as_ref();
        let min_average = rule
            .and_then(|r| r.min_average)
            .unwrap_or(params.default_min_average);
        let max_failed_subjects = rule
            .and_then(|r| r.max_pending_subjects)
            .map(|v| v.max(0) as usize)
            .unwrap_or(params.max_failed_subjects);

        let mut status = determine_status(
            summary.failed_subjects,
            summary.final_average,
            min_average,
            max_failed_subjects,
        );

        let mut promotion_grade_id = match status {
            OutcomeStatus::Failed => Some(inputs.current_grade_id),
            _ => rule
                .and_then(|r| r.grade_to_id)
                .or_else(|| inputs.next_grade.as_ref().map(|g| g.id)),
        };

        // owed subject failed again: the earliest origin wins
        let failed_now: HashSet<i64> = summary.failed().map(|r| r.subject_id).collect();
        let carried_over = inputs.owed.iter().find(|o| failed_now.contains(&o.subject_id));
        if let Some(owed) = carried_over {
            status = OutcomeStatus::Failed;
            promotion_grade_id = Some(owed.origin_grade_id.unwrap_or(inputs.current_grade_id));
        }

        // no destination left: the catalog has no grade after this one
        let graduated_at = if status != OutcomeStatus::Failed && promotion_grade_id.is_none() {
            Some(now)
        } else {
            None
        };

        PromotionDecision {
            inscription_id: inputs.inscription_id,
            status,
            final_average: summary.final_average,
            failed_subject_count: summary.failed_subjects,
            promotion_grade_id,
            graduated_at,
            failed_subjects: summary.failed().cloned().collect(),
            rule_id: rule.map(|r| r.id),
            min_average,
            max_failed_subjects,
            carried_over_subject_id: carried_over.map(|o| o.subject_id),
            evaluated_at: now,
        }
    }

    /// Load rule, next catalog grade and active debts of an inscription
    pub fn load_inputs(&self, conn: &Connection, inscription: &Inscription) -> RepositoryResult<DecisionInputs> {
        let catalog = GradeCatalogRepository::new(conn);
        let rule = catalog.find_rule_for_grade(inscription.grade_id)?;
        let next_grade = catalog.find_by_ord(inscription.grade_ord + 1)?;
        let owed = PendingSubjectRepository::new(conn).list_owed(inscription.id)?;

        Ok(DecisionInputs {
            inscription_id: inscription.id,
            current_grade_id: inscription.grade_id,
            rule,
            next_grade,
            owed,
        })
    }

    /// Decide and upsert the StudentPeriodOutcome
    pub fn evaluate(
        &self,
        conn: &Connection,
        inscription: &Inscription,
        summary: &GradeSummary,
        params: &ClosureParams,
        now: DateTime<Utc>,
    ) -> RepositoryResult<PromotionDecision> {
        let inputs = self.load_inputs(conn, inscription)?;
        let decision = self.decide(&inputs, summary, params, now);
        OutcomeRepository::new(conn).upsert(&decision)?;

        debug!(
            inscription_id = inscription.id,
            status = %decision.status,
            promotion_grade_id = ?decision.promotion_grade_id,
            carried_over_subject_id = ?decision.carried_over_subject_id,
            "promotion decided"
        );
        Ok(decision)
    }

    /// Same decision as `evaluate`, nothing persisted
    pub fn preview_decision(
        &self,
        conn: &Connection,
        inscription: &Inscription,
        summary: &GradeSummary,
        params: &ClosureParams,
        now: DateTime<Utc>,
    ) -> RepositoryResult<PromotionDecision> {
        let inputs = self.load_inputs(conn, inscription)?;
        Ok(self.decide(&inputs, summary, params, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grading::SubjectResult;
    use crate::domain::types::SubjectStatus;

    fn result(subject_id: i64, score: f64) -> SubjectResult {
        SubjectResult {
            inscription_subject_id: subject_id * 10,
            subject_id,
            subject_name: format!("S{}", subject_id),
            raw_score: score,
            council_points: 0.0,
            final_score: score,
            status: if score >= 10.0 {
                SubjectStatus::Approved
            } else {
                SubjectStatus::Failed
            },
        }
    }

    fn summary(scores: &[f64]) -> GradeSummary {
        let subject_results: Vec<SubjectResult> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| result(i as i64 + 1, *s))
            .collect();
        let failed_subjects = subject_results.iter().filter(|r| r.status.is_failed()).count();
        let final_average = scores.iter().sum::<f64>() / scores.len() as f64;
        GradeSummary {
            inscription_id: 1,
            final_average,
            failed_subjects,
            subject_results,
            term_divisor: 3,
        }
    }

    fn inputs() -> DecisionInputs {
        DecisionInputs {
            inscription_id: 1,
            current_grade_id: 2,
            rule: None,
            next_grade: Some(Grade {
                id: 3,
                name: "3er Año".to_string(),
                ord: 3,
            }),
            owed: Vec::new(),
        }
    }

    #[test]
    fn test_determine_status_table() {
        assert_eq!(determine_status(0, 15.0, 10.0, 3), OutcomeStatus::Approved);
        assert_eq!(determine_status(5, 15.0, 10.0, 3), OutcomeStatus::Failed);
        assert_eq!(determine_status(2, 9.0, 10.0, 3), OutcomeStatus::PendingSubjects);
        // no failed subject but a low average is still pending
        assert_eq!(determine_status(0, 9.5, 10.0, 3), OutcomeStatus::PendingSubjects);
        assert_eq!(determine_status(3, 12.0, 10.0, 3), OutcomeStatus::PendingSubjects);
    }

    #[test]
    fn test_approved_moves_to_next_catalog_grade() {
        let decision = PromotionDecisionEngine::new().decide(
            &inputs(),
            &summary(&[15.0, 18.0]),
            &ClosureParams::default(),
            Utc::now(),
        );
        assert_eq!(decision.status, OutcomeStatus::Approved);
        assert_eq!(decision.promotion_grade_id, Some(3));
        assert!(decision.graduated_at.is_none());
        assert!(decision.failed_subjects.is_empty());
    }

    #[test]
    fn test_failed_stays_in_current_grade() {
        let decision = PromotionDecisionEngine::new().decide(
            &inputs(),
            &summary(&[2.0, 3.0, 4.0, 5.0]),
            &ClosureParams::default(),
            Utc::now(),
        );
        assert_eq!(decision.status, OutcomeStatus::Failed);
        assert_eq!(decision.promotion_grade_id, Some(2));
        assert_eq!(decision.failed_subjects.len(), 4);
    }

    #[test]
    fn test_rule_overrides_destination_and_thresholds() {
        let mut inputs = inputs();
        inputs.rule = Some(TransitionRule {
            id: 9,
            grade_from_id: 2,
            grade_to_id: Some(7),
            min_average: Some(16.0),
            max_pending_subjects: Some(0),
            auto_graduate: false,
        });

        let engine = PromotionDecisionEngine::new();
        let pending = engine.decide(&inputs, &summary(&[15.0, 15.0]), &ClosureParams::default(), Utc::now());
        assert_eq!(pending.status, OutcomeStatus::PendingSubjects);
        assert_eq!(pending.promotion_grade_id, Some(7));
        assert_eq!(pending.rule_id, Some(9));
        assert_eq!(pending.min_average, 16.0);

        let failed = engine.decide(&inputs, &summary(&[15.0, 8.0]), &ClosureParams::default(), Utc::now());
        assert_eq!(failed.status, OutcomeStatus::Failed);
    }

    #[test]
    fn test_terminal_grade_graduates_unless_failed() {
        let mut inputs = inputs();
        inputs.next_grade = None;
        let now = Utc::now();
        let engine = PromotionDecisionEngine::new();

        let approved = engine.decide(&inputs, &summary(&[19.0]), &ClosureParams::default(), now);
        assert_eq!(approved.graduated_at, Some(now));
        assert!(approved.is_graduation());

        let pending = engine.decide(&inputs, &summary(&[15.0, 6.0]), &ClosureParams::default(), now);
        assert_eq!(pending.status, OutcomeStatus::PendingSubjects);
        assert!(pending.promotion_grade_id.is_none());
        assert_eq!(pending.graduated_at, Some(now));

        let failed = engine.decide(&inputs, &summary(&[2.0, 3.0, 4.0, 5.0]), &ClosureParams::default(), now);
        assert_eq!(failed.status, OutcomeStatus::Failed);
        assert_eq!(failed.promotion_grade_id, Some(2));
        assert!(failed.graduated_at.is_none());
    }

    #[test]
    fn test_auto_graduate_rule_without_destination_graduates() {
        let mut inputs = inputs();
        inputs.rule = Some(TransitionRule {
            id: 1,
            grade_from_id: 2,
            grade_to_id: None,
            min_average: None,
            max_pending_subjects: None,
            auto_graduate: true,
        });
        inputs.next_grade = None;

        let decision = PromotionDecisionEngine::new().decide(
            &inputs,
            &summary(&[14.0]),
            &ClosureParams::default(),
            Utc::now(),
        );
        assert_eq!(decision.status, OutcomeStatus::Approved);
        assert!(decision.promotion_grade_id.is_none());
        assert!(decision.is_graduation());
    }

    #[test]
    fn test_auto_graduate_keeps_rule_destination() {
        let mut inputs = inputs();
        inputs.rule = Some(TransitionRule {
            id: 1,
            grade_from_id: 2,
            grade_to_id: Some(3),
            min_average: None,
            max_pending_subjects: None,
            auto_graduate: true,
        });

        let decision = PromotionDecisionEngine::new().decide(
            &inputs,
            &summary(&[14.0]),
            &ClosureParams::default(),
            Utc::now(),
        );
        assert_eq!(decision.status, OutcomeStatus::Approved);
        assert_eq!(decision.promotion_grade_id, Some(3));
        assert!(!decision.is_graduation());
    }

    #[test]
    fn test_owed_subject_failed_again_forces_origin_grade() {
        let mut inputs = inputs();
        inputs.owed = vec![
            OwedSubject {
                pending_subject_id: 40,
                subject_id: 1,
                origin_period_id: 5,
                origin_period_start_year: 2022,
                origin_grade_id: Some(1),
            },
            OwedSubject {
                pending_subject_id: 41,
                subject_id: 2,
                origin_period_id: 6,
                origin_period_start_year: 2023,
                origin_grade_id: Some(2),
            },
        ];

        // only subject 1 failed; average would otherwise promote as pending
        let decision = PromotionDecisionEngine::new().decide(
            &inputs,
            &summary(&[8.0, 19.0, 20.0]),
            &ClosureParams::default(),
            Utc::now(),
        );
        assert_eq!(decision.status, OutcomeStatus::Failed);
        assert_eq!(decision.promotion_grade_id, Some(1));
        assert_eq!(decision.carried_over_subject_id, Some(1));
        assert!(decision.graduated_at.is_none());
    }

    #[test]
    fn test_owed_subject_passed_does_not_override() {
        let mut inputs = inputs();
        inputs.owed = vec![OwedSubject {
            pending_subject_id: 40,
            subject_id: 1,
            origin_period_id: 5,
            origin_period_start_year: 2022,
            origin_grade_id: Some(1),
        }];

        let decision = PromotionDecisionEngine::new().decide(
            &inputs,
            &summary(&[15.0, 15.0]),
            &ClosureParams::default(),
            Utc::now(),
        );
        assert_eq!(decision.status, OutcomeStatus::Approved);
        assert_eq!(decision.promotion_grade_id, Some(3));
        assert!(decision.carried_over_subject_id.is_none());
    }
}
