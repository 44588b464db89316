// ==========================================
// School Closure - promotion outcome models
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::grading::SubjectResult;
use crate::domain::types::{OutcomeStatus, PendingSubjectStatus};

// ==========================================
// PromotionDecision - decision engine output
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub inscription_id: i64,
    pub status: OutcomeStatus,
    pub final_average: f64,
    pub failed_subject_count: usize,
    /// Grade the student is enrolled in next period (None = no target)
    pub promotion_grade_id: Option<i64>,
    pub graduated_at: Option<DateTime<Utc>>,
    /// Subjects failed in this evaluation, input of the pending tracker
    pub failed_subjects: Vec<SubjectResult>,
    pub rule_id: Option<i64>,
    pub min_average: f64,
    pub max_failed_subjects: usize,
    /// Set when an owed subject was failed again
    pub carried_over_subject_id: Option<i64>,
    pub evaluated_at: DateTime<Utc>,
}

impl PromotionDecision {
    pub fn is_graduation(&self) -> bool {
        self.graduated_at.is_some()
    }

    pub fn metadata(&self) -> OutcomeMetadata {
        OutcomeMetadata {
            rule_id: self.rule_id,
            evaluated_at: self.evaluated_at,
            min_average: self.min_average,
            max_failed_subjects: self.max_failed_subjects,
            carried_over_subject_id: self.carried_over_subject_id,
        }
    }
}

/// metadata_json column of student_period_outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeMetadata {
    pub rule_id: Option<i64>,
    pub evaluated_at: DateTime<Utc>,
    pub min_average: f64,
    pub max_failed_subjects: usize,
    pub carried_over_subject_id: Option<i64>,
}

// ==========================================
// StudentPeriodOutcome - persisted cache row
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPeriodOutcome {
    pub id: i64,
    pub inscription_id: i64,
    pub final_average: f64,
    pub failed_subjects: i64,
    pub status: OutcomeStatus,
    pub promotion_grade_id: Option<i64>,
    pub graduated_at: Option<DateTime<Utc>>,
    pub metadata: Option<OutcomeMetadata>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome row joined with student/grade names (outcomes listing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeView {
    pub outcome: StudentPeriodOutcome,
    pub student_id: i64,
    pub student_name: String,
    pub grade_id: i64,
    pub grade_name: String,
}

// ==========================================
// PendingSubject - subject owed across periods
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubject {
    pub id: i64,
    /// Inscription that carries the debt (the newer one)
    pub inscription_id: i64,
    pub subject_id: i64,
    pub origin_period_id: i64,
    pub status: PendingSubjectStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Pending subject joined with names (pendingSubjects listing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubjectView {
    pub pending: PendingSubject,
    pub student_id: i64,
    pub student_name: String,
    pub subject_name: String,
}

/// Active debt of an inscription with the grade where it was first owed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwedSubject {
    pub pending_subject_id: i64,
    pub subject_id: i64,
    pub origin_period_id: i64,
    pub origin_period_start_year: i32,
    /// Grade of the same student's inscription in the origin period
    pub origin_grade_id: Option<i64>,
}
