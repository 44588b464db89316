// ==========================================
// School Closure - grading snapshots and aggregates
// ==========================================
// Snapshot types are plain values loaded once per inscription and
// handed to the pure aggregation functions; nothing here walks the
// database lazily.
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::SubjectStatus;

// ==========================================
// Input snapshot
// ==========================================

/// One recorded score joined to its evaluation plan item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationEntry {
    pub term_id: i64,
    pub score: f64,
    pub percentage: f64,
}

/// Council bonus for one term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilPointEntry {
    pub term_id: i64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectGradingSnapshot {
    pub inscription_subject_id: i64,
    pub subject_id: i64,
    pub subject_name: String,
    pub qualifications: Vec<QualificationEntry>,
    pub council_points: Vec<CouncilPointEntry>,
}

/// Everything the aggregator needs for one inscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InscriptionGradingSnapshot {
    pub inscription_id: i64,
    pub period_id: i64,
    /// Terms of the inscription's period, ordered
    pub term_ids: Vec<i64>,
    pub subjects: Vec<SubjectGradingSnapshot>,
}

// ==========================================
// Aggregation output
// ==========================================

/// Final grade of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
    pub inscription_subject_id: i64,
    pub subject_id: i64,
    pub subject_name: String,
    /// Weighted scores averaged over terms
    pub raw_score: f64,
    /// Council points averaged over terms
    pub council_points: f64,
    pub final_score: f64,
    pub status: SubjectStatus,
}

/// Aggregate of one inscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeSummary {
    pub inscription_id: i64,
    pub final_average: f64,
    pub failed_subjects: usize,
    pub subject_results: Vec<SubjectResult>,
    /// Divisor actually used (1 when the period has no terms)
    pub term_divisor: usize,
}

impl GradeSummary {
    pub fn failed(&self) -> impl Iterator<Item = &SubjectResult> {
        self.subject_results.iter().filter(|r| r.status.is_failed())
    }
}

// ==========================================
// SubjectFinalGrade - persisted cache row
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectFinalGrade {
    pub inscription_subject_id: i64,
    pub raw_score: f64,
    pub council_points: f64,
    pub final_score: f64,
    pub status: SubjectStatus,
    pub calculated_at: DateTime<Utc>,
}
