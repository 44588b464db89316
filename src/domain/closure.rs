// ==========================================
// School Closure - closure run models
// ==========================================
// Audit log lines, statistics, validation report and the tagged
// per-student result folded by the orchestrator.
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::academic::{Inscription, SchoolPeriod};
use crate::domain::outcome::PromotionDecision;
use crate::domain::types::{ClosureStatus, OutcomeStatus};

// ==========================================
// ValidationReport - pre-transaction checks
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Resolved next period (present when found)
    pub next_period_id: Option<i64>,
}

impl ValidationReport {
    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.valid = false;
    }

    pub fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

// ==========================================
// ClosureStats - counters of one run
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureStats {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub failed: usize,
    pub graduated: usize,
    pub new_inscriptions: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl ClosureStats {
    pub fn record_status(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Approved => self.approved += 1,
            OutcomeStatus::PendingSubjects => self.pending += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }
}

// ==========================================
// StudentClosureOutcome - tagged per-student result
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum StudentClosureOutcome {
    /// Next-period inscription created
    Promoted {
        decision: PromotionDecision,
        new_inscription_id: i64,
        new_grade_id: i64,
        section_id: Option<i64>,
    },
    /// Not failed and no destination grade, leaves the cohort
    Graduated { decision: PromotionDecision },
    /// Decision stored but the target grade is not opened next period
    Skipped {
        decision: PromotionDecision,
        reason: String,
    },
    /// Record-level failure, this student's writes rolled back
    Failed { message: String },
}

impl StudentClosureOutcome {
    pub fn decision(&self) -> Option<&PromotionDecision> {
        match self {
            StudentClosureOutcome::Promoted { decision, .. }
            | StudentClosureOutcome::Graduated { decision }
            | StudentClosureOutcome::Skipped { decision, .. } => Some(decision),
            StudentClosureOutcome::Failed { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StudentClosureOutcome::Promoted { .. } => "promoted",
            StudentClosureOutcome::Graduated { .. } => "graduated",
            StudentClosureOutcome::Skipped { .. } => "skipped",
            StudentClosureOutcome::Failed { .. } => "failed",
        }
    }

    /// Fold this result into the run counters
    pub fn apply_to(&self, stats: &mut ClosureStats) {
        stats.total += 1;
        if let Some(decision) = self.decision() {
            stats.record_status(decision.status);
        }
        match self {
            StudentClosureOutcome::Promoted { .. } => stats.new_inscriptions += 1,
            StudentClosureOutcome::Graduated { .. } => stats.graduated += 1,
            StudentClosureOutcome::Skipped { .. } => stats.skipped += 1,
            StudentClosureOutcome::Failed { .. } => stats.errors += 1,
        }
    }

    pub fn to_log_entry(&self, inscription: &Inscription) -> ClosureLogEntry {
        let decision = self.decision();
        let (new_grade_id, new_inscription_id, message) = match self {
            StudentClosureOutcome::Promoted {
                new_inscription_id,
                new_grade_id,
                ..
            } => (Some(*new_grade_id), Some(*new_inscription_id), None),
            StudentClosureOutcome::Graduated { .. } => (None, None, None),
            StudentClosureOutcome::Skipped { reason, .. } => (None, None, Some(reason.clone())),
            StudentClosureOutcome::Failed { message } => (None, None, Some(message.clone())),
        };

        ClosureLogEntry {
            result: self.kind().to_string(),
            failed: matches!(self, StudentClosureOutcome::Failed { .. }),
            inscription_id: inscription.id,
            student_id: inscription.student_id,
            student_name: inscription.student_name.clone(),
            old_grade_id: inscription.grade_id,
            old_grade_name: inscription.grade_name.clone(),
            new_grade_id,
            new_inscription_id,
            status: decision.map(|d| d.status),
            final_average: decision.map(|d| d.final_average),
            failed_subjects: decision.map(|d| d.failed_subject_count),
            message,
        }
    }
}

// ==========================================
// ClosureLogEntry - one audit line per student
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureLogEntry {
    /// promoted / graduated / skipped / failed
    pub result: String,
    pub failed: bool,
    pub inscription_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub old_grade_id: i64,
    pub old_grade_name: String,
    pub new_grade_id: Option<i64>,
    pub new_inscription_id: Option<i64>,
    pub status: Option<OutcomeStatus>,
    pub final_average: Option<f64>,
    pub failed_subjects: Option<usize>,
    pub message: Option<String>,
}

// ==========================================
// ClosureReport - result of execute()
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureReport {
    pub success: bool,
    pub closure_id: Option<String>,
    pub period_id: i64,
    pub next_period_id: Option<i64>,
    pub stats: ClosureStats,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub log: Vec<ClosureLogEntry>,
}

impl ClosureReport {
    pub fn rejected(period_id: i64, errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            period_id,
            errors,
            warnings,
            ..Default::default()
        }
    }
}

// ==========================================
// PeriodClosure - audit row
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodClosure {
    pub closure_id: String,
    pub period_id: i64,
    pub status: ClosureStatus,
    pub initiated_by: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub log: Vec<ClosureLogEntry>,
    /// stats + validation + config snapshot
    pub snapshot: Option<JsonValue>,
}

// ==========================================
// Read models
// ==========================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistProgress {
    pub done: usize,
    pub total: usize,
}

/// status(periodId)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatusView {
    pub period: SchoolPeriod,
    pub checklist: ChecklistProgress,
    pub blocked_terms: usize,
    pub total_terms: usize,
    pub next_period: Option<SchoolPeriod>,
    pub last_closure_id: Option<String>,
    pub last_closure_status: Option<ClosureStatus>,
}

/// One row of preview(periodId)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    pub inscription_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub grade_id: i64,
    pub grade_name: String,
    pub final_average: f64,
    pub failed_subjects: usize,
    pub status: Option<OutcomeStatus>,
    pub promotion_grade_id: Option<i64>,
    pub graduates: bool,
    pub failed_subject_names: Vec<String>,
    pub error: Option<String>,
}
