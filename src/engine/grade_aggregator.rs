// ==========================================
// School Closure - grade aggregator
// ==========================================
// Per subject, per term:
//   term_total = Σ(score × percentage / 100) + Σ(council points)
// Subject final_score = Σ term_total / N   (N = terms of the period, 1 if none)
// Subject passes when final_score >= min_approval
// Inscription final_average = mean of subject final scores
// ==========================================
// `aggregate` is pure; `summarize` loads a snapshot; `calculate`
// additionally upserts the SubjectFinalGrade cache.
// ==========================================

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::config::ClosureParams;
use crate::domain::grading::{GradeSummary, InscriptionGradingSnapshot, SubjectGradingSnapshot, SubjectResult};
use crate::domain::types::SubjectStatus;
use crate::repository::{GradingRepository, RepositoryResult};

/// Round to two decimals, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GradeAggregator;

impl GradeAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Compute the summary of one inscription from its snapshot
    pub fn aggregate(&self, snapshot: &InscriptionGradingSnapshot, params: &ClosureParams) -> GradeSummary {
        let term_divisor = snapshot.term_ids.len().max(1);
        if snapshot.term_ids.is_empty() {
            warn!(
                inscription_id = snapshot.inscription_id,
                period_id = snapshot.period_id,
                "period has no terms, term divisor falls back to 1"
            );
        }

        // with no terms every entry counts (sum across terms)
        let terms: Option<HashSet<i64>> = if snapshot.term_ids.is_empty() {
            None
        } else {
            Some(snapshot.term_ids.iter().copied().collect())
        };

        let subject_results: Vec<SubjectResult> = snapshot
            .subjects
            .iter()
            .map(|subject| subject_result(subject, terms.as_ref(), term_divisor, params.min_approval))
            .collect();

        let failed_subjects = subject_results.iter().filter(|r| r.status.is_failed()).count();
        let final_average = if subject_results.is_empty() {
            0.0
        } else {
            let total: f64 = subject_results.iter().map(|r| r.final_score).sum();
            round2(total / subject_results.len() as f64)
        };

        GradeSummary {
            inscription_id: snapshot.inscription_id,
            final_average,
            failed_subjects,
            subject_results,
            term_divisor,
        }
    }

    /// Load the snapshot and aggregate it without writing anything
    pub fn summarize(
        &self,
        conn: &Connection,
        inscription_id: i64,
        params: &ClosureParams,
    ) -> RepositoryResult<GradeSummary> {
        let snapshot = GradingRepository::new(conn).load_snapshot(inscription_id)?;
        Ok(self.aggregate(&snapshot, params))
    }

    /// Aggregate and upsert one SubjectFinalGrade row per subject
    pub fn calculate(
        &self,
        conn: &Connection,
        inscription_id: i64,
        params: &ClosureParams,
        calculated_at: &DateTime<Utc>,
    ) -> RepositoryResult<GradeSummary> {
        let summary = self.summarize(conn, inscription_id, params)?;

        let repo = GradingRepository::new(conn);
        for result in &summary.subject_results {
            repo.upsert_final_grade(result, calculated_at)?;
        }

        debug!(
            inscription_id,
            final_average = summary.final_average,
            failed_subjects = summary.failed_subjects,
            subjects = summary.subject_results.len(),
            "grades aggregated"
        );
        Ok(summary)
    }
}

fn subject_result(
    subject: &SubjectGradingSnapshot,
    terms: Option<&HashSet<i64>>,
    term_divisor: usize,
    min_approval: f64,
) -> SubjectResult {
    let counts = |term_id: i64| terms.map_or(true, |t| t.contains(&term_id));

    let weighted: f64 = subject
        .qualifications
        .iter()
        .filter(|q| counts(q.term_id))
        .map(|q| q.score * q.percentage / 100.0)
        .sum();
    let council: f64 = subject
        .council_points
        .iter()
        .filter(|c| counts(c.term_id))
        .map(|c| c.points)
        .sum();

    let divisor = term_divisor as f64;
    let final_score = round2((weighted + council) / divisor);
    let status = if final_score >= min_approval {
        SubjectStatus::Approved
    } else {
        SubjectStatus::Failed
    };

    SubjectResult {
        inscription_subject_id: subject.inscription_subject_id,
        subject_id: subject.subject_id,
        subject_name: subject.subject_name.clone(),
        raw_score: round2(weighted / divisor),
        council_points: round2(council / divisor),
        final_score,
        status,
    }
}
