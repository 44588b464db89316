// ==========================================
// School Closure - closure preview (dry run)
// ==========================================
// Aggregation + decision for every inscription of a period with no
// writes at all: no caches, no inscriptions, no debts.
// At-risk students first: failed subjects desc, average asc.
// `open` gives the preview its own connection so it is not queued
// behind a closure holding the shared one.
// ==========================================

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, instrument, warn};

use crate::config::{ClosureConfigReader, ClosureParams};
use crate::db::open_sqlite_connection;
use crate::domain::academic::Inscription;
use crate::domain::closure::PreviewRow;
use crate::domain::outcome::PromotionDecision;
use crate::engine::error::{ClosureError, EngineResult};
use crate::engine::orchestrator::lock_conn;
use crate::engine::{GradeAggregator, PromotionDecisionEngine};
use crate::repository::{InscriptionRepository, PeriodRepository, RepositoryResult};

pub struct ClosurePreviewService<C>
where
    C: ClosureConfigReader,
{
    conn: Arc<Mutex<Connection>>,
    config: Arc<C>,
    aggregator: GradeAggregator,
    decision: PromotionDecisionEngine,
}

impl<C> ClosurePreviewService<C>
where
    C: ClosureConfigReader,
{
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<C>) -> Self {
        Self {
            conn,
            config,
            aggregator: GradeAggregator::new(),
            decision: PromotionDecisionEngine::new(),
        }
    }

    /// Preview over a dedicated read connection
    pub fn open(db_path: &str, config: Arc<C>) -> EngineResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self::new(Arc::new(Mutex::new(conn)), config))
    }

    #[instrument(skip(self))]
    pub async fn preview(&self, period_id: i64) -> EngineResult<Vec<PreviewRow>> {
        let params = self
            .config
            .resolve_params()
            .await
            .map_err(|e| ClosureError::Config(e.to_string()))?;

        let conn = lock_conn(&self.conn)?;
        if PeriodRepository::new(&conn).find_by_id(period_id)?.is_none() {
            return Err(ClosureError::PeriodNotFound(period_id));
        }

        let inscriptions = InscriptionRepository::new(&conn).list_by_period(period_id)?;
        let mut rows = Vec::with_capacity(inscriptions.len());
        for inscription in &inscriptions {
            match self.preview_student(&conn, inscription, &params) {
                Ok(decision) => rows.push(preview_row(inscription, Some(&decision), None)),
                Err(e) if e.is_record_level() => {
                    warn!(inscription_id = inscription.id, error = %e, "preview failed for student");
                    rows.push(preview_row(inscription, None, Some(e.to_string())));
                }
                Err(e) => return Err(e.into()),
            }
        }

        sort_at_risk_first(&mut rows);
        info!(rows = rows.len(), "preview computed");
        Ok(rows)
    }

    fn preview_student(
        &self,
        conn: &Connection,
        inscription: &Inscription,
        params: &ClosureParams,
    ) -> RepositoryResult<PromotionDecision> {
        let summary = self.aggregator.summarize(conn, inscription.id, params)?;
        self.decision
            .preview_decision(conn, inscription, &summary, params, Utc::now())
    }
}

fn preview_row(inscription: &Inscription, decision: Option<&PromotionDecision>, error: Option<String>) -> PreviewRow {
    PreviewRow {
        inscription_id: inscription.id,
        student_id: inscription.student_id,
        student_name: inscription.student_name.clone(),
        grade_id: inscription.grade_id,
        grade_name: inscription.grade_name.clone(),
        final_average: decision.map_or(0.0, |d| d.final_average),
        failed_subjects: decision.map_or(0, |d| d.failed_subject_count),
        status: decision.map(|d| d.status),
        promotion_grade_id: decision.and_then(|d| d.promotion_grade_id),
        graduates: decision.map_or(false, |d| d.is_graduation()),
        failed_subject_names: decision
            .map(|d| d.failed_subjects.iter().map(|s| s.subject_name.clone()).collect())
            .unwrap_or_default(),
        error,
    }
}

/// Rows that could not be computed come first, then failed subjects
/// descending, average ascending, inscription id.
pub fn sort_at_risk_first(rows: &mut [PreviewRow]) {
    rows.sort_by(|a, b| {
        b.error
            .is_some()
            .cmp(&a.error.is_some())
            .then_with(|| b.failed_subjects.cmp(&a.failed_subjects))
            .then_with(|| {
                a.final_average
                    .partial_cmp(&b.final_average)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.inscription_id.cmp(&b.inscription_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::OutcomeStatus;

    fn row(id: i64, failed: usize, avg: f64) -> PreviewRow {
        PreviewRow {
            inscription_id: id,
            student_id: id,
            student_name: format!("student {}", id),
            grade_id: 1,
            grade_name: "1er Año".to_string(),
            final_average: avg,
            failed_subjects: failed,
            status: Some(OutcomeStatus::PendingSubjects),
            promotion_grade_id: Some(2),
            graduates: false,
            failed_subject_names: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_sort_at_risk_first() {
        let mut broken = row(9, 0, 0.0);
        broken.error = Some("bad row".to_string());
        let mut rows = vec![row(1, 0, 18.0), row(2, 2, 11.0), row(3, 2, 9.5), row(4, 5, 6.0), broken, row(5, 0, 18.0)];

        sort_at_risk_first(&mut rows);

        let ids: Vec<i64> = rows.iter().map(|r| r.inscription_id).collect();
        assert_eq!(ids, vec![9, 4, 3, 2, 1, 5]);
    }
}
