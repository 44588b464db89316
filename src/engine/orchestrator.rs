// ==========================================
// School Closure - closure orchestrator
// ==========================================
// validate: read-only precondition checks, no transaction
// execute:  one transaction for the whole cohort
//   1. refuse an already closed period
//   2. validate (rejected -> nothing written)
//   3. PeriodClosure row (validating)
//   4. per inscription, inside a savepoint:
//      aggregate -> decide -> next-period inscription -> debts
//   5. PeriodClosure row closed with log + snapshot
//   6. flip is_active on both periods, commit
// ==========================================

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_settings_snapshot, ClosureConfigReader, ClosureParams};
use crate::domain::academic::{Inscription, NewInscription};
use crate::domain::closure::{
    ClosureReport, ClosureStats, PeriodClosure, PeriodStatusView, StudentClosureOutcome,
    ValidationReport,
};
use crate::domain::types::{ClosureStatus, OutcomeStatus, SchoolingStatus};
use crate::engine::error::{ClosureError, EngineResult};
use crate::engine::{GradeAggregator, PendingSubjectTracker, PromotionDecisionEngine};
use crate::repository::{
    InscriptionRepository, PeriodClosureRepository, PeriodRepository, RepositoryError,
    RepositoryResult,
};

/// Lock the shared connection, mapping poisoning to a repository error
pub(crate) fn lock_conn(conn: &Mutex<Connection>) -> RepositoryResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

// ==========================================
// Validation
// ==========================================

/// Pre-transaction checks of a period
///
/// Missing or inactive period stops the checks early.
pub fn validate_period(conn: &Connection, period_id: i64) -> RepositoryResult<ValidationReport> {
    let periods = PeriodRepository::new(conn);
    let mut report = ValidationReport {
        valid: true,
        ..Default::default()
    };

    let period = match periods.find_by_id(period_id)? {
        Some(p) => p,
        None => {
            report.error(format!("school period {} does not exist", period_id));
            return Ok(report);
        }
    };
    if !period.is_active {
        report.error(format!("school period {} is not active", period.name));
        return Ok(report);
    }

    match periods.find_next_period(period.start_year)? {
        Some(next) => report.next_period_id = Some(next.id),
        None => report.error(format!(
            "no inactive period starts after {} ({})",
            period.name, period.start_year
        )),
    }

    let terms = periods.list_terms(period_id)?;
    if terms.is_empty() {
        report.warning("period has no terms; subject scores will be summed instead of averaged");
    }
    let unblocked: Vec<&str> = terms
        .iter()
        .filter(|t| !t.is_blocked)
        .map(|t| t.name.as_str())
        .collect();
    if !unblocked.is_empty() {
        report.error(format!("terms not blocked: {}", unblocked.join(", ")));
    }

    let checklist = periods.checklist_progress(period_id)?;
    if checklist.total == 0 {
        report.warning("no council checklists configured for this period");
    } else if checklist.done < checklist.total {
        report.error(format!(
            "{} of {} council checklists are not done",
            checklist.total - checklist.done,
            checklist.total
        ));
    }

    if periods.count_inscriptions(period_id)? == 0 {
        report.warning("period has no inscriptions");
    }

    Ok(report)
}

// ==========================================
// ClosureOrchestrator
// ==========================================

pub struct ClosureOrchestrator<C>
where
    C: ClosureConfigReader,
{
    conn: Arc<Mutex<Connection>>,
    config: Arc<C>,
    aggregator: GradeAggregator,
    decision: PromotionDecisionEngine,
    tracker: PendingSubjectTracker,
}

impl<C> ClosureOrchestrator<C>
where
    C: ClosureConfigReader,
{
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<C>) -> Self {
        Self {
            conn,
            config,
            aggregator: GradeAggregator::new(),
            decision: PromotionDecisionEngine::new(),
            tracker: PendingSubjectTracker::new(),
        }
    }

    /// Read-only precondition check
    #[instrument(skip(self))]
    pub fn validate(&self, period_id: i64) -> EngineResult<ValidationReport> {
        let conn = lock_conn(&self.conn)?;
        let report = validate_period(&conn, period_id)?;
        debug!(
            valid = report.valid,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "period validated"
        );
        Ok(report)
    }

    /// Progress of a period towards closure
    pub fn status(&self, period_id: i64) -> EngineResult<PeriodStatusView> {
        let conn = lock_conn(&self.conn)?;
        let periods = PeriodRepository::new(&conn);

        let period = periods
            .find_by_id(period_id)?
            .ok_or(ClosureError::PeriodNotFound(period_id))?;
        let terms = periods.list_terms(period_id)?;
        let checklist = periods.checklist_progress(period_id)?;
        let next_period = periods.find_next_period(period.start_year)?;
        let last_closure = PeriodClosureRepository::new(&conn).find_latest_by_period(period_id)?;

        Ok(PeriodStatusView {
            period,
            checklist,
            blocked_terms: terms.iter().filter(|t| t.is_blocked).count(),
            total_terms: terms.len(),
            next_period,
            last_closure_id: last_closure.as_ref().map(|c| c.closure_id.clone()),
            last_closure_status: last_closure.map(|c| c.status),
        })
    }

    /// Close a period and roll its cohort into the next one
    ///
    /// Always returns a report; `success == false` means nothing was
    /// committed. The only errors are a period already closed and
    /// configuration or lock failures raised before any write.
    #[instrument(skip(self), fields(closure_id = tracing::field::Empty))]
    pub async fn execute(&self, period_id: i64, initiated_by: &str) -> EngineResult<ClosureReport> {
        // params are fixed for the whole run
        let params = self
            .config
            .resolve_params()
            .await
            .map_err(|e| ClosureError::Config(e.to_string()))?;

        let mut conn = lock_conn(&self.conn)?;

        if let Some(closed) = PeriodClosureRepository::new(&conn).find_closed_by_period(period_id)? {
            warn!(closure_id = %closed.closure_id, "period already closed, refusing rerun");
            return Err(ClosureError::PeriodAlreadyClosed {
                period_id,
                closure_id: closed.closure_id,
            });
        }

        let validation = validate_period(&conn, period_id)?;
        if !validation.valid {
            info!(errors = ?validation.errors, "closure rejected by validation");
            return Ok(ClosureReport::rejected(
                period_id,
                validation.errors,
                validation.warnings,
            ));
        }

        info!(initiated_by, "closure started");
        match self.run_in_transaction(&mut conn, period_id, initiated_by, &params, &validation) {
            Ok(report) => {
                info!(
                    closure_id = ?report.closure_id,
                    total = report.stats.total,
                    approved = report.stats.approved,
                    pending = report.stats.pending,
                    failed = report.stats.failed,
                    graduated = report.stats.graduated,
                    new_inscriptions = report.stats.new_inscriptions,
                    skipped = report.stats.skipped,
                    errors = report.stats.errors,
                    "closure committed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "closure rolled back");
                Ok(ClosureReport {
                    success: false,
                    period_id,
                    next_period_id: validation.next_period_id,
                    errors: vec![e.to_string()],
                    warnings: validation.warnings,
                    ..Default::default()
                })
            }
        }
    }

    fn run_in_transaction(
        &self,
        conn: &mut Connection,
        period_id: i64,
        initiated_by: &str,
        params: &ClosureParams,
        validation: &ValidationReport,
    ) -> RepositoryResult<ClosureReport> {
        let mut tx = conn.transaction()?;
        let started_at = Utc::now();
        let closure_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("closure_id", closure_id.as_str());

        PeriodClosureRepository::new(&tx).create(&PeriodClosure {
            closure_id: closure_id.clone(),
            period_id,
            status: ClosureStatus::Validating,
            initiated_by: initiated_by.to_string(),
            started_at,
            finished_at: None,
            log: Vec::new(),
            snapshot: None,
        })?;

        let next_period = {
            let periods = PeriodRepository::new(&tx);
            let current = periods
                .find_by_id(period_id)?
                .ok_or_else(|| RepositoryError::not_found("school_period", period_id))?;
            periods.find_next_period(current.start_year)?.ok_or_else(|| {
                RepositoryError::BusinessRuleViolation(format!(
                    "no next period after school period {}",
                    period_id
                ))
            })?
        };

        let inscriptions = InscriptionRepository::new(&tx).list_by_period(period_id)?;

        let mut stats = ClosureStats::default();
        let mut log = Vec::with_capacity(inscriptions.len());
        let mut errors = Vec::new();
        let mut warnings = validation.warnings.clone();

        for inscription in &inscriptions {
            let outcome = self.process_student(&mut tx, inscription, period_id, next_period.id, params, started_at)?;

            match &outcome {
                StudentClosureOutcome::Failed { message } => {
                    warn!(inscription_id = inscription.id, error = %message, "student rolled back");
                    errors.push(format!("inscription {}: {}", inscription.id, message));
                }
                StudentClosureOutcome::Skipped { reason, .. } => {
                    warn!(inscription_id = inscription.id, reason = %reason, "student skipped");
                    warnings.push(format!("inscription {}: {}", inscription.id, reason));
                }
                StudentClosureOutcome::Promoted {
                    new_inscription_id, ..
                } => {
                    debug!(inscription_id = inscription.id, new_inscription_id, "student promoted");
                }
                StudentClosureOutcome::Graduated { .. } => {
                    debug!(inscription_id = inscription.id, "student graduated");
                }
            }

            outcome.apply_to(&mut stats);
            log.push(outcome.to_log_entry(inscription));
        }

        let snapshot = json!({
            "stats": stats,
            "validation": validation,
            "params": params,
            "settings": load_settings_snapshot(&tx)?,
            "nextPeriodId": next_period.id,
        });
        PeriodClosureRepository::new(&tx).finish(
            &closure_id,
            ClosureStatus::Closed,
            &Utc::now(),
            &log,
            &snapshot,
        )?;

        let periods = PeriodRepository::new(&tx);
        periods.set_active(period_id, false)?;
        periods.set_active(next_period.id, true)?;

        tx.commit()?;

        Ok(ClosureReport {
            success: true,
            closure_id: Some(closure_id),
            period_id,
            next_period_id: Some(next_period.id),
            stats,
            errors,
            warnings,
            log,
        })
    }

    /// Run one student inside a savepoint
    ///
    /// Record-level errors roll back this student only; anything else
    /// propagates and aborts the run.
    fn process_student(
        &self,
        tx: &mut Transaction<'_>,
        inscription: &Inscription,
        period_id: i64,
        next_period_id: i64,
        params: &ClosureParams,
        now: DateTime<Utc>,
    ) -> RepositoryResult<StudentClosureOutcome> {
        let sp = tx.savepoint()?;
        match self.migrate_student(&sp, inscription, period_id, next_period_id, params, now) {
            Ok(outcome) => {
                sp.commit()?;
                Ok(outcome)
            }
            Err(e) if e.is_record_level() => {
                // dropping the savepoint rolls it back
                drop(sp);
                Ok(StudentClosureOutcome::Failed {
                    message: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn migrate_student(
        &self,
        conn: &Connection,
        inscription: &Inscription,
        period_id: i64,
        next_period_id: i64,
        params: &ClosureParams,
        now: DateTime<Utc>,
    ) -> RepositoryResult<StudentClosureOutcome> {
        let summary = self.aggregator.calculate(conn, inscription.id, params, &now)?;
        let decision = self.decision.evaluate(conn, inscription, &summary, params, now)?;

        let target_grade_id = match decision.promotion_grade_id {
            Some(id) => id,
            None => return Ok(StudentClosureOutcome::Graduated { decision }),
        };

        let periods = PeriodRepository::new(conn);
        let period_grade = match periods.find_period_grade(next_period_id, target_grade_id)? {
            Some(pg) => pg,
            None => {
                return Ok(StudentClosureOutcome::Skipped {
                    decision,
                    reason: format!(
                        "grade {} is not opened in period {}",
                        target_grade_id, next_period_id
                    ),
                })
            }
        };

        let section_id = match inscription.section_id {
            Some(section_id) if periods.period_grade_has_section(period_grade.id, section_id)? => Some(section_id),
            _ => None,
        };

        let new_inscription_id = InscriptionRepository::new(conn).create(&NewInscription {
            student_id: inscription.student_id,
            period_id: next_period_id,
            grade_id: target_grade_id,
            section_id,
            schooling_status: SchoolingStatus::for_outcome(decision.status),
            is_repeater: decision.status == OutcomeStatus::Failed,
            origin_period_id: period_id,
        })?;

        self.tracker
            .sync(conn, new_inscription_id, period_id, &summary.subject_results)?;
        self.tracker
            .carry_forward(conn, inscription.id, new_inscription_id, &summary.subject_results, now)?;

        Ok(StudentClosureOutcome::Promoted {
            decision,
            new_inscription_id,
            new_grade_id: target_grade_id,
            section_id,
        })
    }
}
