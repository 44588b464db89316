// ==========================================
// School Closure - closure API
// ==========================================
// status / validate / preview / execute / outcomes /
// pendingSubjects / resolvePendingSubject / closure
// Input checks live here; engines assume well-formed ids
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ClosureConfigReader;
use crate::domain::closure::{ClosureReport, PeriodClosure, PeriodStatusView, PreviewRow, ValidationReport};
use crate::domain::outcome::{OutcomeView, PendingSubject, PendingSubjectView};
use crate::domain::types::{OutcomeStatus, PendingSubjectStatus};
use crate::engine::{ClosureOrchestrator, ClosurePreviewService, PendingSubjectTracker};
use crate::repository::{OutcomeRepository, PeriodClosureRepository, RepositoryError};

pub struct ClosureApi<C>
where
    C: ClosureConfigReader,
{
    conn: Arc<Mutex<Connection>>,
    orchestrator: ClosureOrchestrator<C>,
    preview: ClosurePreviewService<C>,
    tracker: PendingSubjectTracker,
}

impl<C> ClosureApi<C>
where
    C: ClosureConfigReader,
{
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<C>) -> Self {
        Self {
            orchestrator: ClosureOrchestrator::new(conn.clone(), config.clone()),
            preview: ClosurePreviewService::new(conn.clone(), config),
            tracker: PendingSubjectTracker::new(),
            conn,
        }
    }

    /// Serve previews from another service (e.g. on its own connection)
    pub fn with_preview(mut self, preview: ClosurePreviewService<C>) -> Self {
        self.preview = preview;
        self
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, RepositoryError>) -> ApiResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("database lock failed: {}", e)))?;
        Ok(f(&*conn)?)
    }

    /// GET status(periodId)
    pub fn status(&self, period_id: i64) -> ApiResult<PeriodStatusView> {
        check_period_id(period_id)?;
        Ok(self.orchestrator.status(period_id)?)
    }

    /// GET validate(periodId)
    pub fn validate(&self, period_id: i64) -> ApiResult<ValidationReport> {
        check_period_id(period_id)?;
        Ok(self.orchestrator.validate(period_id)?)
    }

    /// GET preview(periodId)
    pub async fn preview(&self, period_id: i64) -> ApiResult<Vec<PreviewRow>> {
        check_period_id(period_id)?;
        Ok(self.preview.preview(period_id).await?)
    }

    /// POST execute(periodId, initiatedBy)
    ///
    /// A rejected or rolled-back run is still `Ok` with `success == false`.
    pub async fn execute(&self, period_id: i64, initiated_by: &str) -> ApiResult<ClosureReport> {
        check_period_id(period_id)?;
        let initiated_by = initiated_by.trim();
        if initiated_by.is_empty() {
            return Err(ApiError::InvalidInput("initiated_by must not be empty".to_string()));
        }

        let report = self.orchestrator.execute(period_id, initiated_by).await?;
        info!(period_id, success = report.success, "execute requested by {}", initiated_by);
        Ok(report)
    }

    /// GET outcomes(periodId, status?)
    pub fn list_outcomes(&self, period_id: i64, status: Option<&str>) -> ApiResult<Vec<OutcomeView>> {
        check_period_id(period_id)?;
        let status = match status {
            Some(raw) => Some(
                OutcomeStatus::from_db_str(raw)
                    .ok_or_else(|| ApiError::InvalidInput(format!("unknown outcome status: {}", raw)))?,
            ),
            None => None,
        };
        self.with_conn(|conn| OutcomeRepository::new(conn).list_by_period(period_id, status))
    }

    /// GET pendingSubjects(periodId)
    pub fn list_pending_subjects(&self, period_id: i64) -> ApiResult<Vec<PendingSubjectView>> {
        check_period_id(period_id)?;
        self.with_conn(|conn| self.tracker.list_by_period(conn, period_id))
    }

    /// POST resolvePendingSubject(id, status)
    pub fn resolve_pending_subject(&self, pending_subject_id: i64, status: &str) -> ApiResult<PendingSubject> {
        if pending_subject_id <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "invalid pending subject id: {}",
                pending_subject_id
            )));
        }
        let status = PendingSubjectStatus::from_db_str(status)
            .filter(|s| s.is_resolution())
            .ok_or_else(|| {
                ApiError::InvalidInput(format!(
                    "status must be aprobada or convalidada, got {}",
                    status
                ))
            })?;

        self.with_conn(|conn| self.tracker.resolve(conn, pending_subject_id, status))
    }

    /// GET closure(closureId)
    pub fn get_closure(&self, closure_id: &str) -> ApiResult<PeriodClosure> {
        let closure_id = closure_id.trim();
        if closure_id.is_empty() {
            return Err(ApiError::InvalidInput("closure id must not be empty".to_string()));
        }
        self.with_conn(|conn| {
            PeriodClosureRepository::new(conn)
                .find_by_id(closure_id)?
                .ok_or_else(|| RepositoryError::not_found("period_closure", closure_id))
        })
    }
}

fn check_period_id(period_id: i64) -> ApiResult<()> {
    if period_id <= 0 {
        return Err(ApiError::InvalidInput(format!("invalid period id: {}", period_id)));
    }
    Ok(())
}
