// ==========================================
// School Closure - pending subject tracker
// ==========================================
// Keeps the set of subjects a student still owes across periods.
// A debt lives on the newest inscription of the student and keeps the
// period where it was first owed.
// ==========================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::domain::grading::SubjectResult;
use crate::domain::outcome::{PendingSubject, PendingSubjectView};
use crate::domain::types::{PendingSubjectStatus, SubjectStatus};
use crate::repository::{PendingSubjectRepository, RepositoryError, RepositoryResult};

/// What `carry_forward` did with the closing inscription's debts
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CarryForwardSummary {
    /// Owed subjects passed this period
    pub resolved: usize,
    /// Owed subjects not taken this period, moved to the new inscription
    pub copied: usize,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PendingSubjectTracker;

impl PendingSubjectTracker {
    pub fn new() -> Self {
        Self
    }

    /// Record the failed subjects of a period as debts of the new inscription
    ///
    /// With no failed subject every debt of the inscription is removed.
    pub fn sync(
        &self,
        conn: &Connection,
        new_inscription_id: i64,
        origin_period_id: i64,
        subject_results: &[SubjectResult],
    ) -> RepositoryResult<usize> {
        let repo = PendingSubjectRepository::new(conn);
        let failed: Vec<&SubjectResult> = subject_results.iter().filter(|r| r.status.is_failed()).collect();

        if failed.is_empty() {
            let removed = repo.delete_by_inscription(new_inscription_id)?;
            if removed > 0 {
                debug!(new_inscription_id, removed, "debts cleared");
            }
            return Ok(0);
        }

        for result in &failed {
            repo.upsert_pending(new_inscription_id, result.subject_id, origin_period_id)?;
        }
        Ok(failed.len())
    }

    /// Settle the closing inscription's own debts
    ///
    /// Passed this period -> resolved as aprobada. Not taken -> copied to
    /// the new inscription. Failed again -> the row written by `sync` gets
    /// back its original origin period. Must run after `sync`.
    pub fn carry_forward(
        &self,
        conn: &Connection,
        old_inscription_id: i64,
        new_inscription_id: i64,
        subject_results: &[SubjectResult],
        now: DateTime<Utc>,
    ) -> RepositoryResult<CarryForwardSummary> {
        let repo = PendingSubjectRepository::new(conn);
        let taken: HashMap<i64, SubjectStatus> = subject_results
            .iter()
            .map(|r| (r.subject_id, r.status))
            .collect();

        let mut summary = CarryForwardSummary::default();
        for owed in repo.list_owed(old_inscription_id)? {
            match taken.get(&owed.subject_id) {
                Some(SubjectStatus::Approved) => {
                    repo.update_status(owed.pending_subject_id, PendingSubjectStatus::Approved, Some(now))?;
                    summary.resolved += 1;
                }
                Some(SubjectStatus::Failed) => {
                    repo.upsert_pending(new_inscription_id, owed.subject_id, owed.origin_period_id)?;
                }
                None => {
                    summary.copied +=
                        repo.insert_ignore(new_inscription_id, owed.subject_id, owed.origin_period_id)?;
                }
            }
        }
        Ok(summary)
    }

    /// Close a debt by approval or equivalence
    pub fn resolve(
        &self,
        conn: &Connection,
        pending_subject_id: i64,
        status: PendingSubjectStatus,
    ) -> RepositoryResult<PendingSubject> {
        if !status.is_resolution() {
            return Err(RepositoryError::ValidationError(format!(
                "{} is not a resolution status",
                status
            )));
        }

        let repo = PendingSubjectRepository::new(conn);
        if repo.find_by_id(pending_subject_id)?.is_none() {
            return Err(RepositoryError::not_found("pending_subject", pending_subject_id));
        }

        repo.update_status(pending_subject_id, status, Some(Utc::now()))?;
        info!(pending_subject_id, status = %status, "pending subject resolved");

        repo.find_by_id(pending_subject_id)?
            .ok_or_else(|| RepositoryError::not_found("pending_subject", pending_subject_id))
    }

    /// Debts carried by the inscriptions of a period
    pub fn list_by_period(&self, conn: &Connection, period_id: i64) -> RepositoryResult<Vec<PendingSubjectView>> {
        PendingSubjectRepository::new(conn).list_by_period(period_id)
    }
}
