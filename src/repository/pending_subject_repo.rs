// ==========================================
// School Closure - pending subject repository
// ==========================================
// Table: pending_subject, unique per (inscription_id, subject_id)
// The origin grade is derived by joining the student's inscription
// in origin_period_id; it is never stored.
// ==========================================

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::outcome::{OwedSubject, PendingSubject, PendingSubjectView};
use crate::domain::types::PendingSubjectStatus;
use crate::repository::db_utils::{parse_code, parse_db_timestamp, parse_opt_timestamp, ts_to_db};
use crate::repository::error::RepositoryResult;

const PENDING_COLUMNS: &str =
    "p.id, p.inscription_id, p.subject_id, p.origin_period_id, p.status, p.resolved_at, p.created_at";

pub struct PendingSubjectRepository<'c> {
    conn: &'c Connection,
}

impl<'c> PendingSubjectRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn map_pending(row: &Row<'_>) -> rusqlite::Result<PendingSubject> {
        Ok(PendingSubject {
            id: row.get(0)?,
            inscription_id: row.get(1)?,
            subject_id: row.get(2)?,
            origin_period_id: row.get(3)?,
            status: parse_code(4, &row.get::<_, String>(4)?, PendingSubjectStatus::from_db_str)?,
            resolved_at: parse_opt_timestamp(5, row.get(5)?)?,
            created_at: parse_db_timestamp(6, &row.get::<_, String>(6)?)?,
        })
    }

    /// Mark a subject as owed by an inscription
    ///
    /// Existing rows are reset to `pendiente` with the given origin.
    pub fn upsert_pending(
        &self,
        inscription_id: i64,
        subject_id: i64,
        origin_period_id: i64,
    ) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO pending_subject (
                inscription_id, subject_id, origin_period_id, status, resolved_at, created_at
            ) VALUES (?1, ?2, ?3, 'pendiente', NULL, ?4)
            ON CONFLICT(inscription_id, subject_id) DO UPDATE SET
                origin_period_id = excluded.origin_period_id,
                status = 'pendiente',
                resolved_at = NULL
            "#,
            params![inscription_id, subject_id, origin_period_id, ts_to_db(&Utc::now())],
        )?;
        Ok(())
    }

    /// Copy a debt onto another inscription unless it already owes that subject
    pub fn insert_ignore(
        &self,
        inscription_id: i64,
        subject_id: i64,
        origin_period_id: i64,
    ) -> RepositoryResult<usize> {
        let changed = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO pending_subject (
                inscription_id, subject_id, origin_period_id, status, resolved_at, created_at
            ) VALUES (?1, ?2, ?3, 'pendiente', NULL, ?4)
            "#,
            params![inscription_id, subject_id, origin_period_id, ts_to_db(&Utc::now())],
        )?;
        Ok(changed)
    }

    /// Remove every debt of an inscription, returns removed rows
    pub fn delete_by_inscription(&self, inscription_id: i64) -> RepositoryResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM pending_subject WHERE inscription_id = ?1",
            params![inscription_id],
        )?;
        Ok(changed)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<PendingSubject>> {
        let sql = format!("SELECT {} FROM pending_subject p WHERE p.id = ?1", PENDING_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id], Self::map_pending)
            .optional()?;
        Ok(row)
    }

    pub fn list_by_inscription(&self, inscription_id: i64) -> RepositoryResult<Vec<PendingSubject>> {
        let sql = format!(
            "SELECT {} FROM pending_subject p WHERE p.inscription_id = ?1 ORDER BY p.subject_id ASC",
            PENDING_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![inscription_id], Self::map_pending)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Set the status of a debt, returns affected rows
    pub fn update_status(
        &self,
        id: i64,
        status: PendingSubjectStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> RepositoryResult<usize> {
        let changed = self.conn.execute(
            "UPDATE pending_subject SET status = ?2, resolved_at = ?3 WHERE id = ?1",
            params![id, status.to_db_str(), resolved_at.as_ref().map(ts_to_db)],
        )?;
        Ok(changed)
    }

    /// Active debts of an inscription with their origin grade
    ///
    /// Ordered by origin period (oldest first).
    pub fn list_owed(&self, inscription_id: i64) -> RepositoryResult<Vec<OwedSubject>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.subject_id, p.origin_period_id, sp.start_year, orig.grade_id
            FROM pending_subject p
            JOIN inscription cur ON cur.id = p.inscription_id
            JOIN school_period sp ON sp.id = p.origin_period_id
            LEFT JOIN inscription orig
                   ON orig.student_id = cur.student_id
                  AND orig.period_id = p.origin_period_id
            WHERE p.inscription_id = ?1 AND p.status = 'pendiente'
            ORDER BY sp.start_year ASC, p.id ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![inscription_id], |row| {
                Ok(OwedSubject {
                    pending_subject_id: row.get(0)?,
                    subject_id: row.get(1)?,
                    origin_period_id: row.get(2)?,
                    origin_period_start_year: row.get(3)?,
                    origin_grade_id: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Debts carried by the inscriptions of a period
    pub fn list_by_period(&self, period_id: i64) -> RepositoryResult<Vec<PendingSubjectView>> {
        let sql = format!(
            r#"
            SELECT {}, i.student_id, st.full_name, sub.name
            FROM pending_subject p
            JOIN inscription i ON i.id = p.inscription_id
            JOIN student st ON st.id = i.student_id
            JOIN subject sub ON sub.id = p.subject_id
            WHERE i.period_id = ?1
            ORDER BY st.full_name ASC, sub.name ASC, p.id ASC
            "#,
            PENDING_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![period_id], |row| {
                Ok(PendingSubjectView {
                    pending: Self::map_pending(row)?,
                    student_id: row.get(7)?,
                    student_name: row.get(8)?,
                    subject_name: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
