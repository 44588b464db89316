// ==========================================
// School Closure - school period repository
// ==========================================
// Tables: school_period, term, council_checklist,
//         period_grade, period_grade_section
// Rule: no business logic, data access only
// ==========================================

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::academic::{PeriodGrade, SchoolPeriod, Term};
use crate::domain::closure::ChecklistProgress;
use crate::repository::error::RepositoryResult;

// ==========================================
// PeriodRepository
// ==========================================
/// Borrows a connection so the same calls work on a plain connection,
/// a closure transaction or a per-student savepoint.
pub struct PeriodRepository<'c> {
    conn: &'c Connection,
}

impl<'c> PeriodRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn map_period(row: &Row<'_>) -> rusqlite::Result<SchoolPeriod> {
        Ok(SchoolPeriod {
            id: row.get(0)?,
            name: row.get(1)?,
            start_year: row.get(2)?,
            end_year: row.get(3)?,
            is_active: row.get::<_, i64>(4)? != 0,
        })
    }

    /// Look up a period by id
    pub fn find_by_id(&self, period_id: i64) -> RepositoryResult<Option<SchoolPeriod>> {
        let period = self
            .conn
            .query_row(
                "SELECT id, name, start_year, end_year, is_active FROM school_period WHERE id = ?1",
                params![period_id],
                Self::map_period,
            )
            .optional()?;
        Ok(period)
    }

    /// Next period of a closing one
    ///
    /// The inactive period with the smallest start_year strictly greater
    /// than `start_year`.
    pub fn find_next_period(&self, start_year: i32) -> RepositoryResult<Option<SchoolPeriod>> {
        let period = self
            .conn
            .query_row(
                r#"
                SELECT id, name, start_year, end_year, is_active
                FROM school_period
                WHERE is_active = 0 AND start_year > ?1
                ORDER BY start_year ASC, id ASC
                LIMIT 1
                "#,
                params![start_year],
                Self::map_period,
            )
            .optional()?;
        Ok(period)
    }

    /// Flip the active flag of a period, returns affected rows
    pub fn set_active(&self, period_id: i64, active: bool) -> RepositoryResult<usize> {
        let changed = self.conn.execute(
            "UPDATE school_period SET is_active = ?2 WHERE id = ?1",
            params![period_id, active as i64],
        )?;
        Ok(changed)
    }

    /// Terms of a period ordered by position
    pub fn list_terms(&self, period_id: i64) -> RepositoryResult<Vec<Term>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, period_id, name, ord, is_blocked
            FROM term
            WHERE period_id = ?1
            ORDER BY ord ASC, id ASC
            "#,
        )?;

        let terms = stmt
            .query_map(params![period_id], |row| {
                Ok(Term {
                    id: row.get(0)?,
                    period_id: row.get(1)?,
                    name: row.get(2)?,
                    ord: row.get(3)?,
                    is_blocked: row.get::<_, i64>(4)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(terms)
    }

    /// Council checklist completion of a period
    pub fn checklist_progress(&self, period_id: i64) -> RepositoryResult<ChecklistProgress> {
        let (done, total): (i64, i64) = self.conn.query_row(
            r#"
            SELECT COALESCE(SUM(CASE WHEN status = 'done' THEN 1 ELSE 0 END), 0), COUNT(*)
            FROM council_checklist
            WHERE period_id = ?1
            "#,
            params![period_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(ChecklistProgress {
            done: done as usize,
            total: total as usize,
        })
    }

    /// Grade opened in a period, if any
    pub fn find_period_grade(
        &self,
        period_id: i64,
        grade_id: i64,
    ) -> RepositoryResult<Option<PeriodGrade>> {
        let pg = self
            .conn
            .query_row(
                "SELECT id, period_id, grade_id FROM period_grade WHERE period_id = ?1 AND grade_id = ?2",
                params![period_id, grade_id],
                |row| {
                    Ok(PeriodGrade {
                        id: row.get(0)?,
                        period_id: row.get(1)?,
                        grade_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(pg)
    }

    /// Whether a section is configured under a period grade
    pub fn period_grade_has_section(
        &self,
        period_grade_id: i64,
        section_id: i64,
    ) -> RepositoryResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM period_grade_section WHERE period_grade_id = ?1 AND section_id = ?2",
                params![period_grade_id, section_id],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    /// Number of inscriptions in a period
    pub fn count_inscriptions(&self, period_id: i64) -> RepositoryResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM inscription WHERE period_id = ?1",
            params![period_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}
