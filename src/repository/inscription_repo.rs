// ==========================================
// School Closure - inscription repository
// ==========================================
// Table: inscription (joined with student, grade, section)
// ==========================================

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::academic::{Inscription, NewInscription};
use crate::domain::types::SchoolingStatus;
use crate::repository::db_utils::{parse_code, parse_db_timestamp, ts_to_db};
use crate::repository::error::RepositoryResult;

const SELECT_INSCRIPTION: &str = r#"
    SELECT i.id, i.student_id, s.full_name, i.period_id,
           i.grade_id, g.name, g.ord,
           i.section_id, sec.name,
           i.schooling_status, i.is_repeater, i.origin_period_id, i.created_at
    FROM inscription i
    JOIN student s ON s.id = i.student_id
    JOIN grade g ON g.id = i.grade_id
    LEFT JOIN section sec ON sec.id = i.section_id
"#;

pub struct InscriptionRepository<'c> {
    conn: &'c Connection,
}

impl<'c> InscriptionRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Inscription> {
        Ok(Inscription {
            id: row.get(0)?,
            student_id: row.get(1)?,
            student_name: row.get(2)?,
            period_id: row.get(3)?,
            grade_id: row.get(4)?,
            grade_name: row.get(5)?,
            grade_ord: row.get(6)?,
            section_id: row.get(7)?,
            section_name: row.get(8)?,
            schooling_status: parse_code(9, &row.get::<_, String>(9)?, SchoolingStatus::from_db_str)?,
            is_repeater: row.get::<_, i64>(10)? != 0,
            origin_period_id: row.get(11)?,
            created_at: parse_db_timestamp(12, &row.get::<_, String>(12)?)?,
        })
    }

    pub fn find_by_id(&self, inscription_id: i64) -> RepositoryResult<Option<Inscription>> {
        let sql = format!("{} WHERE i.id = ?1", SELECT_INSCRIPTION);
        let inscription = self
            .conn
            .query_row(&sql, params![inscription_id], Self::map_row)
            .optional()?;
        Ok(inscription)
    }

    /// All inscriptions of a period, ordered by grade then student name
    pub fn list_by_period(&self, period_id: i64) -> RepositoryResult<Vec<Inscription>> {
        let sql = format!(
            "{} WHERE i.period_id = ?1 ORDER BY g.ord ASC, s.full_name ASC, i.id ASC",
            SELECT_INSCRIPTION
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![period_id], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Inscription of a student in a given period
    pub fn find_by_student_and_period(
        &self,
        student_id: i64,
        period_id: i64,
    ) -> RepositoryResult<Option<Inscription>> {
        let sql = format!("{} WHERE i.student_id = ?1 AND i.period_id = ?2", SELECT_INSCRIPTION);
        let inscription = self
            .conn
            .query_row(&sql, params![student_id, period_id], Self::map_row)
            .optional()?;
        Ok(inscription)
    }

    /// Insert a next-period inscription, returns its id
    ///
    /// Fails with UniqueConstraintViolation when the student is already
    /// enrolled in the target period.
    pub fn create(&self, new: &NewInscription) -> RepositoryResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO inscription (
                student_id, period_id, grade_id, section_id,
                schooling_status, is_repeater, origin_period_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                new.student_id,
                new.period_id,
                new.grade_id,
                new.section_id,
                new.schooling_status.to_db_str(),
                new.is_repeater as i64,
                new.origin_period_id,
                ts_to_db(&Utc::now()),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}
