// ==========================================
// School Closure - student period outcome repository
// ==========================================
// Table: student_period_outcome (derived cache, one row per inscription)
// ==========================================

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::domain::outcome::{OutcomeMetadata, OutcomeView, PromotionDecision, StudentPeriodOutcome};
use crate::domain::types::OutcomeStatus;
use crate::repository::db_utils::{parse_code, parse_db_timestamp, parse_opt_timestamp, ts_to_db};
use crate::repository::error::RepositoryResult;

const OUTCOME_COLUMNS: &str = r#"
    o.id, o.inscription_id, o.final_average, o.failed_subjects, o.status,
    o.promotion_grade_id, o.graduated_at, o.metadata_json, o.updated_at
"#;

pub struct OutcomeRepository<'c> {
    conn: &'c Connection,
}

impl<'c> OutcomeRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn map_outcome(row: &Row<'_>) -> rusqlite::Result<StudentPeriodOutcome> {
        // metadata is informational; an unreadable blob must not hide the row
        let metadata = row
            .get::<_, Option<String>>(7)?
            .and_then(|raw| serde_json::from_str::<OutcomeMetadata>(&raw).ok());

        Ok(StudentPeriodOutcome {
            id: row.get(0)?,
            inscription_id: row.get(1)?,
            final_average: row.get(2)?,
            failed_subjects: row.get(3)?,
            status: parse_code(4, &row.get::<_, String>(4)?, OutcomeStatus::from_db_str)?,
            promotion_grade_id: row.get(5)?,
            graduated_at: parse_opt_timestamp(6, row.get(6)?)?,
            metadata,
            updated_at: parse_db_timestamp(8, &row.get::<_, String>(8)?)?,
        })
    }

    /// Insert or replace the outcome of a decision's inscription, returns row id
    pub fn upsert(&self, decision: &PromotionDecision) -> RepositoryResult<i64> {
        let metadata_json = serde_json::to_string(&decision.metadata())?;

        self.conn.execute(
            r#"
            INSERT INTO student_period_outcome (
                inscription_id, final_average, failed_subjects, status,
                promotion_grade_id, graduated_at, metadata_json, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(inscription_id) DO UPDATE SET
                final_average = excluded.final_average,
                failed_subjects = excluded.failed_subjects,
                status = excluded.status,
                promotion_grade_id = excluded.promotion_grade_id,
                graduated_at = excluded.graduated_at,
                metadata_json = excluded.metadata_json,
                updated_at = excluded.updated_at
            "#,
            params![
                decision.inscription_id,
                decision.final_average,
                decision.failed_subject_count as i64,
                decision.status.to_db_str(),
                decision.promotion_grade_id,
                decision.graduated_at.as_ref().map(ts_to_db),
                metadata_json,
                ts_to_db(&Utc::now()),
            ],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM student_period_outcome WHERE inscription_id = ?1",
            params![decision.inscription_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn find_by_inscription(
        &self,
        inscription_id: i64,
    ) -> RepositoryResult<Option<StudentPeriodOutcome>> {
        let sql = format!(
            "SELECT {} FROM student_period_outcome o WHERE o.inscription_id = ?1",
            OUTCOME_COLUMNS
        );
        let outcome = self
            .conn
            .query_row(&sql, params![inscription_id], Self::map_outcome)
            .optional()?;
        Ok(outcome)
    }

    /// Outcomes of a period, optionally filtered by status
    pub fn list_by_period(
        &self,
        period_id: i64,
        status: Option<OutcomeStatus>,
    ) -> RepositoryResult<Vec<OutcomeView>> {
        let mut sql = format!(
            r#"
            SELECT {}, i.student_id, s.full_name, i.grade_id, g.name
            FROM student_period_outcome o
            JOIN inscription i ON i.id = o.inscription_id
            JOIN student s ON s.id = i.student_id
            JOIN grade g ON g.id = i.grade_id
            WHERE i.period_id = ?
            "#,
            OUTCOME_COLUMNS
        );
        let mut values: Vec<Value> = vec![Value::from(period_id)];
        if let Some(status) = status {
            sql.push_str(" AND o.status = ?");
            values.push(Value::from(status.to_db_str().to_string()));
        }
        sql.push_str(" ORDER BY g.ord ASC, s.full_name ASC, o.id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(OutcomeView {
                    outcome: Self::map_outcome(row)?,
                    student_id: row.get(9)?,
                    student_name: row.get(10)?,
                    grade_id: row.get(11)?,
                    grade_name: row.get(12)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
