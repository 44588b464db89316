// ==========================================
// School Closure - grading data repository
// ==========================================
// Reads:  inscription_subject, qualification, evaluation_plan_item,
//         council_point, term
// Writes: subject_final_grade (derived cache, upsert only)
// ==========================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::grading::{
    CouncilPointEntry, InscriptionGradingSnapshot, QualificationEntry, SubjectFinalGrade,
    SubjectGradingSnapshot, SubjectResult,
};
use crate::domain::types::SubjectStatus;
use crate::repository::db_utils::{parse_code, parse_db_timestamp, ts_to_db};
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct GradingRepository<'c> {
    conn: &'c Connection,
}

impl<'c> GradingRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Load the grading snapshot of one inscription
    ///
    /// Four flat queries (period terms, subjects, qualifications joined to
    /// their plan item, council points) assembled in memory.
    pub fn load_snapshot(&self, inscription_id: i64) -> RepositoryResult<InscriptionGradingSnapshot> {
        let period_id: i64 = self
            .conn
            .query_row(
                "SELECT period_id FROM inscription WHERE id = ?1",
                params![inscription_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("inscription", inscription_id))?;

        let term_ids = {
            let mut stmt = self
                .conn
                .prepare("SELECT id FROM term WHERE period_id = ?1 ORDER BY ord ASC, id ASC")?;
            let ids = stmt
                .query_map(params![period_id], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };

        let mut subjects = {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT ins.id, ins.subject_id, sub.name
                FROM inscription_subject ins
                JOIN subject sub ON sub.id = ins.subject_id
                WHERE ins.inscription_id = ?1
                ORDER BY sub.name ASC, ins.id ASC
                "#,
            )?;
            let rows = stmt
                .query_map(params![inscription_id], |row| {
                    Ok(SubjectGradingSnapshot {
                        inscription_subject_id: row.get(0)?,
                        subject_id: row.get(1)?,
                        subject_name: row.get(2)?,
                        qualifications: Vec::new(),
                        council_points: Vec::new(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let index: HashMap<i64, usize> = subjects
            .iter()
            .enumerate()
            .map(|(i, s)| (s.inscription_subject_id, i))
            .collect();

        {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT q.inscription_subject_id, epi.term_id, q.score, epi.percentage
                FROM qualification q
                JOIN evaluation_plan_item epi ON epi.id = q.evaluation_plan_item_id
                JOIN inscription_subject ins ON ins.id = q.inscription_subject_id
                WHERE ins.inscription_id = ?1
                ORDER BY q.id ASC
                "#,
            )?;
            let rows = stmt.query_map(params![inscription_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    QualificationEntry {
                        term_id: row.get(1)?,
                        score: row.get(2)?,
                        percentage: row.get(3)?,
                    },
                ))
            })?;
            for row in rows {
                let (is_id, entry) = row?;
                if let Some(&i) = index.get(&is_id) {
                    subjects[i].qualifications.push(entry);
                }
            }
        }

        {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT cp.inscription_subject_id, cp.term_id, cp.points
                FROM council_point cp
                JOIN inscription_subject ins ON ins.id = cp.inscription_subject_id
                WHERE ins.inscription_id = ?1
                ORDER BY cp.id ASC
                "#,
            )?;
            let rows = stmt.query_map(params![inscription_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    CouncilPointEntry {
                        term_id: row.get(1)?,
                        points: row.get(2)?,
                    },
                ))
            })?;
            for row in rows {
                let (is_id, entry) = row?;
                if let Some(&i) = index.get(&is_id) {
                    subjects[i].council_points.push(entry);
                }
            }
        }

        Ok(InscriptionGradingSnapshot {
            inscription_id,
            period_id,
            term_ids,
            subjects,
        })
    }

    /// Upsert the cached final grade of one subject
    pub fn upsert_final_grade(
        &self,
        result: &SubjectResult,
        calculated_at: &DateTime<Utc>,
    ) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO subject_final_grade (
                inscription_subject_id, raw_score, council_points,
                final_score, status, calculated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(inscription_subject_id) DO UPDATE SET
                raw_score = excluded.raw_score,
                council_points = excluded.council_points,
                final_score = excluded.final_score,
                status = excluded.status,
                calculated_at = excluded.calculated_at
            "#,
            params![
                result.inscription_subject_id,
                result.raw_score,
                result.council_points,
                result.final_score,
                result.status.to_db_str(),
                ts_to_db(calculated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_final_grade(
        &self,
        inscription_subject_id: i64,
    ) -> RepositoryResult<Option<SubjectFinalGrade>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT inscription_subject_id, raw_score, council_points,
                       final_score, status, calculated_at
                FROM subject_final_grade
                WHERE inscription_subject_id = ?1
                "#,
                params![inscription_subject_id],
                |row| {
                    Ok(SubjectFinalGrade {
                        inscription_subject_id: row.get(0)?,
                        raw_score: row.get(1)?,
                        council_points: row.get(2)?,
                        final_score: row.get(3)?,
                        status: parse_code(4, &row.get::<_, String>(4)?, SubjectStatus::from_db_str)?,
                        calculated_at: parse_db_timestamp(5, &row.get::<_, String>(5)?)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
