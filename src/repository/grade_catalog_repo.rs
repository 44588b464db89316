// ==========================================
// School Closure - grade catalog repository
// ==========================================
// Tables: grade, transition_rule
// ==========================================

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::academic::{Grade, TransitionRule};
use crate::repository::error::RepositoryResult;

pub struct GradeCatalogRepository<'c> {
    conn: &'c Connection,
}

impl<'c> GradeCatalogRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn map_grade(row: &Row<'_>) -> rusqlite::Result<Grade> {
        Ok(Grade {
            id: row.get(0)?,
            name: row.get(1)?,
            ord: row.get(2)?,
        })
    }

    /// Catalog grade at a given position
    pub fn find_by_ord(&self, ord: i32) -> RepositoryResult<Option<Grade>> {
        let grade = self
            .conn
            .query_row(
                "SELECT id, name, ord FROM grade WHERE ord = ?1",
                params![ord],
                Self::map_grade,
            )
            .optional()?;
        Ok(grade)
    }

    /// Transition rule keyed by origin grade
    pub fn find_rule_for_grade(&self, grade_from_id: i64) -> RepositoryResult<Option<TransitionRule>> {
        let rule = self
            .conn
            .query_row(
                r#"
                SELECT id, grade_from_id, grade_to_id, min_average,
                       max_pending_subjects, auto_graduate
                FROM transition_rule
                WHERE grade_from_id = ?1
                "#,
                params![grade_from_id],
                |row| {
                    Ok(TransitionRule {
                        id: row.get(0)?,
                        grade_from_id: row.get(1)?,
                        grade_to_id: row.get(2)?,
                        min_average: row.get(3)?,
                        max_pending_subjects: row.get(4)?,
                        auto_graduate: row.get::<_, i64>(5)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(rule)
    }
}
