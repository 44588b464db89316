// ==========================================
// School Closure - period closure audit repository
// ==========================================
// Table: period_closure
// Rows are append-only once closed: `finish` only touches rows that
// are still in a non-final state.
// ==========================================

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value as JsonValue;

use crate::domain::closure::{ClosureLogEntry, PeriodClosure};
use crate::domain::types::ClosureStatus;
use crate::repository::db_utils::{parse_code, parse_db_timestamp, parse_opt_timestamp, ts_to_db};
use crate::repository::error::{RepositoryError, RepositoryResult};

const CLOSURE_COLUMNS: &str = r#"
    closure_id, period_id, status, initiated_by,
    started_at, finished_at, log_json, snapshot_json
"#;

pub struct PeriodClosureRepository<'c> {
    conn: &'c Connection,
}

impl<'c> PeriodClosureRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<PeriodClosure> {
        let log = match row.get::<_, Option<String>>(6)? {
            Some(raw) => serde_json::from_str::<Vec<ClosureLogEntry>>(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
            })?,
            None => Vec::new(),
        };
        let snapshot = row
            .get::<_, Option<String>>(7)?
            .and_then(|raw| serde_json::from_str::<JsonValue>(&raw).ok());

        Ok(PeriodClosure {
            closure_id: row.get(0)?,
            period_id: row.get(1)?,
            status: parse_code(2, &row.get::<_, String>(2)?, ClosureStatus::from_db_str)?,
            initiated_by: row.get(3)?,
            started_at: parse_db_timestamp(4, &row.get::<_, String>(4)?)?,
            finished_at: parse_opt_timestamp(5, row.get(5)?)?,
            log,
            snapshot,
        })
    }

    pub fn create(&self, closure: &PeriodClosure) -> RepositoryResult<()> {
        let log_json = if closure.log.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&closure.log)?)
        };
        let snapshot_json = closure
            .snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO period_closure (
                closure_id, period_id, status, initiated_by,
                started_at, finished_at, log_json, snapshot_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                closure.closure_id,
                closure.period_id,
                closure.status.to_db_str(),
                closure.initiated_by,
                ts_to_db(&closure.started_at),
                closure.finished_at.as_ref().map(ts_to_db),
                log_json,
                snapshot_json,
            ],
        )?;
        Ok(())
    }

    /// Move an open run to a final status with its log and snapshot
    pub fn finish(
        &self,
        closure_id: &str,
        status: ClosureStatus,
        finished_at: &DateTime<Utc>,
        log: &[ClosureLogEntry],
        snapshot: &JsonValue,
    ) -> RepositoryResult<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE period_closure
            SET status = ?2, finished_at = ?3, log_json = ?4, snapshot_json = ?5
            WHERE closure_id = ?1 AND status IN ('draft', 'validating')
            "#,
            params![
                closure_id,
                status.to_db_str(),
                ts_to_db(finished_at),
                serde_json::to_string(log)?,
                serde_json::to_string(snapshot)?,
            ],
        )?;

        if changed == 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "period closure {} is not open",
                closure_id
            )));
        }
        Ok(())
    }

    pub fn find_by_id(&self, closure_id: &str) -> RepositoryResult<Option<PeriodClosure>> {
        let sql = format!("SELECT {} FROM period_closure WHERE closure_id = ?1", CLOSURE_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![closure_id], Self::map_row)
            .optional()?;
        Ok(row)
    }

    /// Most recent run of a period, any status
    pub fn find_latest_by_period(&self, period_id: i64) -> RepositoryResult<Option<PeriodClosure>> {
        let sql = format!(
            "SELECT {} FROM period_closure WHERE period_id = ?1 ORDER BY started_at DESC LIMIT 1",
            CLOSURE_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![period_id], Self::map_row)
            .optional()?;
        Ok(row)
    }

    /// Closed run of a period, if the period was already closed
    pub fn find_closed_by_period(&self, period_id: i64) -> RepositoryResult<Option<PeriodClosure>> {
        let sql = format!(
            "SELECT {} FROM period_closure WHERE period_id = ?1 AND status = 'closed' ORDER BY started_at DESC LIMIT 1",
            CLOSURE_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![period_id], Self::map_row)
            .optional()?;
        Ok(row)
    }

    pub fn count_by_period(&self, period_id: i64) -> RepositoryResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM period_closure WHERE period_id = ?1",
            params![period_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}
