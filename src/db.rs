// ==========================================
// School Closure - SQLite connection setup
// ==========================================
// Goals:
// - every Connection::open goes through the same PRAGMAs
//   (foreign keys on, shared busy_timeout)
// - one idempotent schema bootstrap for the closure tables and the
//   read-only catalog tables the engine consumes
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version written by `init_schema`
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Apply the shared PRAGMAs to a connection
///
/// foreign_keys and busy_timeout are per-connection settings, so every
/// connection must go through here.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the shared configuration
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Read schema_version (None when the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// Create every table the closure engine reads or writes (idempotent)
///
/// Catalog tables (period, term, grade, section, subject, checklist, setting)
/// belong to other subsystems; they are created here so a fresh database is
/// usable by the engine, the CLI and the integration tests.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS setting (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== academic structure (read-only for the engine) =====

CREATE TABLE IF NOT EXISTS school_period (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    start_year INTEGER NOT NULL,
    end_year INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS term (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    period_id INTEGER NOT NULL REFERENCES school_period(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    ord INTEGER NOT NULL DEFAULT 0,
    is_blocked INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_term_period ON term(period_id);

CREATE TABLE IF NOT EXISTS grade (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    ord INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS section (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS period_grade (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    period_id INTEGER NOT NULL REFERENCES school_period(id) ON DELETE CASCADE,
    grade_id INTEGER NOT NULL REFERENCES grade(id),
    UNIQUE (period_id, grade_id)
);

CREATE TABLE IF NOT EXISTS period_grade_section (
    period_grade_id INTEGER NOT NULL REFERENCES period_grade(id) ON DELETE CASCADE,
    section_id INTEGER NOT NULL REFERENCES section(id),
    PRIMARY KEY (period_grade_id, section_id)
);

CREATE TABLE IF NOT EXISTS subject (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS council_checklist (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    period_id INTEGER NOT NULL REFERENCES school_period(id) ON DELETE CASCADE,
    period_grade_id INTEGER REFERENCES period_grade(id),
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'done'))
);
CREATE INDEX IF NOT EXISTS idx_council_checklist_period ON council_checklist(period_id);

CREATE TABLE IF NOT EXISTS transition_rule (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    grade_from_id INTEGER NOT NULL UNIQUE REFERENCES grade(id),
    grade_to_id INTEGER REFERENCES grade(id),
    min_average REAL,
    max_pending_subjects INTEGER,
    auto_graduate INTEGER NOT NULL DEFAULT 0
);

-- ===== enrollment + grading data (entered by staff) =====

CREATE TABLE IF NOT EXISTS inscription (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL REFERENCES student(id),
    period_id INTEGER NOT NULL REFERENCES school_period(id),
    grade_id INTEGER NOT NULL REFERENCES grade(id),
    section_id INTEGER REFERENCES section(id),
    schooling_status TEXT NOT NULL DEFAULT 'regular'
        CHECK (schooling_status IN ('regular', 'repitiente', 'materia_pendiente')),
    is_repeater INTEGER NOT NULL DEFAULT 0,
    origin_period_id INTEGER REFERENCES school_period(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (period_id, student_id)
);

CREATE TABLE IF NOT EXISTS inscription_subject (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inscription_id INTEGER NOT NULL REFERENCES inscription(id) ON DELETE CASCADE,
    subject_id INTEGER NOT NULL REFERENCES subject(id),
    UNIQUE (inscription_id, subject_id)
);

CREATE TABLE IF NOT EXISTS evaluation_plan_item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id INTEGER NOT NULL REFERENCES subject(id),
    section_id INTEGER REFERENCES section(id),
    term_id INTEGER NOT NULL REFERENCES term(id),
    description TEXT NOT NULL DEFAULT '',
    percentage REAL NOT NULL,
    date TEXT
);

CREATE TABLE IF NOT EXISTS qualification (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    evaluation_plan_item_id INTEGER NOT NULL REFERENCES evaluation_plan_item(id),
    inscription_subject_id INTEGER NOT NULL REFERENCES inscription_subject(id) ON DELETE CASCADE,
    score REAL NOT NULL,
    UNIQUE (evaluation_plan_item_id, inscription_subject_id)
);

CREATE TABLE IF NOT EXISTS council_point (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inscription_subject_id INTEGER NOT NULL REFERENCES inscription_subject(id) ON DELETE CASCADE,
    term_id INTEGER NOT NULL REFERENCES term(id),
    points REAL NOT NULL,
    UNIQUE (inscription_subject_id, term_id)
);

-- ===== closure-time entities (written only by the engine) =====

CREATE TABLE IF NOT EXISTS subject_final_grade (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inscription_subject_id INTEGER NOT NULL UNIQUE REFERENCES inscription_subject(id) ON DELETE CASCADE,
    raw_score REAL NOT NULL,
    council_points REAL NOT NULL,
    final_score REAL NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('aprobada', 'reprobada')),
    calculated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student_period_outcome (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inscription_id INTEGER NOT NULL UNIQUE REFERENCES inscription(id) ON DELETE CASCADE,
    final_average REAL NOT NULL,
    failed_subjects INTEGER NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('aprobado', 'materias_pendientes', 'reprobado')),
    promotion_grade_id INTEGER REFERENCES grade(id),
    graduated_at TEXT,
    metadata_json TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pending_subject (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inscription_id INTEGER NOT NULL REFERENCES inscription(id) ON DELETE CASCADE,
    subject_id INTEGER NOT NULL REFERENCES subject(id),
    origin_period_id INTEGER NOT NULL REFERENCES school_period(id),
    status TEXT NOT NULL DEFAULT 'pendiente'
        CHECK (status IN ('pendiente', 'aprobada', 'convalidada')),
    resolved_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (inscription_id, subject_id)
);

CREATE TABLE IF NOT EXISTS period_closure (
    closure_id TEXT PRIMARY KEY,
    period_id INTEGER NOT NULL REFERENCES school_period(id),
    status TEXT NOT NULL CHECK (status IN ('draft', 'validating', 'closed', 'failed')),
    initiated_by TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    log_json TEXT,
    snapshot_json TEXT
);
CREATE INDEX IF NOT EXISTS idx_period_closure_period ON period_closure(period_id, status);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
