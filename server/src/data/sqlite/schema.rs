//! SQLite schema definitions
//!
//! Column types follow the record field tables: text and dates are TEXT
//! (dates as `YYYY-MM-DD`), numbers NUMERIC, booleans INTEGER 0/1.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- 1. Coach master (current state, one row per coach)
-- =============================================================================
CREATE TABLE IF NOT EXISTS coach_master (
    coachno TEXT PRIMARY KEY CHECK(length(coachno) >= 1),
    coach_type TEXT,
    coach_code TEXT,
    owning_rly TEXT,
    base_depot TEXT,
    built_year NUMERIC,
    manufacturer TEXT,
    pohby TEXT,
    poh_date TEXT,
    ioh_date TEXT,
    return_date TEXT,
    next_poh_due TEXT,
    in_yard INTEGER CHECK(in_yard IS NULL OR in_yard IN (0, 1)),
    yard_in_date TEXT,
    yard_out_date TEXT,
    battery_status TEXT,
    battery_date TEXT,
    upholstery_status TEXT,
    upholstery_date TEXT,
    brake_test_date TEXT,
    fire_extinguisher_fitment_date TEXT,
    codal_life NUMERIC,
    air_conditioned INTEGER CHECK(air_conditioned IS NULL OR air_conditioned IN (0, 1)),
    remarks TEXT
);

CREATE INDEX IF NOT EXISTS idx_coach_master_pohby ON coach_master(pohby);
CREATE INDEX IF NOT EXISTS idx_coach_master_base_depot ON coach_master(base_depot);

-- =============================================================================
-- 2. Coach history (one row per recorded overhaul)
-- =============================================================================
CREATE TABLE IF NOT EXISTS coach_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    coachno TEXT NOT NULL CHECK(length(coachno) >= 1),
    coach_type TEXT,
    owning_rly TEXT,
    pohby TEXT,
    poh_date TEXT,
    ioh_date TEXT,
    return_date TEXT,
    work_done TEXT,
    recorded_at TEXT,
    remarks TEXT
);

CREATE INDEX IF NOT EXISTS idx_coach_history_coachno ON coach_history(coachno);

-- =============================================================================
-- 3. Audit logs
-- =============================================================================
CREATE TABLE IF NOT EXISTS audit_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor TEXT NOT NULL,
    action TEXT NOT NULL,
    entity_name TEXT NOT NULL,
    entity_id TEXT,
    description TEXT,
    old_values TEXT,
    new_values TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_logs_created ON audit_logs(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_audit_logs_entity ON audit_logs(entity_name, created_at DESC);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteService;
    use crate::data::types::{FieldKind, RecordKind};
    use sqlx::SqlitePool;

    async fn setup_test_pool() -> SqlitePool {
        SqliteService::in_memory().await.unwrap().pool().clone()
    }

    #[tokio::test]
    async fn test_schema_matches_field_tables() {
        let pool = setup_test_pool().await;

        for kind in [RecordKind::Master, RecordKind::History] {
            let sql = format!(
                "SELECT name, type FROM pragma_table_info('{}')",
                kind.table()
            );
            let columns: Vec<(String, String)> =
                sqlx::query_as(&sql).fetch_all(&pool).await.unwrap();

            let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, kind.filterable_columns(), "{} columns", kind);

            for ((name, sql_type), spec) in columns.iter().zip(kind.fields()) {
                let expected = match spec.kind {
                    FieldKind::Text | FieldKind::Date => "TEXT",
                    FieldKind::Number if name == "id" => "INTEGER",
                    FieldKind::Number => "NUMERIC",
                    FieldKind::Boolean => "INTEGER",
                };
                assert_eq!(sql_type, expected, "{}.{}", kind.table(), name);
            }
        }
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = setup_test_pool().await;
        sqlx::query(SCHEMA).execute(&pool).await.unwrap();
    }
}
