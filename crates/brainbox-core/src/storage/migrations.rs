//! Database migrations
//!
//! Schema migrations for the neuron/synapse store. Versioned and idempotent:
//! each step is `CREATE TABLE IF NOT EXISTS` / `CREATE INDEX IF NOT EXISTS`,
//! applied in order inside a single `execute_batch` call, and recorded in
//! `schema_version` so a later open never re-applies an already-present step.

/// One schema migration: a version number, a human description, and the
/// batch of DDL statements that bring the schema from `version - 1` to `version`.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

/// All migrations in ascending version order.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: neurons, synapses, access_log, sessions",
    up: MIGRATION_V1_UP,
}];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS neurons (
    id              TEXT PRIMARY KEY,
    neuron_type     TEXT NOT NULL,
    path            TEXT NOT NULL,
    activation      REAL NOT NULL DEFAULT 1.0,
    myelination     REAL NOT NULL DEFAULT 0.0,
    access_count    INTEGER NOT NULL DEFAULT 0,
    last_accessed   TEXT,
    created_at      TEXT NOT NULL,
    contexts        TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS idx_neurons_type ON neurons(neuron_type);
CREATE INDEX IF NOT EXISTS idx_neurons_myelination ON neurons(myelination);
CREATE INDEX IF NOT EXISTS idx_neurons_activation ON neurons(activation);

CREATE TABLE IF NOT EXISTS synapses (
    source_id       TEXT NOT NULL,
    target_id       TEXT NOT NULL,
    weight          REAL NOT NULL DEFAULT 0.0,
    co_access_count INTEGER NOT NULL DEFAULT 0,
    last_fired      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    PRIMARY KEY (source_id, target_id),
    FOREIGN KEY (source_id) REFERENCES neurons(id) ON DELETE CASCADE,
    FOREIGN KEY (target_id) REFERENCES neurons(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_synapses_source ON synapses(source_id);
CREATE INDEX IF NOT EXISTS idx_synapses_weight ON synapses(weight);

CREATE TABLE IF NOT EXISTS access_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    neuron_id       TEXT NOT NULL,
    session_id      TEXT NOT NULL,
    query           TEXT,
    timestamp       TEXT NOT NULL,
    token_cost      INTEGER NOT NULL,
    access_order    INTEGER NOT NULL,
    FOREIGN KEY (neuron_id) REFERENCES neurons(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_access_log_neuron ON access_log(neuron_id);
CREATE INDEX IF NOT EXISTS idx_access_log_timestamp ON access_log(timestamp);

CREATE TABLE IF NOT EXISTS sessions (
    id              TEXT PRIMARY KEY,
    started_at      TEXT NOT NULL,
    ended_at        TEXT,
    total_accesses  INTEGER NOT NULL DEFAULT 0,
    tokens_used     INTEGER NOT NULL DEFAULT 0,
    tokens_saved    INTEGER NOT NULL DEFAULT 0,
    hit_rate        REAL NOT NULL DEFAULT 0.0
);

CREATE TABLE IF NOT EXISTS schema_version (
    version         INTEGER PRIMARY KEY,
    applied_at      TEXT NOT NULL
);
"#;

/// Read the highest applied migration version, or 0 if none has been applied yet.
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .or(Ok(0))
}

/// Apply every migration newer than the current schema version, recording
/// each in `schema_version`. Returns the number of migrations applied.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    // schema_version itself must exist before get_current_version can query it.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL);",
    )?;

    let current_version = get_current_version(conn)?;
    let mut applied = 0;
    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!("Applying migration v{}: {}", migration.version, migration.description);
            conn.execute_batch(migration.up)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![migration.version, chrono::Utc::now().to_rfc3339()],
            )?;
            applied += 1;
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_apply_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let first = apply_migrations(&conn).unwrap();
        assert_eq!(first, MIGRATIONS.len() as u32);

        let second = apply_migrations(&conn).unwrap();
        assert_eq!(second, 0);

        assert_eq!(get_current_version(&conn).unwrap(), MIGRATIONS.last().unwrap().version);
    }

    #[test]
    fn test_schema_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        for table in ["neurons", "synapses", "access_log", "sessions", "schema_version"] {
            let exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
                    rusqlite::params![table],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            assert!(exists, "missing table {table}");
        }
    }
}
