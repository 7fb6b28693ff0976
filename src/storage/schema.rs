//! Database schema definitions
//!
//! Jobs and their artifacts. Deleting a Job row cascades to its artifacts.
//! Unfinished Jobs carry a lease that their owning process keeps renewing.

/// SQL schema for the Job registry
pub const SCHEMA_SQL: &str = r#"
-- One row per submitted scan
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    target_url TEXT NOT NULL,
    request TEXT NOT NULL,
    pages_visited INTEGER NOT NULL DEFAULT 0,
    max_pages INTEGER NOT NULL,
    report TEXT,
    aggregate_score REAL,
    failure_reason TEXT,
    error_message TEXT,
    warnings TEXT NOT NULL DEFAULT '[]',
    lease_expires_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_created ON jobs(created_at);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);

-- Binary byproducts of completed scans
CREATE TABLE IF NOT EXISTS artifacts (
    job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    data BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (job_id, kind)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Registries created before leases existed
    let has_lease: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info('jobs') WHERE name = 'lease_expires_at'",
        [],
        |row| row.get(0),
    )?;
    if !has_lease {
        conn.execute_batch("ALTER TABLE jobs ADD COLUMN lease_expires_at TEXT;")?;
    }

    Ok(())
}
