//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use vidgate_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE users (
            id BLOB PRIMARY KEY,              -- 12 bytes
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL,               -- 'user' | 'admin'
            status TEXT NOT NULL,             -- 'active' | 'disabled'
            created_at INTEGER NOT NULL
        );

        CREATE TABLE domains (
            id BLOB PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE topics (
            id BLOB PRIMARY KEY,
            name TEXT NOT NULL,
            domain BLOB NOT NULL,
            description TEXT,
            created_at INTEGER NOT NULL,

            UNIQUE(name, domain)
        );

        -- domain, topic, year, month, day are the access-relevant columns
        CREATE TABLE videos (
            id BLOB PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            domain BLOB NOT NULL,
            topic BLOB NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            day INTEGER NOT NULL,
            storage_ref TEXT NOT NULL,        -- http(s) URL or uploads-relative path
            mime_type TEXT,
            size INTEGER,
            created_at INTEGER NOT NULL
        );

        -- NULL scope columns are wildcards
        CREATE TABLE access_rules (
            id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            domain BLOB,
            topic BLOB,
            year INTEGER,
            month INTEGER,
            day INTEGER,
            expires_at INTEGER NOT NULL,      -- Unix ms, active while expires_at > now
            is_permanent INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE audit_log (
            id BLOB PRIMARY KEY,
            action TEXT NOT NULL,
            user_id BLOB NOT NULL,
            detail BLOB NOT NULL,             -- CBOR-encoded AuditDetail
            ip TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );

        CREATE INDEX idx_rules_user_expiry ON access_rules(user_id, expires_at);
        CREATE INDEX idx_videos_domain_topic ON videos(domain, topic);
        CREATE INDEX idx_videos_date ON videos(year, month, day);
        CREATE INDEX idx_videos_created ON videos(created_at);
        CREATE INDEX idx_audit_timestamp ON audit_log(timestamp);
        "#,
    )?;

    Ok(())
}
