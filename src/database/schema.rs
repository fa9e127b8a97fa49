/*!
 * Database schema definitions and migrations.
 *
 * This module contains the SQL schema for the translation-memory tables
 * and handles schema migrations for version upgrades.
 */

use anyhow::{Context, Result};
use rusqlite::Connection;
use log::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Per-connection settings; SQLite does not persist them in the file
pub fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .context("Failed to enable foreign keys")?;
    Ok(())
}

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    configure_connection(conn)?;

    // Check current schema version
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        // Fresh database - create all tables
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        // Need to migrate
        info!(
            "Migrating database schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    // Check if the schema_version table exists
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL lets an export page through units while an import writes
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS trans_memories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS tm_translation_units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tm_id INTEGER NOT NULL REFERENCES trans_memories(id) ON DELETE CASCADE,
            trans_unit_id TEXT NOT NULL,
            source_language TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(tm_id, trans_unit_id)
        );

        CREATE INDEX IF NOT EXISTS idx_tm_units_tm ON tm_translation_units(tm_id, id);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS tm_trans_unit_variants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tu_id INTEGER NOT NULL REFERENCES tm_translation_units(id) ON DELETE CASCADE,
            language TEXT NOT NULL,
            content TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            UNIQUE(tu_id, language)
        );

        CREATE INDEX IF NOT EXISTS idx_tm_variants_unit ON tm_trans_unit_variants(tu_id);
        CREATE INDEX IF NOT EXISTS idx_tm_variants_hash ON tm_trans_unit_variants(content_hash);
        "#,
    )?;

    info!("Database schema created successfully");
    Ok(())
}

/// Migrate the schema from an older version
///
/// v1 is the first schema, so any older version number is unknown.
fn migrate_schema(_conn: &Connection, from_version: i32) -> Result<()> {
    Err(anyhow::anyhow!(
        "Unknown schema version: {}. Cannot migrate.",
        from_version
    ))
}
