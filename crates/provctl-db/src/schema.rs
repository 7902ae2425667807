//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! Descriptors are stored whole in a flexible `spec` object next to the
//! columns the store itself queries on (`name`, `is_default`).

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "resource_tables",
        sql: RESOURCE_TABLES,
    },
    Migration {
        version: 2,
        name: "audit_events",
        sql: AUDIT_TABLES,
    },
];

// -----------------------------------------------------------------------
// v1: managed resources
// -----------------------------------------------------------------------

const RESOURCE_TABLES: &str = "\
-- =======================================================================
-- Clusters
-- =======================================================================
DEFINE TABLE cluster SCHEMAFULL;
DEFINE FIELD name ON TABLE cluster TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD spec ON TABLE cluster TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD is_default ON TABLE cluster TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE cluster TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE cluster TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_cluster_name ON TABLE cluster COLUMNS name UNIQUE;

-- =======================================================================
-- Pools
-- =======================================================================
DEFINE TABLE pool SCHEMAFULL;
DEFINE FIELD name ON TABLE pool TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD spec ON TABLE pool TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD is_default ON TABLE pool TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE pool TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE pool TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_pool_name ON TABLE pool COLUMNS name UNIQUE;
";

// -----------------------------------------------------------------------
// v2: audit events (never deleted) and per-target locks
// -----------------------------------------------------------------------

const AUDIT_TABLES: &str = "\
DEFINE TABLE audit_event SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update FULL
        FOR delete NONE;
DEFINE FIELD target_kind ON TABLE audit_event TYPE string \
    ASSERT $value IN ['cluster', 'pool'];
DEFINE FIELD target_value ON TABLE audit_event TYPE string;
DEFINE FIELD kind ON TABLE audit_event TYPE string;
DEFINE FIELD owner_type ON TABLE audit_event TYPE string \
    ASSERT $value IN ['User', 'ServiceAccount', 'System'];
DEFINE FIELD owner_name ON TABLE audit_event TYPE string;
DEFINE FIELD custom_data ON TABLE audit_event TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD allowed ON TABLE audit_event TYPE string;
DEFINE FIELD start_time ON TABLE audit_event TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD end_time ON TABLE audit_event TYPE option<datetime>;
DEFINE FIELD running ON TABLE audit_event TYPE bool DEFAULT true;
DEFINE FIELD error ON TABLE audit_event TYPE option<string>;
DEFINE INDEX idx_audit_event_target ON TABLE audit_event \
    COLUMNS target_kind, target_value;
DEFINE INDEX idx_audit_event_start ON TABLE audit_event \
    COLUMNS start_time;

-- One record per busy target, keyed `<kind>/<name>`.
DEFINE TABLE audit_lock SCHEMAFULL;
DEFINE FIELD event_id ON TABLE audit_lock TYPE string;
DEFINE FIELD acquired_at ON TABLE audit_lock TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_lock_event ON TABLE audit_lock \
    COLUMNS event_id UNIQUE;
";

/// Run all pending migrations against the given database.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
    {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        // DDL and its _migration record commit together.
        db.query(format!(
            "BEGIN TRANSACTION;\n{}\nCREATE _migration SET version = $version, name = $name;\nCOMMIT TRANSACTION;",
            migration.sql
        ))
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;
    }

    info!(
        version = MIGRATIONS.last().map(|m| m.version).unwrap_or(0),
        "Schema up to date"
    );

    Ok(())
}
