//! Database migrations for claims
//!
//! Each migration is applied atomically and tracked in the
//! `claim_schema_version` table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::info;

use super::StorageResult;
use crate::core_region::types::Timestamp;

/// Current schema version for claims
pub const CURRENT_CLAIM_SCHEMA_VERSION: i32 = 2;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial claims schema",
            up_sql: r#"
            CREATE TABLE IF NOT EXISTS claim_schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );

            -- One row per claim
            CREATE TABLE IF NOT EXISTS regions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid VARCHAR(36) NOT NULL UNIQUE,
                name VARCHAR(36) NOT NULL UNIQUE,
                owner VARCHAR(36) NOT NULL,
                created INTEGER NOT NULL            -- unix millis
            );

            CREATE INDEX IF NOT EXISTS idx_regions_owner ON regions(owner);

            -- Claim block position and reach
            CREATE TABLE IF NOT EXISTS claim_anchors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid VARCHAR(36) NOT NULL UNIQUE,
                radius TINYINT NOT NULL,
                x INT NOT NULL,
                y INT NOT NULL,
                z INT NOT NULL,
                world VARCHAR(36) NOT NULL,
                FOREIGN KEY (uuid) REFERENCES regions(uuid) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_claim_anchors_position ON claim_anchors(world, x, y, z);

            -- Officers, members and pending invitations
            CREATE TABLE IF NOT EXISTS region_staff (
                uuid VARCHAR(36) NOT NULL,
                player VARCHAR(36) NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('Officer', 'Member', 'Invited')),
                PRIMARY KEY (uuid, player),
                FOREIGN KEY (uuid) REFERENCES regions(uuid) ON DELETE CASCADE
            );
        "#,
        },
        Migration {
            version: 2,
            description: "Invitation issue times",
            up_sql: r#"
            -- unix millis; only set for 'Invited' rows
            ALTER TABLE region_staff ADD COLUMN issued INTEGER;

            -- Invitations from before this column start their lifetime now
            UPDATE region_staff
            SET issued = CAST(strftime('%s', 'now') AS INTEGER) * 1000
            WHERE role = 'Invited';
        "#,
        },
    ]
}

/// Get current schema version from database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> StorageResult<i32> {
    let conn = pool.get()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS claim_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM claim_schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> StorageResult<()> {
    let current_version = get_current_version(pool)?;
    let pending: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let conn = pool.get()?;

    for migration in pending {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO claim_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, Timestamp::now().as_millis() as i64],
        )?;

        tx.commit()?;

        info!(
            version = migration.version,
            "Applied migration: {}", migration.description
        );
    }

    Ok(())
}
