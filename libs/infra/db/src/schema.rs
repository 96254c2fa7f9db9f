//! Idempotent schema bootstrap: `map_state` and `players`, applied with
//! `CREATE TABLE IF NOT EXISTS` so repeated startups on the same
//! database file are no-ops.

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument};

const TABLES: &[(&str, &str)] = &[
    (
        "map_state",
        r#"
        CREATE TABLE IF NOT EXISTS map_state (
            x INTEGER NOT NULL,
            y INTEGER NOT NULL,
            revealed INTEGER NOT NULL DEFAULT 0,
            is_mine INTEGER NOT NULL DEFAULT 0,
            adjacent_mines INTEGER,
            flag_state INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (x, y)
        );
    "#,
    ),
    (
        "players",
        r#"
        CREATE TABLE IF NOT EXISTS players (
            player_id TEXT PRIMARY KEY,
            score INTEGER NOT NULL DEFAULT 0,
            last_seen DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#,
    ),
];

const INDEXES: &[(&str, &str)] = &[(
    "idx_map_state_region",
    "CREATE INDEX IF NOT EXISTS idx_map_state_region ON map_state(x, y);",
)];

/// Applies the full schema. Safe to call on every process start.
#[instrument(skip(connection))]
pub async fn apply_schema(connection: &Connection) -> Result<()> {
    info!("applying schema");
    for (name, sql) in TABLES {
        debug!(table = *name, "creating table if absent");
        connection
            .execute(sql, ())
            .await
            .with_context(|| format!("failed to create table {name}"))?;
    }
    for (name, sql) in INDEXES {
        debug!(index = *name, "creating index if absent");
        connection
            .execute(sql, ())
            .await
            .with_context(|| format!("failed to create index {name}"))?;
    }
    Ok(())
}
