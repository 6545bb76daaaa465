#![allow(dead_code)]

use std::time::Duration;

use sql_ops::prelude::*;
use tempfile::TempDir;

pub const SCHEMA: &str = "
    CREATE TABLE t (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        cnt INTEGER NOT NULL
    );
    CREATE TABLE uniq (
        name TEXT PRIMARY KEY,
        cnt INTEGER NOT NULL
    );
";

/// Pool over a fresh database file inside `dir`, with the test schema applied.
pub async fn setup(dir: &TempDir, pool_size: u32) -> Result<ConfigAndPool, SqlOpsError> {
    let path = dir.path().join("test.sqlite");
    let config = PoolConfig::sqlite(path.to_string_lossy())
        .with_pool_size(pool_size)
        .with_connection_timeout(Duration::from_millis(500));
    let pool = ConfigAndPool::new_sqlite(config).await?;
    pool.context().execute_batch(SCHEMA).await?;
    Ok(pool)
}

pub async fn count_rows(ctx: &mut ExecutionContext, table: &str) -> Result<i64, SqlOpsError> {
    let count = Select::new(&format!("select count(*) as n from {table}"));
    let row = count.call(ctx, params![]).await?;
    row.and_then(|r| r.get("n").and_then(|v| v.as_int().copied()))
        .ok_or_else(|| SqlOpsError::Other(format!("no count for {table}")))
}
