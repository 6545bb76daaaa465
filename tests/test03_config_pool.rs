use std::io::Write;
use std::time::Duration;

use serde_json::json;
use sql_ops::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn pool_from_toml_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("from_toml.sqlite");
    let config_path = dir.path().join("pool.toml");
    let mut file = std::fs::File::create(&config_path)?;
    writeln!(
        file,
        r#"
pool_name = "mypool"
pool_size = 2
host = "localhost"
port = 3306
db = "{}"
user = "app"
password = "secret"
charset = "utf8mb4"
"#,
        db_path.display()
    )?;

    let config = PoolConfig::from_toml_file(&config_path)?;
    assert_eq!(config.pool_size, 2);
    let pool = ConfigAndPool::new_sqlite(config).await?;
    assert_eq!(pool.config.pool_name.as_deref(), Some("mypool"));

    let mut ctx = pool.context();
    ctx.execute_batch("create table kv (k text primary key, v text)").await?;
    let put = Insert::new("insert into kv (k, v) values (:k, :v)");
    put.call(&mut ctx, named_params! { "k" => "a", "v" => "1" }).await?;
    assert!(db_path.exists());
    Ok(())
}

#[tokio::test]
async fn pool_from_json_mapping_without_journal_pragma() -> TestResult {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("from_json.sqlite");
    let config = PoolConfig::from_json_value(json!({
        "database": db_path.to_string_lossy(),
        "pool_size": 1,
        "journal_mode": null,
    }))?;
    assert_eq!(config.journal_mode, None);

    let pool = ConfigAndPool::new_sqlite(config).await?;
    let mut ctx = pool.context();
    let mode = Select::new("pragma journal_mode").with_row_shape(RowShape::Tuple);
    let row = mode.call(&mut ctx, params![]).await?.ok_or("no pragma row")?;
    assert_eq!(row.get_by_index(0), Some(&RowValues::Text("delete".into())));
    Ok(())
}

#[tokio::test]
async fn wal_is_the_default_journal_mode() -> TestResult {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("wal.sqlite");
    let pool = ConfigAndPool::new_sqlite(PoolConfig::sqlite(db_path.to_string_lossy())).await?;
    let mut ctx = pool.context();
    let mode = Select::new("pragma journal_mode").with_row_shape(RowShape::Tuple);
    let row = mode.call(&mut ctx, params![]).await?.ok_or("no pragma row")?;
    assert_eq!(row.get_by_index(0), Some(&RowValues::Text("wal".into())));
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_rejected_before_connecting() {
    let err = ConfigAndPool::new_sqlite(PoolConfig::default()).await.unwrap_err();
    assert!(matches!(err, SqlOpsError::ConfigError(_)));

    let err = ConfigAndPool::new_sqlite(PoolConfig::sqlite("x.sqlite").with_pool_size(0))
        .await
        .unwrap_err();
    assert!(matches!(err, SqlOpsError::ConfigError(_)));
}

#[tokio::test]
async fn unopenable_database_is_a_connection_failure() -> TestResult {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("no_such_dir").join("db.sqlite");
    let config = PoolConfig::sqlite(missing.to_string_lossy())
        .with_connection_timeout(Duration::from_millis(200));
    let err = ConfigAndPool::new_sqlite(config).await.unwrap_err();
    assert!(err.is_execution_failure(), "unexpected error: {err}");
    Ok(())
}

#[test]
fn missing_config_file_is_config_error() {
    let err = PoolConfig::from_toml_file("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, SqlOpsError::ConfigError(_)));
}
