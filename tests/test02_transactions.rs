mod common;

use std::time::Duration;

use sql_ops::prelude::*;

use common::{count_rows, setup};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn insert_t() -> Insert {
    Insert::new("insert into t (name, cnt) values (?, ?)")
}

#[tokio::test]
async fn nested_scopes_commit_once_at_the_owner() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 3).await?;
    let mut ctx = pool.context();
    let mut observer = pool.context();
    let insert = insert_t();

    let outer = ctx.begin().await?;
    assert!(outer.is_owner());
    insert.call(&mut ctx, params!["outer", 1]).await?;

    let inner = ctx.begin().await?;
    assert!(!inner.is_owner());
    assert_eq!(inner.transaction_id(), outer.transaction_id());
    assert_eq!(ctx.depth(), 2);
    insert.call(&mut ctx, params!["inner", 2]).await?;
    ctx.commit(inner).await?;

    // inner commit is bookkeeping only
    assert_eq!(ctx.depth(), 1);
    assert_eq!(count_rows(&mut observer, "t").await?, 0);

    ctx.commit(outer).await?;
    assert!(!ctx.in_transaction());
    assert_eq!(count_rows(&mut observer, "t").await?, 2);
    Ok(())
}

#[tokio::test]
async fn inner_failure_rolls_back_outer_writes() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 2).await?;
    let mut ctx = pool.context();
    let insert = insert_t();

    let result: Result<(), SqlOpsError> = ctx
        .transaction(async |ctx: &mut ExecutionContext| {
            insert.call(ctx, params!["outer", 1]).await?;
            ctx.transaction(async |ctx: &mut ExecutionContext| {
                insert.call(ctx, params!["inner", 2]).await?;
                Err::<(), _>(SqlOpsError::Other("inner failed".into()))
            })
            .await
        })
        .await;

    assert!(matches!(result, Err(SqlOpsError::Other(ref m)) if m == "inner failed"));
    assert!(!ctx.in_transaction());
    assert_eq!(count_rows(&mut ctx, "t").await?, 0);
    Ok(())
}

#[tokio::test]
async fn swallowed_inner_failure_still_aborts_owner() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 2).await?;
    let mut ctx = pool.context();
    let insert = insert_t();

    let result: Result<(), SqlOpsError> = ctx
        .transaction(async |ctx: &mut ExecutionContext| {
            insert.call(ctx, params!["outer", 1]).await?;
            let inner: Result<(), SqlOpsError> = ctx
                .transaction(async |ctx: &mut ExecutionContext| {
                    insert.call(ctx, params!["inner", 2]).await?;
                    Err(SqlOpsError::Other("inner failed".into()))
                })
                .await;
            assert!(inner.is_err());
            let info = ctx.current_transaction().ok_or(SqlOpsError::Other("no tx".into()))?;
            assert!(info.rollback_only);
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(SqlOpsError::TransactionAborted(_))));
    assert_eq!(count_rows(&mut ctx, "t").await?, 0);
    Ok(())
}

#[tokio::test]
async fn batch_insert_is_all_or_nothing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 2).await?;
    let mut ctx = pool.context();

    let batch = BatchInsert::declare(
        "insert into uniq (name, cnt) values (?, ?)",
        |rows: Vec<(&'static str, i64)>| {
            rows.into_iter()
                .map(|(name, cnt)| params![name, cnt])
                .collect()
        },
    );

    let err = batch
        .call(&mut ctx, vec![("a", 1), ("b", 2), ("a", 3), ("c", 4)])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlOpsError::ExecutionError(_)));
    assert!(!ctx.in_transaction());
    assert_eq!(count_rows(&mut ctx, "uniq").await?, 0);

    assert_eq!(batch.call(&mut ctx, vec![("a", 1), ("b", 2)]).await?, 2);
    assert_eq!(batch.call(&mut ctx, Vec::new()).await?, 0);
    assert_eq!(count_rows(&mut ctx, "uniq").await?, 2);
    Ok(())
}

#[tokio::test]
async fn batch_insert_joins_the_callers_transaction() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 2).await?;
    let mut ctx = pool.context();
    let batch = BatchInsert::new("insert into t (name, cnt) values (:name, :cnt)");

    let scope = ctx.begin().await?;
    let inserted = batch
        .call(
            &mut ctx,
            vec![
                named_params! { "name" => "a", "cnt" => 1 },
                named_params! { "name" => "b", "cnt" => 2 },
            ],
        )
        .await?;
    assert_eq!(inserted, 2);
    assert_eq!(ctx.depth(), 1);
    assert_eq!(count_rows(&mut ctx, "t").await?, 2);

    ctx.rollback(scope).await?;
    assert_eq!(count_rows(&mut ctx, "t").await?, 0);
    Ok(())
}

#[tokio::test]
async fn uncommitted_rows_are_invisible_to_other_contexts() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 3).await?;
    let mut writer = pool.context();
    let mut reader = pool.context();
    let insert = insert_t();

    let scope = writer.begin().await?;
    insert.call(&mut writer, params!["pending", 1]).await?;
    assert_eq!(count_rows(&mut writer, "t").await?, 1);
    assert_eq!(count_rows(&mut reader, "t").await?, 0);
    assert!(!reader.in_transaction());

    writer.commit(scope).await?;
    assert_eq!(count_rows(&mut reader, "t").await?, 1);
    Ok(())
}

#[tokio::test]
async fn dropping_a_context_rolls_back_and_frees_the_connection() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 1).await?;
    let insert = insert_t();

    {
        let mut ctx = pool.context();
        let _scope = ctx.begin().await?;
        insert.call(&mut ctx, params!["abandoned", 1]).await?;
    }

    // the single pooled connection must come back usable and outside any transaction
    let mut ctx = pool.context();
    assert_eq!(count_rows(&mut ctx, "t").await?, 0);
    ctx.transaction(async |ctx: &mut ExecutionContext| {
        insert.call(ctx, params!["kept", 2]).await
    })
    .await?;
    assert_eq!(count_rows(&mut ctx, "t").await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_context_rolls_back_on_a_multi_thread_runtime() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 1).await?;
    let insert = insert_t();

    let mut ctx = pool.context();
    let scope = ctx.begin().await?;
    insert.call(&mut ctx, params!["abandoned", 1]).await?;
    drop(scope);
    drop(ctx);

    let mut ctx = pool.context();
    assert_eq!(count_rows(&mut ctx, "t").await?, 0);
    insert.call(&mut ctx, params!["kept", 2]).await?;
    assert_eq!(count_rows(&mut ctx, "t").await?, 1);
    Ok(())
}

#[tokio::test]
async fn scopes_are_checked_against_the_open_transaction() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 2).await?;
    let mut owner = pool.context();
    let mut idle = pool.context();

    let scope = owner.begin().await?;
    insert_t().call(&mut owner, params!["lost", 1]).await?;
    let err = idle.commit(scope).await.unwrap_err();
    assert!(matches!(err, SqlOpsError::TransactionState(_)));
    assert!(!idle.in_transaction());

    // the rejected owner token is gone, so its transaction is abandoned
    assert!(!owner.in_transaction());
    assert_eq!(count_rows(&mut owner, "t").await?, 0);
    let fresh = owner.begin().await?;
    assert!(fresh.is_owner());
    owner.rollback(fresh).await?;
    Ok(())
}

#[tokio::test]
async fn cancelled_transaction_is_rolled_back_before_reuse() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 2).await?;
    let mut ctx = pool.context();
    let mut observer = pool.context();
    let insert = insert_t();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(200),
        ctx.transaction(async |ctx: &mut ExecutionContext| {
            insert.call(ctx, params!["cancelled", 1]).await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, SqlOpsError>(())
        }),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(!ctx.in_transaction());
    assert_eq!(ctx.depth(), 0);

    // the next operation runs outside the abandoned transaction and commits on its own
    insert.call(&mut ctx, params!["standalone", 2]).await?;
    assert!(!ctx.in_transaction());
    assert_eq!(count_rows(&mut observer, "t").await?, 1);

    let scope = ctx.begin().await?;
    assert!(scope.is_owner());
    ctx.rollback(scope).await?;
    Ok(())
}

#[tokio::test]
async fn dropped_nested_scope_aborts_the_owner() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 2).await?;
    let mut ctx = pool.context();

    let outer = ctx.begin().await?;
    insert_t().call(&mut ctx, params!["outer", 1]).await?;
    let inner = ctx.begin().await?;
    assert_eq!(ctx.depth(), 2);
    drop(inner);

    let info = ctx.current_transaction().ok_or(SqlOpsError::Other("no tx".into()))?;
    assert_eq!(info.depth, 1);
    assert!(info.rollback_only);

    let err = ctx.commit(outer).await.unwrap_err();
    assert!(matches!(err, SqlOpsError::TransactionAborted(_)));
    assert!(!ctx.in_transaction());
    assert_eq!(count_rows(&mut ctx, "t").await?, 0);
    Ok(())
}

#[tokio::test]
async fn commit_with_open_nested_scope_aborts() -> TestResult {
    let dir = tempfile::tempdir()?;
    let pool = setup(&dir, 2).await?;
    let mut ctx = pool.context();
    insert_t().call(&mut ctx, params!["committed", 1]).await?;

    let outer = ctx.begin().await?;
    let _inner = ctx.begin().await?;
    insert_t().call(&mut ctx, params!["pending", 2]).await?;
    let err = ctx.commit(outer).await.unwrap_err();
    assert!(matches!(err, SqlOpsError::TransactionAborted(_)));
    assert!(!ctx.in_transaction());
    assert_eq!(count_rows(&mut ctx, "t").await?, 1);
    Ok(())
}

#[tokio::test]
async fn pool_exhaustion_is_a_connection_timeout() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("timeout.sqlite");
    let config = PoolConfig::sqlite(path.to_string_lossy())
        .with_pool_size(1)
        .with_connection_timeout(Duration::from_millis(100));
    let pool = ConfigAndPool::new_sqlite(config).await?;

    let mut holder = pool.context();
    let scope = holder.begin().await?;

    let mut waiter = pool.context();
    let err = waiter.execute_batch("select 1").await.unwrap_err();
    assert!(matches!(err, SqlOpsError::ConnectionTimeoutError(_)));
    assert!(err.is_execution_failure());

    holder.rollback(scope).await?;
    waiter.execute_batch("select 1").await?;
    Ok(())
}
