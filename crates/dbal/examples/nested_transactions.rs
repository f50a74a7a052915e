//! Nested Transaction Usage Examples
//!
//! This example demonstrates nested-transaction emulation in both nesting
//! modes, using the in-memory driver so it runs without a database server.
//! With a real server you would construct the connection with
//! `Connection::postgres(config)` instead.

use vireo_dbal::testing::MemoryDriver;
use vireo_dbal::{Connection, ConnectionConfig, ConnectionError};

#[tokio::main]
async fn main() -> Result<(), ConnectionError> {
    flat_mode().await?;
    savepoint_mode().await?;
    unit_of_work().await?;
    Ok(())
}

/// Flat mode: nested levels are absorbed into one native transaction,
/// and an inner rollback taints the whole transaction.
async fn flat_mode() -> Result<(), ConnectionError> {
    let driver = MemoryDriver::new();
    let log = driver.statements();
    let mut conn = Connection::new(
        ConnectionConfig::new("memory://localhost/example"),
        Box::new(driver),
    );

    conn.begin_transaction().await?;
    conn.begin_transaction().await?;
    conn.roll_back().await?;

    // The outer level is now rollback-only; commit is refused
    assert!(conn.commit().await.is_err());
    conn.roll_back().await?;

    println!("flat mode statements: {:?}", log.snapshot());
    Ok(())
}

/// Savepoint mode: each nested level gets its own savepoint, so an inner
/// rollback leaves the outer transaction healthy.
async fn savepoint_mode() -> Result<(), ConnectionError> {
    let driver = MemoryDriver::new();
    let log = driver.statements();
    let mut conn = Connection::new(
        ConnectionConfig::new("memory://localhost/example"),
        Box::new(driver),
    );
    conn.set_nest_transactions_with_savepoints(true)?;

    conn.begin_transaction().await?;
    conn.begin_transaction().await?;
    conn.roll_back().await?;
    conn.commit().await?;

    println!("savepoint mode statements: {:?}", log.snapshot());
    Ok(())
}

/// The `transactional` runner brackets a unit of work with
/// begin/commit-or-rollback and never leaks a nesting level.
async fn unit_of_work() -> Result<(), ConnectionError> {
    let mut conn = Connection::new(
        ConnectionConfig::new("memory://localhost/example"),
        Box::new(MemoryDriver::new()),
    );

    let inserted = conn
        .transactional(|conn| {
            Box::pin(async move {
                conn.execute_statement("INSERT INTO accounts VALUES (1)")
                    .await?;
                conn.execute_statement("INSERT INTO accounts VALUES (2)")
                    .await?;
                Ok::<_, ConnectionError>(2)
            })
        })
        .await?;

    println!("inserted {} rows inside one transaction", inserted);
    Ok(())
}
