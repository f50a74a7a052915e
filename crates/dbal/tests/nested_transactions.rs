//! Integration tests driving the public connection API end to end
//!
//! A reusable unit of work wraps its logic in a transaction without
//! knowing whether its caller already opened one; these scenarios verify
//! that composition works in both nesting modes.

use vireo_dbal::testing::MemoryDriver;
use vireo_dbal::{Connection, ConnectionConfig, ConnectionError};

fn connection(driver: MemoryDriver) -> Connection {
    Connection::new(
        ConnectionConfig::new("memory://localhost/integration"),
        Box::new(driver),
    )
}

#[tokio::test]
async fn composed_units_of_work_share_one_native_transaction() {
    let driver = MemoryDriver::new();
    let log = driver.statements();
    let mut conn = connection(driver);

    // Outer unit of work
    conn.begin_transaction().await.unwrap();
    conn.execute_statement("INSERT INTO orders VALUES (1)")
        .await
        .unwrap();

    // Inner, reusable unit of work brackets itself too
    conn.begin_transaction().await.unwrap();
    conn.execute_statement("INSERT INTO order_lines VALUES (1, 1)")
        .await
        .unwrap();
    conn.commit().await.unwrap();

    conn.commit().await.unwrap();

    let statements = log.snapshot();
    assert_eq!(
        statements.first().map(String::as_str),
        Some("START TRANSACTION")
    );
    assert_eq!(statements.last().map(String::as_str), Some("COMMIT"));
    assert_eq!(
        statements.iter().filter(|s| *s == "COMMIT").count(),
        1,
        "nested commit must not reach the driver"
    );
}

#[tokio::test]
async fn savepoint_mode_recovers_from_inner_failure() {
    let driver = MemoryDriver::new();
    let failures = driver.failures();
    let mut conn = connection(driver);
    conn.set_nest_transactions_with_savepoints(true).unwrap();

    conn.begin_transaction().await.unwrap();
    conn.execute_statement("INSERT INTO orders VALUES (1)")
        .await
        .unwrap();

    conn.begin_transaction().await.unwrap();
    failures.fail_on("INSERT INTO order_lines VALUES (1, 1)");
    let err = conn
        .execute_statement("INSERT INTO order_lines VALUES (1, 1)")
        .await
        .unwrap_err();
    assert!(err.is_driver_error());
    conn.roll_back().await.unwrap();

    // The outer transaction is still healthy
    assert!(!conn.is_rollback_only());
    conn.commit().await.unwrap();
    assert_eq!(conn.transaction_nesting_level(), 0);
}

#[tokio::test]
async fn flat_mode_refuses_outer_commit_after_inner_failure() {
    let mut conn = connection(MemoryDriver::new());

    conn.begin_transaction().await.unwrap();
    conn.begin_transaction().await.unwrap();
    conn.roll_back().await.unwrap();

    let err = conn.commit().await.unwrap_err();
    assert!(matches!(err, ConnectionError::CommitFailedRollbackOnly));

    conn.roll_back().await.unwrap();
    assert_eq!(conn.transaction_nesting_level(), 0);
}

#[tokio::test]
async fn transactional_preserves_caller_error_type() {
    #[derive(Debug, PartialEq)]
    enum ImportError {
        BadRow(usize),
        Database(String),
    }

    impl From<ConnectionError> for ImportError {
        fn from(err: ConnectionError) -> Self {
            ImportError::Database(err.to_string())
        }
    }

    let mut conn = connection(MemoryDriver::new());

    let result: Result<(), ImportError> = conn
        .transactional(|conn| {
            Box::pin(async move {
                conn.execute_statement("INSERT INTO rows VALUES (1)")
                    .await?;
                Err(ImportError::BadRow(7))
            })
        })
        .await;

    assert_eq!(result.unwrap_err(), ImportError::BadRow(7));
    assert_eq!(conn.transaction_nesting_level(), 0);
}

#[tokio::test]
async fn driver_without_savepoints_still_nests_in_flat_mode() {
    let driver = MemoryDriver::without_savepoints();
    let log = driver.statements();
    let mut conn = connection(driver);

    assert!(matches!(
        conn.set_nest_transactions_with_savepoints(true),
        Err(ConnectionError::SavepointsNotSupported)
    ));

    conn.begin_transaction().await.unwrap();
    conn.begin_transaction().await.unwrap();
    conn.commit().await.unwrap();
    conn.commit().await.unwrap();

    assert_eq!(log.snapshot(), vec!["START TRANSACTION", "COMMIT"]);
}

#[tokio::test]
async fn dropped_session_is_discarded_by_reconnecting() {
    let driver = MemoryDriver::new();
    let log = driver.statements();
    let mut conn = connection(driver);

    conn.begin_transaction().await.unwrap();
    conn.execute_statement("INSERT INTO orders VALUES (1)")
        .await
        .unwrap();

    // Caller detects the dangling transaction and discards the session
    conn.reconnect().await.unwrap();
    assert!(conn.is_connected());
    assert!(!conn.is_transaction_active());

    // A fresh transaction works normally afterwards
    conn.begin_transaction().await.unwrap();
    conn.commit().await.unwrap();

    let statements = log.snapshot();
    assert!(!statements.contains(&"ROLLBACK".to_string()));
    assert_eq!(
        statements
            .iter()
            .filter(|s| *s == "START TRANSACTION")
            .count(),
        2
    );
}
