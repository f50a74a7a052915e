//! Connection Lifecycle
//!
//! A [`Connection`] owns one driver session and the transaction state that
//! goes with it. Closing the connection discards the session and zeroes
//! the transaction state; no state survives a connection boundary.
//!
//! A connection is not safe for concurrent use from independent flows:
//! every operation takes `&mut self`, and callers that share a connection
//! must hand out exclusive access (e.g. one lease at a time from a pool).

use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::config::ConnectionConfig;
use crate::backends::{Driver, DriverKind, PostgresDriver};
use crate::error::{ConnectionError, DbalResult};
use crate::transactions::{IsolationLevel, TransactionManager};

/// Connection status, independent of transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
}

/// A database connection with nested-transaction emulation
pub struct Connection {
    config: ConnectionConfig,
    driver: Box<dyn Driver>,
    status: ConnectionStatus,
    transaction: TransactionManager,
    isolation: Option<IsolationLevel>,
}

impl Connection {
    /// Create a connection over the given driver
    ///
    /// The underlying session is established lazily, on `connect()` or on
    /// the first operation that needs it.
    pub fn new(config: ConnectionConfig, driver: Box<dyn Driver>) -> Self {
        Self {
            config,
            driver,
            status: ConnectionStatus::Disconnected,
            transaction: TransactionManager::new(),
            isolation: None,
        }
    }

    /// Create a PostgreSQL connection
    pub fn postgres(config: ConnectionConfig) -> Self {
        Self::new(config, Box::new(PostgresDriver::new()))
    }

    /// The configuration this connection was created with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The driver type behind this connection
    pub fn driver_kind(&self) -> DriverKind {
        self.driver.kind()
    }

    /// Establish the underlying session
    ///
    /// Returns `true` when a new session was established, `false` when the
    /// connection was already open.
    pub async fn connect(&mut self) -> DbalResult<bool> {
        if self.status == ConnectionStatus::Connected {
            return Ok(false);
        }

        self.driver.connect(&self.config).await?;
        self.status = ConnectionStatus::Connected;
        debug!("Connection established");
        Ok(true)
    }

    /// Close the connection and discard the underlying session
    ///
    /// Any in-flight transaction is abandoned, not rolled back; the
    /// transaction state is unconditionally reset.
    pub async fn close(&mut self) {
        if self.transaction.nesting_level() > 0 {
            warn!(
                "Closing connection with {} open transaction level(s); the native transaction is abandoned",
                self.transaction.nesting_level()
            );
        }

        self.transaction.reset();
        self.driver.disconnect().await;
        self.status = ConnectionStatus::Disconnected;
        debug!("Connection closed");
    }

    /// Close and reopen the underlying session
    ///
    /// The new session starts with nesting level zero.
    pub async fn reconnect(&mut self) -> DbalResult<()> {
        self.close().await;
        self.connect().await?;
        Ok(())
    }

    /// Whether the connection is currently open
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Check that the underlying session is still alive
    pub async fn ping(&mut self) -> DbalResult<()> {
        self.ensure_connected().await?;
        self.driver.ping().await
    }

    /// Whether a transaction is currently open on a live connection
    pub fn is_transaction_active(&self) -> bool {
        self.status == ConnectionStatus::Connected && self.transaction.nesting_level() > 0
    }

    /// Execute a raw statement and return the affected row count
    pub async fn execute_statement(&mut self, sql: &str) -> DbalResult<u64> {
        self.ensure_connected().await?;
        self.driver.execute_statement(sql).await
    }

    /// Open a logical transaction, connecting first if necessary
    pub async fn begin_transaction(&mut self) -> DbalResult<()> {
        self.ensure_connected().await?;
        self.transaction.begin(&mut *self.driver).await
    }

    /// Commit the innermost logical transaction
    pub async fn commit(&mut self) -> DbalResult<()> {
        self.transaction.commit(&mut *self.driver).await
    }

    /// Roll back the innermost logical transaction
    pub async fn roll_back(&mut self) -> DbalResult<()> {
        self.transaction.roll_back(&mut *self.driver).await
    }

    /// Count of currently open logical transactions
    pub fn transaction_nesting_level(&self) -> u32 {
        self.transaction.nesting_level()
    }

    /// Whether the current transaction may only be rolled back
    pub fn is_rollback_only(&self) -> bool {
        self.transaction.is_rollback_only()
    }

    /// Mark the current transaction so that the only possible outcome is a rollback
    pub fn set_rollback_only(&mut self) -> DbalResult<()> {
        self.transaction.set_rollback_only()
    }

    /// Whether nested transactions are emulated with savepoints
    pub fn nest_transactions_with_savepoints(&self) -> bool {
        self.transaction.nest_with_savepoints()
    }

    /// Switch between savepoint emulation and flat-mode nesting
    pub fn set_nest_transactions_with_savepoints(&mut self, enable: bool) -> DbalResult<()> {
        self.transaction
            .set_nest_with_savepoints(enable, &*self.driver)
    }

    /// Create a named savepoint
    pub async fn create_savepoint(&mut self, name: &str) -> DbalResult<()> {
        if !self.driver.supports_savepoints() {
            return Err(ConnectionError::SavepointsNotSupported);
        }
        self.ensure_connected().await?;
        self.transaction
            .savepoints()
            .create(&mut *self.driver, name)
            .await
    }

    /// Release a named savepoint
    pub async fn release_savepoint(&mut self, name: &str) -> DbalResult<()> {
        if !self.driver.supports_savepoints() {
            return Err(ConnectionError::SavepointsNotSupported);
        }
        self.ensure_connected().await?;
        self.transaction
            .savepoints()
            .release(&mut *self.driver, name)
            .await
    }

    /// Roll back to a named savepoint
    pub async fn rollback_savepoint(&mut self, name: &str) -> DbalResult<()> {
        if !self.driver.supports_savepoints() {
            return Err(ConnectionError::SavepointsNotSupported);
        }
        self.ensure_connected().await?;
        self.transaction
            .savepoints()
            .rollback_to(&mut *self.driver, name)
            .await
    }

    /// Set the session default transaction isolation level
    ///
    /// Refused while a transaction is open.
    pub async fn set_transaction_isolation(&mut self, level: IsolationLevel) -> DbalResult<()> {
        if self.transaction.nesting_level() > 0 {
            return Err(ConnectionError::TransactionActive);
        }

        self.ensure_connected().await?;
        let sql = format!(
            "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL {}",
            level.as_sql()
        );
        self.driver.execute_statement(&sql).await?;
        self.isolation = Some(level);
        Ok(())
    }

    /// The session isolation level, if one was set through this connection
    pub fn transaction_isolation(&self) -> Option<IsolationLevel> {
        self.isolation
    }

    /// Execute a unit of work inside a transaction bracket
    ///
    /// Begins a transaction, runs the unit, commits on the normal path and
    /// rolls back on every abnormal one, re-raising the unit's failure
    /// with its identity untouched. The nesting level after the call
    /// always equals the level before it.
    pub async fn transactional<F, R, E>(&mut self, unit: F) -> Result<R, E>
    where
        for<'c> F: FnOnce(&'c mut Connection) -> BoxFuture<'c, Result<R, E>> + Send,
        R: Send,
        E: From<ConnectionError> + Send,
    {
        self.begin_transaction().await.map_err(E::from)?;

        match unit(&mut *self).await {
            Ok(value) => {
                if let Err(commit_err) = self.commit().await {
                    if let Err(rollback_err) = self.roll_back().await {
                        warn!(
                            "Rollback after failed commit also failed: {}",
                            rollback_err
                        );
                    }
                    return Err(E::from(commit_err));
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.roll_back().await {
                    warn!(
                        "Rollback after failed unit of work also failed: {}",
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn ensure_connected(&mut self) -> DbalResult<()> {
        if self.status != ConnectionStatus::Connected {
            self.connect().await?;
        }
        Ok(())
    }
}
