//! Transaction Nesting State Machine
//!
//! The underlying database session understands a single flat transaction.
//! This manager lets `begin`/`commit`/`roll_back` be called at arbitrary
//! nesting depth and decides, per call, whether to drive the native
//! transaction, a savepoint, or nothing at all.
//!
//! In flat mode a nested rollback cannot partially undo work belonging to
//! the outer level, so it marks the whole transaction rollback-only; the
//! outermost commit is then refused until the caller rolls back. Without
//! that flag an inner logical rollback would silently leave the outer
//! transaction committing work the caller believed was undone.

use tracing::debug;

use super::savepoints::SavepointManager;
use crate::backends::Driver;
use crate::error::{ConnectionError, DbalResult};

const BEGIN_SQL: &str = "START TRANSACTION";
const COMMIT_SQL: &str = "COMMIT";
const ROLLBACK_SQL: &str = "ROLLBACK";

/// Transaction manager owning the nesting state of one connection
///
/// Driver I/O is always issued before any counter moves, so a failed
/// statement leaves the nesting state exactly as it was.
#[derive(Debug, Default)]
pub struct TransactionManager {
    nesting_level: u32,
    rollback_only: bool,
    savepoint_mode: bool,
    savepoints: SavepointManager,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            nesting_level: 0,
            rollback_only: false,
            savepoint_mode: false,
            savepoints: SavepointManager::new(),
        }
    }

    /// Count of currently open logical transactions
    pub fn nesting_level(&self) -> u32 {
        self.nesting_level
    }

    /// Whether the current transaction may only be rolled back
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    /// Whether nested transactions are emulated with savepoints
    pub fn nest_with_savepoints(&self) -> bool {
        self.savepoint_mode
    }

    /// Name of the innermost active savepoint, if any
    pub fn last_savepoint_name(&self) -> Option<&str> {
        self.savepoints.last_savepoint_name()
    }

    /// Savepoint manager backing this transaction state
    pub fn savepoints(&self) -> &SavepointManager {
        &self.savepoints
    }

    /// Mark the current transaction so that the only possible outcome is a rollback
    ///
    /// Idempotent while a transaction is open.
    pub fn set_rollback_only(&mut self) -> DbalResult<()> {
        if self.nesting_level == 0 {
            return Err(ConnectionError::NoActiveTransaction);
        }
        self.rollback_only = true;
        Ok(())
    }

    /// Switch between savepoint emulation and flat-mode nesting
    ///
    /// The mode cannot change while a transaction is open, and savepoint
    /// emulation requires the driver capability.
    pub fn set_nest_with_savepoints(&mut self, enable: bool, driver: &dyn Driver) -> DbalResult<()> {
        if self.nesting_level > 0 {
            return Err(ConnectionError::TransactionActive);
        }
        if enable && !driver.supports_savepoints() {
            return Err(ConnectionError::SavepointsNotSupported);
        }
        self.savepoint_mode = enable;
        Ok(())
    }

    /// Open a logical transaction
    ///
    /// Starts the native transaction at the first level; deeper levels
    /// create a savepoint in savepoint mode and are absorbed into the
    /// outer transaction in flat mode.
    pub async fn begin(&mut self, driver: &mut dyn Driver) -> DbalResult<()> {
        if self.nesting_level == 0 {
            debug!("Beginning native transaction");
            driver.execute_statement(BEGIN_SQL).await?;
        } else if self.savepoint_mode {
            self.savepoints
                .push_for_depth(driver, self.nesting_level + 1)
                .await?;
        }

        self.nesting_level += 1;
        debug!("Transaction nesting level is now {}", self.nesting_level);
        Ok(())
    }

    /// Commit the innermost logical transaction
    pub async fn commit(&mut self, driver: &mut dyn Driver) -> DbalResult<()> {
        match self.nesting_level {
            0 => Err(ConnectionError::NoActiveTransaction),
            1 => {
                if self.rollback_only {
                    return Err(ConnectionError::CommitFailedRollbackOnly);
                }

                debug!("Committing native transaction");
                driver.execute_statement(COMMIT_SQL).await?;
                self.nesting_level = 0;
                self.rollback_only = false;
                Ok(())
            }
            _ => {
                if self.savepoint_mode {
                    self.savepoints.release_top(driver).await?;
                }
                self.nesting_level -= 1;
                debug!("Transaction nesting level is now {}", self.nesting_level);
                Ok(())
            }
        }
    }

    /// Roll back the innermost logical transaction
    ///
    /// At a nested level: savepoint mode restores the savepoint and clears
    /// the rollback-only flag, because the nested work is fully undone.
    /// Flat mode performs no I/O and taints the outer transaction instead.
    pub async fn roll_back(&mut self, driver: &mut dyn Driver) -> DbalResult<()> {
        match self.nesting_level {
            0 => Err(ConnectionError::NoActiveTransaction),
            1 => {
                debug!("Rolling back native transaction");
                driver.execute_statement(ROLLBACK_SQL).await?;
                self.nesting_level = 0;
                self.rollback_only = false;
                self.savepoints.clear();
                Ok(())
            }
            _ => {
                if self.savepoint_mode {
                    self.savepoints.rollback_top(driver).await?;
                    self.nesting_level -= 1;
                    self.rollback_only = false;
                } else {
                    self.nesting_level -= 1;
                    self.rollback_only = true;
                }
                debug!("Transaction nesting level is now {}", self.nesting_level);
                Ok(())
            }
        }
    }

    /// Reset to the zero state without issuing any driver I/O
    ///
    /// Used when the connection is closed: the native transaction, if any,
    /// is abandoned with the session. The nesting mode survives.
    pub(crate) fn reset(&mut self) {
        self.nesting_level = 0;
        self.rollback_only = false;
        self.savepoints.clear();
    }
}
