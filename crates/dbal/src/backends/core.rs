//! Core Database Driver Trait
//!
//! This module defines the driver trait the connection layer is written
//! against. A driver owns one native database session, executes raw
//! statements on it, and reports the capabilities the transaction layer
//! needs to decide between native transactions and savepoint emulation.

use async_trait::async_trait;

use crate::connection::ConnectionConfig;
use crate::error::DbalResult;

/// Capabilities reported by a driver, fixed for the life of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCapabilities {
    /// Whether the backend understands SAVEPOINT / RELEASE / ROLLBACK TO
    pub supports_savepoints: bool,
}

/// Abstract database driver trait
///
/// Implementations are session-oriented: one driver instance wraps one
/// native connection. The wire protocol, statement execution details and
/// result decoding all live behind this boundary.
#[async_trait]
pub trait Driver: Send {
    /// The driver type
    fn kind(&self) -> crate::backends::DriverKind;

    /// Capabilities of the underlying backend
    fn capabilities(&self) -> DriverCapabilities;

    /// Whether the backend supports savepoints
    fn supports_savepoints(&self) -> bool {
        self.capabilities().supports_savepoints
    }

    /// Establish the underlying session
    async fn connect(&mut self, config: &ConnectionConfig) -> DbalResult<()>;

    /// Discard the underlying session
    ///
    /// Never fails: a session that cannot be shut down cleanly is dropped.
    async fn disconnect(&mut self);

    /// Whether a native session is currently established
    fn is_connected(&self) -> bool;

    /// Execute a raw statement and return the affected row count
    async fn execute_statement(&mut self, sql: &str) -> DbalResult<u64>;

    /// Check that the session is still alive
    async fn ping(&mut self) -> DbalResult<()>;
}
