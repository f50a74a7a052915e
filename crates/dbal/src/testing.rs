//! Test Utilities
//!
//! An in-memory driver that records every statement it is asked to execute
//! and can be scripted to fail specific statements or to report a backend
//! without savepoint support. The handles returned by
//! [`MemoryDriver::statements`] and [`MemoryDriver::failures`] stay valid
//! after the driver has been boxed into a connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backends::{Driver, DriverCapabilities, DriverKind};
use crate::connection::ConnectionConfig;
use crate::error::{ConnectionError, DbalResult};

/// Shared view of the statements a [`MemoryDriver`] has executed
#[derive(Debug, Clone, Default)]
pub struct StatementLog(Arc<Mutex<Vec<String>>>);

impl StatementLog {
    /// All statements seen so far, in execution order
    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Whether a statement was executed verbatim
    pub fn contains(&self, sql: &str) -> bool {
        self.0.lock().unwrap().iter().any(|s| s == sql)
    }

    /// Number of statements seen so far
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// Whether no statement was executed yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    fn push(&self, sql: &str) {
        self.0.lock().unwrap().push(sql.to_string());
    }
}

/// Scripted failures for a [`MemoryDriver`]
#[derive(Debug, Clone, Default)]
pub struct FailureScript(Arc<Mutex<HashMap<String, String>>>);

impl FailureScript {
    /// Fail the given statement with a constraint-violation style message
    pub fn fail_on(&self, sql: &str) {
        self.fail_with(sql, "duplicate key value violates unique constraint");
    }

    /// Fail the given statement with a specific message
    pub fn fail_with(&self, sql: &str, message: &str) {
        self.0
            .lock()
            .unwrap()
            .insert(sql.to_string(), message.to_string());
    }

    /// Stop failing anything
    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    fn message_for(&self, sql: &str) -> Option<String> {
        self.0.lock().unwrap().get(sql).cloned()
    }
}

/// In-memory driver for tests
#[derive(Debug)]
pub struct MemoryDriver {
    capabilities: DriverCapabilities,
    connected: bool,
    log: StatementLog,
    failures: FailureScript,
}

impl MemoryDriver {
    /// A driver whose backend supports savepoints
    pub fn new() -> Self {
        Self {
            capabilities: DriverCapabilities {
                supports_savepoints: true,
            },
            connected: false,
            log: StatementLog::default(),
            failures: FailureScript::default(),
        }
    }

    /// A driver whose backend does not support savepoints
    pub fn without_savepoints() -> Self {
        Self {
            capabilities: DriverCapabilities {
                supports_savepoints: false,
            },
            ..Self::new()
        }
    }

    /// Handle onto the statement log
    pub fn statements(&self) -> StatementLog {
        self.log.clone()
    }

    /// Handle onto the failure script
    pub fn failures(&self) -> FailureScript {
        self.failures.clone()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Memory
    }

    fn capabilities(&self) -> DriverCapabilities {
        self.capabilities
    }

    async fn connect(&mut self, _config: &ConnectionConfig) -> DbalResult<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn execute_statement(&mut self, sql: &str) -> DbalResult<u64> {
        if !self.connected {
            return Err(ConnectionError::Driver(
                "No active database session".to_string(),
            ));
        }

        self.log.push(sql);

        if let Some(message) = self.failures.message_for(sql) {
            return Err(ConnectionError::Driver(message));
        }

        Ok(0)
    }

    async fn ping(&mut self) -> DbalResult<()> {
        if !self.connected {
            return Err(ConnectionError::Driver(
                "No active database session".to_string(),
            ));
        }
        Ok(())
    }
}
