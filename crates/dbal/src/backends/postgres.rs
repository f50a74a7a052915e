//! PostgreSQL Driver Implementation
//!
//! This module provides the PostgreSQL implementation of the [`Driver`]
//! trait using sqlx as the underlying database driver. The driver wraps a
//! single native session; pooling is a concern of the caller.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::ConnectOptions;
use sqlx::Connection as SqlxConnection;
use tracing::{debug, warn};

use super::core::{Driver, DriverCapabilities};
use crate::connection::ConnectionConfig;
use crate::error::{ConnectionError, DbalResult};

/// PostgreSQL database driver over a single sqlx connection
#[derive(Default)]
pub struct PostgresDriver {
    conn: Option<PgConnection>,
}

impl std::fmt::Debug for PostgresDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDriver")
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl PostgresDriver {
    /// Create a new, not yet connected PostgreSQL driver
    pub fn new() -> Self {
        Self { conn: None }
    }

    fn session(&mut self) -> DbalResult<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| ConnectionError::Driver("No active database session".to_string()))
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn kind(&self) -> crate::backends::DriverKind {
        crate::backends::DriverKind::Postgres
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            supports_savepoints: true,
        }
    }

    async fn connect(&mut self, config: &ConnectionConfig) -> DbalResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        if !config.url.starts_with("postgresql://") && !config.url.starts_with("postgres://") {
            return Err(ConnectionError::Driver(
                "Invalid PostgreSQL URL scheme".to_string(),
            ));
        }

        let mut options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| ConnectionError::Driver(format!("Invalid PostgreSQL URL: {}", e)))?;

        if let Some(name) = &config.application_name {
            options = options.application_name(name);
        }

        let conn = options
            .connect()
            .await
            .map_err(|e| ConnectionError::Driver(format!("Failed to connect: {}", e)))?;

        debug!("PostgreSQL session established");
        self.conn = Some(conn);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                warn!("Error while closing PostgreSQL session: {}", e);
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn execute_statement(&mut self, sql: &str) -> DbalResult<u64> {
        let conn = self.session()?;

        let result = sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| ConnectionError::Driver(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn ping(&mut self) -> DbalResult<()> {
        let conn = self.session()?;
        conn.ping()
            .await
            .map_err(|e| ConnectionError::Driver(e.to_string()))
    }
}
