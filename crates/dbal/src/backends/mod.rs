//! Database Driver Abstractions
//!
//! This module provides the driver abstraction consumed by the connection
//! layer, plus the PostgreSQL implementation of it.

pub mod core;
pub mod postgres;

// Re-export core traits and types
pub use self::core::*;
pub use self::postgres::PostgresDriver;

/// Database driver type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    Postgres,
    MySql,
    Sqlite,
    /// In-memory driver from the [`testing`](crate::testing) module
    Memory,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Postgres => write!(f, "postgresql"),
            DriverKind::MySql => write!(f, "mysql"),
            DriverKind::Sqlite => write!(f, "sqlite"),
            DriverKind::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DriverKind::Postgres),
            "mysql" => Ok(DriverKind::MySql),
            "sqlite" => Ok(DriverKind::Sqlite),
            "memory" => Ok(DriverKind::Memory),
            _ => Err(format!("Unsupported database driver: {}", s)),
        }
    }
}
