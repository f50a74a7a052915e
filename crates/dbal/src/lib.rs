//! # vireo-dbal: Database Abstraction Layer
//!
//! Nested-transaction emulation on top of database sessions that natively
//! support only a single flat transaction. Application code can call
//! `begin_transaction`/`commit`/`roll_back` at arbitrary nesting depth;
//! the connection decides per call whether to drive the native
//! transaction, a savepoint, or nothing at all.
//!
//! This crate provides the connection lifecycle, the transaction nesting
//! state machine, savepoint emulation, the driver abstraction these are
//! written against, and a PostgreSQL driver.

pub mod backends;
pub mod connection;
pub mod error;
pub mod testing;
pub mod transactions;


// Re-export core traits and types
pub use backends::*;
pub use connection::*;
pub use error::*;
pub use transactions::*;
