//! Database module for sql_tools
//!
//! This module handles the connection pool used for introspection.

pub mod connection;

// Re-export key types
pub use connection::DatabaseConnection;
