//! Utilities for sql_tools
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use naming::{key_name, normalize_sql, normalize_type, quote_identifier};
