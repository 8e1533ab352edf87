//! Schema module for sql_tools
//!
//! The schema model and the pipeline that reconciles a declared schema with a
//! live one: introspect, compare, plan, generate.

pub mod analyzer;
pub mod builder;
pub mod diff;
pub mod document;
pub mod generator;
pub mod planner;
pub mod types;
pub mod validate;

// Re-export key types
pub use analyzer::{introspect, CatalogSource, IntrospectOptions, PostgresCatalog, SchemaAnalyzer};
pub use builder::{ColumnBuilder, ForeignKeyOptions, IndexBuilder, SchemaBuilder, TableBuilder, TriggerBuilder};
pub use diff::{Change, SchemaDiff, SyncOptions, Warning, WarningCode};
pub use generator::{generate, SqlGenerator};
pub use planner::{plan, Operation, Phase, Step};
pub use types::{
    ActionType, Column, Constraint, ConstraintKind, Enum, Extension, Function, Index, ObjectKind,
    ObjectRef, Override, Parameter, Schema, Table, Trigger,
};
