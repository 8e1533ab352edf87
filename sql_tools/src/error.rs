//! Error types for sql_tools

use std::fmt;

use thiserror::Error;

use crate::schema::types::ObjectRef;

/// Result type for sql_tools operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sql_tools
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to sql_tools errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(error: toml::ser::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// A schema snapshot broke one of the model's structural rules.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid schema: {object}: {message} ({reason})")]
pub struct SchemaValidationError {
    pub object: ObjectRef,
    pub reason: ValidationReason,
    pub message: String,
}

impl SchemaValidationError {
    pub fn new(object: ObjectRef, reason: ValidationReason, message: impl Into<String>) -> Self {
        Self {
            object,
            reason,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    DuplicateName,
    MultiplePrimaryKeys,
    PrimaryColumnNullable,
    PrimaryColumnNotInKey,
    UnknownColumn,
    UnknownReferenceTable,
    UnknownReferenceColumn,
    ReferenceArityMismatch,
    ReferenceNotUnique,
    EmptyColumnList,
    DuplicateEnumValue,
}

impl ValidationReason {
    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationReason::DuplicateName => "duplicate_name",
            ValidationReason::MultiplePrimaryKeys => "multiple_primary_keys",
            ValidationReason::PrimaryColumnNullable => "primary_column_nullable",
            ValidationReason::PrimaryColumnNotInKey => "primary_column_not_in_key",
            ValidationReason::UnknownColumn => "unknown_column",
            ValidationReason::UnknownReferenceTable => "unknown_reference_table",
            ValidationReason::UnknownReferenceColumn => "unknown_reference_column",
            ValidationReason::ReferenceArityMismatch => "reference_arity_mismatch",
            ValidationReason::ReferenceNotUnique => "reference_not_unique",
            ValidationReason::EmptyColumnList => "empty_column_list",
            ValidationReason::DuplicateEnumValue => "duplicate_enum_value",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The live catalog could not be read.
#[derive(Error, Debug)]
#[error("introspection failed: {object}: {message} ({reason})")]
pub struct IntrospectionError {
    pub object: ObjectRef,
    pub reason: IntrospectionReason,
    pub message: String,
    #[source]
    pub source: Option<sqlx::Error>,
}

impl IntrospectionError {
    pub fn new(object: ObjectRef, reason: IntrospectionReason, message: impl Into<String>) -> Self {
        Self {
            object,
            reason,
            message: message.into(),
            source: None,
        }
    }

    /// Classify a driver error raised while running a catalog query.
    pub fn from_sqlx(object: ObjectRef, error: sqlx::Error) -> Self {
        let reason = match &error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => IntrospectionReason::Connectivity,
            // 42501 insufficient_privilege
            sqlx::Error::Database(db) if db.code().as_deref() == Some("42501") => {
                IntrospectionReason::Permission
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                IntrospectionReason::MalformedCatalog
            }
            _ => IntrospectionReason::Query,
        };

        Self {
            object,
            reason,
            message: error.to_string(),
            source: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrospectionReason {
    Connectivity,
    Permission,
    Query,
    MalformedCatalog,
}

impl IntrospectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            IntrospectionReason::Connectivity => "connectivity",
            IntrospectionReason::Permission => "permission",
            IntrospectionReason::Query => "query",
            IntrospectionReason::MalformedCatalog => "malformed_catalog",
        }
    }
}

impl fmt::Display for IntrospectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An operation has no safe DDL representation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot generate SQL for {object}: {message} ({reason})")]
pub struct GenerationError {
    pub object: ObjectRef,
    pub reason: GenerationReason,
    pub message: String,
}

impl GenerationError {
    pub fn new(object: ObjectRef, reason: GenerationReason, message: impl Into<String>) -> Self {
        Self {
            object,
            reason,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationReason {
    ArrayConversion,
    EnumValueRemoval,
    FunctionSignatureChange,
    UnsupportedRename,
}

impl GenerationReason {
    pub fn code(&self) -> &'static str {
        match self {
            GenerationReason::ArrayConversion => "array_conversion",
            GenerationReason::EnumValueRemoval => "enum_value_removal",
            GenerationReason::FunctionSignatureChange => "function_signature_change",
            GenerationReason::UnsupportedRename => "unsupported_rename",
        }
    }
}

impl fmt::Display for GenerationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
