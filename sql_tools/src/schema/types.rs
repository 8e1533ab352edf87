//! Type definitions for database schema objects
//!
//! Every object is a plain value snapshot. Field names serialize in camelCase so
//! a schema document reads the same whether it was introspected or declared.

use serde::{Deserialize, Serialize};
use std::fmt;

fn default_true() -> bool {
    true
}

fn default_schema_name() -> String {
    "public".to_string()
}

/// Represents a complete database schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub database_name: String,
    #[serde(default = "default_schema_name")]
    pub schema_name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub enums: Vec<Enum>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub overrides: Vec<Override>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new(database_name: &str, schema_name: &str) -> Self {
        Self {
            database_name: database_name.to_string(),
            schema_name: schema_name.to_string(),
            tables: Vec::new(),
            enums: Vec::new(),
            extensions: Vec::new(),
            functions: Vec::new(),
            parameters: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Run validation and hand back the schema only if it is consistent
    pub fn finalize(self) -> Result<Self, crate::error::SchemaValidationError> {
        crate::schema::validate::validate(&self)?;
        Ok(self)
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    #[serde(default = "default_schema_name")]
    pub schema_name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema_name: default_schema_name(),
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            triggers: Vec::new(),
            synchronize: true,
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn add_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn add_trigger(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::PrimaryKey))
    }
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub table_name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

impl Column {
    /// Create a new not-null column with the given name and type
    pub fn new(table_name: &str, name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            table_name: table_name.to_string(),
            data_type: data_type.to_string(),
            nullable: false,
            is_array: false,
            default: None,
            primary: false,
            comment: None,
            synchronize: true,
        }
    }

    /// Full type as written in DDL, including the array suffix
    pub fn sql_type(&self) -> String {
        if self.is_array {
            format!("{}[]", self.data_type)
        } else {
            self.data_type.clone()
        }
    }
}

/// Represents an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    pub table_name: String,
    #[serde(rename = "columnNames")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

/// Referential action of a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ActionType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ActionType::NoAction => "NO ACTION",
            ActionType::Restrict => "RESTRICT",
            ActionType::Cascade => "CASCADE",
            ActionType::SetNull => "SET NULL",
            ActionType::SetDefault => "SET DEFAULT",
        }
    }

    /// Decode `pg_constraint.confupdtype` / `confdeltype`
    pub fn from_catalog_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(ActionType::NoAction),
            "r" => Some(ActionType::Restrict),
            "c" => Some(ActionType::Cascade),
            "n" => Some(ActionType::SetNull),
            "d" => Some(ActionType::SetDefault),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    PrimaryKey,
    #[serde(rename_all = "camelCase")]
    ForeignKey {
        #[serde(rename = "referenceTableName")]
        reference_table: String,
        #[serde(rename = "referenceColumnNames")]
        reference_columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_update: Option<ActionType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_delete: Option<ActionType>,
    },
    Unique,
    Check {
        expression: String,
    },
}

impl ConstraintKind {
    pub fn label(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::ForeignKey { .. } => "FOREIGN KEY",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::Check { .. } => "CHECK",
        }
    }
}

/// Represents a table constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub name: String,
    pub table_name: String,
    #[serde(rename = "columnNames", default)]
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub kind: ConstraintKind,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

impl Constraint {
    pub fn is_foreign_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::ForeignKey { .. })
    }

    /// Whether this constraint makes its column set a valid foreign key target
    pub fn is_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey | ConstraintKind::Unique)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAction {
    Insert,
    Update,
    Delete,
    Truncate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerScope {
    #[default]
    Row,
    Statement,
}

/// Represents a trigger bound to a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub name: String,
    pub table_name: String,
    pub timing: TriggerTiming,
    pub actions: Vec<TriggerAction>,
    #[serde(default)]
    pub scope: TriggerScope,
    pub function_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

/// Represents a stored function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
    pub returns: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub body: String,
    /// Argument types alone, when they differ from `arguments` (defaults, OUT parameters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_arguments: Option<String>,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

fn default_language() -> String {
    "plpgsql".to_string()
}

impl Function {
    /// Arguments as DROP FUNCTION and ALTER FUNCTION expect them
    pub fn identity_arguments(&self) -> &str {
        self.identity_arguments.as_deref().unwrap_or(&self.arguments)
    }
}

/// Represents an enum type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enum {
    pub name: String,
    pub values: Vec<String>,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

/// Represents an installed extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub name: String,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

impl Extension {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            synchronize: true,
        }
    }
}

/// Represents a database-level configuration parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub database_name: String,
    pub value: String,
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

/// Maps a live object name to a declared one so the pair is treated as a rename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    pub from: String,
    pub to: String,
}

impl Override {
    pub fn new(kind: ObjectKind, from: &str, to: &str) -> Self {
        Self {
            kind,
            table_name: None,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Restrict a table-owned override to one (declared) table
    pub fn on_table(mut self, table_name: &str) -> Self {
        self.table_name = Some(table_name.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    Column,
    Index,
    Constraint,
    Trigger,
    Function,
    Enum,
    Extension,
    Parameter,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Index => "index",
            ObjectKind::Constraint => "constraint",
            ObjectKind::Trigger => "trigger",
            ObjectKind::Function => "function",
            ObjectKind::Enum => "enum",
            ObjectKind::Extension => "extension",
            ObjectKind::Parameter => "parameter",
        };
        f.write_str(s)
    }
}

/// Identity of a schema object, used in errors and warnings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, name: &str) -> Self {
        Self {
            kind,
            table: None,
            name: name.to_string(),
        }
    }

    pub fn in_table(kind: ObjectKind, table: &str, name: &str) -> Self {
        Self {
            kind,
            table: Some(table.to_string()),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{} {}.{}", self.kind, table, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Common surface the comparator needs from every object kind
pub trait SchemaObject: Clone {
    const KIND: ObjectKind;

    fn name(&self) -> &str;

    fn synchronize(&self) -> bool;

    fn table_name(&self) -> Option<&str> {
        None
    }

    fn object_ref(&self) -> ObjectRef {
        match self.table_name() {
            Some(table) => ObjectRef::in_table(Self::KIND, table, self.name()),
            None => ObjectRef::new(Self::KIND, self.name()),
        }
    }
}

macro_rules! schema_object {
    ($ty:ty, $kind:expr) => {
        impl SchemaObject for $ty {
            const KIND: ObjectKind = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn synchronize(&self) -> bool {
                self.synchronize
            }
        }
    };
    ($ty:ty, $kind:expr, table) => {
        impl SchemaObject for $ty {
            const KIND: ObjectKind = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn synchronize(&self) -> bool {
                self.synchronize
            }

            fn table_name(&self) -> Option<&str> {
                Some(&self.table_name)
            }
        }
    };
}

schema_object!(Table, ObjectKind::Table);
schema_object!(Column, ObjectKind::Column, table);
schema_object!(Index, ObjectKind::Index, table);
schema_object!(Constraint, ObjectKind::Constraint, table);
schema_object!(Trigger, ObjectKind::Trigger, table);
schema_object!(Function, ObjectKind::Function);
schema_object!(Enum, ObjectKind::Enum);
schema_object!(Extension, ObjectKind::Extension);
schema_object!(Parameter, ObjectKind::Parameter);
