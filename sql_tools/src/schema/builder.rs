//! Declared schema construction
//!
//! Builds a validated [`Schema`] from plain Rust calls. Primary keys, foreign
//! key columns and unnamed indexes/constraints get deterministic hashed names
//! so a rebuilt schema always compares equal to the one that produced it.
//!
//! ```
//! use sql_tools::schema::builder::{ColumnBuilder, ForeignKeyOptions, SchemaBuilder, TableBuilder};
//!
//! let schema = SchemaBuilder::new("postgres")
//!     .table(TableBuilder::new("users").column(ColumnBuilder::new("id", "uuid").primary()))
//!     .table(
//!         TableBuilder::new("sessions")
//!             .column(ColumnBuilder::new("id", "uuid").primary())
//!             .foreign_key_column("userId", "users", ForeignKeyOptions::default()),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.tables.len(), 2);
//! ```

use crate::error::{SchemaValidationError, ValidationReason};
use crate::schema::types::{
    ActionType, Column, Constraint, ConstraintKind, Enum, Extension, Function, Index, ObjectKind,
    ObjectRef, Override, Parameter, Schema, Table, Trigger, TriggerAction, TriggerScope,
    TriggerTiming,
};
use crate::utils::naming::key_name;

/// Entry point for declaring a schema
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    schema: Schema,
    tables: Vec<TableBuilder>,
}

impl SchemaBuilder {
    pub fn new(database_name: &str) -> Self {
        Self {
            schema: Schema::new(database_name, "public"),
            tables: Vec::new(),
        }
    }

    pub fn schema_name(mut self, name: &str) -> Self {
        self.schema.schema_name = name.to_string();
        self
    }

    pub fn extension(mut self, name: &str) -> Self {
        self.schema.extensions.push(Extension::new(name));
        self
    }

    pub fn enum_type(mut self, name: &str, values: &[&str]) -> Self {
        self.schema.enums.push(Enum {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            synchronize: true,
        });
        self
    }

    pub fn function(mut self, function: Function) -> Self {
        self.schema.functions.push(function);
        self
    }

    /// Database-level setting, applied with `ALTER DATABASE ... SET`
    pub fn parameter(mut self, name: &str, value: &str) -> Self {
        let database_name = self.schema.database_name.clone();
        self.schema.parameters.push(Parameter {
            name: name.to_string(),
            database_name,
            value: value.to_string(),
            synchronize: true,
        });
        self
    }

    pub fn table(mut self, table: TableBuilder) -> Self {
        self.tables.push(table);
        self
    }

    pub fn override_rule(mut self, rule: Override) -> Self {
        self.schema.overrides.push(rule);
        self
    }

    /// Resolve foreign key columns, name every key, and validate
    pub fn build(self) -> Result<Schema, SchemaValidationError> {
        let SchemaBuilder { mut schema, tables } = self;
        let schema_name = schema.schema_name.clone();

        // Base tables first so foreign key columns can look up their target types
        let mut built: Vec<Table> = tables
            .iter()
            .map(|builder| builder.base_table(&schema_name))
            .collect();

        for (builder, table_index) in tables.iter().zip(0..) {
            let mut additions = Vec::new();
            for pending in &builder.foreign_key_columns {
                additions.push(pending.resolve(&builder.name, &built)?);
            }

            let table = &mut built[table_index];
            for (column, foreign_key, unique, index) in additions {
                table.add_column(column);
                table.add_constraint(foreign_key);
                if let Some(unique) = unique {
                    table.add_constraint(unique);
                }
                if let Some(index) = index {
                    table.add_index(index);
                }
            }
            builder.finish_table(table);
        }

        schema.tables = built;
        schema.finalize()
    }
}

/// Column declaration
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    name: String,
    data_type: String,
    nullable: bool,
    is_array: bool,
    default: Option<String>,
    primary: bool,
    comment: Option<String>,
    unique: bool,
    index: bool,
    synchronize: bool,
}

impl ColumnBuilder {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: false,
            is_array: false,
            default: None,
            primary: false,
            comment: None,
            unique: false,
            index: false,
            synchronize: true,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn default(mut self, expression: &str) -> Self {
        self.default = Some(expression.to_string());
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Adds a single-column UNIQUE constraint
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds a single-column index
    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn synchronize(mut self, synchronize: bool) -> Self {
        self.synchronize = synchronize;
        self
    }

    fn to_column(&self, table_name: &str) -> Column {
        Column {
            name: self.name.clone(),
            table_name: table_name.to_string(),
            data_type: self.data_type.clone(),
            nullable: self.nullable,
            is_array: self.is_array,
            default: self.default.clone(),
            primary: self.primary,
            comment: self.comment.clone(),
            synchronize: self.synchronize,
        }
    }
}

/// Index declaration
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    name: Option<String>,
    columns: Vec<String>,
    unique: bool,
    using: Option<String>,
    where_clause: Option<String>,
    synchronize: bool,
}

impl IndexBuilder {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            using: None,
            where_clause: None,
            synchronize: true,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn using(mut self, method: &str) -> Self {
        self.using = Some(method.to_string());
        self
    }

    pub fn where_clause(mut self, predicate: &str) -> Self {
        self.where_clause = Some(predicate.to_string());
        self
    }

    pub fn synchronize(mut self, synchronize: bool) -> Self {
        self.synchronize = synchronize;
        self
    }

    fn to_index(&self, table_name: &str) -> Index {
        Index {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| key_name("IDX_", table_name, &self.columns)),
            table_name: table_name.to_string(),
            columns: self.columns.clone(),
            unique: self.unique,
            using: self.using.clone(),
            where_clause: self.where_clause.clone(),
            synchronize: self.synchronize,
        }
    }
}

/// Trigger declaration
#[derive(Debug, Clone)]
pub struct TriggerBuilder {
    name: Option<String>,
    timing: TriggerTiming,
    actions: Vec<TriggerAction>,
    scope: TriggerScope,
    function_name: String,
    when: Option<String>,
    synchronize: bool,
}

impl TriggerBuilder {
    /// A `BEFORE UPDATE ... FOR EACH ROW` trigger calling `function_name`
    pub fn new(function_name: &str) -> Self {
        Self {
            name: None,
            timing: TriggerTiming::Before,
            actions: vec![TriggerAction::Update],
            scope: TriggerScope::Row,
            function_name: function_name.to_string(),
            when: None,
            synchronize: true,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn timing(mut self, timing: TriggerTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn actions(mut self, actions: &[TriggerAction]) -> Self {
        self.actions = actions.to_vec();
        self
    }

    pub fn for_each_statement(mut self) -> Self {
        self.scope = TriggerScope::Statement;
        self
    }

    pub fn when(mut self, condition: &str) -> Self {
        self.when = Some(condition.to_string());
        self
    }

    pub fn synchronize(mut self, synchronize: bool) -> Self {
        self.synchronize = synchronize;
        self
    }

    fn to_trigger(&self, table_name: &str) -> Trigger {
        Trigger {
            name: self.name.clone().unwrap_or_else(|| {
                key_name("TR_", table_name, &[self.function_name.clone()])
            }),
            table_name: table_name.to_string(),
            timing: self.timing,
            actions: self.actions.clone(),
            scope: self.scope,
            function_name: self.function_name.clone(),
            when: self.when.clone(),
            synchronize: self.synchronize,
        }
    }
}

/// Options for [`TableBuilder::foreign_key_column`]
#[derive(Debug, Clone)]
pub struct ForeignKeyOptions {
    /// Defaults to the referenced table's primary key
    pub reference_column: Option<String>,
    pub nullable: bool,
    pub unique: bool,
    pub index: bool,
    pub on_delete: Option<ActionType>,
    pub on_update: Option<ActionType>,
    pub name: Option<String>,
}

impl Default for ForeignKeyOptions {
    fn default() -> Self {
        Self {
            reference_column: None,
            nullable: false,
            unique: false,
            index: true,
            on_delete: None,
            on_update: None,
            name: None,
        }
    }
}

#[derive(Debug, Clone)]
struct ForeignKeyColumn {
    column: String,
    reference_table: String,
    options: ForeignKeyOptions,
}

type ResolvedForeignKey = (Column, Constraint, Option<Constraint>, Option<Index>);

impl ForeignKeyColumn {
    fn resolve(
        &self,
        table_name: &str,
        tables: &[Table],
    ) -> Result<ResolvedForeignKey, SchemaValidationError> {
        let object = ObjectRef::in_table(ObjectKind::Column, table_name, &self.column);
        let target = tables
            .iter()
            .find(|t| t.name == self.reference_table)
            .ok_or_else(|| {
                SchemaValidationError::new(
                    object.clone(),
                    ValidationReason::UnknownReferenceTable,
                    format!("referenced table '{}' does not exist", self.reference_table),
                )
            })?;

        let reference_column = match &self.options.reference_column {
            Some(name) => name.clone(),
            None => match target.primary_key().map(|pk| pk.columns.as_slice()) {
                Some([single]) => single.clone(),
                _ => {
                    return Err(SchemaValidationError::new(
                        object,
                        ValidationReason::ReferenceNotUnique,
                        format!(
                            "table '{}' has no single-column primary key to reference",
                            self.reference_table
                        ),
                    ))
                }
            },
        };

        let target_column = target.column(&reference_column).ok_or_else(|| {
            SchemaValidationError::new(
                object.clone(),
                ValidationReason::UnknownReferenceColumn,
                format!(
                    "referenced column '{}.{}' does not exist",
                    self.reference_table, reference_column
                ),
            )
        })?;

        let columns = vec![self.column.clone()];
        let column = Column {
            nullable: self.options.nullable,
            is_array: target_column.is_array,
            ..Column::new(table_name, &self.column, &target_column.data_type)
        };

        let foreign_key = Constraint {
            name: self
                .options
                .name
                .clone()
                .unwrap_or_else(|| key_name("FK_", table_name, &columns)),
            table_name: table_name.to_string(),
            columns: columns.clone(),
            kind: ConstraintKind::ForeignKey {
                reference_table: self.reference_table.clone(),
                reference_columns: vec![reference_column],
                on_update: self.options.on_update,
                on_delete: self.options.on_delete,
            },
            synchronize: true,
        };

        let unique = self.options.unique.then(|| Constraint {
            name: key_name("UQ_", table_name, &columns),
            table_name: table_name.to_string(),
            columns: columns.clone(),
            kind: ConstraintKind::Unique,
            synchronize: true,
        });

        let index = self
            .options
            .index
            .then(|| IndexBuilder::new(&[self.column.as_str()]).to_index(table_name));

        Ok((column, foreign_key, unique, index))
    }
}

/// Table declaration
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnBuilder>,
    indexes: Vec<IndexBuilder>,
    constraints: Vec<Constraint>,
    foreign_key_columns: Vec<ForeignKeyColumn>,
    triggers: Vec<TriggerBuilder>,
    synchronize: bool,
}

impl TableBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            foreign_key_columns: Vec::new(),
            triggers: Vec::new(),
            synchronize: true,
        }
    }

    pub fn column(mut self, column: ColumnBuilder) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, index: IndexBuilder) -> Self {
        self.indexes.push(index);
        self
    }

    /// Multi-column UNIQUE constraint
    pub fn unique(mut self, columns: &[&str]) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        self.constraints.push(Constraint {
            name: key_name("UQ_", &self.name, &columns),
            table_name: self.name.clone(),
            columns,
            kind: ConstraintKind::Unique,
            synchronize: true,
        });
        self
    }

    pub fn check(mut self, name: Option<&str>, expression: &str) -> Self {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| key_name("CHK_", &self.name, &[expression.to_string()]));
        self.constraints.push(Constraint {
            name,
            table_name: self.name.clone(),
            columns: Vec::new(),
            kind: ConstraintKind::Check {
                expression: expression.to_string(),
            },
            synchronize: true,
        });
        self
    }

    /// Composite or explicitly named foreign key over columns already declared
    pub fn foreign_key(
        mut self,
        columns: &[&str],
        reference_table: &str,
        reference_columns: &[&str],
        on_delete: Option<ActionType>,
    ) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        self.constraints.push(Constraint {
            name: key_name("FK_", &self.name, &columns),
            table_name: self.name.clone(),
            columns,
            kind: ConstraintKind::ForeignKey {
                reference_table: reference_table.to_string(),
                reference_columns: reference_columns.iter().map(|c| c.to_string()).collect(),
                on_update: None,
                on_delete,
            },
            synchronize: true,
        });
        self
    }

    /// Declares a column together with its foreign key, index and optional
    /// UNIQUE constraint. The column type is taken from the referenced column.
    pub fn foreign_key_column(
        mut self,
        column: &str,
        reference_table: &str,
        options: ForeignKeyOptions,
    ) -> Self {
        self.foreign_key_columns.push(ForeignKeyColumn {
            column: column.to_string(),
            reference_table: reference_table.to_string(),
            options,
        });
        self
    }

    pub fn trigger(mut self, trigger: TriggerBuilder) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Mark the whole table as hand-managed
    pub fn synchronize(mut self, synchronize: bool) -> Self {
        self.synchronize = synchronize;
        self
    }

    fn base_table(&self, schema_name: &str) -> Table {
        let mut table = Table::new(&self.name);
        table.schema_name = schema_name.to_string();
        table.synchronize = self.synchronize;

        for column in &self.columns {
            table.add_column(column.to_column(&self.name));
        }

        let primary: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.primary)
            .map(|c| c.name.clone())
            .collect();

        if !primary.is_empty() {
            table.add_constraint(Constraint {
                name: key_name("PK_", &self.name, &primary),
                table_name: self.name.clone(),
                columns: primary,
                kind: ConstraintKind::PrimaryKey,
                synchronize: true,
            });
        }

        table
    }

    fn finish_table(&self, table: &mut Table) {
        for column in &self.columns {
            let columns = vec![column.name.clone()];
            if column.unique {
                table.add_constraint(Constraint {
                    name: key_name("UQ_", &self.name, &columns),
                    table_name: self.name.clone(),
                    columns: columns.clone(),
                    kind: ConstraintKind::Unique,
                    synchronize: true,
                });
            }
            if column.index {
                table.add_index(IndexBuilder::new(&[column.name.as_str()]).to_index(&self.name));
            }
        }

        for constraint in &self.constraints {
            table.add_constraint(constraint.clone());
        }
        for index in &self.indexes {
            table.add_index(index.to_index(&self.name));
        }
        for trigger in &self.triggers {
            table.add_trigger(trigger.to_trigger(&self.name));
        }
    }
}
