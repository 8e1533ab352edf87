//! Structural validation of schema snapshots
//!
//! Runs once when a snapshot is finalized, after introspection or after the
//! declared schema is built. The first violation aborts.

use std::collections::{BTreeSet, HashSet};

use crate::error::{SchemaValidationError, ValidationReason};
use crate::schema::types::{Column, ConstraintKind, ObjectRef, Schema, SchemaObject, Table};

type ValidationResult = std::result::Result<(), SchemaValidationError>;

/// Validate a complete schema snapshot
pub fn validate(schema: &Schema) -> ValidationResult {
    unique_names(&schema.tables)?;
    unique_names(&schema.enums)?;
    unique_names(&schema.functions)?;
    unique_names(&schema.extensions)?;
    unique_names(&schema.parameters)?;

    for enum_type in &schema.enums {
        let mut seen = HashSet::new();
        for value in &enum_type.values {
            if !seen.insert(value.as_str()) {
                return Err(SchemaValidationError::new(
                    enum_type.object_ref(),
                    ValidationReason::DuplicateEnumValue,
                    format!("label '{}' appears more than once", value),
                ));
            }
        }
    }

    // Index and constraint names share the namespace across tables
    let mut index_names = HashSet::new();
    let mut constraint_names = HashSet::new();

    for table in &schema.tables {
        validate_table(table)?;

        for index in &table.indexes {
            if !index_names.insert(index.name.as_str()) {
                return Err(duplicate(index.object_ref()));
            }
        }
        for constraint in &table.constraints {
            if !constraint_names.insert(constraint.name.as_str()) {
                return Err(duplicate(constraint.object_ref()));
            }
        }
    }

    for table in &schema.tables {
        validate_foreign_keys(schema, table)?;
    }

    Ok(())
}

fn duplicate(object: ObjectRef) -> SchemaValidationError {
    let message = format!("{} name '{}' is not unique", object.kind, object.name);
    SchemaValidationError::new(object, ValidationReason::DuplicateName, message)
}

fn unique_names<T: SchemaObject>(objects: &[T]) -> ValidationResult {
    let mut seen = HashSet::new();
    for object in objects {
        if !seen.insert(object.name()) {
            return Err(duplicate(object.object_ref()));
        }
    }
    Ok(())
}

fn validate_table(table: &Table) -> ValidationResult {
    unique_names(&table.columns)?;
    unique_names(&table.triggers)?;

    let primary_keys: Vec<_> = table
        .constraints
        .iter()
        .filter(|c| matches!(c.kind, ConstraintKind::PrimaryKey))
        .collect();

    if primary_keys.len() > 1 {
        return Err(SchemaValidationError::new(
            primary_keys[1].object_ref(),
            ValidationReason::MultiplePrimaryKeys,
            format!("table '{}' declares more than one primary key", table.name),
        ));
    }

    for column in &table.columns {
        validate_primary_column(column, primary_keys.first().map(|pk| &pk.columns))?;
    }

    // Unmanaged indexes may list expressions in place of columns
    for index in table.indexes.iter().filter(|i| i.synchronize) {
        require_columns(table, index.object_ref(), &index.columns)?;
    }

    for constraint in &table.constraints {
        match constraint.kind {
            // Check constraints may be table-level with no column list
            ConstraintKind::Check { .. } if constraint.columns.is_empty() => {}
            _ => require_columns(table, constraint.object_ref(), &constraint.columns)?,
        }
    }

    Ok(())
}

fn validate_primary_column(column: &Column, key: Option<&Vec<String>>) -> ValidationResult {
    if !column.primary {
        return Ok(());
    }

    if column.nullable {
        return Err(SchemaValidationError::new(
            column.object_ref(),
            ValidationReason::PrimaryColumnNullable,
            "primary column must be NOT NULL",
        ));
    }

    if !key.is_some_and(|columns| columns.contains(&column.name)) {
        return Err(SchemaValidationError::new(
            column.object_ref(),
            ValidationReason::PrimaryColumnNotInKey,
            "column is marked primary but is not part of the primary key",
        ));
    }

    Ok(())
}

fn require_columns(table: &Table, object: ObjectRef, columns: &[String]) -> ValidationResult {
    if columns.is_empty() {
        return Err(SchemaValidationError::new(
            object,
            ValidationReason::EmptyColumnList,
            "column list is empty",
        ));
    }

    for name in columns {
        if table.column(name).is_none() {
            let message = format!("column '{}' does not exist on table '{}'", name, table.name);
            return Err(SchemaValidationError::new(
                object,
                ValidationReason::UnknownColumn,
                message,
            ));
        }
    }

    Ok(())
}

fn validate_foreign_keys(schema: &Schema, table: &Table) -> ValidationResult {
    for constraint in &table.constraints {
        let ConstraintKind::ForeignKey {
            reference_table,
            reference_columns,
            ..
        } = &constraint.kind
        else {
            continue;
        };

        let Some(target) = schema.table(reference_table) else {
            return Err(SchemaValidationError::new(
                constraint.object_ref(),
                ValidationReason::UnknownReferenceTable,
                format!("referenced table '{}' does not exist", reference_table),
            ));
        };

        if reference_columns.len() != constraint.columns.len() {
            return Err(SchemaValidationError::new(
                constraint.object_ref(),
                ValidationReason::ReferenceArityMismatch,
                format!(
                    "{} column(s) reference {} column(s)",
                    constraint.columns.len(),
                    reference_columns.len()
                ),
            ));
        }

        for name in reference_columns {
            if target.column(name).is_none() {
                return Err(SchemaValidationError::new(
                    constraint.object_ref(),
                    ValidationReason::UnknownReferenceColumn,
                    format!("referenced column '{}.{}' does not exist", reference_table, name),
                ));
            }
        }

        // The referenced columns, as a set, must be exactly some key of the target:
        // a primary key, a unique constraint or a non-partial unique index
        let wanted: BTreeSet<&str> = reference_columns.iter().map(String::as_str).collect();
        let covers = |columns: &[String]| {
            columns.iter().map(String::as_str).collect::<BTreeSet<_>>() == wanted
        };
        let is_key = target
            .constraints
            .iter()
            .filter(|c| c.is_key())
            .any(|key| covers(&key.columns))
            || target
                .indexes
                .iter()
                .filter(|i| i.unique && i.where_clause.is_none())
                .any(|index| covers(&index.columns));

        if !is_key {
            return Err(SchemaValidationError::new(
                constraint.object_ref(),
                ValidationReason::ReferenceNotUnique,
                format!(
                    "referenced columns ({}) are not a primary key or unique key of '{}'",
                    reference_columns.join(", "),
                    reference_table
                ),
            ));
        }
    }

    Ok(())
}
