//! Migration planner
//!
//! Expands change records into DDL steps and orders them so every statement
//! runs after the objects it depends on exist, and before the objects it
//! depends on go away.
//!
//! Phases, in execution order:
//!
//! 1. drop dependents: triggers, foreign keys, other constraints, indexes,
//!    columns, tables
//! 2. renames
//! 3. create prerequisites: parameters, extensions, enums, functions, tables
//!    (with primary key and check constraints inline), columns
//! 4. alter columns
//! 5. create dependents: indexes, constraints, triggers
//! 6. drop base objects: functions, enums, extensions, parameters
//!
//! Inside a phase, steps keep change-record order.

use std::collections::BTreeSet;

use crate::schema::diff::{Change, ColumnField, SchemaDiff};
use crate::schema::types::{
    Column, Constraint, ConstraintKind, Enum, Extension, Function, Index, ObjectKind, ObjectRef,
    Parameter, SchemaObject, Table, Trigger,
};

/// One DDL step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    SetParameter {
        from: Option<Parameter>,
        to: Parameter,
    },
    ResetParameter(Parameter),
    RenameParameter { from: String, to: String },

    CreateExtension(Extension),
    DropExtension(Extension),
    RenameExtension { from: String, to: String },

    CreateEnum(Enum),
    AlterEnum { from: Enum, to: Enum },
    DropEnum(Enum),
    RenameEnum { from: String, to: String },

    CreateFunction(Function),
    ReplaceFunction { from: Function, to: Function },
    DropFunction(Function),
    RenameFunction { from: Function, to: String },

    /// Columns, primary key and check constraints only
    CreateTable(Table),
    DropTable(Table),
    RenameTable { from: String, to: String },

    AddColumn(Column),
    AlterColumn {
        from: Column,
        to: Column,
        fields: Vec<ColumnField>,
    },
    DropColumn(Column),
    RenameColumn { table: String, from: String, to: String },

    CreateIndex(Index),
    DropIndex(Index),
    RenameIndex { table: String, from: String, to: String },

    AddConstraint(Constraint),
    DropConstraint(Constraint),
    RenameConstraint { table: String, from: String, to: String },

    CreateTrigger(Trigger),
    DropTrigger(Trigger),
    RenameTrigger { table: String, from: String, to: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    DropDependents,
    Rename,
    CreatePrerequisites,
    AlterColumns,
    CreateDependents,
    DropBase,
}

impl Step {
    /// Phase plus position inside the phase
    fn rank(&self) -> (Phase, u8) {
        use Step::*;
        match self {
            DropTrigger(_) => (Phase::DropDependents, 0),
            DropConstraint(c) if c.is_foreign_key() => (Phase::DropDependents, 1),
            DropConstraint(_) => (Phase::DropDependents, 2),
            DropIndex(_) => (Phase::DropDependents, 3),
            DropColumn(_) => (Phase::DropDependents, 4),
            DropTable(_) => (Phase::DropDependents, 5),

            RenameTable { .. } => (Phase::Rename, 0),
            RenameColumn { .. } => (Phase::Rename, 1),
            RenameIndex { .. } => (Phase::Rename, 2),
            RenameConstraint { .. } => (Phase::Rename, 3),
            RenameTrigger { .. } => (Phase::Rename, 4),
            RenameFunction { .. } => (Phase::Rename, 5),
            RenameEnum { .. } => (Phase::Rename, 6),
            RenameExtension { .. } => (Phase::Rename, 7),
            RenameParameter { .. } => (Phase::Rename, 8),

            SetParameter { .. } => (Phase::CreatePrerequisites, 0),
            CreateExtension(_) => (Phase::CreatePrerequisites, 1),
            CreateEnum(_) => (Phase::CreatePrerequisites, 2),
            AlterEnum { .. } => (Phase::CreatePrerequisites, 3),
            CreateFunction(_) => (Phase::CreatePrerequisites, 4),
            ReplaceFunction { .. } => (Phase::CreatePrerequisites, 5),
            CreateTable(_) => (Phase::CreatePrerequisites, 6),
            AddColumn(_) => (Phase::CreatePrerequisites, 7),

            AlterColumn { .. } => (Phase::AlterColumns, 0),

            CreateIndex(_) => (Phase::CreateDependents, 0),
            AddConstraint(_) => (Phase::CreateDependents, 1),
            CreateTrigger(_) => (Phase::CreateDependents, 2),

            DropFunction(_) => (Phase::DropBase, 0),
            DropEnum(_) => (Phase::DropBase, 1),
            DropExtension(_) => (Phase::DropBase, 2),
            ResetParameter(_) => (Phase::DropBase, 3),
        }
    }

    pub fn phase(&self) -> Phase {
        self.rank().0
    }

    /// The object this step acts on
    pub fn object(&self) -> ObjectRef {
        use Step::*;
        match self {
            SetParameter { to: p, .. } | ResetParameter(p) => p.object_ref(),
            RenameParameter { from, .. } => ObjectRef::new(ObjectKind::Parameter, from),
            CreateExtension(e) | DropExtension(e) => e.object_ref(),
            RenameExtension { from, .. } => ObjectRef::new(ObjectKind::Extension, from),
            CreateEnum(e) | AlterEnum { to: e, .. } | DropEnum(e) => e.object_ref(),
            RenameEnum { from, .. } => ObjectRef::new(ObjectKind::Enum, from),
            CreateFunction(f) | ReplaceFunction { to: f, .. } | DropFunction(f) => f.object_ref(),
            RenameFunction { from, .. } => from.object_ref(),
            CreateTable(t) | DropTable(t) => t.object_ref(),
            RenameTable { from, .. } => ObjectRef::new(ObjectKind::Table, from),
            AddColumn(c) | AlterColumn { to: c, .. } | DropColumn(c) => c.object_ref(),
            RenameColumn { table, from, .. } => ObjectRef::in_table(ObjectKind::Column, table, from),
            CreateIndex(i) | DropIndex(i) => i.object_ref(),
            RenameIndex { table, from, .. } => ObjectRef::in_table(ObjectKind::Index, table, from),
            AddConstraint(c) | DropConstraint(c) => c.object_ref(),
            RenameConstraint { table, from, .. } => {
                ObjectRef::in_table(ObjectKind::Constraint, table, from)
            }
            CreateTrigger(t) | DropTrigger(t) => t.object_ref(),
            RenameTrigger { table, from, .. } => {
                ObjectRef::in_table(ObjectKind::Trigger, table, from)
            }
        }
    }
}

/// A step together with the change record it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub step: Step,
    /// Index into [`SchemaDiff::changes`]
    pub origin: usize,
}

/// Constraints created inside `CREATE TABLE`
pub fn is_inline_constraint(constraint: &Constraint) -> bool {
    matches!(
        constraint.kind,
        ConstraintKind::PrimaryKey | ConstraintKind::Check { .. }
    )
}

fn expand(change: &Change) -> Vec<Step> {
    use Change::*;
    match change.clone() {
        TableAdd(table) => {
            let mut steps = Vec::new();
            for index in &table.indexes {
                steps.push(Step::CreateIndex(index.clone()));
            }
            for constraint in table.constraints.iter().filter(|c| !is_inline_constraint(c)) {
                steps.push(Step::AddConstraint(constraint.clone()));
            }
            for trigger in &table.triggers {
                steps.push(Step::CreateTrigger(trigger.clone()));
            }
            steps.insert(0, Step::CreateTable(table));
            steps
        }
        TableDrop(table) => {
            // Outgoing foreign keys go first so dropped tables can go in any order
            let mut steps: Vec<Step> = table
                .constraints
                .iter()
                .filter(|c| c.is_foreign_key())
                .map(|c| Step::DropConstraint(c.clone()))
                .collect();
            steps.push(Step::DropTable(table));
            steps
        }
        TableRename { from, to } => vec![Step::RenameTable { from, to }],

        ColumnAdd(column) => vec![Step::AddColumn(column)],
        ColumnDrop(column) => vec![Step::DropColumn(column)],
        ColumnModify { from, to, fields } => vec![Step::AlterColumn { from, to, fields }],
        ColumnRename { table, from, to } => vec![Step::RenameColumn { table, from, to }],

        IndexAdd(index) => vec![Step::CreateIndex(index)],
        IndexDrop(index) => vec![Step::DropIndex(index)],
        IndexModify { from, to, .. } => vec![Step::DropIndex(from), Step::CreateIndex(to)],
        IndexRename { table, from, to } => vec![Step::RenameIndex { table, from, to }],

        ConstraintAdd(constraint) => vec![Step::AddConstraint(constraint)],
        ConstraintDrop(constraint) => vec![Step::DropConstraint(constraint)],
        ConstraintModify { from, to, .. } => {
            vec![Step::DropConstraint(from), Step::AddConstraint(to)]
        }
        ConstraintRename { table, from, to } => vec![Step::RenameConstraint { table, from, to }],

        TriggerAdd(trigger) => vec![Step::CreateTrigger(trigger)],
        TriggerDrop(trigger) => vec![Step::DropTrigger(trigger)],
        TriggerModify { from, to, .. } => vec![Step::DropTrigger(from), Step::CreateTrigger(to)],
        TriggerRename { table, from, to } => vec![Step::RenameTrigger { table, from, to }],

        FunctionAdd(function) => vec![Step::CreateFunction(function)],
        FunctionDrop(function) => vec![Step::DropFunction(function)],
        FunctionModify { from, to, .. } => vec![Step::ReplaceFunction { from, to }],
        FunctionRename { from, to } => vec![Step::RenameFunction { from, to }],

        EnumAdd(enum_type) => vec![Step::CreateEnum(enum_type)],
        EnumDrop(enum_type) => vec![Step::DropEnum(enum_type)],
        EnumModify { from, to } => vec![Step::AlterEnum { from, to }],
        EnumRename { from, to } => vec![Step::RenameEnum { from, to }],

        ExtensionAdd(extension) => vec![Step::CreateExtension(extension)],
        ExtensionDrop(extension) => vec![Step::DropExtension(extension)],
        ExtensionRename { from, to } => vec![Step::RenameExtension { from, to }],

        ParameterSet { from, to } => vec![Step::SetParameter { from, to }],
        ParameterReset(parameter) => vec![Step::ResetParameter(parameter)],
        ParameterRename { from, to } => vec![Step::RenameParameter { from, to }],
    }
}

/// Order the steps needed to apply a diff
pub fn plan(diff: &SchemaDiff) -> Vec<Operation> {
    let mut operations: Vec<Operation> = diff
        .changes
        .iter()
        .enumerate()
        .flat_map(|(origin, change)| {
            expand(change)
                .into_iter()
                .map(move |step| Operation { step, origin })
        })
        .collect();

    // Stable, so change-record order survives inside each phase
    operations.sort_by_key(|operation| operation.step.rank());

    let operations = defer_foreign_keys(operations);

    tracing::debug!(
        changes = diff.changes.len(),
        operations = operations.len(),
        "Migration planned"
    );

    operations
}

/// Key a foreign key points at: referenced table plus column set
type KeyTarget = (String, BTreeSet<String>);

fn provided_key(step: &Step) -> Option<KeyTarget> {
    match step {
        Step::AddConstraint(c) if c.is_key() => {
            Some((c.table_name.clone(), c.columns.iter().cloned().collect()))
        }
        _ => None,
    }
}

fn required_key(step: &Step) -> Option<KeyTarget> {
    match step {
        Step::AddConstraint(Constraint {
            kind:
                ConstraintKind::ForeignKey {
                    reference_table,
                    reference_columns,
                    ..
                },
            ..
        }) => Some((
            reference_table.clone(),
            reference_columns.iter().cloned().collect(),
        )),
        _ => None,
    }
}

/// Hold each foreign key back until any key it references that this plan
/// also creates has been added. Otherwise declared order is kept.
fn defer_foreign_keys(operations: Vec<Operation>) -> Vec<Operation> {
    let is_constraint = |o: &Operation| matches!(o.step, Step::AddConstraint(_));
    let (Some(start), Some(last)) = (
        operations.iter().position(is_constraint),
        operations.iter().rposition(is_constraint),
    ) else {
        return operations;
    };

    let mut ordered = operations;
    let tail = ordered.split_off(last + 1);
    let mut pending = ordered.split_off(start);

    while !pending.is_empty() {
        let blocked = |operation: &Operation| match required_key(&operation.step) {
            Some(target) => pending
                .iter()
                .any(|other| provided_key(&other.step).as_ref() == Some(&target)),
            None => false,
        };
        // Keys never wait on foreign keys, so something is always ready
        let next = pending.iter().position(|o| !blocked(o)).unwrap_or(0);
        ordered.push(pending.remove(next));
    }

    ordered.extend(tail);
    ordered
}
