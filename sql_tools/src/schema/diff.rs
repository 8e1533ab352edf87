//! Schema difference calculator
//!
//! Compares a declared schema (the source of truth) with a live snapshot and
//! produces typed change records, one per structural difference.
//!
//! Objects are matched by name. A declared object with no live namesake may
//! still match a live object through an [`Override`] of the same kind, which
//! turns an apparent drop + add into a rename. When several overrides could
//! supply the same declared object, the first in override-list order wins and
//! the rest are reported as `ambiguous_rename` warnings.
//!
//! Live objects that nothing claims are dropped, unless they are marked
//! `synchronize = false`: those are left alone and reported as warnings.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::types::{
    Column, Constraint, ConstraintKind, Enum, Extension, Function, Index, ObjectKind, ObjectRef,
    Override, Parameter, Schema, SchemaObject, Table, Trigger,
};
use crate::utils::naming::{normalize_default, normalize_expression, normalize_sql, normalize_type};

/// Behaviour switches for the comparator
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub allow_table_removal: bool,
    pub allow_column_removal: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            allow_table_removal: true,
            allow_column_removal: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnField {
    Type,
    Nullable,
    Array,
    Default,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexField {
    Columns,
    Unique,
    Using,
    Where,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintField {
    Kind,
    Columns,
    Reference,
    OnUpdate,
    OnDelete,
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerField {
    Timing,
    Actions,
    Scope,
    Function,
    When,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionField {
    Body,
    Arguments,
    Returns,
    Language,
}

/// A single schema change
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table with all of its children
    TableAdd(Table),
    /// Drop a table, cascading to its children
    TableDrop(Table),
    TableRename { from: String, to: String },

    ColumnAdd(Column),
    ColumnDrop(Column),
    ColumnModify {
        from: Column,
        to: Column,
        fields: Vec<ColumnField>,
    },
    ColumnRename { table: String, from: String, to: String },

    IndexAdd(Index),
    IndexDrop(Index),
    /// `from` and `to` may carry different names when an override renamed it
    IndexModify {
        from: Index,
        to: Index,
        fields: Vec<IndexField>,
    },
    IndexRename { table: String, from: String, to: String },

    ConstraintAdd(Constraint),
    ConstraintDrop(Constraint),
    ConstraintModify {
        from: Constraint,
        to: Constraint,
        fields: Vec<ConstraintField>,
    },
    ConstraintRename { table: String, from: String, to: String },

    TriggerAdd(Trigger),
    TriggerDrop(Trigger),
    TriggerModify {
        from: Trigger,
        to: Trigger,
        fields: Vec<TriggerField>,
    },
    TriggerRename { table: String, from: String, to: String },

    FunctionAdd(Function),
    FunctionDrop(Function),
    FunctionModify {
        from: Function,
        to: Function,
        fields: Vec<FunctionField>,
    },
    FunctionRename { from: Function, to: String },

    EnumAdd(Enum),
    EnumDrop(Enum),
    EnumModify { from: Enum, to: Enum },
    EnumRename { from: String, to: String },

    ExtensionAdd(Extension),
    ExtensionDrop(Extension),
    ExtensionRename { from: String, to: String },

    /// Add or change a parameter (`from` is the live value, if any)
    ParameterSet {
        from: Option<Parameter>,
        to: Parameter,
    },
    ParameterReset(Parameter),
    ParameterRename { from: String, to: String },
}

/// What a change does to its object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Add,
    Drop,
    Modify,
    Rename,
}

impl Change {
    pub fn action(&self) -> ChangeAction {
        use Change::*;
        match self {
            TableAdd(_) | ColumnAdd(_) | IndexAdd(_) | ConstraintAdd(_) | TriggerAdd(_)
            | FunctionAdd(_) | EnumAdd(_) | ExtensionAdd(_) => ChangeAction::Add,
            ParameterSet { from: None, .. } => ChangeAction::Add,
            TableDrop(_) | ColumnDrop(_) | IndexDrop(_) | ConstraintDrop(_) | TriggerDrop(_)
            | FunctionDrop(_) | EnumDrop(_) | ExtensionDrop(_) | ParameterReset(_) => {
                ChangeAction::Drop
            }
            ColumnModify { .. } | IndexModify { .. } | ConstraintModify { .. }
            | TriggerModify { .. } | FunctionModify { .. } | EnumModify { .. }
            | ParameterSet { .. } => ChangeAction::Modify,
            TableRename { .. } | ColumnRename { .. } | IndexRename { .. }
            | ConstraintRename { .. } | TriggerRename { .. } | FunctionRename { .. }
            | EnumRename { .. } | ExtensionRename { .. } | ParameterRename { .. } => {
                ChangeAction::Rename
            }
        }
    }

    /// The object this change targets, named as it will be after the change
    pub fn object(&self) -> ObjectRef {
        use Change::*;
        match self {
            TableAdd(t) | TableDrop(t) => t.object_ref(),
            TableRename { to, .. } => ObjectRef::new(ObjectKind::Table, to),
            ColumnAdd(c) | ColumnDrop(c) | ColumnModify { to: c, .. } => c.object_ref(),
            ColumnRename { table, to, .. } => ObjectRef::in_table(ObjectKind::Column, table, to),
            IndexAdd(i) | IndexDrop(i) | IndexModify { to: i, .. } => i.object_ref(),
            IndexRename { table, to, .. } => ObjectRef::in_table(ObjectKind::Index, table, to),
            ConstraintAdd(c) | ConstraintDrop(c) | ConstraintModify { to: c, .. } => {
                c.object_ref()
            }
            ConstraintRename { table, to, .. } => {
                ObjectRef::in_table(ObjectKind::Constraint, table, to)
            }
            TriggerAdd(t) | TriggerDrop(t) | TriggerModify { to: t, .. } => t.object_ref(),
            TriggerRename { table, to, .. } => ObjectRef::in_table(ObjectKind::Trigger, table, to),
            FunctionAdd(f) | FunctionDrop(f) | FunctionModify { to: f, .. } => f.object_ref(),
            FunctionRename { to, .. } => ObjectRef::new(ObjectKind::Function, to),
            EnumAdd(e) | EnumDrop(e) | EnumModify { to: e, .. } => e.object_ref(),
            EnumRename { to, .. } => ObjectRef::new(ObjectKind::Enum, to),
            ExtensionAdd(e) | ExtensionDrop(e) => e.object_ref(),
            ExtensionRename { to, .. } => ObjectRef::new(ObjectKind::Extension, to),
            ParameterSet { to: p, .. } | ParameterReset(p) => p.object_ref(),
            ParameterRename { to, .. } => ObjectRef::new(ObjectKind::Parameter, to),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let object = self.object();
        match self {
            Change::TableRename { from, to }
            | Change::ColumnRename { from, to, .. }
            | Change::IndexRename { from, to, .. }
            | Change::ConstraintRename { from, to, .. }
            | Change::TriggerRename { from, to, .. }
            | Change::EnumRename { from, to }
            | Change::ExtensionRename { from, to }
            | Change::ParameterRename { from, to } => {
                write!(f, "> rename {} {} -> {}", object.kind, from, to)
            }
            Change::FunctionRename { from, to } => {
                write!(f, "> rename function {} -> {}", from.name, to)
            }
            Change::ColumnModify { fields, .. } => write!(f, "~ {} {:?}", object, fields),
            Change::IndexModify { fields, .. } => write!(f, "~ {} {:?}", object, fields),
            Change::ConstraintModify { fields, .. } => write!(f, "~ {} {:?}", object, fields),
            Change::TriggerModify { fields, .. } => write!(f, "~ {} {:?}", object, fields),
            Change::FunctionModify { fields, .. } => write!(f, "~ {} {:?}", object, fields),
            _ => match self.action() {
                ChangeAction::Add => write!(f, "+ {}", object),
                ChangeAction::Drop => write!(f, "- {}", object),
                _ => write!(f, "~ {}", object),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    /// A `synchronize = false` object differs and was left untouched
    SynchronizeSkipped,
    /// More than one override could supply the same declared object
    AmbiguousRename,
    /// A drop was withheld because removal is disabled in [`SyncOptions`]
    DropSuppressed,
}

impl WarningCode {
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::SynchronizeSkipped => "synchronize_skipped",
            WarningCode::AmbiguousRename => "ambiguous_rename",
            WarningCode::DropSuppressed => "drop_suppressed",
        }
    }
}

/// Non-fatal finding reported alongside the plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub code: WarningCode,
    pub object: ObjectRef,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.code(), self.object, self.message)
    }
}

/// Represents changes needed to synchronize two schemas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    pub changes: Vec<Change>,
    pub warnings: Vec<Warning>,
}

impl SchemaDiff {
    /// Diff a declared schema against a live snapshot
    pub fn generate(declared: &Schema, live: &Schema, options: &SyncOptions) -> Self {
        let mut comparator = Comparator {
            options,
            overrides: &declared.overrides,
            diff: SchemaDiff::default(),
        };

        comparator.parameters(&declared.parameters, &live.parameters);
        comparator.extensions(&declared.extensions, &live.extensions);
        comparator.enums(&declared.enums, &live.enums);
        comparator.functions(&declared.functions, &live.functions);
        comparator.tables(&declared.tables, &live.tables);

        let diff = comparator.diff;
        tracing::debug!(
            changes = diff.changes.len(),
            warnings = diff.warnings.len(),
            "Schema comparison finished"
        );
        diff
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}

/// Result of matching one declared or live object
enum Outcome<'a, T, F> {
    Add(&'a T),
    Drop(&'a T),
    Matched {
        live: &'a T,
        declared: &'a T,
        renamed: bool,
        fields: Vec<F>,
    },
}

struct Comparator<'o> {
    options: &'o SyncOptions,
    overrides: &'o [Override],
    diff: SchemaDiff,
}

impl<'o> Comparator<'o> {
    fn warn(&mut self, code: WarningCode, object: ObjectRef, message: String) {
        tracing::warn!(code = code.code(), object = %object, "{}", message);
        self.diff.warnings.push(Warning {
            code,
            object,
            message,
        });
    }

    /// Overrides of this kind that could turn a live object into `declared`
    fn rename_sources<T: SchemaObject>(&self, declared: &T) -> Vec<&'o Override> {
        self.overrides
            .iter()
            .filter(|o| o.kind == T::KIND && o.to == declared.name())
            .filter(|o| match (&o.table_name, declared.table_name()) {
                (Some(scope), Some(table)) => scope == table,
                _ => true,
            })
            .collect()
    }

    /// Shared matching strategy for every object kind
    fn resolve<'a, T, F>(
        &mut self,
        declared: &'a [T],
        live: &'a [T],
        compare: impl Fn(&T, &T) -> Vec<F>,
    ) -> Vec<Outcome<'a, T, F>>
    where
        T: SchemaObject,
    {
        let by_name: IndexMap<&str, &T> = live.iter().map(|o| (o.name(), o)).collect();

        // Direct name matches are claimed first so overrides never steal them
        let mut claimed: HashSet<&str> = declared
            .iter()
            .map(|d| d.name())
            .filter(|name| by_name.contains_key(name))
            .collect();

        let mut outcomes = Vec::new();

        for object in declared {
            let (live_match, renamed) = match by_name.get(object.name()) {
                Some(found) => (Some(*found), false),
                None => {
                    let viable: Vec<&T> = self
                        .rename_sources(object)
                        .into_iter()
                        .filter_map(|o| by_name.get(o.from.as_str()).copied())
                        .filter(|candidate| !claimed.contains(candidate.name()))
                        .collect();

                    if viable.len() > 1 {
                        let others: Vec<&str> = viable[1..].iter().map(|c| c.name()).collect();
                        self.warn(
                            WarningCode::AmbiguousRename,
                            object.object_ref(),
                            format!(
                                "renamed from '{}'; overrides from {:?} also match",
                                viable[0].name(),
                                others
                            ),
                        );
                    }

                    match viable.first() {
                        Some(source) => {
                            claimed.insert(source.name());
                            (Some(*source), true)
                        }
                        None => (None, false),
                    }
                }
            };

            let outcome = match live_match {
                Some(live_object) => Outcome::Matched {
                    live: live_object,
                    declared: object,
                    renamed,
                    fields: compare(live_object, object),
                },
                None => Outcome::Add(object),
            };

            // Either side opting out leaves the pair untouched. A declared object
            // landing on an unmanaged live one is always reported.
            let live_skipped = live_match.is_some_and(|l| !l.synchronize());
            if !object.synchronize() || live_skipped {
                let differs = match &outcome {
                    Outcome::Matched {
                        renamed, fields, ..
                    } => *renamed || !fields.is_empty(),
                    _ => true,
                };
                if differs || live_skipped {
                    self.warn(
                        WarningCode::SynchronizeSkipped,
                        object.object_ref(),
                        "object is not synchronized; differences left in place".to_string(),
                    );
                }
                continue;
            }

            outcomes.push(outcome);
        }

        for object in live {
            if claimed.contains(object.name()) {
                continue;
            }
            if object.synchronize() {
                outcomes.push(Outcome::Drop(object));
            } else {
                self.warn(
                    WarningCode::SynchronizeSkipped,
                    object.object_ref(),
                    "live object is not synchronized and was not dropped".to_string(),
                );
            }
        }

        outcomes
    }

    fn push(&mut self, change: Change) {
        tracing::trace!(change = %change, "Change recorded");
        self.diff.changes.push(change);
    }

    fn parameters(&mut self, declared: &[Parameter], live: &[Parameter]) {
        for outcome in self.resolve(declared, live, |l, d| {
            if l.value != d.value {
                vec![()]
            } else {
                Vec::new()
            }
        }) {
            match outcome {
                Outcome::Add(p) => self.push(Change::ParameterSet {
                    from: None,
                    to: p.clone(),
                }),
                Outcome::Drop(p) => self.push(Change::ParameterReset(p.clone())),
                Outcome::Matched {
                    live,
                    declared,
                    renamed,
                    fields,
                } => {
                    if renamed {
                        self.push(Change::ParameterRename {
                            from: live.name.clone(),
                            to: declared.name.clone(),
                        });
                    }
                    if !fields.is_empty() {
                        self.push(Change::ParameterSet {
                            from: Some(live.clone()),
                            to: declared.clone(),
                        });
                    }
                }
            }
        }
    }

    fn extensions(&mut self, declared: &[Extension], live: &[Extension]) {
        for outcome in self.resolve(declared, live, |_, _| Vec::<()>::new()) {
            match outcome {
                Outcome::Add(e) => self.push(Change::ExtensionAdd(e.clone())),
                Outcome::Drop(e) => self.push(Change::ExtensionDrop(e.clone())),
                Outcome::Matched {
                    live,
                    declared,
                    renamed: true,
                    ..
                } => self.push(Change::ExtensionRename {
                    from: live.name.clone(),
                    to: declared.name.clone(),
                }),
                Outcome::Matched { .. } => {}
            }
        }
    }

    fn enums(&mut self, declared: &[Enum], live: &[Enum]) {
        for outcome in self.resolve(declared, live, |l, d| {
            if l.values != d.values {
                vec![()]
            } else {
                Vec::new()
            }
        }) {
            match outcome {
                Outcome::Add(e) => self.push(Change::EnumAdd(e.clone())),
                Outcome::Drop(e) => self.push(Change::EnumDrop(e.clone())),
                Outcome::Matched {
                    live,
                    declared,
                    renamed,
                    fields,
                } => {
                    if renamed {
                        self.push(Change::EnumRename {
                            from: live.name.clone(),
                            to: declared.name.clone(),
                        });
                    }
                    if !fields.is_empty() {
                        self.push(Change::EnumModify {
                            from: live.clone(),
                            to: declared.clone(),
                        });
                    }
                }
            }
        }
    }

    fn functions(&mut self, declared: &[Function], live: &[Function]) {
        for outcome in self.resolve(declared, live, function_fields) {
            match outcome {
                Outcome::Add(f) => self.push(Change::FunctionAdd(f.clone())),
                Outcome::Drop(f) => self.push(Change::FunctionDrop(f.clone())),
                Outcome::Matched {
                    live,
                    declared,
                    renamed,
                    fields,
                } => {
                    if renamed {
                        self.push(Change::FunctionRename {
                            from: live.clone(),
                            to: declared.name.clone(),
                        });
                    }
                    if !fields.is_empty() {
                        let mut from = live.clone();
                        from.name = declared.name.clone();
                        self.push(Change::FunctionModify {
                            from,
                            to: declared.clone(),
                            fields,
                        });
                    }
                }
            }
        }
    }

    fn tables(&mut self, declared: &[Table], live: &[Table]) {
        for outcome in self.resolve(declared, live, |_, _| Vec::<()>::new()) {
            match outcome {
                Outcome::Add(t) => self.push(Change::TableAdd(t.clone())),
                Outcome::Drop(t) => {
                    if self.options.allow_table_removal {
                        self.push(Change::TableDrop(t.clone()));
                    } else {
                        self.warn(
                            WarningCode::DropSuppressed,
                            t.object_ref(),
                            "table removal is disabled".to_string(),
                        );
                    }
                }
                Outcome::Matched {
                    live,
                    declared,
                    renamed,
                    ..
                } => {
                    if renamed {
                        self.push(Change::TableRename {
                            from: live.name.clone(),
                            to: declared.name.clone(),
                        });
                    }
                    self.columns(declared, live);
                    self.indexes(&declared.indexes, &live.indexes);
                    self.constraints(&declared.constraints, &live.constraints);
                    self.triggers(declared, live);
                }
            }
        }
    }

    fn columns(&mut self, declared: &Table, live: &Table) {
        for outcome in self.resolve(&declared.columns, &live.columns, column_fields) {
            match outcome {
                Outcome::Add(c) => self.push(Change::ColumnAdd(c.clone())),
                Outcome::Drop(c) => {
                    if self.options.allow_column_removal {
                        self.push(Change::ColumnDrop(c.clone()));
                    } else {
                        self.warn(
                            WarningCode::DropSuppressed,
                            c.object_ref(),
                            "column removal is disabled".to_string(),
                        );
                    }
                }
                Outcome::Matched {
                    live: column,
                    declared: target,
                    renamed,
                    fields,
                } => {
                    if renamed {
                        self.push(Change::ColumnRename {
                            table: declared.name.clone(),
                            from: column.name.clone(),
                            to: target.name.clone(),
                        });
                    }
                    if !fields.is_empty() {
                        self.push(Change::ColumnModify {
                            from: column.clone(),
                            to: target.clone(),
                            fields,
                        });
                    }
                }
            }
        }
    }

    fn indexes(&mut self, declared: &[Index], live: &[Index]) {
        for outcome in self.resolve(declared, live, index_fields) {
            match outcome {
                Outcome::Add(i) => self.push(Change::IndexAdd(i.clone())),
                Outcome::Drop(i) => self.push(Change::IndexDrop(i.clone())),
                Outcome::Matched {
                    live,
                    declared,
                    renamed,
                    fields,
                } => {
                    if !fields.is_empty() {
                        // Recreated under the declared name, which also covers a rename
                        self.push(Change::IndexModify {
                            from: live.clone(),
                            to: declared.clone(),
                            fields,
                        });
                    } else if renamed {
                        self.push(Change::IndexRename {
                            table: declared.table_name.clone(),
                            from: live.name.clone(),
                            to: declared.name.clone(),
                        });
                    }
                }
            }
        }
    }

    fn constraints(&mut self, declared: &[Constraint], live: &[Constraint]) {
        for outcome in self.resolve(declared, live, constraint_fields) {
            match outcome {
                Outcome::Add(c) => self.push(Change::ConstraintAdd(c.clone())),
                Outcome::Drop(c) => self.push(Change::ConstraintDrop(c.clone())),
                Outcome::Matched {
                    live,
                    declared,
                    renamed,
                    fields,
                } => {
                    if !fields.is_empty() {
                        self.push(Change::ConstraintModify {
                            from: live.clone(),
                            to: declared.clone(),
                            fields,
                        });
                    } else if renamed {
                        self.push(Change::ConstraintRename {
                            table: declared.table_name.clone(),
                            from: live.name.clone(),
                            to: declared.name.clone(),
                        });
                    }
                }
            }
        }
    }

    fn triggers(&mut self, declared: &Table, live: &Table) {
        for outcome in self.resolve(&declared.triggers, &live.triggers, trigger_fields) {
            match outcome {
                Outcome::Add(t) => self.push(Change::TriggerAdd(t.clone())),
                Outcome::Drop(t) => self.push(Change::TriggerDrop(t.clone())),
                Outcome::Matched {
                    live: trigger,
                    declared: target,
                    renamed,
                    fields,
                } => {
                    if !fields.is_empty() {
                        self.push(Change::TriggerModify {
                            from: trigger.clone(),
                            to: target.clone(),
                            fields,
                        });
                    } else if renamed {
                        self.push(Change::TriggerRename {
                            table: declared.name.clone(),
                            from: trigger.name.clone(),
                            to: target.name.clone(),
                        });
                    }
                }
            }
        }
    }
}

fn normalized_default(column: &Column) -> Option<String> {
    column.default.as_deref().map(normalize_default)
}

/// Column equality. The primary flag is carried by the primary key constraint, not the column.
pub fn column_fields(live: &Column, declared: &Column) -> Vec<ColumnField> {
    let mut fields = Vec::new();
    if normalize_type(&live.data_type) != normalize_type(&declared.data_type) {
        fields.push(ColumnField::Type);
    }
    if live.nullable != declared.nullable {
        fields.push(ColumnField::Nullable);
    }
    if live.is_array != declared.is_array {
        fields.push(ColumnField::Array);
    }
    if normalized_default(live) != normalized_default(declared) {
        fields.push(ColumnField::Default);
    }
    if live.comment != declared.comment {
        fields.push(ColumnField::Comment);
    }
    fields
}

fn index_method(index: &Index) -> String {
    index.using.as_deref().unwrap_or("btree").to_lowercase()
}

/// Index equality is order-sensitive on the column list
pub fn index_fields(live: &Index, declared: &Index) -> Vec<IndexField> {
    let mut fields = Vec::new();
    if live.columns != declared.columns {
        fields.push(IndexField::Columns);
    }
    if live.unique != declared.unique {
        fields.push(IndexField::Unique);
    }
    if index_method(live) != index_method(declared) {
        fields.push(IndexField::Using);
    }
    let predicate = |i: &Index| i.where_clause.as_deref().map(normalize_expression);
    if predicate(live) != predicate(declared) {
        fields.push(IndexField::Where);
    }
    fields
}

pub fn constraint_fields(live: &Constraint, declared: &Constraint) -> Vec<ConstraintField> {
    let mut fields = Vec::new();
    // A check's column list is derived from its expression
    let is_check = matches!(declared.kind, ConstraintKind::Check { .. });
    if !is_check && live.columns != declared.columns {
        fields.push(ConstraintField::Columns);
    }

    match (&live.kind, &declared.kind) {
        (ConstraintKind::PrimaryKey, ConstraintKind::PrimaryKey)
        | (ConstraintKind::Unique, ConstraintKind::Unique) => {}
        (
            ConstraintKind::ForeignKey {
                reference_table: live_table,
                reference_columns: live_columns,
                on_update: live_update,
                on_delete: live_delete,
            },
            ConstraintKind::ForeignKey {
                reference_table,
                reference_columns,
                on_update,
                on_delete,
            },
        ) => {
            if live_table != reference_table || live_columns != reference_columns {
                fields.push(ConstraintField::Reference);
            }
            if live_update.unwrap_or_default() != on_update.unwrap_or_default() {
                fields.push(ConstraintField::OnUpdate);
            }
            if live_delete.unwrap_or_default() != on_delete.unwrap_or_default() {
                fields.push(ConstraintField::OnDelete);
            }
        }
        (
            ConstraintKind::Check {
                expression: live_expression,
            },
            ConstraintKind::Check { expression },
        ) => {
            if normalize_expression(live_expression) != normalize_expression(expression) {
                fields.push(ConstraintField::Expression);
            }
        }
        _ => fields.push(ConstraintField::Kind),
    }

    fields
}

pub fn trigger_fields(live: &Trigger, declared: &Trigger) -> Vec<TriggerField> {
    let mut fields = Vec::new();
    if live.timing != declared.timing {
        fields.push(TriggerField::Timing);
    }
    // `INSERT OR UPDATE` and `UPDATE OR INSERT` are the same trigger
    let same_actions = live.actions.len() == declared.actions.len()
        && live.actions.iter().all(|a| declared.actions.contains(a));
    if !same_actions {
        fields.push(TriggerField::Actions);
    }
    if live.scope != declared.scope {
        fields.push(TriggerField::Scope);
    }
    if live.function_name != declared.function_name {
        fields.push(TriggerField::Function);
    }
    let condition = |t: &Trigger| t.when.as_deref().map(normalize_expression);
    if condition(live) != condition(declared) {
        fields.push(TriggerField::When);
    }
    fields
}

/// Function equality compares normalized body text and the signature
pub fn function_fields(live: &Function, declared: &Function) -> Vec<FunctionField> {
    let mut fields = Vec::new();
    if normalize_sql(&live.body) != normalize_sql(&declared.body) {
        fields.push(FunctionField::Body);
    }
    if normalize_sql(&live.arguments).to_lowercase()
        != normalize_sql(&declared.arguments).to_lowercase()
    {
        fields.push(FunctionField::Arguments);
    }
    if normalize_type(&live.returns) != normalize_type(&declared.returns) {
        fields.push(FunctionField::Returns);
    }
    if !live.language.eq_ignore_ascii_case(&declared.language) {
        fields.push(FunctionField::Language);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{ActionType, TriggerAction, TriggerScope, TriggerTiming};
    use pretty_assertions::assert_eq;

    fn column(table: &str, name: &str, data_type: &str) -> Column {
        Column::new(table, name, data_type)
    }

    fn table(name: &str, columns: &[(&str, &str)]) -> Table {
        let mut table = Table::new(name);
        for (column_name, data_type) in columns {
            table.add_column(column(name, column_name, data_type));
        }
        table
    }

    fn schema(tables: Vec<Table>) -> Schema {
        let mut schema = Schema::new("postgres", "public");
        schema.tables = tables;
        schema
    }

    fn diff(declared: &Schema, live: &Schema) -> SchemaDiff {
        SchemaDiff::generate(declared, live, &SyncOptions::default())
    }

    #[test]
    fn test_diff_empty_schemas() {
        let result = diff(&schema(vec![]), &schema(vec![]));
        assert!(result.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_diff_add_and_drop_table() {
        let declared = schema(vec![table("users", &[("id", "uuid")])]);
        let live = schema(vec![table("legacy", &[("id", "uuid")])]);

        let result = diff(&declared, &live);
        assert_eq!(
            result.changes,
            vec![
                Change::TableAdd(declared.tables[0].clone()),
                Change::TableDrop(live.tables[0].clone()),
            ]
        );
    }

    #[test]
    fn test_diff_column_modify_fields() {
        let mut target = column("users", "email", "varchar(255)");
        target.nullable = true;
        target.default = Some("'none'".to_string());
        let mut current = column("users", "email", "character varying(255)");
        current.default = Some("'none'::character varying".to_string());

        assert_eq!(column_fields(&current, &target), vec![ColumnField::Nullable]);
    }

    #[test]
    fn test_diff_index_column_order_matters() {
        let index = |columns: &[&str]| Index {
            name: "IDX_a_b".to_string(),
            table_name: "t".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            using: None,
            where_clause: None,
            synchronize: true,
        };
        assert_eq!(
            index_fields(&index(&["a", "b"]), &index(&["b", "a"])),
            vec![IndexField::Columns]
        );
        let mut explicit = index(&["a", "b"]);
        explicit.using = Some("btree".to_string());
        assert!(index_fields(&index(&["a", "b"]), &explicit).is_empty());
    }

    #[test]
    fn test_diff_foreign_key_actions() {
        let fk = |on_delete: Option<ActionType>| Constraint {
            name: "FK_1".to_string(),
            table_name: "posts".to_string(),
            columns: vec!["authorId".to_string()],
            kind: ConstraintKind::ForeignKey {
                reference_table: "users".to_string(),
                reference_columns: vec!["id".to_string()],
                on_update: None,
                on_delete,
            },
            synchronize: true,
        };

        assert!(constraint_fields(&fk(None), &fk(Some(ActionType::NoAction))).is_empty());
        assert_eq!(
            constraint_fields(&fk(None), &fk(Some(ActionType::Cascade))),
            vec![ConstraintField::OnDelete]
        );
    }

    #[test]
    fn test_diff_enum_reorder_is_a_change() {
        let status = |values: &[&str]| Enum {
            name: "status".to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            synchronize: true,
        };
        let mut declared = schema(vec![]);
        declared.enums.push(status(&["b", "a"]));
        let mut live = schema(vec![]);
        live.enums.push(status(&["a", "b"]));

        let result = diff(&declared, &live);
        assert_eq!(
            result.changes,
            vec![Change::EnumModify {
                from: live.enums[0].clone(),
                to: declared.enums[0].clone(),
            }]
        );
    }

    #[test]
    fn test_diff_trigger_actions_are_unordered() {
        let trigger = |actions: Vec<TriggerAction>| Trigger {
            name: "t".to_string(),
            table_name: "users".to_string(),
            timing: TriggerTiming::Before,
            actions,
            scope: TriggerScope::Row,
            function_name: "touch".to_string(),
            when: None,
            synchronize: true,
        };
        assert!(trigger_fields(
            &trigger(vec![TriggerAction::Insert, TriggerAction::Update]),
            &trigger(vec![TriggerAction::Update, TriggerAction::Insert]),
        )
        .is_empty());
    }

    #[test]
    fn test_diff_function_body_whitespace() {
        let function = |body: &str| Function {
            name: "touch".to_string(),
            arguments: String::new(),
            returns: "trigger".to_string(),
            language: "plpgsql".to_string(),
            body: body.to_string(),
            identity_arguments: None,
            synchronize: true,
        };
        assert!(function_fields(
            &function("\n  BEGIN\n    RETURN NEW;\n  END\n"),
            &function("BEGIN RETURN NEW; END"),
        )
        .is_empty());
    }

    #[test]
    fn test_diff_column_rename_through_override() {
        let mut declared = schema(vec![table("users", &[("id", "uuid"), ("fullName", "text")])]);
        declared.overrides.push(Override::new(ObjectKind::Column, "name", "fullName").on_table("users"));
        let live = schema(vec![table("users", &[("id", "uuid"), ("name", "text")])]);

        let result = diff(&declared, &live);
        assert_eq!(
            result.changes,
            vec![Change::ColumnRename {
                table: "users".to_string(),
                from: "name".to_string(),
                to: "fullName".to_string(),
            }]
        );
    }

    #[test]
    fn test_diff_override_scoped_to_other_table_is_ignored() {
        let mut declared = schema(vec![table("users", &[("fullName", "text")])]);
        declared.overrides.push(Override::new(ObjectKind::Column, "name", "fullName").on_table("posts"));
        let live = schema(vec![table("users", &[("name", "text")])]);

        let result = diff(&declared, &live);
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.changes[0].action(), ChangeAction::Add);
        assert_eq!(result.changes[1].action(), ChangeAction::Drop);
    }

    #[test]
    fn test_diff_ambiguous_rename_first_override_wins() {
        let mut declared = schema(vec![table("accounts", &[("id", "uuid")])]);
        declared.overrides.push(Override::new(ObjectKind::Table, "users", "accounts"));
        declared.overrides.push(Override::new(ObjectKind::Table, "members", "accounts"));
        let live = schema(vec![
            table("members", &[("id", "uuid")]),
            table("users", &[("id", "uuid")]),
        ]);

        let result = diff(&declared, &live);
        assert_eq!(
            result.changes,
            vec![
                Change::TableRename {
                    from: "users".to_string(),
                    to: "accounts".to_string(),
                },
                Change::TableDrop(live.tables[0].clone()),
            ]
        );
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, WarningCode::AmbiguousRename);
    }

    #[test]
    fn test_diff_declared_unsynchronized_table_is_skipped() {
        let mut managed = table("audit", &[("id", "uuid"), ("extra", "text")]);
        managed.synchronize = false;
        let declared = schema(vec![managed]);
        let live = schema(vec![table("audit", &[("id", "uuid")])]);

        let result = diff(&declared, &live);
        assert!(result.changes.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_diff_drop_suppressed_by_options() {
        let declared = schema(vec![table("users", &[("id", "uuid")])]);
        let live = schema(vec![
            table("users", &[("id", "uuid"), ("old", "text")]),
            table("legacy", &[("id", "uuid")]),
        ]);
        let options = SyncOptions {
            allow_table_removal: false,
            allow_column_removal: false,
        };

        let result = SchemaDiff::generate(&declared, &live, &options);
        assert!(result.changes.is_empty());
        let codes: Vec<WarningCode> = result.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::DropSuppressed, WarningCode::DropSuppressed]);
    }

    #[test]
    fn test_diff_live_unsynchronized_table_is_not_recreated() {
        let declared = schema(vec![table("migrations", &[("id", "integer"), ("name", "text")])]);
        let mut unmanaged = table("migrations", &[("id", "integer")]);
        unmanaged.synchronize = false;
        let live = schema(vec![unmanaged]);

        let result = diff(&declared, &live);
        assert_eq!(result.changes, vec![]);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, WarningCode::SynchronizeSkipped);
        assert_eq!(result.warnings[0].object, ObjectRef::new(ObjectKind::Table, "migrations"));
    }

    #[test]
    fn test_diff_primary_flag_alone_is_not_a_column_change() {
        let mut declared_table = table("users", &[("id", "uuid")]);
        declared_table.columns[0].primary = true;
        let declared = schema(vec![declared_table]);
        let live = schema(vec![table("users", &[("id", "uuid")])]);

        let result = diff(&declared, &live);
        assert_eq!(result.changes, vec![]);
    }
}
