//! Migration generator
//!
//! Renders planned steps as PostgreSQL DDL. Rendering is pure: the same steps
//! always produce the same statements. Identifiers are always double-quoted,
//! and tables, types and functions outside `public` are schema-qualified.

use crate::error::{GenerationError, GenerationReason};
use crate::schema::diff::ColumnField;
use crate::schema::planner::{is_inline_constraint, Operation, Step};
use crate::schema::types::{
    Column, Constraint, ConstraintKind, Enum, Function, Index, ObjectKind, ObjectRef,
    SchemaObject, Table, Trigger, TriggerAction, TriggerScope, TriggerTiming,
};
use crate::utils::naming::{normalize_sql, normalize_type, quote_identifier, quote_list, quote_literal};

type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Objects in this schema are written without a qualifier
const DEFAULT_SCHEMA: &str = "public";

/// Render every operation for `schema_name`, in order
pub fn generate(operations: &[Operation], schema_name: &str) -> GenerationResult<Vec<String>> {
    SqlGenerator::new(schema_name).generate(operations)
}

/// DDL renderer bound to the schema the plan targets
#[derive(Debug, Clone, Copy)]
pub struct SqlGenerator<'a> {
    schema_name: &'a str,
}

impl<'a> SqlGenerator<'a> {
    pub fn new(schema_name: &'a str) -> Self {
        Self { schema_name }
    }

    pub fn generate(&self, operations: &[Operation]) -> GenerationResult<Vec<String>> {
        let mut statements = Vec::new();
        for operation in operations {
            statements.extend(self.generate_step(&operation.step)?);
        }
        tracing::debug!(
            schema = self.schema_name,
            statements = statements.len(),
            "Generated migration SQL"
        );
        Ok(statements)
    }

    /// Quoted name of a schema-level object
    fn qualify(&self, name: &str) -> String {
        if self.schema_name == DEFAULT_SCHEMA {
            quote_identifier(name)
        } else {
            format!("{}.{}", quote_identifier(self.schema_name), quote_identifier(name))
        }
    }

    /// `name(argument types)`, the form DROP and ALTER FUNCTION accept
    fn function_signature(&self, function: &Function) -> String {
        format!("{}({})", self.qualify(&function.name), function.identity_arguments())
    }

    /// Render a single step, which may take more than one statement
    pub fn generate_step(&self, step: &Step) -> GenerationResult<Vec<String>> {
        use crate::utils::naming::quote_identifier as q;

        let statements = match step {
            Step::SetParameter { to, .. } => vec![format!(
                "ALTER DATABASE {} SET {} TO {};",
                q(&to.database_name),
                to.name,
                to.value
            )],
            Step::ResetParameter(parameter) => vec![format!(
                "ALTER DATABASE {} RESET {};",
                q(&parameter.database_name),
                parameter.name
            )],
            Step::RenameParameter { from, .. } => {
                return Err(unsupported_rename(ObjectRef::new(ObjectKind::Parameter, from)))
            }

            Step::CreateExtension(extension) => {
                vec![format!("CREATE EXTENSION IF NOT EXISTS {};", q(&extension.name))]
            }
            Step::DropExtension(extension) => vec![format!("DROP EXTENSION {};", q(&extension.name))],
            Step::RenameExtension { from, .. } => {
                return Err(unsupported_rename(ObjectRef::new(ObjectKind::Extension, from)))
            }

            Step::CreateEnum(enum_type) => vec![format!(
                "CREATE TYPE {} AS ENUM ({});",
                self.qualify(&enum_type.name),
                enum_type
                    .values
                    .iter()
                    .map(|v| quote_literal(v))
                    .collect::<Vec<_>>()
                    .join(", ")
            )],
            Step::AlterEnum { from, to } => self.alter_enum(from, to)?,
            Step::DropEnum(enum_type) => vec![format!("DROP TYPE {};", self.qualify(&enum_type.name))],
            Step::RenameEnum { from, to } => {
                vec![format!("ALTER TYPE {} RENAME TO {};", self.qualify(from), q(to))]
            }

            Step::CreateFunction(function) => vec![self.create_function(function)],
            Step::ReplaceFunction { from, to } => {
                let same_arguments = normalize_sql(&from.arguments).to_lowercase()
                    == normalize_sql(&to.arguments).to_lowercase();
                if !same_arguments || normalize_type(&from.returns) != normalize_type(&to.returns) {
                    return Err(GenerationError::new(
                        to.object_ref(),
                        GenerationReason::FunctionSignatureChange,
                        format!(
                            "{}({}) returns {} cannot become {}({}) returns {}",
                            from.name, from.arguments, from.returns, to.name, to.arguments, to.returns
                        ),
                    ));
                }
                vec![self.create_function(to)]
            }
            Step::DropFunction(function) => {
                vec![format!("DROP FUNCTION {};", self.function_signature(function))]
            }
            Step::RenameFunction { from, to } => vec![format!(
                "ALTER FUNCTION {} RENAME TO {};",
                self.function_signature(from),
                q(to)
            )],

            Step::CreateTable(table) => self.create_table(table),
            Step::DropTable(table) => vec![format!("DROP TABLE {};", self.qualify(&table.name))],
            Step::RenameTable { from, to } => {
                vec![format!("ALTER TABLE {} RENAME TO {};", self.qualify(from), q(to))]
            }

            Step::AddColumn(column) => {
                let mut statements = vec![format!(
                    "ALTER TABLE {} ADD {};",
                    self.qualify(&column.table_name),
                    column_definition(column)
                )];
                statements.extend(self.column_comment(column));
                statements
            }
            Step::AlterColumn { from, to, fields } => self.alter_column(from, to, fields)?,
            Step::DropColumn(column) => vec![format!(
                "ALTER TABLE {} DROP COLUMN {};",
                self.qualify(&column.table_name),
                q(&column.name)
            )],
            Step::RenameColumn { table, from, to } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                self.qualify(table),
                q(from),
                q(to)
            )],

            Step::CreateIndex(index) => vec![self.create_index(index)],
            Step::DropIndex(index) => vec![format!("DROP INDEX {};", self.qualify(&index.name))],
            Step::RenameIndex { from, to, .. } => {
                vec![format!("ALTER INDEX {} RENAME TO {};", self.qualify(from), q(to))]
            }

            Step::AddConstraint(constraint) => vec![format!(
                "ALTER TABLE {} ADD CONSTRAINT {} {};",
                self.qualify(&constraint.table_name),
                q(&constraint.name),
                self.constraint_definition(constraint)
            )],
            Step::DropConstraint(constraint) => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {};",
                self.qualify(&constraint.table_name),
                q(&constraint.name)
            )],
            Step::RenameConstraint { table, from, to } => vec![format!(
                "ALTER TABLE {} RENAME CONSTRAINT {} TO {};",
                self.qualify(table),
                q(from),
                q(to)
            )],

            Step::CreateTrigger(trigger) => vec![self.create_trigger(trigger)],
            Step::DropTrigger(trigger) => vec![format!(
                "DROP TRIGGER {} ON {};",
                q(&trigger.name),
                self.qualify(&trigger.table_name)
            )],
            Step::RenameTrigger { table, from, to } => vec![format!(
                "ALTER TRIGGER {} ON {} RENAME TO {};",
                q(from),
                self.qualify(table),
                q(to)
            )],
        };

        Ok(statements)
    }

    fn column_comment(&self, column: &Column) -> Option<String> {
        column.comment.as_ref().map(|comment| {
            format!(
                "COMMENT ON COLUMN {}.{} IS {};",
                self.qualify(&column.table_name),
                quote_identifier(&column.name),
                quote_literal(comment)
            )
        })
    }

    fn create_table(&self, table: &Table) -> Vec<String> {
        let mut definitions: Vec<String> = table.columns.iter().map(column_definition).collect();

        for constraint in table.constraints.iter().filter(|c| is_inline_constraint(c)) {
            definitions.push(format!(
                "CONSTRAINT {} {}",
                quote_identifier(&constraint.name),
                self.constraint_definition(constraint)
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} ({});",
            self.qualify(&table.name),
            definitions.join(", ")
        )];
        statements.extend(table.columns.iter().filter_map(|c| self.column_comment(c)));
        statements
    }

    fn alter_column(
        &self,
        from: &Column,
        to: &Column,
        fields: &[ColumnField],
    ) -> GenerationResult<Vec<String>> {
        if from.is_array != to.is_array {
            return Err(GenerationError::new(
                to.object_ref(),
                GenerationReason::ArrayConversion,
                format!("cannot convert {} to {}", from.sql_type(), to.sql_type()),
            ));
        }

        let alter = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.qualify(&to.table_name),
            quote_identifier(&to.name)
        );

        let mut statements = Vec::new();
        for field in fields {
            match field {
                ColumnField::Type => statements.push(format!(
                    "{} TYPE {} USING {}::{};",
                    alter,
                    to.sql_type(),
                    quote_identifier(&to.name),
                    to.sql_type()
                )),
                ColumnField::Nullable if to.nullable => {
                    statements.push(format!("{} DROP NOT NULL;", alter))
                }
                ColumnField::Nullable => statements.push(format!("{} SET NOT NULL;", alter)),
                ColumnField::Default => match &to.default {
                    Some(default) => statements.push(format!("{} SET DEFAULT {};", alter, default)),
                    None => statements.push(format!("{} DROP DEFAULT;", alter)),
                },
                ColumnField::Comment => statements.push(format!(
                    "COMMENT ON COLUMN {}.{} IS {};",
                    self.qualify(&to.table_name),
                    quote_identifier(&to.name),
                    to.comment
                        .as_deref()
                        .map(quote_literal)
                        .unwrap_or_else(|| "NULL".to_string())
                )),
                // Rejected above
                ColumnField::Array => {}
            }
        }

        Ok(statements)
    }

    fn create_index(&self, index: &Index) -> String {
        let mut sql = format!(
            "CREATE {}INDEX {} ON {}",
            if index.unique { "UNIQUE " } else { "" },
            quote_identifier(&index.name),
            self.qualify(&index.table_name)
        );
        if let Some(method) = &index.using {
            sql.push_str(&format!(" USING {}", method));
        }
        sql.push_str(&format!(" ({})", quote_list(&index.columns)));
        if let Some(predicate) = &index.where_clause {
            sql.push_str(&format!(" WHERE {}", predicate));
        }
        sql.push(';');
        sql
    }

    fn constraint_definition(&self, constraint: &Constraint) -> String {
        match &constraint.kind {
            ConstraintKind::PrimaryKey => format!("PRIMARY KEY ({})", quote_list(&constraint.columns)),
            ConstraintKind::Unique => format!("UNIQUE ({})", quote_list(&constraint.columns)),
            ConstraintKind::Check { expression } => format!("CHECK ({})", expression),
            ConstraintKind::ForeignKey {
                reference_table,
                reference_columns,
                on_update,
                on_delete,
            } => {
                let mut sql = format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_list(&constraint.columns),
                    self.qualify(reference_table),
                    quote_list(reference_columns)
                );
                // NO ACTION is the default and is left implicit
                if let Some(action) = on_update.filter(|a| a.as_sql() != "NO ACTION") {
                    sql.push_str(&format!(" ON UPDATE {}", action.as_sql()));
                }
                if let Some(action) = on_delete.filter(|a| a.as_sql() != "NO ACTION") {
                    sql.push_str(&format!(" ON DELETE {}", action.as_sql()));
                }
                sql
            }
        }
    }

    fn create_trigger(&self, trigger: &Trigger) -> String {
        let timing = match trigger.timing {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        };
        let actions = trigger
            .actions
            .iter()
            .map(|action| match action {
                TriggerAction::Insert => "INSERT",
                TriggerAction::Update => "UPDATE",
                TriggerAction::Delete => "DELETE",
                TriggerAction::Truncate => "TRUNCATE",
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        let scope = match trigger.scope {
            TriggerScope::Row => "ROW",
            TriggerScope::Statement => "STATEMENT",
        };

        let mut sql = format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH {}",
            quote_identifier(&trigger.name),
            timing,
            actions,
            self.qualify(&trigger.table_name),
            scope
        );
        if let Some(condition) = &trigger.when {
            sql.push_str(&format!(" WHEN ({})", condition));
        }
        sql.push_str(&format!(
            " EXECUTE FUNCTION {}();",
            self.qualify(&trigger.function_name)
        ));
        sql
    }

    fn create_function(&self, function: &Function) -> String {
        let tag = if function.body.contains("$$") { "$fn$" } else { "$$" };
        format!(
            "CREATE OR REPLACE FUNCTION {}({}) RETURNS {} LANGUAGE {} AS {}{}{};",
            self.qualify(&function.name),
            function.arguments,
            function.returns,
            function.language,
            tag,
            function.body,
            tag
        )
    }

    /// Labels can only be added. Existing labels must keep their relative order.
    fn alter_enum(&self, from: &Enum, to: &Enum) -> GenerationResult<Vec<String>> {
        let mut positions = Vec::with_capacity(from.values.len());
        for value in &from.values {
            match to.values.iter().position(|v| v == value) {
                Some(position) => positions.push(position),
                None => {
                    return Err(GenerationError::new(
                        to.object_ref(),
                        GenerationReason::EnumValueRemoval,
                        format!("label '{}' would be removed", value),
                    ))
                }
            }
        }
        if positions.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(GenerationError::new(
                to.object_ref(),
                GenerationReason::EnumValueRemoval,
                "existing labels would be reordered",
            ));
        }

        let name = self.qualify(&to.name);
        let statements = to
            .values
            .iter()
            .enumerate()
            .filter(|(_, value)| !from.values.contains(value))
            .map(|(i, value)| {
                let placement = match (i.checked_sub(1), to.values.get(i + 1)) {
                    (Some(previous), _) => format!(" AFTER {}", quote_literal(&to.values[previous])),
                    (None, Some(next)) => format!(" BEFORE {}", quote_literal(next)),
                    (None, None) => String::new(),
                };
                format!("ALTER TYPE {} ADD VALUE {}{};", name, quote_literal(value), placement)
            })
            .collect();

        Ok(statements)
    }
}

fn unsupported_rename(object: ObjectRef) -> GenerationError {
    let message = format!("{} objects cannot be renamed", object.kind);
    GenerationError::new(object, GenerationReason::UnsupportedRename, message)
}

fn column_definition(column: &Column) -> String {
    let mut sql = format!("{} {}", quote_identifier(&column.name), column.sql_type());
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(&format!(" DEFAULT {}", default));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{ActionType, Parameter};
    use pretty_assertions::assert_eq;

    fn enum_type(values: &[&str]) -> Enum {
        Enum {
            name: "asset_status".to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            synchronize: true,
        }
    }

    fn function(arguments: &str, returns: &str) -> Function {
        Function {
            name: "updated_at".to_string(),
            arguments: arguments.to_string(),
            returns: returns.to_string(),
            language: "plpgsql".to_string(),
            body: "BEGIN NEW.\"updatedAt\" = now(); RETURN NEW; END".to_string(),
            identity_arguments: None,
            synchronize: true,
        }
    }

    fn public() -> SqlGenerator<'static> {
        SqlGenerator::new("public")
    }

    fn reason(step: Step) -> GenerationReason {
        public().generate_step(&step).unwrap_err().reason
    }

    #[test]
    fn test_create_table_inlines_primary_key() {
        let mut table = Table::new("table1");
        let mut id = Column::new("table1", "id", "uuid");
        id.primary = true;
        id.comment = Some("it's the id".to_string());
        table.add_column(id);
        table.add_constraint(Constraint {
            name: "PK_b249cc64cf63b8a22557cdc8537".to_string(),
            table_name: "table1".to_string(),
            columns: vec!["id".to_string()],
            kind: ConstraintKind::PrimaryKey,
            synchronize: true,
        });

        assert_eq!(
            public().generate_step(&Step::CreateTable(table)).unwrap(),
            vec![
                r#"CREATE TABLE "table1" ("id" uuid NOT NULL, CONSTRAINT "PK_b249cc64cf63b8a22557cdc8537" PRIMARY KEY ("id"));"#,
                r#"COMMENT ON COLUMN "table1"."id" IS 'it''s the id';"#,
            ]
        );
    }

    #[test]
    fn test_foreign_key_actions() {
        let constraint = Constraint {
            name: "FK_1".to_string(),
            table_name: "table2".to_string(),
            columns: vec!["parentId".to_string()],
            kind: ConstraintKind::ForeignKey {
                reference_table: "table1".to_string(),
                reference_columns: vec!["id".to_string()],
                on_update: Some(ActionType::NoAction),
                on_delete: Some(ActionType::Cascade),
            },
            synchronize: true,
        };

        assert_eq!(
            public().generate_step(&Step::AddConstraint(constraint)).unwrap(),
            vec![r#"ALTER TABLE "table2" ADD CONSTRAINT "FK_1" FOREIGN KEY ("parentId") REFERENCES "table1" ("id") ON DELETE CASCADE;"#]
        );
    }

    #[test]
    fn test_partial_index() {
        let index = Index {
            name: "IDX_live".to_string(),
            table_name: "assets".to_string(),
            columns: vec!["ownerId".to_string(), "createdAt".to_string()],
            unique: true,
            using: Some("btree".to_string()),
            where_clause: Some("\"deletedAt\" IS NULL".to_string()),
            synchronize: true,
        };

        assert_eq!(
            public().generate_step(&Step::CreateIndex(index)).unwrap(),
            vec![r#"CREATE UNIQUE INDEX "IDX_live" ON "assets" USING btree ("ownerId", "createdAt") WHERE "deletedAt" IS NULL;"#]
        );
    }

    #[test]
    fn test_alter_column_fields() {
        let from = Column::new("users", "name", "varchar(20)");
        let mut to = Column::new("users", "name", "text");
        to.nullable = true;
        to.default = Some("''".to_string());

        let statements = public().generate_step(&Step::AlterColumn {
            from,
            to,
            fields: vec![ColumnField::Type, ColumnField::Nullable, ColumnField::Default],
        })
        .unwrap();

        assert_eq!(
            statements,
            vec![
                r#"ALTER TABLE "users" ALTER COLUMN "name" TYPE text USING "name"::text;"#,
                r#"ALTER TABLE "users" ALTER COLUMN "name" DROP NOT NULL;"#,
                r#"ALTER TABLE "users" ALTER COLUMN "name" SET DEFAULT '';"#,
            ]
        );
    }

    #[test]
    fn test_array_conversion_is_rejected() {
        let from = Column::new("assets", "tags", "text");
        let mut to = from.clone();
        to.is_array = true;

        assert_eq!(
            reason(Step::AlterColumn {
                from,
                to,
                fields: vec![ColumnField::Array],
            }),
            GenerationReason::ArrayConversion
        );
    }

    #[test]
    fn test_enum_values_added_in_place() {
        let statements = public().generate_step(&Step::AlterEnum {
            from: enum_type(&["active", "trashed"]),
            to: enum_type(&["pending", "active", "hidden", "trashed"]),
        })
        .unwrap();

        assert_eq!(
            statements,
            vec![
                r#"ALTER TYPE "asset_status" ADD VALUE 'pending' BEFORE 'active';"#,
                r#"ALTER TYPE "asset_status" ADD VALUE 'hidden' AFTER 'active';"#,
            ]
        );
    }

    #[test]
    fn test_enum_removal_and_reorder_are_rejected() {
        assert_eq!(
            reason(Step::AlterEnum {
                from: enum_type(&["active", "trashed"]),
                to: enum_type(&["active"]),
            }),
            GenerationReason::EnumValueRemoval
        );
        assert_eq!(
            reason(Step::AlterEnum {
                from: enum_type(&["active", "trashed"]),
                to: enum_type(&["trashed", "active"]),
            }),
            GenerationReason::EnumValueRemoval
        );
    }

    #[test]
    fn test_function_replace_and_signature_change() {
        let statements = public().generate_step(&Step::ReplaceFunction {
            from: function("", "trigger"),
            to: function("", "TRIGGER"),
        })
        .unwrap();
        assert_eq!(
            statements,
            vec![r#"CREATE OR REPLACE FUNCTION "updated_at"() RETURNS TRIGGER LANGUAGE plpgsql AS $$BEGIN NEW."updatedAt" = now(); RETURN NEW; END$$;"#]
        );

        assert_eq!(
            reason(Step::ReplaceFunction {
                from: function("", "trigger"),
                to: function("value integer", "trigger"),
            }),
            GenerationReason::FunctionSignatureChange
        );
    }

    #[test]
    fn test_trigger() {
        let trigger = Trigger {
            name: "users_updated_at".to_string(),
            table_name: "users".to_string(),
            timing: TriggerTiming::Before,
            actions: vec![TriggerAction::Insert, TriggerAction::Update],
            scope: TriggerScope::Row,
            function_name: "updated_at".to_string(),
            when: Some("pg_trigger_depth() = 0".to_string()),
            synchronize: true,
        };

        assert_eq!(
            public().generate_step(&Step::CreateTrigger(trigger)).unwrap(),
            vec![r#"CREATE TRIGGER "users_updated_at" BEFORE INSERT OR UPDATE ON "users" FOR EACH ROW WHEN (pg_trigger_depth() = 0) EXECUTE FUNCTION "updated_at"();"#]
        );
    }

    #[test]
    fn test_parameters_and_extension_rename() {
        let parameter = Parameter {
            name: "search_path".to_string(),
            database_name: "immich".to_string(),
            value: "public, vectors".to_string(),
            synchronize: true,
        };
        assert_eq!(
            public().generate_step(&Step::SetParameter {
                from: None,
                to: parameter.clone(),
            })
            .unwrap(),
            vec![r#"ALTER DATABASE "immich" SET search_path TO public, vectors;"#]
        );
        assert_eq!(
            public().generate_step(&Step::ResetParameter(parameter)).unwrap(),
            vec![r#"ALTER DATABASE "immich" RESET search_path;"#]
        );
        assert_eq!(
            reason(Step::RenameExtension {
                from: "vectors".to_string(),
                to: "vector".to_string(),
            }),
            GenerationReason::UnsupportedRename
        );
    }

    #[test]
    fn test_rename_statements() {
        let rename = |step: Step| public().generate_step(&step).unwrap();
        let names = |from: &str, to: &str| (from.to_string(), to.to_string());

        let (from, to) = names("IDX_old", "IDX_new");
        assert_eq!(
            rename(Step::RenameIndex { table: "assets".to_string(), from, to }),
            vec![r#"ALTER INDEX "IDX_old" RENAME TO "IDX_new";"#]
        );
        let (from, to) = names("UQ_old", "UQ_new");
        assert_eq!(
            rename(Step::RenameConstraint { table: "assets".to_string(), from, to }),
            vec![r#"ALTER TABLE "assets" RENAME CONSTRAINT "UQ_old" TO "UQ_new";"#]
        );
        let (from, to) = names("assets_touch", "assets_updated_at");
        assert_eq!(
            rename(Step::RenameTrigger { table: "assets".to_string(), from, to }),
            vec![r#"ALTER TRIGGER "assets_touch" ON "assets" RENAME TO "assets_updated_at";"#]
        );
        let (from, to) = names("asset_status", "asset_state");
        assert_eq!(
            rename(Step::RenameEnum { from, to }),
            vec![r#"ALTER TYPE "asset_status" RENAME TO "asset_state";"#]
        );
        assert_eq!(
            rename(Step::RenameFunction {
                from: function("", "trigger"),
                to: "touch".to_string(),
            }),
            vec![r#"ALTER FUNCTION "updated_at"() RENAME TO "touch";"#]
        );
    }

    #[test]
    fn test_function_is_dropped_by_argument_types() {
        let mut with_default = function("amount integer DEFAULT 0", "integer");
        with_default.identity_arguments = Some("amount integer".to_string());

        assert_eq!(
            public().generate_step(&Step::DropFunction(with_default.clone())).unwrap(),
            vec![r#"DROP FUNCTION "updated_at"(amount integer);"#]
        );
        assert_eq!(
            public()
                .generate_step(&Step::RenameFunction {
                    from: with_default,
                    to: "charge".to_string(),
                })
                .unwrap(),
            vec![r#"ALTER FUNCTION "updated_at"(amount integer) RENAME TO "charge";"#]
        );
    }

    #[test]
    fn test_objects_outside_public_are_qualified() {
        let generator = SqlGenerator::new("app");

        let mut table = Table::new("assets");
        table.add_column(Column::new("assets", "id", "uuid"));
        assert_eq!(
            generator.generate_step(&Step::CreateTable(table.clone())).unwrap(),
            vec![r#"CREATE TABLE "app"."assets" ("id" uuid NOT NULL);"#]
        );
        assert_eq!(
            generator.generate_step(&Step::DropTable(table)).unwrap(),
            vec![r#"DROP TABLE "app"."assets";"#]
        );

        let constraint = Constraint {
            name: "FK_owner".to_string(),
            table_name: "assets".to_string(),
            columns: vec!["ownerId".to_string()],
            kind: ConstraintKind::ForeignKey {
                reference_table: "users".to_string(),
                reference_columns: vec!["id".to_string()],
                on_update: None,
                on_delete: None,
            },
            synchronize: true,
        };
        assert_eq!(
            generator.generate_step(&Step::AddConstraint(constraint)).unwrap(),
            vec![r#"ALTER TABLE "app"."assets" ADD CONSTRAINT "FK_owner" FOREIGN KEY ("ownerId") REFERENCES "app"."users" ("id");"#]
        );

        let index = Index {
            name: "IDX_owner".to_string(),
            table_name: "assets".to_string(),
            columns: vec!["ownerId".to_string()],
            unique: false,
            using: None,
            where_clause: None,
            synchronize: true,
        };
        assert_eq!(
            generator.generate_step(&Step::CreateIndex(index.clone())).unwrap(),
            vec![r#"CREATE INDEX "IDX_owner" ON "app"."assets" ("ownerId");"#]
        );
        assert_eq!(
            generator.generate_step(&Step::DropIndex(index)).unwrap(),
            vec![r#"DROP INDEX "app"."IDX_owner";"#]
        );

        assert_eq!(
            generator.generate_step(&Step::CreateEnum(enum_type(&["active"]))).unwrap(),
            vec![r#"CREATE TYPE "app"."asset_status" AS ENUM ('active');"#]
        );
        assert_eq!(
            generator.generate_step(&Step::DropFunction(function("", "trigger"))).unwrap(),
            vec![r#"DROP FUNCTION "app"."updated_at"();"#]
        );

        let trigger = Trigger {
            name: "assets_touch".to_string(),
            table_name: "assets".to_string(),
            timing: TriggerTiming::After,
            actions: vec![TriggerAction::Delete],
            scope: TriggerScope::Statement,
            function_name: "updated_at".to_string(),
            when: None,
            synchronize: true,
        };
        assert_eq!(
            generator.generate_step(&Step::CreateTrigger(trigger)).unwrap(),
            vec![r#"CREATE TRIGGER "assets_touch" AFTER DELETE ON "app"."assets" FOR EACH STATEMENT EXECUTE FUNCTION "app"."updated_at"();"#]
        );
    }
}
