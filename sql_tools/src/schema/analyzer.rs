//! Database schema analyzer
//!
//! Reads the PostgreSQL system catalogs and assembles a [`Schema`] snapshot.
//! Catalog access sits behind [`CatalogSource`] so the assembly logic can run
//! against canned rows.

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use crate::db::connection::DatabaseConnection;
use crate::error::{IntrospectionError, IntrospectionReason, Result};
use crate::schema::types::{
    ActionType, Column, Constraint, ConstraintKind, Enum, Extension, Function, Index, ObjectKind,
    ObjectRef, Parameter, Schema, Table, Trigger, TriggerAction, TriggerScope, TriggerTiming,
};

type CatalogResult<T> = std::result::Result<T, IntrospectionError>;

// pg_trigger.tgtype bits
const TRIGGER_TYPE_ROW: i32 = 1 << 0;
const TRIGGER_TYPE_BEFORE: i32 = 1 << 1;
const TRIGGER_TYPE_INSERT: i32 = 1 << 2;
const TRIGGER_TYPE_DELETE: i32 = 1 << 3;
const TRIGGER_TYPE_UPDATE: i32 = 1 << 4;
const TRIGGER_TYPE_TRUNCATE: i32 = 1 << 5;
const TRIGGER_TYPE_INSTEAD: i32 = 1 << 6;

static CHECK_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^CHECK \((.*)\)(?: NOT VALID)?$").unwrap());

static TRIGGER_WHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s) WHEN \((.*)\) EXECUTE (?:FUNCTION|PROCEDURE) ").unwrap());

/// Introspection settings
#[derive(Debug, Clone, PartialEq)]
pub struct IntrospectOptions {
    /// Tables kept in the snapshot but never synchronized
    pub unmanaged_tables: Vec<String>,
    /// Extensions left out of the snapshot entirely
    pub unmanaged_extensions: Vec<String>,
}

impl Default for IntrospectOptions {
    fn default() -> Self {
        Self {
            unmanaged_tables: Vec::new(),
            unmanaged_extensions: vec!["plpgsql".to_string()],
        }
    }
}

// Row types for catalog queries

#[derive(Debug, Clone, FromRow)]
pub struct TableRow {
    pub table_name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ColumnRow {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_array: bool,
    pub not_null: bool,
    pub column_default: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct IndexRow {
    pub table_name: String,
    pub index_name: String,
    /// Key columns in order; expression keys appear as their SQL text
    pub column_names: Vec<String>,
    pub has_expressions: bool,
    pub is_unique: bool,
    pub method: String,
    pub predicate: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ConstraintRow {
    pub table_name: String,
    pub constraint_name: String,
    /// `pg_constraint.contype`: p, f, u or c
    pub constraint_type: String,
    pub column_names: Vec<String>,
    pub reference_table: Option<String>,
    pub reference_columns: Vec<String>,
    pub on_update: String,
    pub on_delete: String,
    pub definition: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TriggerRow {
    pub table_name: String,
    pub trigger_name: String,
    pub trigger_type: i32,
    pub function_name: String,
    pub definition: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct FunctionRow {
    pub name: String,
    pub arguments: String,
    pub identity_arguments: String,
    pub returns: String,
    pub language: String,
    pub body: String,
    pub extension_owned: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct EnumRow {
    pub name: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExtensionRow {
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ParameterRow {
    pub database_name: String,
    /// One `name=value` entry of `pg_db_role_setting.setconfig`
    pub setting: String,
}

/// Access to the system catalog, one method per object kind
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn database_name(&self) -> CatalogResult<String>;

    async fn tables(&self, schema_name: &str) -> CatalogResult<Vec<TableRow>>;

    async fn columns(&self, schema_name: &str) -> CatalogResult<Vec<ColumnRow>>;

    async fn indexes(&self, schema_name: &str) -> CatalogResult<Vec<IndexRow>>;

    async fn constraints(&self, schema_name: &str) -> CatalogResult<Vec<ConstraintRow>>;

    async fn triggers(&self, schema_name: &str) -> CatalogResult<Vec<TriggerRow>>;

    async fn functions(&self, schema_name: &str) -> CatalogResult<Vec<FunctionRow>>;

    async fn enums(&self, schema_name: &str) -> CatalogResult<Vec<EnumRow>>;

    async fn extensions(&self) -> CatalogResult<Vec<ExtensionRow>>;

    async fn parameters(&self) -> CatalogResult<Vec<ParameterRow>>;
}

/// PostgreSQL catalog reader
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch<T>(&self, kind: ObjectKind, sql: &str, schema_name: &str) -> CatalogResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        sqlx::query_as::<_, T>(sql)
            .bind(schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IntrospectionError::from_sqlx(ObjectRef::new(kind, schema_name), e))
    }

    async fn fetch_database_wide<T>(&self, kind: ObjectKind, sql: &str) -> CatalogResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        sqlx::query_as::<_, T>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IntrospectionError::from_sqlx(ObjectRef::new(kind, "*"), e))
    }
}

#[async_trait]
impl CatalogSource for PostgresCatalog {
    async fn database_name(&self) -> CatalogResult<String> {
        sqlx::query_scalar::<_, String>("SELECT current_database()::text")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IntrospectionError::from_sqlx(ObjectRef::new(ObjectKind::Parameter, "*"), e))
    }

    async fn tables(&self, schema_name: &str) -> CatalogResult<Vec<TableRow>> {
        let sql = r#"
            SELECT c.relname::text AS table_name
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1
              AND c.relkind IN ('r', 'p')
              AND NOT c.relispartition
            ORDER BY c.relname
        "#;
        self.fetch(ObjectKind::Table, sql, schema_name).await
    }

    async fn columns(&self, schema_name: &str) -> CatalogResult<Vec<ColumnRow>> {
        let sql = r#"
            SELECT
                c.relname::text AS table_name,
                a.attname::text AS column_name,
                CASE WHEN t.typcategory = 'A'
                    THEN format_type(t.typelem, a.atttypmod)
                    ELSE format_type(a.atttypid, a.atttypmod)
                END AS data_type,
                t.typcategory = 'A' AS is_array,
                a.attnotnull AS not_null,
                pg_get_expr(d.adbin, d.adrelid) AS column_default,
                col_description(c.oid, a.attnum) AS comment
            FROM pg_catalog.pg_attribute a
            JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
            LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE n.nspname = $1
              AND c.relkind IN ('r', 'p')
              AND a.attnum > 0
              AND NOT a.attisdropped
            ORDER BY c.relname, a.attnum
        "#;
        self.fetch(ObjectKind::Column, sql, schema_name).await
    }

    async fn indexes(&self, schema_name: &str) -> CatalogResult<Vec<IndexRow>> {
        // Indexes backing a primary key, unique or exclusion constraint belong to the constraint.
        // indkey is 0-based. INCLUDE columns sit past indnkeyatts and are not keys.
        let sql = r#"
            SELECT
                t.relname::text AS table_name,
                i.relname::text AS index_name,
                ARRAY(
                    SELECT CASE
                        WHEN ix.indkey[k.ord - 1] = 0
                            THEN pg_get_indexdef(ix.indexrelid, k.ord, true)
                        ELSE (
                            SELECT a.attname::text
                            FROM pg_catalog.pg_attribute a
                            WHERE a.attrelid = ix.indrelid AND a.attnum = ix.indkey[k.ord - 1]
                        )
                    END
                    FROM generate_series(1, ix.indnkeyatts::int) AS k(ord)
                    ORDER BY k.ord
                ) AS column_names,
                EXISTS (
                    SELECT 1 FROM generate_series(0, ix.indnkeyatts - 1) AS k(pos)
                    WHERE ix.indkey[k.pos] = 0
                ) AS has_expressions,
                ix.indisunique AS is_unique,
                am.amname::text AS method,
                pg_get_expr(ix.indpred, ix.indrelid) AS predicate
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_am am ON am.oid = i.relam
            WHERE n.nspname = $1
              AND NOT EXISTS (
                  SELECT 1 FROM pg_catalog.pg_constraint c
                  WHERE c.conindid = ix.indexrelid AND c.contype IN ('p', 'u', 'x')
              )
            ORDER BY t.relname, i.relname
        "#;
        self.fetch(ObjectKind::Index, sql, schema_name).await
    }

    async fn constraints(&self, schema_name: &str) -> CatalogResult<Vec<ConstraintRow>> {
        let sql = r#"
            SELECT
                t.relname::text AS table_name,
                c.conname::text AS constraint_name,
                c.contype::text AS constraint_type,
                ARRAY(
                    SELECT a.attname::text
                    FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
                    JOIN pg_catalog.pg_attribute a
                        ON a.attrelid = c.conrelid AND a.attnum = k.attnum
                    ORDER BY k.ord
                ) AS column_names,
                r.relname::text AS reference_table,
                ARRAY(
                    SELECT a.attname::text
                    FROM unnest(c.confkey) WITH ORDINALITY AS k(attnum, ord)
                    JOIN pg_catalog.pg_attribute a
                        ON a.attrelid = c.confrelid AND a.attnum = k.attnum
                    ORDER BY k.ord
                ) AS reference_columns,
                c.confupdtype::text AS on_update,
                c.confdeltype::text AS on_delete,
                pg_get_constraintdef(c.oid) AS definition
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            LEFT JOIN pg_catalog.pg_class r ON r.oid = c.confrelid
            WHERE n.nspname = $1
              AND c.contype IN ('p', 'f', 'u', 'c')
            ORDER BY t.relname, c.contype = 'p' DESC, c.conname
        "#;
        self.fetch(ObjectKind::Constraint, sql, schema_name).await
    }

    async fn triggers(&self, schema_name: &str) -> CatalogResult<Vec<TriggerRow>> {
        let sql = r#"
            SELECT
                c.relname::text AS table_name,
                t.tgname::text AS trigger_name,
                t.tgtype::int4 AS trigger_type,
                p.proname::text AS function_name,
                pg_get_triggerdef(t.oid) AS definition
            FROM pg_catalog.pg_trigger t
            JOIN pg_catalog.pg_class c ON c.oid = t.tgrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_catalog.pg_proc p ON p.oid = t.tgfoid
            WHERE n.nspname = $1
              AND NOT t.tgisinternal
            ORDER BY c.relname, t.tgname
        "#;
        self.fetch(ObjectKind::Trigger, sql, schema_name).await
    }

    async fn functions(&self, schema_name: &str) -> CatalogResult<Vec<FunctionRow>> {
        let sql = r#"
            SELECT
                p.proname::text AS name,
                pg_get_function_arguments(p.oid) AS arguments,
                pg_get_function_identity_arguments(p.oid) AS identity_arguments,
                pg_get_function_result(p.oid) AS returns,
                l.lanname::text AS language,
                p.prosrc AS body,
                EXISTS (
                    SELECT 1 FROM pg_catalog.pg_depend d
                    WHERE d.classid = 'pg_catalog.pg_proc'::regclass
                      AND d.objid = p.oid
                      AND d.deptype = 'e'
                ) AS extension_owned
            FROM pg_catalog.pg_proc p
            JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
            JOIN pg_catalog.pg_language l ON l.oid = p.prolang
            WHERE n.nspname = $1
              AND p.prokind = 'f'
            ORDER BY p.proname, p.oid
        "#;
        self.fetch(ObjectKind::Function, sql, schema_name).await
    }

    async fn enums(&self, schema_name: &str) -> CatalogResult<Vec<EnumRow>> {
        let sql = r#"
            SELECT
                t.typname::text AS name,
                array_agg(e.enumlabel::text ORDER BY e.enumsortorder) AS labels
            FROM pg_catalog.pg_type t
            JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
            WHERE n.nspname = $1
            GROUP BY t.typname
            ORDER BY t.typname
        "#;
        self.fetch(ObjectKind::Enum, sql, schema_name).await
    }

    async fn extensions(&self) -> CatalogResult<Vec<ExtensionRow>> {
        let sql = "SELECT extname::text AS name FROM pg_catalog.pg_extension ORDER BY extname";
        self.fetch_database_wide(ObjectKind::Extension, sql).await
    }

    async fn parameters(&self) -> CatalogResult<Vec<ParameterRow>> {
        let sql = r#"
            SELECT
                d.datname::text AS database_name,
                unnest(s.setconfig) AS setting
            FROM pg_catalog.pg_db_role_setting s
            JOIN pg_catalog.pg_database d ON d.oid = s.setdatabase
            WHERE s.setrole = 0
              AND d.datname = current_database()
        "#;
        self.fetch_database_wide(ObjectKind::Parameter, sql).await
    }
}

fn malformed(object: ObjectRef, message: String) -> IntrospectionError {
    IntrospectionError::new(object, IntrospectionReason::MalformedCatalog, message)
}

/// Build a validated snapshot of one schema from the catalog
pub async fn introspect<C>(
    catalog: &C,
    schema_name: &str,
    options: &IntrospectOptions,
) -> Result<Schema>
where
    C: CatalogSource + ?Sized,
{
    let database_name = catalog.database_name().await?;
    let mut schema = Schema::new(&database_name, schema_name);
    let managed = |name: &str| !options.unmanaged_tables.iter().any(|t| t == name);

    // Unmanaged tables stay visible so declared tables and foreign keys can see them
    let mut tables: IndexMap<String, Table> = IndexMap::new();
    for row in catalog.tables(schema_name).await? {
        let mut table = Table::new(&row.table_name);
        table.schema_name = schema_name.to_string();
        table.synchronize = managed(&row.table_name);
        tables.insert(row.table_name, table);
    }

    for row in catalog.columns(schema_name).await? {
        if let Some(table) = tables.get_mut(&row.table_name) {
            table.add_column(column_from_row(row));
        }
    }

    for row in catalog.indexes(schema_name).await? {
        if let Some(table) = tables.get_mut(&row.table_name) {
            // Expression keys cannot be declared, so these indexes are left alone
            if row.has_expressions {
                tracing::warn!(
                    table = %row.table_name,
                    index = %row.index_name,
                    "Expression index is not synchronized"
                );
            }
            table.add_index(Index {
                name: row.index_name,
                table_name: row.table_name,
                columns: row.column_names,
                unique: row.is_unique,
                using: Some(row.method),
                where_clause: row.predicate,
                synchronize: !row.has_expressions,
            });
        }
    }

    for row in catalog.constraints(schema_name).await? {
        if !tables.contains_key(&row.table_name) {
            continue;
        }
        let constraint = constraint_from_row(row)?;
        if let Some(table) = tables.get_mut(&constraint.table_name) {
            if matches!(constraint.kind, ConstraintKind::PrimaryKey) {
                for column in table.columns.iter_mut() {
                    if constraint.columns.contains(&column.name) {
                        column.primary = true;
                    }
                }
            }
            table.add_constraint(constraint);
        }
    }

    for row in catalog.triggers(schema_name).await? {
        if let Some(table) = tables.get_mut(&row.table_name) {
            table.add_trigger(trigger_from_row(row)?);
        }
    }

    schema.tables = tables.into_values().collect();

    for row in catalog.functions(schema_name).await? {
        // Extension functions are unmanaged; their overloads collapse to one entry
        if row.extension_owned && schema.functions.iter().any(|f| f.name == row.name) {
            continue;
        }
        let identity_arguments =
            (row.identity_arguments != row.arguments).then_some(row.identity_arguments);
        schema.functions.push(Function {
            name: row.name,
            arguments: row.arguments,
            returns: row.returns,
            language: row.language,
            body: row.body,
            identity_arguments,
            synchronize: !row.extension_owned,
        });
    }

    schema.enums = catalog
        .enums(schema_name)
        .await?
        .into_iter()
        .map(|row| Enum {
            name: row.name,
            values: row.labels,
            synchronize: true,
        })
        .collect();

    schema.extensions = catalog
        .extensions()
        .await?
        .into_iter()
        .filter(|row| !options.unmanaged_extensions.contains(&row.name))
        .map(|row| Extension::new(&row.name))
        .collect();

    for row in catalog.parameters().await? {
        let Some((name, value)) = row.setting.split_once('=') else {
            return Err(malformed(
                ObjectRef::new(ObjectKind::Parameter, &row.setting),
                "setting is not of the form name=value".to_string(),
            )
            .into());
        };
        schema.parameters.push(Parameter {
            name: name.to_string(),
            database_name: row.database_name,
            value: value.to_string(),
            synchronize: true,
        });
    }

    tracing::info!(
        database = %schema.database_name,
        schema = %schema.schema_name,
        tables = schema.tables.len(),
        functions = schema.functions.len(),
        enums = schema.enums.len(),
        "Introspected database schema"
    );

    Ok(schema.finalize()?)
}

fn column_from_row(row: ColumnRow) -> Column {
    Column {
        name: row.column_name,
        table_name: row.table_name,
        data_type: row.data_type,
        nullable: !row.not_null,
        is_array: row.is_array,
        default: row.column_default,
        primary: false,
        comment: row.comment,
        synchronize: true,
    }
}

fn action_from_code(object: &ObjectRef, code: &str) -> CatalogResult<Option<ActionType>> {
    match ActionType::from_catalog_code(code) {
        Some(ActionType::NoAction) => Ok(None),
        Some(action) => Ok(Some(action)),
        None => Err(malformed(
            object.clone(),
            format!("unknown referential action code '{}'", code),
        )),
    }
}

fn constraint_from_row(row: ConstraintRow) -> CatalogResult<Constraint> {
    let object = ObjectRef::in_table(ObjectKind::Constraint, &row.table_name, &row.constraint_name);

    let kind = match row.constraint_type.as_str() {
        "p" => ConstraintKind::PrimaryKey,
        "u" => ConstraintKind::Unique,
        "f" => {
            let reference_table = row.reference_table.clone().ok_or_else(|| {
                malformed(object.clone(), "foreign key has no referenced table".to_string())
            })?;
            ConstraintKind::ForeignKey {
                reference_table,
                reference_columns: row.reference_columns.clone(),
                on_update: action_from_code(&object, &row.on_update)?,
                on_delete: action_from_code(&object, &row.on_delete)?,
            }
        }
        "c" => {
            let expression = CHECK_DEFINITION
                .captures(&row.definition)
                .map(|captures| captures[1].to_string())
                .ok_or_else(|| {
                    malformed(
                        object.clone(),
                        format!("unrecognized check definition '{}'", row.definition),
                    )
                })?;
            ConstraintKind::Check { expression }
        }
        other => {
            return Err(malformed(
                object,
                format!("unsupported constraint type '{}'", other),
            ))
        }
    };

    Ok(Constraint {
        name: row.constraint_name,
        table_name: row.table_name,
        columns: row.column_names,
        kind,
        synchronize: true,
    })
}

fn trigger_from_row(row: TriggerRow) -> CatalogResult<Trigger> {
    let bits = row.trigger_type;

    let timing = if bits & TRIGGER_TYPE_INSTEAD != 0 {
        TriggerTiming::InsteadOf
    } else if bits & TRIGGER_TYPE_BEFORE != 0 {
        TriggerTiming::Before
    } else {
        TriggerTiming::After
    };

    let actions: Vec<TriggerAction> = [
        (TRIGGER_TYPE_INSERT, TriggerAction::Insert),
        (TRIGGER_TYPE_UPDATE, TriggerAction::Update),
        (TRIGGER_TYPE_DELETE, TriggerAction::Delete),
        (TRIGGER_TYPE_TRUNCATE, TriggerAction::Truncate),
    ]
    .into_iter()
    .filter(|(bit, _)| bits & bit != 0)
    .map(|(_, action)| action)
    .collect();

    if actions.is_empty() {
        return Err(malformed(
            ObjectRef::in_table(ObjectKind::Trigger, &row.table_name, &row.trigger_name),
            format!("trigger type {} has no events", bits),
        ));
    }

    let scope = if bits & TRIGGER_TYPE_ROW != 0 {
        TriggerScope::Row
    } else {
        TriggerScope::Statement
    };

    let when = TRIGGER_WHEN
        .captures(&row.definition)
        .map(|captures| captures[1].to_string());

    Ok(Trigger {
        name: row.trigger_name,
        table_name: row.table_name,
        timing,
        actions,
        scope,
        function_name: row.function_name,
        when,
        synchronize: true,
    })
}

/// Schema analyzer bound to a live connection
pub struct SchemaAnalyzer {
    connection: DatabaseConnection,
    options: IntrospectOptions,
}

impl SchemaAnalyzer {
    /// Create a new schema analyzer
    pub fn new(connection: DatabaseConnection, options: IntrospectOptions) -> Self {
        Self {
            connection,
            options,
        }
    }

    /// Analyze the current database schema
    pub async fn analyze(&self) -> Result<Schema> {
        let catalog = PostgresCatalog::new(self.connection.pool().clone());
        introspect(&catalog, self.connection.schema(), &self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    /// Canned catalog rows
    #[derive(Default)]
    struct FakeCatalog {
        tables: Vec<TableRow>,
        columns: Vec<ColumnRow>,
        indexes: Vec<IndexRow>,
        constraints: Vec<ConstraintRow>,
        triggers: Vec<TriggerRow>,
        functions: Vec<FunctionRow>,
        enums: Vec<EnumRow>,
        extensions: Vec<ExtensionRow>,
        parameters: Vec<ParameterRow>,
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn database_name(&self) -> CatalogResult<String> {
            Ok("immich".to_string())
        }

        async fn tables(&self, _: &str) -> CatalogResult<Vec<TableRow>> {
            Ok(self.tables.clone())
        }

        async fn columns(&self, _: &str) -> CatalogResult<Vec<ColumnRow>> {
            Ok(self.columns.clone())
        }

        async fn indexes(&self, _: &str) -> CatalogResult<Vec<IndexRow>> {
            Ok(self.indexes.clone())
        }

        async fn constraints(&self, _: &str) -> CatalogResult<Vec<ConstraintRow>> {
            Ok(self.constraints.clone())
        }

        async fn triggers(&self, _: &str) -> CatalogResult<Vec<TriggerRow>> {
            Ok(self.triggers.clone())
        }

        async fn functions(&self, _: &str) -> CatalogResult<Vec<FunctionRow>> {
            Ok(self.functions.clone())
        }

        async fn enums(&self, _: &str) -> CatalogResult<Vec<EnumRow>> {
            Ok(self.enums.clone())
        }

        async fn extensions(&self) -> CatalogResult<Vec<ExtensionRow>> {
            Ok(self.extensions.clone())
        }

        async fn parameters(&self) -> CatalogResult<Vec<ParameterRow>> {
            Ok(self.parameters.clone())
        }
    }

    fn column(table: &str, name: &str, data_type: &str, not_null: bool) -> ColumnRow {
        ColumnRow {
            table_name: table.to_string(),
            column_name: name.to_string(),
            data_type: data_type.to_string(),
            is_array: false,
            not_null,
            column_default: None,
            comment: None,
        }
    }

    fn constraint(table: &str, name: &str, kind: &str, columns: &[&str]) -> ConstraintRow {
        ConstraintRow {
            table_name: table.to_string(),
            constraint_name: name.to_string(),
            constraint_type: kind.to_string(),
            column_names: columns.iter().map(|c| c.to_string()).collect(),
            reference_table: None,
            reference_columns: Vec::new(),
            on_update: " ".to_string(),
            on_delete: " ".to_string(),
            definition: String::new(),
        }
    }

    fn users_catalog() -> FakeCatalog {
        FakeCatalog {
            tables: vec![
                TableRow {
                    table_name: "users".to_string(),
                },
                TableRow {
                    table_name: "posts".to_string(),
                },
            ],
            columns: vec![
                column("users", "id", "uuid", true),
                column("users", "email", "character varying(255)", false),
                column("posts", "id", "uuid", true),
                column("posts", "authorId", "uuid", true),
            ],
            constraints: vec![
                constraint("users", "PK_users", "p", &["id"]),
                constraint("posts", "PK_posts", "p", &["id"]),
                ConstraintRow {
                    reference_table: Some("users".to_string()),
                    reference_columns: vec!["id".to_string()],
                    on_update: "a".to_string(),
                    on_delete: "c".to_string(),
                    ..constraint("posts", "FK_author", "f", &["authorId"])
                },
            ],
            extensions: vec![
                ExtensionRow {
                    name: "plpgsql".to_string(),
                },
                ExtensionRow {
                    name: "pg_trgm".to_string(),
                },
            ],
            ..FakeCatalog::default()
        }
    }

    #[tokio::test]
    async fn test_introspect_tables_and_keys() {
        let schema = introspect(&users_catalog(), "public", &IntrospectOptions::default())
            .await
            .unwrap();

        assert_eq!(schema.database_name, "immich");
        assert_eq!(schema.tables.len(), 2);

        let users = schema.table("users").unwrap();
        assert!(users.columns[0].primary);
        assert!(!users.columns[0].nullable);
        assert!(users.columns[1].nullable);

        let posts = schema.table("posts").unwrap();
        assert_eq!(
            posts.constraints[1].kind,
            ConstraintKind::ForeignKey {
                reference_table: "users".to_string(),
                reference_columns: vec!["id".to_string()],
                on_update: None,
                on_delete: Some(ActionType::Cascade),
            }
        );

        // plpgsql is unmanaged by default
        assert_eq!(schema.extensions, vec![Extension::new("pg_trgm")]);
    }

    #[tokio::test]
    async fn test_introspect_keeps_unmanaged_tables_unsynchronized() {
        let mut catalog = users_catalog();
        catalog.tables.push(TableRow {
            table_name: "migrations".to_string(),
        });
        catalog.columns.push(column("migrations", "id", "integer", true));
        catalog.columns.push(column("posts", "migrationId", "integer", false));
        catalog.constraints.push(constraint("migrations", "PK_migrations", "p", &["id"]));
        // A managed table may reference an unmanaged one
        catalog.constraints.push(ConstraintRow {
            reference_table: Some("migrations".to_string()),
            reference_columns: vec!["id".to_string()],
            ..constraint("posts", "FK_migration", "f", &["migrationId"])
        });
        let options = IntrospectOptions {
            unmanaged_tables: vec!["migrations".to_string()],
            ..IntrospectOptions::default()
        };

        let schema = introspect(&catalog, "public", &options).await.unwrap();
        let migrations = schema.table("migrations").unwrap();
        assert!(!migrations.synchronize);
        assert_eq!(migrations.columns.len(), 1);
        assert!(schema.table("users").unwrap().synchronize);
    }

    #[tokio::test]
    async fn test_introspect_expression_and_include_indexes() {
        let mut catalog = users_catalog();
        catalog.indexes = vec![
            IndexRow {
                table_name: "users".to_string(),
                index_name: "IDX_email_lower".to_string(),
                column_names: vec!["lower((email)::text)".to_string()],
                has_expressions: true,
                is_unique: true,
                method: "btree".to_string(),
                predicate: None,
            },
            // INCLUDE columns are not part of the key list
            IndexRow {
                table_name: "posts".to_string(),
                index_name: "IDX_author".to_string(),
                column_names: vec!["authorId".to_string()],
                has_expressions: false,
                is_unique: false,
                method: "btree".to_string(),
                predicate: None,
            },
        ];

        let schema = introspect(&catalog, "public", &IntrospectOptions::default())
            .await
            .unwrap();

        let expression = &schema.table("users").unwrap().indexes[0];
        assert!(!expression.synchronize);
        assert_eq!(expression.columns, vec!["lower((email)::text)"]);

        let plain = &schema.table("posts").unwrap().indexes[0];
        assert!(plain.synchronize);
        assert_eq!(plain.columns, vec!["authorId"]);
    }

    #[tokio::test]
    async fn test_introspect_check_and_trigger() {
        let mut catalog = users_catalog();
        catalog.columns.push(column("users", "age", "integer", false));
        catalog.constraints.push(ConstraintRow {
            definition: "CHECK ((age > 0))".to_string(),
            ..constraint("users", "CHK_age", "c", &["age"])
        });
        catalog.triggers.push(TriggerRow {
            table_name: "users".to_string(),
            trigger_name: "users_updated_at".to_string(),
            // ROW | BEFORE | UPDATE
            trigger_type: 1 | 2 | 16,
            function_name: "updated_at".to_string(),
            definition: "CREATE TRIGGER users_updated_at BEFORE UPDATE ON public.users FOR EACH ROW WHEN ((pg_trigger_depth() = 0)) EXECUTE FUNCTION updated_at()".to_string(),
        });

        let schema = introspect(&catalog, "public", &IntrospectOptions::default())
            .await
            .unwrap();
        let users = schema.table("users").unwrap();

        assert_eq!(
            users.constraints[1].kind,
            ConstraintKind::Check {
                expression: "(age > 0)".to_string()
            }
        );
        let trigger = &users.triggers[0];
        assert_eq!(trigger.timing, TriggerTiming::Before);
        assert_eq!(trigger.actions, vec![TriggerAction::Update]);
        assert_eq!(trigger.scope, TriggerScope::Row);
        assert_eq!(trigger.when.as_deref(), Some("(pg_trigger_depth() = 0)"));
    }

    #[tokio::test]
    async fn test_introspect_functions_enums_parameters() {
        let mut catalog = users_catalog();
        let function = |name: &str, extension_owned: bool| FunctionRow {
            name: name.to_string(),
            arguments: String::new(),
            identity_arguments: String::new(),
            returns: "trigger".to_string(),
            language: "plpgsql".to_string(),
            body: "BEGIN RETURN NEW; END".to_string(),
            extension_owned,
        };
        catalog.functions = vec![
            function("similarity", true),
            function("similarity", true),
            function("updated_at", false),
            FunctionRow {
                returns: "integer".to_string(),
                arguments: "amount integer DEFAULT 0".to_string(),
                identity_arguments: "amount integer".to_string(),
                ..function("charge", false)
            },
        ];
        catalog.enums.push(EnumRow {
            name: "status".to_string(),
            labels: vec!["active".to_string(), "deleted".to_string()],
        });
        catalog.parameters.push(ParameterRow {
            database_name: "immich".to_string(),
            setting: "search_path=public, vectors".to_string(),
        });

        let schema = introspect(&catalog, "public", &IntrospectOptions::default())
            .await
            .unwrap();

        assert_eq!(schema.functions.len(), 3);
        assert!(!schema.functions[0].synchronize);
        assert!(schema.functions[1].synchronize);
        assert_eq!(schema.functions[1].identity_arguments, None);
        assert_eq!(schema.functions[2].identity_arguments(), "amount integer");
        assert_eq!(schema.enums[0].values, vec!["active", "deleted"]);
        assert_eq!(schema.parameters[0].name, "search_path");
        assert_eq!(schema.parameters[0].value, "public, vectors");
    }

    #[tokio::test]
    async fn test_introspect_unknown_constraint_type() {
        let mut catalog = users_catalog();
        catalog
            .constraints
            .push(constraint("users", "EX_1", "t", &["id"]));

        match introspect(&catalog, "public", &IntrospectOptions::default()).await {
            Err(Error::Introspection(e)) => {
                assert_eq!(e.reason, IntrospectionReason::MalformedCatalog)
            }
            other => panic!("expected introspection error, got {:?}", other),
        }
    }
}
