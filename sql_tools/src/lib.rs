//! sql_tools: keeps a PostgreSQL schema in sync with a declared one
//!
//! A declared [`Schema`] (built with [`schema::builder`] or loaded from a
//! document) is compared against a snapshot introspected from a live
//! database. The differences become typed change records, which are ordered
//! into a dependency-safe plan and rendered as DDL statements. Nothing is
//! ever executed against the database; applying the statements is up to the
//! caller.

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod utils;

use serde::Serialize;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use error::{Error, Result};
pub use schema::analyzer::SchemaAnalyzer;
pub use schema::diff::{Change, SchemaDiff, SyncOptions, Warning};
pub use schema::planner::{Operation, Step};
pub use schema::types::Schema;

/// Everything produced for one declared/live pair
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    pub changes: Vec<Change>,
    pub operations: Vec<Operation>,
    pub statements: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl MigrationPlan {
    /// Check if the live schema already matches
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Counts logged once a plan is ready
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub changes: usize,
    pub statements: usize,
    pub warnings: usize,
}

impl From<&MigrationPlan> for PlanSummary {
    fn from(plan: &MigrationPlan) -> Self {
        Self {
            changes: plan.changes.len(),
            statements: plan.statements.len(),
            warnings: plan.warnings.len(),
        }
    }
}

/// Compare, order and render: the full pipeline over two snapshots
pub fn plan(declared: &Schema, live: &Schema, options: &SyncOptions) -> Result<MigrationPlan> {
    let diff = SchemaDiff::generate(declared, live, options);
    let operations = schema::planner::plan(&diff);
    // Objects are written for the schema the declaration targets
    let statements = schema::generator::generate(&operations, &declared.schema_name)?;

    let plan = MigrationPlan {
        changes: diff.changes,
        operations,
        statements,
        warnings: diff.warnings,
    };

    let summary = PlanSummary::from(&plan);
    tracing::info!(
        changes = summary.changes,
        statements = summary.statements,
        warnings = summary.warnings,
        "Migration plan ready"
    );

    Ok(plan)
}

/// Initialize sql_tools with the specified configuration file
pub async fn init(config_path: &str) -> Result<SqlToolsClient> {
    let config = config::load_from_file(config_path)?;
    SqlToolsClient::new(config).await
}

/// The main client: introspects one live database and plans against it
pub struct SqlToolsClient {
    config: Config,
    schema_analyzer: SchemaAnalyzer,
}

impl SqlToolsClient {
    /// Create a new client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let db_connection = DatabaseConnection::connect(&config.database).await?;
        let schema_analyzer =
            SchemaAnalyzer::new(db_connection, config.sync.introspect_options());

        Ok(Self {
            config,
            schema_analyzer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze the current database schema
    pub async fn introspect(&self) -> Result<Schema> {
        self.schema_analyzer.analyze().await
    }

    /// Diff only, without ordering or rendering
    pub async fn diff(&self, declared: &Schema) -> Result<SchemaDiff> {
        let live = self.introspect().await?;
        Ok(SchemaDiff::generate(
            declared,
            &live,
            &self.config.sync.sync_options(),
        ))
    }

    /// Plan the statements that bring the live database to `declared`
    pub async fn plan(&self, declared: &Schema) -> Result<MigrationPlan> {
        let live = self.introspect().await?;
        plan(declared, &live, &self.config.sync.sync_options())
    }
}
