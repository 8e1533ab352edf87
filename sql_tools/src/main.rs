use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use sql_tools::config;
use sql_tools::schema::document::{self, SchemaFormat};
use sql_tools::utils::logging::init_logging;
use sql_tools::{SqlToolsClient, Warning};

#[derive(Parser, Debug)]
#[command(name = "sql-tools")]
#[command(version)]
#[command(about = "Compare a declared PostgreSQL schema with a live database and plan the DDL to reconcile them")]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = "sql_tools.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the live schema as a document
    Introspect {
        /// Output format, defaults to the [output] setting or json
        #[arg(long, value_name = "FORMAT")]
        format: Option<SchemaFormat>,
    },
    /// Print the change records between a declared schema and the live one
    Diff {
        /// Declared schema document (.json, .yaml or .toml)
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,
    },
    /// Print the SQL statements that bring the live schema to the declared one
    Plan {
        /// Declared schema document (.json, .yaml or .toml)
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,
    },
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = config::load_from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    init_logging(&config.logging)?;

    let output_format = config
        .output
        .as_ref()
        .map(|output| output.format)
        .unwrap_or_default();

    let client = SqlToolsClient::new(config)
        .await
        .context("connecting to database")?;

    match args.command {
        Command::Introspect { format } => {
            let schema = client.introspect().await?;
            println!("{}", document::to_string(&schema, format.unwrap_or(output_format))?);
        }
        Command::Diff { schema } => {
            let declared = document::load_schema(&schema)
                .with_context(|| format!("loading {}", schema.display()))?;
            let diff = client.diff(&declared).await?;

            for change in &diff.changes {
                println!("{}", change);
            }
            print_warnings(&diff.warnings);
        }
        Command::Plan { schema } => {
            let declared = document::load_schema(&schema)
                .with_context(|| format!("loading {}", schema.display()))?;
            let plan = client.plan(&declared).await?;

            println!(
                "-- Generated by sql-tools at {}",
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            );
            if plan.is_empty() {
                println!("-- Database schema is already in sync");
            }
            for statement in &plan.statements {
                println!("{}", statement);
            }
            print_warnings(&plan.warnings);
        }
    }

    Ok(())
}
