use crate::{commands::QueryArgs, error::CliError};
use clap::Parser;
use commands::Commands;
use compiler::QueryCompiler;
use connectors::{EntityQuery, sql::postgres::PgExecutor};
use model::{filter::Filter, schema::SchemaRegistry};
use planner::query::dialect::DialectKind;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "relq",
    version = "0.1.0",
    about = "Compile JSON filters into parameterized SQL"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            query,
            dialect,
            count,
        } => {
            let filter = load_filter(&query).await?;
            let compiler = load_compiler(&query.schema, dialect)?;
            let compiled = match count {
                true => compiler.count(&query.entity, Some(&filter))?,
                false => compiler.select(&query.entity, &Filter::from_json(filter)?)?,
            };
            output::print_json(&output::compiled_json(&compiled))?;
        }
        Commands::Find {
            query,
            conn_str,
            one,
        } => {
            let filter = Filter::from_json(load_filter(&query).await?)?;
            let entity_query = connect(&query, &conn_str).await?;
            let rows: Vec<_> = match one {
                true => entity_query.find_one(&filter).await?.into_iter().collect(),
                false => entity_query.find(&filter).await?,
            };
            info!(entity = %query.entity, rows = rows.len(), "Query finished");
            output::print_json(&output::rows_json(&rows))?;
        }
        Commands::Count { query, conn_str } => {
            let where_clause = load_filter(&query).await?;
            let entity_query = connect(&query, &conn_str).await?;
            let count = entity_query.count(Some(&where_clause)).await?;
            output::print_json(&JsonValue::from(count))?;
        }
        Commands::Schema { schema } => {
            let registry = load_registry(&schema)?;
            info!(entities = registry.entity_names().len(), "Schema is valid");
            println!("{}", registry.to_json()?);
        }
    }

    Ok(())
}

fn load_registry(path: &str) -> Result<SchemaRegistry, CliError> {
    Ok(SchemaRegistry::from_path(path)?)
}

fn load_compiler(path: &str, dialect: DialectKind) -> Result<QueryCompiler, CliError> {
    let registry = Arc::new(load_registry(path)?);
    Ok(QueryCompiler::new(registry).with_dialect(dialect))
}

async fn connect(query: &QueryArgs, conn_str: &str) -> Result<EntityQuery<PgExecutor>, CliError> {
    let compiler = load_compiler(&query.schema, DialectKind::Postgres)?;
    let executor = PgExecutor::connect(conn_str).await?;
    Ok(EntityQuery::new(compiler, executor, &query.entity)?)
}

/// The filter from `--filter` or `--filter-file`, or an empty object.
async fn load_filter(query: &QueryArgs) -> Result<JsonValue, CliError> {
    let source = match (&query.filter, &query.filter_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path).await?,
        (None, None) => return Ok(JsonValue::Object(Default::default())),
    };
    Ok(serde_json::from_str(&source)?)
}
