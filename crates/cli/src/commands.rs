use clap::{Args, Subcommand};
use planner::query::dialect::DialectKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the SQL and bindings a filter compiles to
    Compile {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(long, default_value = "postgres", help = "SQL dialect: postgres, mysql or sqlite")]
        dialect: DialectKind,

        #[arg(long, help = "Compile the count statement instead of the select")]
        count: bool,
    },
    /// Run a filter against Postgres and print the matching rows as JSON
    Find {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(long, env = "RELQ_CONN_STR", help = "Postgres connection string")]
        conn_str: String,

        #[arg(long, help = "Return at most one row")]
        one: bool,
    },
    /// Count the rows matching a where tree
    Count {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(long, env = "RELQ_CONN_STR", help = "Postgres connection string")]
        conn_str: String,
    },
    /// Validate a schema document and print it normalized
    Schema {
        #[arg(long, help = "Schema document path")]
        schema: String,
    },
}

#[derive(Args)]
pub struct QueryArgs {
    #[arg(long, help = "Schema document path")]
    pub schema: String,

    #[arg(long, help = "Root entity name")]
    pub entity: String,

    /// Inline JSON filter; for `count` this is the bare where tree
    #[arg(long, conflicts_with = "filter_file")]
    pub filter: Option<String>,

    #[arg(long, help = "Read the filter from a JSON file")]
    pub filter_file: Option<String>,
}
