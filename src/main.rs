//! Rowmap CLI - run SQL through the query executor and show its execution log

use clap::{Parser, Subcommand};
use rowmap::config::{self, ConnectionConfig};
use rowmap::{Connection, ExecOutcome, Param, Params, QueryExecutor, ui};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rowmap")]
#[command(version)]
#[command(about = "Run parameterized SQL with typed binding and an audited execution log")]
#[command(long_about = r#"
Rowmap executes SQL with named parameters, binding each value by its type,
and prints the literalized statement recorded in the execution log.

Example usage:
  rowmap init --database app.db
  rowmap exec "SELECT * FROM users WHERE id = :id" --param id=7
  rowmap exec "UPDATE posts SET body = :body WHERE id = 1" --param 'body*=<p>kept</p>'
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one or more statements, in order, on a single connection
    Exec {
        /// SQL statements
        #[arg(required = true)]
        sql: Vec<String>,

        /// Named parameter as NAME=VALUE; a trailing `*` on NAME keeps markup
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Database to use instead of the configured one
        #[arg(short, long)]
        database: Option<String>,

        /// Print outcomes and log entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a config file
    Init {
        /// Path to the config file
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Database file to record
        #[arg(short, long)]
        database: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Exec { sql, params, config: config_path, database, json } => {
            let mut conn_config = config::load_config(config_path.as_deref())?.unwrap_or_default();
            if let Some(database) = database {
                conn_config.database = database;
            }
            run_exec(&conn_config, &sql, &parse_params(&params)?, json)
        }

        Commands::Init { path, database, force } => {
            let path = path.unwrap_or_else(config::default_config_path);
            let conn_config = database.map(ConnectionConfig::new).unwrap_or_default();
            config::write_config(&path, &conn_config, force)?;
            ui::success(&format!("Wrote {}", path.display()));
            Ok(())
        }
    }
}

fn run_exec(
    conn_config: &ConnectionConfig,
    statements: &[String],
    params: &Params,
    json: bool,
) -> anyhow::Result<()> {
    let connection = Connection::open(conn_config)?;
    let mut executor = QueryExecutor::with_connection(connection);
    let mut outcomes = Vec::with_capacity(statements.len());
    for sql in statements {
        let bound = params.for_sql(sql);
        outcomes.push(executor.exec(sql, (!bound.is_empty()).then_some(&bound))?);
    }

    if json {
        let report: Vec<_> = outcomes
            .iter()
            .zip(executor.log().iter())
            .map(|(outcome, entry)| {
                serde_json::json!({
                    "success": outcome.is_success(),
                    "rows": outcome.rows(),
                    "log": entry,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ui::info("Database", conn_config.database.as_str());
        for (outcome, entry) in outcomes.iter().zip(executor.log().iter()) {
            ui::section(&entry.sql);
            match outcome {
                ExecOutcome::Rows(rows) if rows.is_empty() => println!("{}", ui::dim("(no rows)")),
                ExecOutcome::Rows(rows) => println!("{}", ui::rows_table(rows)),
                ExecOutcome::Done { rows_affected, last_insert_id } => {
                    ui::success(&format!("{} row(s) affected", rows_affected));
                    if let Some(id) = last_insert_id {
                        ui::info("Last insert id", &id.to_string());
                    }
                }
                ExecOutcome::Failure => {
                    ui::error(entry.error_message().unwrap_or("statement failed"));
                }
            }
            ui::log_entry(entry);
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} statement(s) failed", failed, outcomes.len());
    }
    Ok(())
}

/// Parse `NAME=VALUE` pairs; values are JSON when they parse as JSON, text otherwise
fn parse_params(raw: &[String]) -> anyhow::Result<Params> {
    let mut params = Params::new();
    for pair in raw {
        let Some((name, value)) = pair.split_once('=') else {
            anyhow::bail!("parameter must look like NAME=VALUE: {}", pair);
        };
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        params.push(Param::new(name, value));
    }
    Ok(params)
}
