// datasource-query
// Connects to every configured datasource, runs one query, prints the rows

use clap::{Parser, Subcommand};
use datasource_registry::config::{self, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, URL_KEY};
use datasource_registry::db::blocking::ConnectionRegistry;
use datasource_registry::{DatabaseError, DriverRegistry, Param, ResultSet, Vendor};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "datasource-query", version, about = "Run queries against named datasources")]
struct Cli {
    /// Datasource file
    #[arg(short, long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured datasources without connecting
    List,
    /// Run a query against one datasource
    Query {
        /// Section name in the datasource file
        datasource: String,
        sql: String,
        /// Positional parameter as type:value (text, int, float, bool, date)
        #[arg(short, long = "param")]
        params: Vec<Param>,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let raw = match config::parse(&cli.config) {
        Ok(raw) => raw,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::List => {
            for section in raw.sections() {
                let vendors = section
                    .get(URL_KEY)
                    .map(Vendor::detect)
                    .unwrap_or_default()
                    .iter()
                    .map(Vendor::display_name)
                    .collect::<Vec<_>>();
                let vendors = if vendors.is_empty() {
                    "-".to_string()
                } else {
                    vendors.join(", ")
                };
                println!("{}\t{}", section.name, vendors);
            }
            ExitCode::SUCCESS
        }
        Command::Query {
            datasource,
            sql,
            params,
            json,
        } => {
            // A datasource that cannot be opened stops the whole process
            let mut registry = match ConnectionRegistry::initialize(&raw, &DriverRegistry::with_defaults()) {
                Ok(registry) => registry,
                Err(e) => {
                    log::error!("Failed to initialize datasources: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            let outcome = registry.execute_query_with_parameters(&datasource, &sql, &params, |rs| {
                print_rows(rs, json)
            });
            if let Err(e) = &outcome {
                log::error!("[{}] {}", datasource, e);
            }

            let failures = registry.close_all();
            if outcome.is_ok() && failures.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn print_rows(rs: &mut ResultSet, json: bool) -> Result<(), DatabaseError> {
    if json {
        let out = serde_json::to_string_pretty(&*rs)
            .map_err(|e| DatabaseError::QueryError(format!("Failed to encode rows: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    let header: Vec<String> = rs.columns().iter().map(|c| c.name.clone()).collect();
    println!("{}", header.join("\t"));
    while rs.next_row() {
        let line: Vec<String> = (0..header.len())
            .map(|idx| rs.get_index(idx).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        println!("{}", line.join("\t"));
    }
    log::info!("{} row(s)", rs.row_count());
    Ok(())
}
