//! mysql-pg-migrate CLI - convert a MySQL database to PostgreSQL.

use clap::Parser;
use mysql_pg_migrate::{Config, MigrateError, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mysql-pg-migrate")]
#[command(about = "Convert a MySQL database to PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (a template is written if it is missing)
    #[arg(short, long, default_value = "mysql-pg-migrate.yml")]
    config: PathBuf,

    /// Log per-table progress and row throughput
    #[arg(short, long)]
    verbose: bool,

    /// Fail instead of writing a configuration template
    #[arg(long)]
    no_init: bool,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: trace, debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ MigrateError::ConfigInitialized(_)) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load_or_init(&cli.config, !cli.no_init)?;
    info!("Loaded configuration from {:?}", cli.config);

    let result = Orchestrator::new(config)
        .with_verbose(cli.verbose)
        .run()
        .await?;

    if cli.output_json {
        println!("{}", result.to_json()?);
    } else {
        println!("\nConversion completed!");
        println!("  Duration: {:.2}s", result.duration_seconds);
        println!("  Tables: {}", result.tables_total);
        println!("  Rows: {}", result.rows_transferred);
        println!("  Throughput: {} rows/sec", result.rows_per_second);
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
