use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use popquery::store::FileStore;
use popquery::{ChartKind, Config, QueryError, Service};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "popquery")]
#[command(about = "Ingest population extracts and answer free-text chart queries", long_about = None)]
struct Args {
    /// Snapshot file holding the normalized records
    #[arg(long, default_value = "files.json")]
    store: PathBuf,

    /// JSON configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a CSV extract (FILE or stdin) and replace the stored snapshot
    Ingest { file: Option<PathBuf> },
    /// Answer a query, e.g. 'Show me data for China and India from 2001 to 2015'
    Query {
        text: String,
        /// bar, line, pie or choropleth
        #[arg(long, default_value = "bar")]
        chart: ChartKind,
    },
    /// Show the structured filter a query is interpreted as
    Interpret { text: String },
    /// Mean population (billions) per selected country
    Summary { text: Option<String> },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let store = FileStore::open(&args.store)
        .with_context(|| format!("Failed to open store {}", args.store.display()))?;
    let service = Service::new(Arc::new(store), config);

    match args.command {
        Command::Ingest { file } => {
            let content = read_input(file.as_ref())?;
            let report = service.ingest(&content).context("Ingestion failed")?;
            print_json(&report)
        }
        Command::Query { text, chart } => match service.query(&text, chart) {
            Ok(response) => {
                for warning in &response.warnings {
                    eprintln!("Warning: {}", warning);
                }
                print_json(&response)
            }
            Err(e) => exit_with_warning(&e),
        },
        Command::Interpret { text } => print_json(&service.interpret(&text)),
        Command::Summary { text } => {
            let (_, projection) = match service.select(text.as_deref().unwrap_or("")) {
                Ok(selected) => selected,
                Err(e) => exit_with_warning(&e),
            };
            let summary: Vec<serde_json::Value> = projection
                .mean_values()
                .into_iter()
                .map(|(country, mean)| {
                    serde_json::json!({
                        "country": country,
                        "meanPopulationBillions": mean.map(|m| m / 1e9),
                    })
                })
                .collect();
            print_json(&summary)
        }
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read CSV from stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value).context("Failed to encode output")?;
    writeln!(handle).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Query failures are shown to the user, never treated as crashes.
fn exit_with_warning(error: &QueryError) -> ! {
    eprintln!("Warning: {}", error);
    std::process::exit(2);
}
