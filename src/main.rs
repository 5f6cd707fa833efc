use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use healparser::api::{self, AppState};
use healparser::config::Config;
use healparser::logging;
use healparser::parser::{LogParser, ReportMeta};
use healparser::scoring;
use healparser::service::ReportService;
use healparser::store::{JsonFileStore, MemoryStore, ReportStore};

/// healparser - healing leaderboards from classic combat logs.
#[derive(Parser, Debug)]
#[command(name = "healparser", version, about)]
struct Cli {
    /// Config file (defaults to ./healparser.toml when present).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Port to listen on, overriding the config file.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Directory for stored reports, overriding the config file.
        #[arg(long = "data-dir")]
        data_dir: Option<PathBuf>,
    },

    /// Parse and score one log file, printing the report as JSON.
    Report {
        file: PathBuf,

        /// Report name (defaults to the file name).
        #[arg(short = 'n', long = "name")]
        name: Option<String>,

        /// Include every player's heal records.
        #[arg(short = 'r', long = "records")]
        records: bool,

        /// Year the log was recorded in.
        #[arg(short = 'y', long = "year")]
        year: Option<i32>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    logging::init(cli.debug, config.logging.level.as_deref());

    let result = match cli.command {
        Command::Serve { port, data_dir } => serve(config, port, data_dir),
        Command::Report {
            file,
            name,
            records,
            year,
        } => report(&config, &file, name, records, year),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn serve(mut config: Config, port: Option<u16>, data_dir: Option<PathBuf>) -> Result<(), String> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if data_dir.is_some() {
        config.storage.data_dir = data_dir;
    }
    config.validate().map_err(|e| e.to_string())?;

    let store: Arc<dyn ReportStore> = match &config.storage.data_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Storing reports as JSON files");
            Arc::new(JsonFileStore::new(dir.clone()))
        }
        None => {
            tracing::info!("Storing reports in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(AppState {
        service: ReportService::new(
            store,
            Duration::from_secs(config.server.cache_ttl_secs),
            config.parser.clone(),
            config.scoring.clone(),
        ),
        owner: config.server.owner.clone(),
        max_upload_bytes: config.server.max_upload_bytes,
    });

    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create tokio runtime: {e}"))?;
    rt.block_on(async {
        let app = api::create_router(state);
        let addr = format!("{}:{}", config.server.bind, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

        tracing::info!(addr = %addr, version = env!("CARGO_PKG_VERSION"), "healparser listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutting down");
                }
            })
            .await
            .map_err(|e| format!("Server error: {e}"))
    })
}

fn report(
    config: &Config,
    file: &Path,
    name: Option<String>,
    records: bool,
    year: Option<i32>,
) -> Result<(), String> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("combat.log")
        .to_string();
    let name = name.unwrap_or_else(|| file_name.clone());

    let mut parser = LogParser::new(&config.parser);
    if let Some(year) = year {
        parser = parser.with_year(year);
    }

    let start = std::time::Instant::now();
    let parsed = parser
        .parse(&text, ReportMeta::new(&name, &file_name, &config.server.owner))
        .map_err(|e| format!("{}: {e}", file.display()))?;
    tracing::info!(
        file = %file.display(),
        events = parsed.events.len(),
        notes = parsed.notes.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Parsed log"
    );

    let report = scoring::score_report(
        &parsed.events,
        &parsed.shell.report_id,
        &parsed.shell.report_name,
        &config.scoring,
        records,
    );
    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
