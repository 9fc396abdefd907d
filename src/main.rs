//! Sockshop CLI - Command-line interface for the sock warehouse service

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;
use sockshop::config::{self, SockshopConfig};
use sockshop::importer::ImportOptions;
use sockshop::output::{OutputMode, emit_success};
use sockshop::storage::SqliteStore;
use sockshop::ui::{self, Icons, ImportProgress};
use sockshop::{Inventory, SockRequest, StockFilter};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sockshop")]
#[command(version)]
#[command(about = "Sock warehouse inventory - REST API and CSV bulk import over SQLite")]
#[command(long_about = r#"
Sockshop keeps the stock of socks per color and cotton percentage:
  • Register incoming and outgoing socks
  • Query stock totals by color and cotton range
  • Bulk import stock files (CSV, one commit per row)
  • Serve everything over HTTP with an OpenAPI document

Example usage:
  sockshop init
  sockshop import --file socks.csv
  sockshop stock --color red --min 30 --max 70
  sockshop serve --port 8080
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default sockshop.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP server
    Serve {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply pending schema migrations and list applied ones
    Migrate {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Import a CSV stock file
    Import {
        /// CSV file with a color;cottonPercentage;quantity header
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Field delimiter (defaults to ';')
        #[arg(long)]
        delimiter: Option<char>,
    },

    /// Show the total quantity for a color and cotton range
    Stock {
        #[arg(long)]
        color: String,

        /// Minimum cotton percentage (inclusive)
        #[arg(long)]
        min: Option<i64>,

        /// Maximum cotton percentage (inclusive)
        #[arg(long)]
        max: Option<i64>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Register incoming socks
    Income {
        #[command(flatten)]
        movement: MovementArgs,
    },

    /// Register outgoing socks
    Outcome {
        #[command(flatten)]
        movement: MovementArgs,
    },

    /// List positions and database statistics
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct MovementArgs {
    #[arg(long)]
    color: String,

    #[arg(long)]
    cotton: i64,

    #[arg(short, long)]
    quantity: i64,

    /// Path to the database file
    #[arg(short, long)]
    database: Option<PathBuf>,
}

/// Config file values, overridden by command-line flags
fn resolve_config(path: Option<&PathBuf>, database: Option<PathBuf>) -> anyhow::Result<SockshopConfig> {
    let mut config = config::load_config(path.map(PathBuf::as_path))?.unwrap_or_default();
    if let Some(db) = database {
        config.database = Some(db.to_string_lossy().to_string());
    }
    Ok(config)
}

fn open_store(config: &SockshopConfig) -> anyhow::Result<SqliteStore> {
    let path = config.database_path();
    config::ensure_db_dir(&path)?;
    Ok(SqliteStore::open(&path)?)
}

/// First 12 characters of a checksum, or all of it when shorter
fn short_checksum(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let output_mode = OutputMode::from_flag(cli.json);

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Init { force } => {
            let path = config_path.cloned().unwrap_or_else(config::default_config_path);
            let defaults = SockshopConfig::with_defaults();
            config::write_config(&path, &defaults, force)?;
            if output_mode.is_human() {
                ui::success(&format!("Wrote {}", path.display()));
            }
            emit_success(output_mode, "init", &defaults)?;
        }

        Commands::Serve { database, host, port } => {
            let mut config = resolve_config(config_path, database)?;
            if host.is_some() {
                config.host = host;
            }
            if port.is_some() {
                config.port = port;
            }
            sockshop::server::start_server(&config).await?;
        }

        Commands::Migrate { database } => {
            let config = resolve_config(config_path, database)?;
            let path = config.database_path();
            config::ensure_db_dir(&path)?;
            let spinner = output_mode.is_human().then(|| ui::Spinner::new("Applying migrations..."));
            let mut store = SqliteStore::connect(&path)?;
            let newly_applied = store.migrate()?;
            let applied = store.applied_migrations()?;
            if let Some(spinner) = spinner {
                spinner.finish_with_message(&format!("{} new migration(s) applied", newly_applied.len()));
            }

            if output_mode.is_human() {
                ui::header(&format!("Migrations for {}", path.display()));
                for migration in &applied {
                    ui::summary_row(
                        &format!("v{}", migration.version),
                        &format!("{} {}", migration.name, ui::dim(short_checksum(&migration.checksum))),
                    );
                }
                ui::success(&format!("Schema is at version {}", applied.last().map(|m| m.version).unwrap_or(0)));
            }
            emit_success(output_mode, "migrate", &applied)?;
        }

        Commands::Import { file, database, delimiter } => {
            let mut config = resolve_config(config_path, database)?;
            if delimiter.is_some() {
                config.delimiter = delimiter;
            }
            let options = ImportOptions { delimiter: config.delimiter()? };
            let db_path = config.database_path();
            drop(open_store(&config)?);

            let reader = BufReader::new(File::open(&file)?);
            let source = file.display().to_string();
            tracing::info!("Importing {} into {:?}", source, db_path);

            // Ctrl+C stops the import between rows; committed rows stay
            let cancel = CancellationToken::new();
            let interrupt = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                }
            });

            let started = Instant::now();
            let progress = output_mode.is_human().then(|| {
                ui::phase(&format!("{} Importing {}", Icons::FILE, source));
                ImportProgress::new(&source)
            });
            let (progress, tx) = match progress {
                Some((progress, tx)) => (Some(progress), Some(tx)),
                None => (None, None),
            };

            let result = tokio::task::spawn_blocking(move || {
                let store = SqliteStore::connect(&db_path)?;
                Inventory::new(&store).import_csv(reader, &options, &cancel, tx)
            })
            .await?;
            interrupt.abort();

            let report = match (result, progress) {
                (Ok(report), Some(progress)) => {
                    progress.finish_with_summary(started.elapsed(), report.imported, report.failed);
                    if !report.errors.is_empty() {
                        ui::section("Rejected rows");
                        for error in &report.errors {
                            ui::warn(&error.to_string());
                        }
                    }
                    if report.cancelled {
                        ui::warn(&format!("Interrupted, {} committed rows kept", report.imported));
                    }
                    ui::timing(&format!("{} rows read in {:.2?}", report.rows, started.elapsed()));
                    report
                }
                (Ok(report), None) => report,
                (Err(e), progress) => {
                    if let Some(progress) = progress {
                        progress.abandon();
                        ui::error(&format!("Import failed: {}", e));
                    }
                    return Err(e.into());
                }
            };
            emit_success(output_mode, "import", &report)?;
        }

        Commands::Stock { color, min, max, database } => {
            let config = resolve_config(config_path, database)?;
            let store = open_store(&config)?;
            let filter = StockFilter::new(color, min, max);
            let total = Inventory::new(&store).quantity_with_filter(&filter)?;

            if output_mode.is_human() {
                ui::info(
                    &format!(
                        "{} socks with {}-{}% cotton",
                        filter.color, filter.min_cotton_percentage, filter.max_cotton_percentage
                    ),
                    &total.to_string(),
                );
            }
            emit_success(output_mode, "stock", total)?;
        }

        Commands::Income { movement } => {
            let config = resolve_config(config_path, movement.database.clone())?;
            let store = open_store(&config)?;
            let request = SockRequest::new(movement.color, movement.cotton, movement.quantity);
            let sock = Inventory::new(&store).register_income(&request)?;
            if output_mode.is_human() {
                ui::success(&format!(
                    "{} {} ({}% cotton): {} in stock",
                    Icons::UP, sock.color, sock.cotton_percentage, sock.quantity
                ));
            }
            emit_success(output_mode, "income", &sock)?;
        }

        Commands::Outcome { movement } => {
            let config = resolve_config(config_path, movement.database.clone())?;
            let store = open_store(&config)?;
            let request = SockRequest::new(movement.color, movement.cotton, movement.quantity);
            let sock = Inventory::new(&store).register_outcome(&request)?;
            if output_mode.is_human() {
                ui::success(&format!(
                    "{} {} ({}% cotton): {} in stock",
                    Icons::DOWN, sock.color, sock.cotton_percentage, sock.quantity
                ));
            }
            emit_success(output_mode, "outcome", &sock)?;
        }

        Commands::Stats { database } => {
            let config = resolve_config(config_path, database)?;
            let store = open_store(&config)?;
            let stats = store.stats()?;
            let socks = Inventory::new(&store).list_socks()?;

            if output_mode.is_human() {
                println!("{} Sockshop Statistics ({:?})", Icons::STATS, config.database_path());
                let positions = stats.positions.to_string();
                let pairs = stats.pairs.to_string();
                let colors = stats.colors.to_string();
                let version = stats.schema_version.to_string();
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Positions", positions.as_str()),
                        ("Pairs in stock", pairs.as_str()),
                        ("Colors", colors.as_str()),
                        ("Schema version", version.as_str()),
                    ])
                );
                if !socks.is_empty() {
                    ui::section("Positions");
                    println!("{}", ui::socks_table(&socks));
                }
            }
            emit_success(
                output_mode,
                "stats",
                serde_json::json!({"stats": stats, "socks": socks}),
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_checksum() {
        assert_eq!(short_checksum("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_checksum("abc"), "abc");
        assert_eq!(short_checksum(""), "");
        // Byte 12 falls inside a character
        assert_eq!(short_checksum("aéééééééé"), "aéééééééé");
    }
}
