//! Geonames - dump importer

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use geonames_common::db::{create_pool, DbConfig};
use geonames_common::logging::{init_logging, LogConfig, LogLevel};
use geonames_ingest::pipeline::{PipelineOrchestrator, RunOptions};
use geonames_ingest::seeder::{MalformedPolicy, Seeder};
use geonames_ingest::storage::PgTableStore;
use geonames_ingest::worker::{InProcessLoadWorker, LoadWorker, ProcessLoadWorker, SeedRequest};
use geonames_ingest::{DatasetLoader, IngestConfig};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "geonames")]
#[command(author, version, about = "Import geonames.org dumps into PostgreSQL")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the dump files and load every dataset in order
    Import {
        /// Dataset names, e.g. country codes or cities15000 (default)
        names: Vec<String>,

        /// Only download and extract the files
        #[arg(long)]
        fetch_only: bool,

        /// Delete the working directory before fetching
        #[arg(long)]
        wipe_files: bool,

        /// Also fetch and load alternateNames
        #[arg(long)]
        alternate_names: bool,

        /// Run loads in this process instead of spawning `seed` per dataset
        #[arg(long)]
        in_process: bool,

        /// Skip lines that do not fit their dataset instead of aborting
        #[arg(long)]
        skip_malformed: bool,
    },

    /// Load one dataset from the working directory
    Seed {
        /// Seeder class, e.g. CountriesTableSeeder
        #[arg(long)]
        class: String,

        /// Working directory holding the source files
        #[arg(long)]
        path: PathBuf,

        /// Names file (without .txt), for NamesTableSeeder
        #[arg(long)]
        file: Option<String>,

        /// Run in production without confirmation
        #[arg(long)]
        force: bool,

        /// Skip lines that do not fit the dataset instead of aborting
        #[arg(long)]
        skip_malformed: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("geonames")
        .build();

    // Environment variables take precedence over flags
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: logging disabled: {e}");
    }

    if let Err(e) = execute(cli.command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn malformed_policy(skip: bool) -> MalformedPolicy {
    if skip {
        MalformedPolicy::Skip
    } else {
        MalformedPolicy::Abort
    }
}

async fn seeder(config: &IngestConfig) -> Result<Seeder<PgTableStore>> {
    let db_config = DbConfig::from_env()?;
    let pool = create_pool(&db_config).await?;

    Ok(Seeder::new(PgTableStore::new(pool))
        .with_batch_size(config.batch_size)
        .with_max_line_length(config.max_line_length)
        .with_plain_suffix(config.plain_suffix.clone()))
}

async fn execute(command: Command) -> Result<()> {
    let config = IngestConfig::from_env().context("Invalid geonames configuration")?;

    match command {
        Command::Import {
            names,
            fetch_only,
            wipe_files,
            alternate_names,
            in_process,
            skip_malformed,
        } => {
            let options = RunOptions {
                names,
                fetch_only,
                wipe_files,
                alternate_names,
                malformed: malformed_policy(skip_malformed),
            };

            if in_process && !fetch_only {
                let worker = InProcessLoadWorker::new(seeder(&config).await?);
                import(config, worker, &options).await
            } else {
                import(config, ProcessLoadWorker::current_exe()?, &options).await
            }
        }
        Command::Seed {
            class,
            path,
            file,
            force,
            skip_malformed,
        } => {
            if config.requires_force() && !force {
                bail!(
                    "Refusing to seed in {} without --force",
                    config.environment
                );
            }

            let loader: DatasetLoader = class.parse()?;
            let mut request =
                SeedRequest::new(loader, path).with_malformed(malformed_policy(skip_malformed));
            if let Some(file) = file {
                request = request.with_file(file);
            }

            let stats = seeder(&config).await?.seed(&request).await?;
            info!(
                "Seeded {} rows into {} ({} malformed lines skipped)",
                stats.rows_inserted,
                loader.table(),
                stats.skipped_lines
            );
            Ok(())
        }
    }
}

async fn import<W: LoadWorker>(config: IngestConfig, worker: W, options: &RunOptions) -> Result<()> {
    let orchestrator = PipelineOrchestrator::new(config, worker)?;
    let report = orchestrator.run(options).await?;

    info!(
        "Done: {} file(s) downloaded, {} cached, {} dataset(s) loaded",
        report.transferred(),
        report.skipped(),
        report.loads().count()
    );
    Ok(())
}
