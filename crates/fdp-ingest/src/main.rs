//! FDP Ingest - fleet data ingestion tool

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser};
use serde::Serialize;
use tracing::info;

use fdp_common::logging::{init_logging, LogConfig, LogLevel};
use fdp_ingest::config::IngestConfig;
use fdp_ingest::pipeline::{Entity, IngestRunner, RunContext, RunReport};
use fdp_ingest::storage::{EntityStore, MemoryStore, PgStore, StatusTracker};
use fdp_ingest::{inspections, maintenance, scores, violations};

#[derive(Parser, Debug)]
#[command(name = "fdp-ingest")]
#[command(author, version, about = "Fleet data ingestion tool")]
struct Cli {
    /// Data source to ingest
    #[command(subcommand)]
    source: Source,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Source {
    /// Ingest driver safety scores (CSV, Excel)
    Scores(RunArgs),

    /// Ingest DOT roadside inspections (XML)
    Inspections(RunArgs),

    /// Ingest hours-of-service violations (spreadsheet, JSON)
    Violations(RunArgs),

    /// Ingest programmed maintenance schedules (Excel, CSV)
    Maintenance(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Single input file
    #[arg(short, long, conflicts_with = "dir")]
    file: Option<PathBuf>,

    /// Directory of input files; defaults to ./data/<source>
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Run date override (YYYY-MM-DD); defaults to today
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,

    /// Normalize and dedup against an in-memory store, without a database
    #[arg(long)]
    dry_run: bool,

    /// Print a per-source analysis of the normalized records
    #[arg(long)]
    analyze: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    let config = IngestConfig::load().context("Failed to load configuration")?;

    match cli.source {
        Source::Scores(args) => {
            execute::<scores::ScoreRecord, _>(&config, args, |records, _| {
                render(&scores::analyze(records))
            })
            .await
        },
        Source::Inspections(args) => {
            execute::<inspections::InspectionRecord, _>(&config, args, |records, _| {
                render(&inspections::analyze(records))
            })
            .await
        },
        Source::Violations(args) => {
            execute::<violations::ViolationRecord, _>(&config, args, |records, _| {
                render(&violations::analyze(records))
            })
            .await
        },
        Source::Maintenance(args) => {
            execute::<maintenance::MaintenanceRecord, _>(&config, args, |records, as_of| {
                render(&maintenance::analyze(records, as_of))
            })
            .await
        },
    }
}

/// Run one source end to end: ingest, report status, print the summary
async fn execute<E, F>(config: &IngestConfig, args: RunArgs, analysis: F) -> Result<()>
where
    E: Entity,
    F: FnOnce(&[E], NaiveDate) -> Result<String>,
    PgStore: EntityStore<E>,
{
    let run = match args.date {
        Some(date) => RunContext::new(date),
        None => RunContext::today(),
    };
    let runner = IngestRunner::new(run, config.loader.batch_loader());

    let report = if args.dry_run {
        info!(source = %E::KIND, "Dry run, using in-memory store");
        let store = MemoryStore::<E>::new();
        ingest(&runner, &store, &args).await?
    } else {
        let store = PgStore::connect(&config.database).await?;
        store.migrate().await?;
        let report: RunReport<E> = ingest(&runner, &store, &args).await?;
        store
            .report_run(
                E::KIND,
                report.summary.is_success(),
                &report.summary.status_comment(),
            )
            .await?;
        report
    };

    println!("{}", render(&report.summary)?);
    if args.analyze {
        println!("{}", analysis(&report.entities, run.run_date)?);
    }

    if !report.summary.is_success() {
        bail!(
            "Ingestion finished with failures: {}",
            report.summary.status_comment()
        );
    }
    Ok(())
}

async fn ingest<E, S>(runner: &IngestRunner<E>, store: &S, args: &RunArgs) -> Result<RunReport<E>>
where
    E: Entity,
    S: EntityStore<E>,
{
    let report = match (&args.file, &args.dir) {
        (Some(file), _) => runner.run_file(store, file).await?,
        (None, Some(dir)) => runner.run_directory(store, dir).await?,
        (None, None) => {
            let dir = PathBuf::from(format!("./data/{}", E::KIND));
            runner.run_directory(store, &dir).await?
        },
    };
    Ok(report)
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to render output")
}
