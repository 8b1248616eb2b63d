mod catalog;
mod config;
mod delimited;
mod http;
mod idempotency;
mod importer;
mod medusa;
mod metrics;
mod models;
mod oplog;
mod pipeline;
mod reconcile;
mod report;
mod slug;
mod stock;
mod throttle;

use clap::{Args, Parser, Subcommand};
use config::{ConfigError, SyncConfig, parse_delimiter};
use delimited::DEFAULT_DELIMITER;
use eyre::{Result, WrapErr};
use idempotency::ResumeLedger;
use importer::{IMPORT_FAILURES_LOG, IMPORT_LOG, IMPORT_SUMMARY, ImportOptions};
use medusa::{MedusaClient, MedusaConfig};
use oplog::RunLogs;
use pipeline::{DetectPipeline, DetectRequest};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stock::{STOCK_FAILURES_LOG, STOCK_LOG, STOCK_SUMMARY, StockOptions};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "awin-sync",
    version,
    about = "Reconcile an AWIN product feed with a Medusa catalog"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare the feed with the live catalog and write report files (read-only)
    Detect(DetectArgs),
    /// Create the products listed in the missing report
    Import(ImportArgs),
    /// Push feed availability onto products listed in the stock mismatch report
    ReconcileStock(StockArgs),
}

#[derive(Debug, Args)]
struct DetectArgs {
    /// AWIN feed export
    #[arg(long)]
    feed: PathBuf,
    #[arg(long, default_value = "reports")]
    out_dir: PathBuf,
    /// Single-character field delimiter (`tab` accepted), `|` when omitted
    #[arg(long)]
    delimiter: Option<String>,
    /// Overrides CATALOG_PAGE_SIZE
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Debug, Args)]
struct ImportArgs {
    #[arg(long, default_value = "reports/missing_products.json")]
    input: PathBuf,
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    /// Skip handles the previous import log already settled
    #[arg(long)]
    resume: bool,
    #[arg(long)]
    limit: Option<usize>,
    /// Look up every handle but create nothing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct StockArgs {
    #[arg(long, default_value = "reports/stock_mismatches.csv")]
    input: PathBuf,
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    #[arg(long)]
    delimiter: Option<String>,
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target = "sync.cli", error = ?err, "run_failed");
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    let config = SyncConfig::from_env();
    match command {
        Command::Detect(args) => detect(args, config).await,
        Command::Import(args) => import(args, config).await,
        Command::ReconcileStock(args) => reconcile_stock(args, config).await,
    }
}

async fn detect(args: DetectArgs, mut config: SyncConfig) -> Result<()> {
    if let Some(page_size) = args.page_size.filter(|v| *v > 0) {
        config.page_size = page_size;
    }
    let delimiter = delimiter_arg(args.delimiter.as_deref())?;
    let medusa = MedusaConfig::from_env()?;
    medusa.read_key()?;
    let client = MedusaClient::reader(medusa);

    let request = DetectRequest {
        feed_path: args.feed,
        out_dir: args.out_dir,
        delimiter,
    };
    let summary = DetectPipeline::new(&client, config)
        .run(&request)
        .await
        .wrap_err("detection run failed")?;
    info!(
        target = "sync.cli",
        summary = %summary.files.summary_json.display(),
        "reports_written"
    );
    Ok(())
}

async fn import(args: ImportArgs, config: SyncConfig) -> Result<()> {
    require_input(&args.input)?;
    let records = report::load_missing(&args.input)
        .wrap_err_with(|| format!("reading {}", args.input.display()))?;

    let ledger = if args.resume {
        let ledger = ResumeLedger::load(&args.log_dir.join(IMPORT_LOG))
            .wrap_err("reading previous import log")?;
        info!(target = "sync.cli", settled = ledger.len(), "resume_ledger_loaded");
        ledger
    } else {
        ResumeLedger::default()
    };

    let client = MedusaClient::writer(MedusaConfig::from_env()?)
        .await
        .wrap_err("authenticating against the admin API")?;
    let options = ImportOptions {
        dry_run: args.dry_run,
        limit: args.limit,
        ..ImportOptions::from_config(&config)
    };
    let mut logs = RunLogs::open(&args.log_dir, IMPORT_LOG, IMPORT_FAILURES_LOG)?;
    let summary = importer::import_missing(&records, &client, &options, &ledger, &mut logs).await?;
    report::write_json(&args.log_dir.join(IMPORT_SUMMARY), &summary)?;
    Ok(())
}

async fn reconcile_stock(args: StockArgs, config: SyncConfig) -> Result<()> {
    require_input(&args.input)?;
    let delimiter = delimiter_arg(args.delimiter.as_deref())?;
    let location_id = config.require_stock_location()?.to_string();
    let records = report::load_stock_mismatches(&args.input, delimiter)
        .wrap_err_with(|| format!("reading {}", args.input.display()))?;

    let client = MedusaClient::writer(MedusaConfig::from_env()?)
        .await
        .wrap_err("authenticating against the admin API")?;
    let options = StockOptions {
        throttle: config.throttle,
        location_id,
        dry_run: args.dry_run,
    };
    let mut logs = RunLogs::open(&args.log_dir, STOCK_LOG, STOCK_FAILURES_LOG)?;
    let summary = stock::reconcile_stock(&records, &client, &options, &mut logs).await?;
    report::write_json(&args.log_dir.join(STOCK_SUMMARY), &summary)?;
    Ok(())
}

fn delimiter_arg(raw: Option<&str>) -> Result<u8, ConfigError> {
    raw.map(parse_delimiter)
        .transpose()
        .map(|parsed| parsed.unwrap_or(DEFAULT_DELIMITER))
}

fn require_input(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::MissingInput(path.display().to_string()))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
