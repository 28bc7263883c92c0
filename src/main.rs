use actix::{Actor, Addr};
use anyhow::anyhow;
use catalog_import::csv::{into_batches, read_file};
use catalog_import::importer::RowFailure;
use catalog_import::service::{
    GetReport, ImportAttributes, ImportBatch, ImportService, Purge, Report,
};
use catalog_import::{format_duration, BatchResult, Catalog, ImportConfig, ImportRow};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::time::Instant;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(version, about = "Reconciles CSV product feeds into the catalog")]
struct Cli {
    /// YAML configuration file, `import.yaml` is used when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import products, variations and price tiers
    Import { csv: PathBuf },
    /// Apply format and material thickness by SKU
    Attributes { csv: PathBuf },
    /// Delete every product, variation and price tier
    Purge {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct Failure {
    row: usize,
    #[serde(flatten)]
    failure: RowFailure,
}

#[derive(Serialize)]
struct Output<'a> {
    file: &'a str,
    #[serde(flatten)]
    report: Report,
    failures: Vec<Failure>,
    not_sent: usize,
}

#[actix_rt::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => (),
        Err(err) => {
            return Err(anyhow!("Unable to open .env file: {err}"));
        }
    }

    let cli = Cli::parse();
    let config = ImportConfig::load(cli.config.as_deref())?;
    log::info!(
        "Using catalog at {} with price list \"{}\"",
        config.database.display(),
        config.price_list
    );
    let catalog = Catalog::open(&config.database).await?;

    let token = CancellationToken::new();
    let t = token.clone();
    tokio::spawn(async {
        let token = t;
        match signal::ctrl_c().await {
            Ok(_) => {
                log::warn!("Interrupted, finishing current row");
                token.cancel()
            }
            Err(err) => log::error!("Unable to listen to shutdown: {err}"),
        }
    });

    let (csv, attributes) = match cli.command {
        Command::Import { csv } => (csv, false),
        Command::Attributes { csv } => (csv, true),
        Command::Purge { yes } => {
            if !yes {
                return Err(anyhow!("Refusing to purge the catalog without --yes"));
            }
            let addr = ImportService::new(catalog, config, token).start();
            let removed = addr.send(Purge).await??;
            log::info!("Catalog purged, {removed} products removed");
            return Ok(());
        }
    };

    let rows = read_file(&csv, config.delimiter_byte())?;
    let total = rows.len();
    let batches = into_batches(rows, config.batch_size);
    log::info!(
        "Read {total} rows from {}, {} batches",
        csv.display(),
        batches.len()
    );

    let pb_style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos:>7}/{len:7} {msg}");
    let pb = if cli.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total as u64)
    };
    match pb_style {
        Ok(p) => pb.set_style(p.progress_chars("=-")),
        Err(err) => log::warn!("Unable to initialize progress bar: {err}"),
    }

    let started = Instant::now();
    let addr = ImportService::new(catalog, config, token.clone()).start();
    let mut failures = Vec::new();
    let mut offset = 0;
    for batch in batches {
        if token.is_cancelled() {
            break;
        }
        let len = batch.len();
        let res = send(&addr, batch, attributes).await?;
        failures.extend(res.failures().into_iter().map(|failure| Failure {
            row: offset + failure.index + 1,
            failure,
        }));
        offset += len;
        pb.inc(len as u64);
        pb.set_message(format!("{} failed", failures.len()));
    }
    pb.finish_and_clear();

    let report = addr.send(GetReport).await?;
    let not_sent = total - offset;
    if cli.json {
        let file = csv.to_string_lossy();
        let output = Output {
            file: &file,
            report: report.clone(),
            failures,
            not_sent,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for f in &failures {
            let retry = if f.failure.retryable { " (retryable)" } else { "" };
            println!("row {}: {}{retry}", f.row, f.failure.reason);
        }
        println!(
            "{}: {} in {}",
            csv.display(),
            report.summary,
            format_duration(&started.elapsed())
        );
        if not_sent > 0 {
            println!("{not_sent} rows not sent after cancellation");
        }
    }

    if report.summary.rows_failed > 0 || not_sent > 0 {
        return Err(anyhow!(
            "{} of {total} rows were not applied",
            report.summary.rows_failed + not_sent
        ));
    }
    Ok(())
}

async fn send(
    addr: &Addr<ImportService>,
    rows: Vec<ImportRow>,
    attributes: bool,
) -> Result<BatchResult, anyhow::Error> {
    let res = if attributes {
        addr.send(ImportAttributes(rows)).await?
    } else {
        addr.send(ImportBatch(rows)).await?
    };
    Ok(res)
}
