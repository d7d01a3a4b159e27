//! `healthguard` command-line tool
//!
//! ```text
//! healthguard [--config FILE] [--store DIR] [-v...] train --data telemetry.csv
//! healthguard ... infer --data telemetry.csv [--json]
//! healthguard ... run   --data telemetry.csv [--json]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use healthguard_core::{CsvSource, RawTable, TableSource};
use healthguard_ml::{
    FileModelStore, HealthPipeline, PipelineConfig, ReportOutcome, ScalingMode, TrainOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "healthguard")]
#[command(version = healthguard_core::VERSION)]
#[command(about = "Machine health monitoring from IoT telemetry")]
struct Cli {
    /// JSON settings file; omitted fields keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the trained models
    #[arg(short, long, global = true, default_value = "models")]
    store: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG wins when set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit (or load) both models on a telemetry export
    Train(DataArgs),
    /// Report on a telemetry export with stored models
    Infer(ReportArgs),
    /// Train if needed, then report on the same export
    Run(ReportArgs),
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Telemetry CSV file
    #[arg(short, long)]
    data: PathBuf,

    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[command(flatten)]
    input: DataArgs,

    /// Refit feature scaling on this batch instead of using the stored one
    #[arg(long)]
    batch_scaling: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Train(args) => {
            let pipeline = HealthPipeline::new(config, FileModelStore::new(&cli.store));
            let outcome = pipeline
                .train(&read_table(&args)?)
                .context("training failed")?;
            print_training(&outcome);
        }
        Command::Infer(args) => {
            let pipeline = report_pipeline(config, &args, &cli.store);
            let models = pipeline
                .load_models()
                .with_context(|| format!("no usable models in {}", cli.store.display()))?;
            let outcome = pipeline.infer(&read_table(&args.input)?, &models)?;
            print_outcome(&outcome, args.json)?;
        }
        Command::Run(args) => {
            let pipeline = report_pipeline(config, &args, &cli.store);
            let table = read_table(&args.input)?;
            let trained = pipeline.train(&table).context("training failed")?;
            if !args.json {
                print_training(&trained);
            }
            let outcome = pipeline.infer(&table, &trained.models)?;
            print_outcome(&outcome, args.json)?;
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config = PipelineConfig::from_json(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    log::info!("Loaded settings from {}", path.display());
    Ok(config)
}

fn report_pipeline(
    config: PipelineConfig,
    args: &ReportArgs,
    store: &Path,
) -> HealthPipeline<FileModelStore> {
    let config = if args.batch_scaling {
        config.with_scaling(ScalingMode::Batch)
    } else {
        config
    };
    HealthPipeline::new(config, FileModelStore::new(store))
}

fn read_table(args: &DataArgs) -> Result<RawTable> {
    let delimiter = u8::try_from(args.delimiter)
        .with_context(|| format!("delimiter {:?} is not a single byte", args.delimiter))?;
    CsvSource::from_path(&args.data)
        .with_delimiter(delimiter)
        .load_table()
        .with_context(|| format!("cannot load {}", args.data.display()))
}

fn print_training(outcome: &TrainOutcome) {
    let stats = &outcome.cleaning;
    println!(
        "Cleaned {} of {} rows ({} dropped)",
        stats.rows_kept, stats.rows_read, stats.rows_dropped
    );
    println!("Windows: {}", outcome.windows);
    println!(
        "Pseudo-labels: Normal {}, Moderate {}, Alert {}",
        outcome.label_counts[0], outcome.label_counts[1], outcome.label_counts[2]
    );
    println!("Clusterer: {}", outcome.clusterer_source);
    println!("Classifier: {}", outcome.classifier_source);

    let summary = outcome.models.classifier.summary();
    if outcome.classifier_source.is_fresh() {
        println!(
            "Training: {} epochs, best loss {:.4} at epoch {}",
            summary.epochs_run, summary.best_loss, summary.best_epoch
        );
    }
}

fn print_outcome(outcome: &ReportOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        print!("{}", outcome);
    }
    Ok(())
}
