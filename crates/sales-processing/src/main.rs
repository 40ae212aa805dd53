//! CLI entry point for the sales order cleaning pipeline.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use sales_processing::{
    CleaningConfig, CleaningOutcome, CleaningReport, Pipeline, ReportGenerator, read_orders_csv,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author = "Sales Analytics Team",
    version,
    about = "Batch cleaning pipeline for e-commerce order exports",
    long_about = "Cleans a raw Amazon sales order export into an analysis-ready CSV.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  RUST_LOG              Overrides --log-level when set\n\n\
                  EXAMPLES:\n  \
                  # Clean with the built-in mapping tables\n  \
                  sales-processing -i data/raw/amazon_sales.csv\n\n  \
                  # Override the mapping tables\n  \
                  sales-processing -i data/raw/amazon_sales.csv --config tables.json\n\n  \
                  # Preview the cleaned shape without writing anything\n  \
                  sales-processing -i data/raw/amazon_sales.csv --dry-run"
)]
struct Args {
    /// Path to the raw order CSV
    #[arg(short, long)]
    input: String,

    /// Path of the cleaned CSV to write
    #[arg(short, long, default_value = "data/processed/amazon_sales_cleaned.csv")]
    output: String,

    /// JSON file overriding the default mapping tables
    #[arg(short, long)]
    config: Option<String>,

    /// Run every cleaning stage but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of the human-readable summary
    ///
    /// Disables all logs; only the final JSON report is printed.
    #[arg(long)]
    json: bool,

    /// Write a JSON report next to the cleaned CSV
    ///
    /// The report will be saved as <output_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// the JSON report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = load_config(args.config.as_deref())?;
    let pipeline = build_pipeline(&args, config)?;

    let outcome = if args.dry_run {
        run_dry_run(&pipeline, &args)
    } else {
        pipeline
            .run(&args.input, &args.output)
            .map_err(|e| anyhow!("Pipeline failed [{}]: {}", e.error_code(), e))
    };

    match outcome {
        Ok(outcome) => handle_pipeline_output(&pipeline, &outcome, &args),
        Err(e) => {
            error!("{}", e);
            Err(e)
        }
    }
}

/// Load the mapping tables, falling back to the built-in defaults.
fn load_config(path: Option<&str>) -> Result<CleaningConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading mapping tables from: {}", path);
            CleaningConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path))?
        }
        None => CleaningConfig::default(),
    };
    Ok(config)
}

fn build_pipeline(args: &Args, config: CleaningConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Run every stage in memory without touching the output path.
fn run_dry_run(pipeline: &Pipeline, args: &Args) -> Result<CleaningOutcome> {
    info!("Dry run: {} will not be written", args.output);

    let df = read_orders_csv(&args.input)
        .map_err(|e| anyhow!("Failed to read input [{}]: {}", e.error_code(), e))?;
    pipeline
        .process(df)
        .map_err(|e| anyhow!("Pipeline failed [{}]: {}", e.error_code(), e))
}

/// Handle pipeline output based on CLI flags.
///
/// - Default: human-readable summary on stdout
/// - `--json`: JSON report on stdout only
/// - `--emit-report`: JSON report written next to the output file
fn handle_pipeline_output(pipeline: &Pipeline, outcome: &CleaningOutcome, args: &Args) -> Result<()> {
    let report = ReportGenerator::build_report(&args.input, outcome, pipeline.config())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report && !args.dry_run {
        let output = Path::new(&args.output);
        let report_dir = output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let generator = ReportGenerator::new(report_dir);
        let report_path = generator.write_report_to_file(&report, &extract_file_stem(output))?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&report, args);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the cleaning run.
fn print_human_readable_summary(report: &CleaningReport, args: &Args) {
    let summary = &report.summary;

    println!();
    println!("{}", "=".repeat(80));
    if args.dry_run {
        println!("DRY RUN COMPLETE (nothing written)");
    } else {
        println!("CLEANING COMPLETE");
    }
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file, summary.rows_before, summary.columns_before
    );
    match report.output_file {
        Some(ref output_file) => println!(
            "Output: {} ({} rows x {} columns)",
            output_file, summary.rows_after, summary.columns_after
        ),
        None => println!(
            "Output: none ({} rows x {} columns)",
            summary.rows_after, summary.columns_after
        ),
    }
    println!();

    println!("Stages:");
    for stage in &summary.stages {
        println!(
            "  {:<24} {:>8} -> {:<8} ({} columns)",
            stage.stage, stage.rows_before, stage.rows_after, stage.columns_after
        );
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed, {:.1}%)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed(),
        summary.rows_removed_percentage()
    );
    println!(
        "  Orders: {}, revenue: {:.2}",
        report.sales.total_orders, report.sales.total_revenue
    );
    println!();

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        for action in summary.actions.iter().take(10) {
            println!("  - {} ({} rows)", action.description, action.affected);
        }
        if summary.actions.len() > 10 {
            println!("  ... and {} more actions", summary.actions.len() - 10);
        }
        println!();
    }

    if summary.has_warnings() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}
