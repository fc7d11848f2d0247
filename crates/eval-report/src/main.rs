//! CLI entry point for the evaluation report generator.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use eval_report::{ReportConfig, ReportPipeline, RunSummary, YearMatch};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// CLI-compatible multi-year cell policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliYearMatch {
    /// Use the first year-like segment
    First,
    /// Drop the year when a cell names more than one
    Reject,
}

impl From<CliYearMatch> for YearMatch {
    fn from(cli: CliYearMatch) -> Self {
        match cli {
            CliYearMatch::First => YearMatch::FirstMatch,
            CliYearMatch::Reject => YearMatch::RejectAmbiguous,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Per-professor PDF reports from student evaluation surveys",
    long_about = "Generates one PDF evaluation report per professor from a survey export.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  RUST_LOG    Log filter (overrides --log-level; may be set in .env)\n\n\
                  EXAMPLES:\n  \
                  # Reports for every professor\n  \
                  eval-report -i responses.xlsx -o reports/\n\n  \
                  # A single professor\n  \
                  eval-report -i responses.xlsx -p \"SMITH J\"\n\n  \
                  # List professors found in the file\n  \
                  eval-report -i responses.csv --list-professors\n\n  \
                  # Machine-readable summary\n  \
                  eval-report -i responses.xlsx --json | jq .failures"
)]
struct Args {
    /// Survey export to read (.xlsx, .xls, .ods or .csv)
    #[arg(short, long)]
    input: PathBuf,

    /// Only generate the report for this professor
    #[arg(short, long)]
    professor: Option<String>,

    /// Destination directory for finished reports
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory where PDFs are written before being moved
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Directory for intermediate chart images
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Logo image for the title page
    #[arg(long, conflicts_with = "no_logo")]
    logo: Option<PathBuf>,

    /// Do not draw a logo on the title page
    #[arg(long)]
    no_logo: bool,

    /// The first data row is a response, not question texts
    #[arg(long)]
    no_metadata_row: bool,

    /// How to read course/year cells naming more than one year
    #[arg(long, value_enum)]
    year_match: Option<CliYearMatch>,

    /// Fail when a topic column is missing instead of skipping the topic
    #[arg(long)]
    strict: bool,

    /// Print the professors found in the input and exit
    #[arg(long)]
    list_professors: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the summary)
    #[arg(short, long)]
    quiet: bool,

    /// Print the run summary as JSON to stdout
    ///
    /// Disables all logs so stdout holds only the JSON document.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
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
    let args = Args::parse();

    // RUST_LOG may come from .env
    dotenv().ok();
    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = build_config(&args)?;
    let pipeline = build_pipeline(&args, config)?;

    if args.list_professors {
        return list_professors(&pipeline, &args.input);
    }

    let summary = match pipeline.run_file(&args.input, args.professor.as_deref()) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Report generation failed: {}", e);
            return Err(anyhow!("Report generation failed: {}", e));
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_human_readable_summary(&summary, pipeline.config());
    }

    if summary.all_failed() {
        return Err(anyhow!("All {} reports failed", summary.failures.len()));
    }
    Ok(())
}

/// Merge the optional JSON config file with command-line overrides.
fn build_config(args: &Args) -> Result<ReportConfig> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ReportConfig::from_json_file(path)?
        }
        None => ReportConfig::default(),
    };

    let mut builder = ReportConfig::builder().base(base);
    if let Some(dir) = &args.output {
        builder = builder.destination_dir(dir);
    }
    if let Some(dir) = &args.staging_dir {
        builder = builder.staging_dir(dir);
    }
    if let Some(dir) = &args.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    if let Some(logo) = &args.logo {
        builder = builder.logo_path(Some(logo.clone()));
    }
    if args.no_logo {
        builder = builder.logo_path(None);
    }
    if args.no_metadata_row {
        builder = builder.has_metadata_row(false);
    }
    if let Some(policy) = args.year_match {
        builder = builder.year_match(policy.into());
    }
    if args.strict {
        builder = builder.strict_layout(true);
    }

    Ok(builder.build()?)
}

fn build_pipeline(args: &Args, config: ReportConfig) -> Result<ReportPipeline> {
    let mut builder = ReportPipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print every professor in the input, one per line.
fn list_professors(pipeline: &ReportPipeline, input: &Path) -> Result<()> {
    let table = pipeline.load(input)?;
    let professors = table.professors()?;
    for professor in &professors {
        println!("{}", professor);
    }
    info!("{} professors in {}", professors.len(), input.display());
    Ok(())
}

/// Print a human-readable run summary.
///
/// Uses `println!` on purpose: the summary is the command's output and must
/// show regardless of log level.
fn print_human_readable_summary(summary: &RunSummary, config: &ReportConfig) {
    println!("\n{}", "=".repeat(80));
    println!("EVALUATION REPORTS");
    println!("{}", "=".repeat(80));
    println!("  Destination: {}", config.destination_dir.display());
    println!(
        "  Generated:   {} of {}",
        summary.reports.len(),
        summary.attempted()
    );
    println!("  Duration:    {} ms", summary.duration_ms);
    println!();

    if !summary.reports.is_empty() {
        println!("REPORTS");
        println!("{}", "-".repeat(40));
        for report in &summary.reports {
            println!(
                "  {} -> {} ({} pages)",
                report.professor,
                report.path.display(),
                report.page_count
            );
            for warning in &report.warnings {
                println!("      ! {}", warning);
            }
        }
        println!();
    }

    if !summary.failures.is_empty() {
        println!("FAILURES");
        println!("{}", "-".repeat(40));
        for failure in &summary.failures {
            println!("  [{}] {}: {}", failure.code, failure.professor, failure.message);
        }
        println!();
    }

    if !summary.cleanup_warnings.is_empty() {
        warn!(
            "{} temporary files could not be removed",
            summary.cleanup_warnings.len()
        );
        for warning in &summary.cleanup_warnings {
            println!("  ! {}", warning);
        }
    }

    println!("{}", "=".repeat(80));
}
