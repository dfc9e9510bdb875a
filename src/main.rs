use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use review_etl::config::PipelineConfig;
use review_etl::constants::DEFAULT_LOG_DIR;
use review_etl::domain::Table;
use review_etl::infra::{self, OutputFormat};
use review_etl::observability::{init_logging, Diagnostics, TracingDiagnostics};
use review_etl::pipeline::{OutputTarget, Pipeline};

#[derive(Parser)]
#[command(name = "review_etl")]
#[command(about = "Batch ETL pipeline for product review datasets")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML file with validation and output settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rows to print when no output file is given
    #[arg(long, global = true)]
    preview_rows: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a raw review file and optionally save a CSV copy
    Extract {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Add derived text and rating features
    Enrich {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Deduplicate, reorder columns and normalize types
    Transform {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check the schema contract and critical columns
    Validate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Persist a dataset in the chosen format
    Load {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Run every stage from raw input to final output
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Write a JSON run report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Load the input or log why it could not be loaded
fn load(input: &Path, diag: &dyn Diagnostics) -> Option<Table> {
    infra::load_table(input, diag).ok()
}

/// Save when an output path was given, otherwise print a preview
fn save_or_preview(
    table: &Table,
    output: Option<&Path>,
    format: OutputFormat,
    preview_rows: usize,
    diag: &dyn Diagnostics,
) {
    match output {
        Some(path) => {
            infra::save_table(table, path, format.as_str(), diag);
        }
        None => println!("{}", table.head(preview_rows)),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = init_logging(Path::new(DEFAULT_LOG_DIR));

    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let preview_rows = cli.preview_rows.unwrap_or(config.output.preview_rows);
    let pipeline = Pipeline::from_config(&config);

    match cli.command {
        Commands::Extract { input, output } => {
            let diag = TracingDiagnostics::new("extract");
            let Some(table) = load(&input, &diag) else {
                return Ok(ExitCode::FAILURE);
            };
            save_or_preview(&table, output.as_deref(), OutputFormat::Csv, preview_rows, &diag);
        }
        Commands::Enrich { input, output } => {
            let diag = TracingDiagnostics::new("enrich");
            let Some(table) = load(&input, &diag) else {
                return Ok(ExitCode::FAILURE);
            };
            let table = pipeline.enrich_table(table, &diag);
            save_or_preview(&table, output.as_deref(), OutputFormat::Csv, preview_rows, &diag);
        }
        Commands::Transform { input, output } => {
            let diag = TracingDiagnostics::new("transform");
            let Some(table) = load(&input, &diag) else {
                return Ok(ExitCode::FAILURE);
            };
            let (table, _) = pipeline.transform_table(table, &diag);
            save_or_preview(&table, output.as_deref(), OutputFormat::Csv, preview_rows, &diag);
        }
        Commands::Validate { input } => {
            let diag = TracingDiagnostics::new("validate");
            let Some(table) = load(&input, &diag) else {
                return Ok(ExitCode::FAILURE);
            };
            // The outcome is logged; a failed validation is not a failed command
            pipeline.validate_table(&table, &diag);
        }
        Commands::Load {
            input,
            output,
            format,
        } => {
            let diag = TracingDiagnostics::new("load");
            let Some(table) = load(&input, &diag) else {
                return Ok(ExitCode::FAILURE);
            };
            let format = format.unwrap_or(config.output.format);
            infra::save_table(&table, &output, format.as_str(), &diag);
        }
        Commands::Run {
            input,
            output,
            format,
            report,
        } => {
            let diag = TracingDiagnostics::new("run");
            let format = format.unwrap_or(config.output.format);
            let target = output.as_deref().map(|path| OutputTarget { path, format });
            let outcome = match pipeline.run(&input, target, &diag) {
                Ok(outcome) => outcome,
                Err(_) => return Ok(ExitCode::FAILURE),
            };

            if output.is_none() {
                println!("{}", outcome.table.head(preview_rows));
            }
            if let Some(path) = report {
                outcome
                    .report
                    .write_json(&path)
                    .with_context(|| format!("Failed to write run report to {}", path.display()))?;
                info!("Run report written to {}", path.display());
            }
            info!(
                run_id = %outcome.report.run_id,
                rows_out = outcome.report.rows_out,
                validation_passed = outcome.report.validation.passed,
                "Pipeline finished"
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
