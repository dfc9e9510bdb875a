use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info_span;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::domain::{ReviewDataset, Table};
use crate::error::Result;
use crate::infra::{self, OutputFormat};
use crate::observability::Diagnostics;
use crate::pipeline::processing::{
    DefaultEnricher, DefaultTransformer, Enricher, Transformer, ValidationReport, Validator,
};

/// Validation outcome as recorded in a run report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub passed: bool,
    #[serde(flatten)]
    pub report: ValidationReport,
}

impl From<ValidationReport> for ValidationSummary {
    fn from(report: ValidationReport) -> Self {
        Self {
            passed: report.passed(),
            report,
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows_loaded: usize,
    pub duplicates_removed: usize,
    pub rows_out: usize,
    pub validation: ValidationSummary,
    pub output_written: bool,
}

impl PipelineReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), self)?;
        Ok(())
    }
}

/// The final table together with the report describing how it was produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub table: Table,
    pub report: PipelineReport,
}

/// Where and how a run persists its result
#[derive(Debug, Clone, Copy)]
pub struct OutputTarget<'a> {
    pub path: &'a Path,
    pub format: OutputFormat,
}

/// Load, enrich, transform, validate and save, one stage after another
pub struct Pipeline {
    enricher: Box<dyn Enricher>,
    transformer: Box<dyn Transformer>,
    validator: Validator,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Validator::default())
    }
}

impl Pipeline {
    pub fn new(validator: Validator) -> Self {
        Self::with_stages(
            Box::new(DefaultEnricher::new()),
            Box::new(DefaultTransformer::new()),
            validator,
        )
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.validator())
    }

    pub fn with_stages(
        enricher: Box<dyn Enricher>,
        transformer: Box<dyn Transformer>,
        validator: Validator,
    ) -> Self {
        Self {
            enricher,
            transformer,
            validator,
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn enrich_table(&self, table: Table, diag: &dyn Diagnostics) -> Table {
        let dataset = ReviewDataset::from_table(table, diag);
        self.enricher.enrich(dataset, diag).into_table()
    }

    /// Returns the transformed table and the number of duplicate rows dropped
    pub fn transform_table(&self, table: Table, diag: &dyn Diagnostics) -> (Table, usize) {
        let dataset = ReviewDataset::from_table(table, diag);
        let outcome = self.transformer.transform(dataset, diag);
        (outcome.dataset.into_table(), outcome.duplicates_removed)
    }

    pub fn validate_table(&self, table: &Table, diag: &dyn Diagnostics) -> ValidationReport {
        self.validator.validate(table, diag)
    }

    /// Run every stage over `input`. Only a load failure aborts the run;
    /// validation and write failures are recorded in the report.
    pub fn run(
        &self,
        input: &Path,
        output: Option<OutputTarget<'_>>,
        diag: &dyn Diagnostics,
    ) -> Result<PipelineOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id, input = %input.display());
        let _enter = span.enter();
        let started_at = Utc::now();

        let table = infra::load_table(input, diag)?;
        let rows_loaded = table.row_count();
        // Types are judged as loaded, before the stages retype known columns
        let schema = self.validator.schema_report(&table, diag);

        let table = self.enrich_table(table, diag);
        let (table, duplicates_removed) = self.transform_table(table, diag);
        let nulls = self.validator.null_report(&table, diag);
        let validation = Validator::conclude(schema, nulls, diag);

        let output_written = match output {
            Some(target) => infra::save_table(&table, target.path, target.format.as_str(), diag),
            None => false,
        };

        let report = PipelineReport {
            run_id,
            input: input.to_path_buf(),
            output: output.map(|target| target.path.to_path_buf()),
            started_at,
            finished_at: Utc::now(),
            rows_loaded,
            duplicates_removed,
            rows_out: table.row_count(),
            validation: validation.into(),
            output_written,
        };
        Ok(PipelineOutcome { table, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnType, Value};
    use crate::observability::{CapturedDiagnostics, Level};
    use tempfile::tempdir;

    const REVIEWS: &str = "product_id,review_rating,description\n\
                           B001,4.5,Great product!\n\
                           B002,3.0,Okayish\n\
                           B001,4.5,Great product!\n";

    #[test]
    fn test_run_produces_report_and_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reviews.csv");
        let output = dir.path().join("out/final.csv");
        fs::write(&input, REVIEWS).unwrap();

        let diag = CapturedDiagnostics::new();
        let outcome = Pipeline::default()
            .run(
                &input,
                Some(OutputTarget {
                    path: &output,
                    format: OutputFormat::Csv,
                }),
                &diag,
            )
            .unwrap();

        let report = &outcome.report;
        assert_eq!(report.rows_loaded, 3);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.rows_out, 2);
        assert!(report.validation.passed);
        assert!(report.output_written);
        assert!(report.finished_at >= report.started_at);
        assert!(output.exists());
        assert_eq!(diag.count(Level::Error), 0);
    }

    #[test]
    fn test_run_without_output_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reviews.csv");
        fs::write(&input, REVIEWS).unwrap();

        let outcome = Pipeline::default()
            .run(&input, None, &CapturedDiagnostics::new())
            .unwrap();
        assert!(!outcome.report.output_written);
        assert_eq!(outcome.report.output, None);
        assert_eq!(outcome.table.row_count(), 2);
    }

    #[test]
    fn test_source_types_are_checked_and_unreadable_values_kept() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reviews.csv");
        fs::write(
            &input,
            "product_id,review_rating,description\n1001,five,Good\n1002,4,Nice\n",
        )
        .unwrap();

        let diag = CapturedDiagnostics::new();
        let outcome = Pipeline::default().run(&input, None, &diag).unwrap();

        let schema = &outcome.report.validation.report.schema;
        assert!(schema.missing_columns.is_empty());
        let mistyped: Vec<(&str, ColumnType)> = schema
            .type_mismatches
            .iter()
            .map(|m| (m.column.as_str(), m.actual))
            .collect();
        assert_eq!(
            mistyped,
            vec![("product_id", ColumnType::Integer), ("review_rating", ColumnType::String)]
        );
        assert!(!outcome.report.validation.passed);
        assert!(diag.contains(Level::Warning, "Column 'review_rating' has type string, expected number"));

        let rating = outcome.table.column("review_rating").unwrap();
        assert_eq!(rating.values, vec![Value::Str("five".into()), Value::Str("4.0".into())]);
    }

    #[test]
    fn test_report_serializes_validation_details() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reviews.csv");
        fs::write(&input, "product_id,review_rating,description\nB001,,Fine\n").unwrap();
        let report_path = dir.path().join("report.json");

        let outcome = Pipeline::default()
            .run(&input, None, &CapturedDiagnostics::new())
            .unwrap();
        outcome.report.write_json(&report_path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["validation"]["passed"], false);
        assert_eq!(json["validation"]["nulls"]["null_counts"][0]["column"], "review_rating");
        assert_eq!(json["validation"]["nulls"]["null_counts"][0]["count"], 1);
        assert_eq!(json["rows_loaded"], 1);
    }
}
