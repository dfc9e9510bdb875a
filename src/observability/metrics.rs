//! Pipeline metrics recorded through the `metrics` facade.
//!
//! Nothing is exported unless the embedding process installs a recorder.

use std::fmt;
use std::time::Duration;

/// All metric names used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RowsLoaded,
    RowsEnriched,
    DuplicatesRemoved,
    ValidationFailures,
    RowsWritten,
    WriteErrors,
    StageDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RowsLoaded => "review_etl_rows_loaded_total",
            MetricName::RowsEnriched => "review_etl_rows_enriched_total",
            MetricName::DuplicatesRemoved => "review_etl_duplicates_removed_total",
            MetricName::ValidationFailures => "review_etl_validation_failures_total",
            MetricName::RowsWritten => "review_etl_rows_written_total",
            MetricName::WriteErrors => "review_etl_write_errors_total",
            MetricName::StageDuration => "review_etl_stage_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            RowsLoaded,
            RowsEnriched,
            DuplicatesRemoved,
            ValidationFailures,
            RowsWritten,
            WriteErrors,
            StageDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record how long a stage took
pub fn stage_duration(stage: &'static str, elapsed: Duration) {
    ::metrics::histogram!(MetricName::StageDuration.as_str(), "stage" => stage).record(elapsed.as_secs_f64());
}

pub mod loader {
    use super::MetricName;

    pub fn rows_loaded(count: usize, format: &'static str) {
        ::metrics::counter!(MetricName::RowsLoaded.as_str(), "format" => format).increment(count as u64);
    }
}

pub mod enrich {
    use super::MetricName;

    pub fn rows_enriched(count: usize) {
        ::metrics::counter!(MetricName::RowsEnriched.as_str()).increment(count as u64);
    }
}

pub mod transform {
    use super::MetricName;

    pub fn duplicates_removed(count: usize) {
        ::metrics::counter!(MetricName::DuplicatesRemoved.as_str()).increment(count as u64);
    }
}

pub mod validate {
    use super::MetricName;

    /// `check` is either "schema" or "nulls"
    pub fn failure(check: &'static str) {
        ::metrics::counter!(MetricName::ValidationFailures.as_str(), "check" => check).increment(1);
    }
}

pub mod writer {
    use super::MetricName;

    pub fn rows_written(count: usize, format: &'static str) {
        ::metrics::counter!(MetricName::RowsWritten.as_str(), "format" => format).increment(count as u64);
    }

    pub fn write_error(format: &'static str) {
        ::metrics::counter!(MetricName::WriteErrors.as_str(), "format" => format).increment(1);
    }
}
