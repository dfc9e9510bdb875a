// File adapters: the loader and writer around the processing core

pub mod csv_adapter;
pub mod json_adapter;
pub mod parquet_adapter;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use crate::domain::Table;
use crate::error::{EtlError, Result};
use crate::observability::{metrics, Diagnostics};
use json_adapter::JsonLayout;

/// Source encodings the loader understands, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
    JsonLines,
    Parquet,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            "jsonl" | "ndjson" => Ok(InputFormat::JsonLines),
            "parquet" => Ok(InputFormat::Parquet),
            _ => Err(EtlError::UnsupportedInput(format!(".{}", extension))),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            InputFormat::Csv => "csv",
            InputFormat::Json => "json",
            InputFormat::JsonLines => "jsonl",
            InputFormat::Parquet => "parquet",
        }
    }
}

/// Output encodings the writer supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Delimited text with a header row
    #[default]
    Csv,
    /// Columnar binary
    Parquet,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            "json" => Ok(OutputFormat::Json),
            other => Err(EtlError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Load a table from disk. A missing file or unknown extension is an error
/// the caller is expected to treat as fatal.
pub fn load_table(path: &Path, diag: &dyn Diagnostics) -> Result<Table> {
    let started = Instant::now();
    match read_table(path) {
        Ok((table, format)) => {
            metrics::loader::rows_loaded(table.row_count(), format.label());
            metrics::stage_duration("load", started.elapsed());
            diag.info(&format!("Loaded {} records from {}", table.row_count(), path.display()));
            Ok(table)
        }
        Err(err) => {
            diag.error(&format!("Failed to load data: {}", err));
            Err(err)
        }
    }
}

fn read_table(path: &Path) -> Result<(Table, InputFormat)> {
    if !path.exists() {
        return Err(EtlError::InputNotFound(path.to_path_buf()));
    }
    let format = InputFormat::from_path(path)?;
    let table = match format {
        InputFormat::Csv => csv_adapter::read_csv(path)?,
        InputFormat::Json => json_adapter::read_json(path, JsonLayout::Auto)?,
        InputFormat::JsonLines => json_adapter::read_json(path, JsonLayout::Lines)?,
        InputFormat::Parquet => parquet_adapter::read_parquet(path)?,
    };
    Ok((table, format))
}

/// Write a table, propagating any failure
pub fn write_table(table: &Table, path: &Path, format: OutputFormat) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    match format {
        OutputFormat::Csv => csv_adapter::write_csv(table, path),
        OutputFormat::Parquet => parquet_adapter::write_parquet(table, path),
        OutputFormat::Json => json_adapter::write_json_lines(table, path),
    }
}

/// Write a table, reporting failures through `diag` instead of returning them.
/// Returns whether the file was written.
pub fn save_table(table: &Table, path: &Path, format: &str, diag: &dyn Diagnostics) -> bool {
    let format = match format.parse::<OutputFormat>() {
        Ok(format) => format,
        Err(err) => {
            diag.error(&err.to_string());
            return false;
        }
    };

    let started = Instant::now();
    match write_table(table, path, format) {
        Ok(()) => {
            metrics::writer::rows_written(table.row_count(), format.as_str());
            metrics::stage_duration("save", started.elapsed());
            diag.info(&format!(
                "Saved data to {} as {}",
                path.display(),
                format.as_str().to_uppercase()
            ));
            true
        }
        Err(err) => {
            metrics::writer::write_error(format.as_str());
            diag.error(&format!("Failed to save data: {}", err));
            false
        }
    }
}
