use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::{DEFAULT_PREVIEW_ROWS, DESCRIPTION, REVIEW_RATING};
use crate::error::{EtlError, Result};
use crate::infra::OutputFormat;
use crate::pipeline::processing::{ExpectedType, Schema, Validator};

/// Settings for a pipeline run; every section is optional in the file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    pub validation: ValidationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    pub schema: Schema,
    pub critical_columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub preview_rows: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            schema: Schema::reviews(),
            critical_columns: vec![DESCRIPTION.to_string(), REVIEW_RATING.to_string()],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

// File shapes; names are checked after parsing so bad values surface as config errors
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    validation: RawValidation,
    #[serde(default)]
    output: RawOutput,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawValidation {
    schema: Option<toml::Table>,
    critical_columns: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    format: Option<String>,
    preview_rows: Option<usize>,
}

impl PipelineConfig {
    /// Load from a TOML file, or use the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let schema = match raw.validation.schema {
            None => defaults.validation.schema,
            Some(table) => table
                .into_iter()
                .map(|(column, value)| {
                    let name = value.as_str().ok_or_else(|| {
                        EtlError::Config(format!("type for column '{}' must be a string", column))
                    })?;
                    let expected = name
                        .parse::<ExpectedType>()
                        .map_err(|e| EtlError::Config(format!("column '{}': {}", column, e)))?;
                    Ok::<_, EtlError>((column, expected))
                })
                .collect::<Result<Schema>>()?,
        };

        let format = match raw.output.format {
            None => defaults.output.format,
            Some(name) => name
                .parse::<OutputFormat>()
                .map_err(|e| EtlError::Config(e.to_string()))?,
        };

        Ok(Self {
            validation: ValidationConfig {
                schema,
                critical_columns: raw
                    .validation
                    .critical_columns
                    .unwrap_or(defaults.validation.critical_columns),
            },
            output: OutputConfig {
                format,
                preview_rows: raw.output.preview_rows.unwrap_or(defaults.output.preview_rows),
            },
        })
    }

    pub fn validator(&self) -> Validator {
        Validator::new(
            self.validation.schema.clone(),
            self.validation.critical_columns.clone(),
        )
    }
}
