use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{DESCRIPTION, PRODUCT_ID, REVIEW_RATING};
use crate::domain::{ColumnType, Table};
use crate::observability::{metrics, Diagnostics};

/// Declared type of a schema column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExpectedType {
    String,
    Float,
    Integer,
    Boolean,
    /// Either float or integer storage
    Number,
}

impl ExpectedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectedType::String => "string",
            ExpectedType::Float => "float64",
            ExpectedType::Integer => "int64",
            ExpectedType::Boolean => "bool",
            ExpectedType::Number => "number",
        }
    }

    pub fn accepts(&self, actual: ColumnType) -> bool {
        match self {
            ExpectedType::String => actual == ColumnType::String,
            ExpectedType::Float => actual == ColumnType::Float,
            ExpectedType::Integer => actual == ColumnType::Integer,
            ExpectedType::Boolean => actual == ColumnType::Boolean,
            ExpectedType::Number => matches!(actual, ColumnType::Float | ColumnType::Integer),
        }
    }
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpectedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "object" | "utf8" => Ok(ExpectedType::String),
            "float" | "float64" | "double" => Ok(ExpectedType::Float),
            "int" | "int64" | "integer" => Ok(ExpectedType::Integer),
            "bool" | "boolean" => Ok(ExpectedType::Boolean),
            "number" | "numeric" => Ok(ExpectedType::Number),
            other => Err(format!("unknown column type '{}'", other)),
        }
    }
}

impl TryFrom<String> for ExpectedType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpectedType> for String {
    fn from(value: ExpectedType) -> Self {
        value.as_str().to_string()
    }
}

/// Required columns and their expected types, in declaration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    columns: Vec<(String, ExpectedType)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, expected: ExpectedType) -> Self {
        self.columns.push((column.into(), expected));
        self
    }

    /// The contract a loaded review file is expected to meet
    pub fn reviews() -> Self {
        Self::new()
            .with(PRODUCT_ID, ExpectedType::String)
            .with(REVIEW_RATING, ExpectedType::Number)
            .with(DESCRIPTION, ExpectedType::String)
    }

    pub fn columns(&self) -> &[(String, ExpectedType)] {
        &self.columns
    }
}

impl<S: Into<String>> FromIterator<(S, ExpectedType)> for Schema {
    fn from_iter<I: IntoIterator<Item = (S, ExpectedType)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(c, t)| (c.into(), t)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeMismatch {
    pub column: String,
    pub actual: ColumnType,
    pub expected: ExpectedType,
}

/// Outcome of the schema check
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SchemaReport {
    pub missing_columns: Vec<String>,
    /// Only computed when no column is missing
    pub type_mismatches: Vec<TypeMismatch>,
}

impl SchemaReport {
    pub fn passed(&self) -> bool {
        self.missing_columns.is_empty() && self.type_mismatches.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NullCount {
    pub column: String,
    pub count: usize,
}

/// Outcome of the null check over critical columns
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NullReport {
    /// Critical columns with at least one null
    pub null_counts: Vec<NullCount>,
    /// Critical columns absent from the table
    pub missing_columns: Vec<String>,
}

impl NullReport {
    pub fn passed(&self) -> bool {
        self.null_counts.is_empty() && self.missing_columns.is_empty()
    }
}

/// Both checks, always evaluated together
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationReport {
    pub schema: SchemaReport,
    pub nulls: NullReport,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.schema.passed() && self.nulls.passed()
    }
}

/// Checks a table against a schema contract and a no-null contract
#[derive(Debug, Clone, PartialEq)]
pub struct Validator {
    pub schema: Schema,
    pub critical_columns: Vec<String>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(
            Schema::reviews(),
            vec![DESCRIPTION.to_string(), REVIEW_RATING.to_string()],
        )
    }
}

impl Validator {
    pub fn new(schema: Schema, critical_columns: Vec<String>) -> Self {
        Self {
            schema,
            critical_columns,
        }
    }

    /// Missing columns first; types are compared only when all are present
    pub fn check_schema(&self, table: &Table) -> SchemaReport {
        let missing_columns: Vec<String> = self
            .schema
            .columns()
            .iter()
            .filter(|(name, _)| !table.has_column(name))
            .map(|(name, _)| name.clone())
            .collect();
        if !missing_columns.is_empty() {
            return SchemaReport {
                missing_columns,
                type_mismatches: Vec::new(),
            };
        }

        let type_mismatches = self
            .schema
            .columns()
            .iter()
            .filter_map(|(name, expected)| {
                let actual = table.column(name)?.dtype;
                (!expected.accepts(actual)).then(|| TypeMismatch {
                    column: name.clone(),
                    actual,
                    expected: *expected,
                })
            })
            .collect();

        SchemaReport {
            missing_columns,
            type_mismatches,
        }
    }

    pub fn count_nulls(&self, table: &Table) -> NullReport {
        let mut report = NullReport::default();
        for name in &self.critical_columns {
            match table.column(name) {
                None => report.missing_columns.push(name.clone()),
                Some(column) => {
                    let count = column.null_count();
                    if count > 0 {
                        report.null_counts.push(NullCount {
                            column: name.clone(),
                            count,
                        });
                    }
                }
            }
        }
        report
    }

    /// Run the schema and null checks, reporting each through `diag`
    pub fn validate(&self, table: &Table, diag: &dyn Diagnostics) -> ValidationReport {
        let schema = self.schema_report(table, diag);
        let nulls = self.null_report(table, diag);
        Self::conclude(schema, nulls, diag)
    }

    /// Schema check with its outcome reported through `diag`
    pub fn schema_report(&self, table: &Table, diag: &dyn Diagnostics) -> SchemaReport {
        let report = self.check_schema(table);
        report_schema(&report, diag);
        report
    }

    /// Null check with its outcome reported through `diag`
    pub fn null_report(&self, table: &Table, diag: &dyn Diagnostics) -> NullReport {
        let report = self.count_nulls(table);
        report_nulls(&report, diag);
        report
    }

    /// Combine both halves, which may have been taken from different tables
    pub fn conclude(schema: SchemaReport, nulls: NullReport, diag: &dyn Diagnostics) -> ValidationReport {
        let report = ValidationReport { schema, nulls };
        if report.passed() {
            diag.info("Validation successful");
        } else {
            diag.warning("Validation failed");
        }
        report
    }
}

/// Schema check alone; false when a column is missing or mistyped
pub fn validate_schema(table: &Table, schema: &Schema, diag: &dyn Diagnostics) -> bool {
    Validator::new(schema.clone(), Vec::new())
        .schema_report(table, diag)
        .passed()
}

/// Null check alone; false when any critical column has nulls
pub fn check_nulls(table: &Table, critical_columns: &[String], diag: &dyn Diagnostics) -> bool {
    Validator::new(Schema::new(), critical_columns.to_vec())
        .null_report(table, diag)
        .passed()
}

fn report_schema(report: &SchemaReport, diag: &dyn Diagnostics) {
    if !report.missing_columns.is_empty() {
        metrics::validate::failure("schema");
        diag.error(&format!("Missing required columns: {:?}", report.missing_columns));
        return;
    }
    for mismatch in &report.type_mismatches {
        diag.warning(&format!(
            "Column '{}' has type {}, expected {}",
            mismatch.column, mismatch.actual, mismatch.expected
        ));
    }
    if report.type_mismatches.is_empty() {
        diag.info("Schema validation passed.");
    } else {
        metrics::validate::failure("schema");
    }
}

fn report_nulls(report: &NullReport, diag: &dyn Diagnostics) {
    if !report.missing_columns.is_empty() {
        diag.warning(&format!(
            "Critical columns not found: {:?}",
            report.missing_columns
        ));
    }
    if !report.null_counts.is_empty() {
        let counts: Vec<String> = report
            .null_counts
            .iter()
            .map(|n| format!("{}={}", n.column, n.count))
            .collect();
        diag.warning(&format!("Null values found: {}", counts.join(", ")));
    }
    if report.passed() {
        diag.info("No nulls found in critical columns.");
    } else {
        metrics::validate::failure("nulls");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, Value};
    use crate::observability::{CapturedDiagnostics, Level};

    fn text(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn valid_table() -> Table {
        Table::new(vec![
            Column::from_text_cells("product_id", text(&["B001", "B002"])),
            Column::from_text_cells("review_rating", text(&["4.5", "3.0"])),
            Column::from_text_cells("description", text(&["Great product!", "Okayish"])),
        ])
    }

    #[test]
    fn test_valid_table_passes_both_checks() {
        let diag = CapturedDiagnostics::new();
        let report = Validator::default().validate(&valid_table(), &diag);
        assert!(report.passed());
        assert!(diag.contains(Level::Info, "Schema validation passed."));
        assert!(diag.contains(Level::Info, "No nulls found"));
        assert!(diag.contains(Level::Info, "Validation successful"));
    }

    #[test]
    fn test_missing_column_is_named() {
        let table = Table::new(vec![
            Column::from_text_cells("product_id", text(&["B001"])),
            Column::from_text_cells("review_rating", text(&["4.5"])),
        ]);
        let diag = CapturedDiagnostics::new();
        assert!(!validate_schema(&table, &Schema::reviews(), &diag));
        assert!(diag.contains(Level::Error, "description"));
    }

    #[test]
    fn test_all_missing_columns_reported_together() {
        let table = Table::new(vec![Column::from_text_cells("other", text(&["x"]))]);
        let report = Validator::default().check_schema(&table);
        assert_eq!(
            report.missing_columns,
            vec!["product_id", "review_rating", "description"]
        );
        assert!(report.type_mismatches.is_empty());
    }

    #[test]
    fn test_every_type_mismatch_is_collected() {
        let table = Table::new(vec![
            Column::from_text_cells("product_id", text(&["1"])),
            Column::from_text_cells("review_rating", text(&["not_a_number"])),
            Column::from_text_cells("description", text(&["fine"])),
        ]);
        let diag = CapturedDiagnostics::new();
        let report = Validator::default().check_schema(&table);
        assert_eq!(
            report.type_mismatches,
            vec![
                TypeMismatch {
                    column: "product_id".into(),
                    actual: ColumnType::Integer,
                    expected: ExpectedType::String,
                },
                TypeMismatch {
                    column: "review_rating".into(),
                    actual: ColumnType::String,
                    expected: ExpectedType::Number,
                },
            ]
        );

        assert!(!validate_schema(&table, &Schema::reviews(), &diag));
        assert_eq!(diag.count(Level::Warning), 2);
        assert!(diag.contains(
            Level::Warning,
            "Column 'review_rating' has type string, expected number"
        ));
    }

    #[test]
    fn test_number_accepts_integer_ratings() {
        let table = Table::new(vec![
            Column::from_text_cells("product_id", text(&["B001"])),
            Column::from_text_cells("review_rating", text(&["4"])),
            Column::from_text_cells("description", text(&["fine"])),
        ]);
        assert!(Validator::default().check_schema(&table).passed());

        let strict = Schema::new().with("review_rating", ExpectedType::Float);
        assert!(!validate_schema(&table, &strict, &CapturedDiagnostics::new()));
    }

    #[test]
    fn test_null_rating_is_counted() {
        let table = Table::new(vec![
            Column::from_text_cells("product_id", text(&["B001", "B002"])),
            Column::from_text_cells("review_rating", text(&["4.5", ""])),
            Column::from_text_cells("description", text(&["Great product!", "Okay"])),
        ]);
        let diag = CapturedDiagnostics::new();
        let critical = vec!["review_rating".to_string(), "description".to_string()];
        assert!(!check_nulls(&table, &critical, &diag));
        assert!(diag.contains(Level::Warning, "review_rating=1"));

        let report = Validator::default().count_nulls(&table);
        assert_eq!(
            report.null_counts,
            vec![NullCount {
                column: "review_rating".into(),
                count: 1
            }]
        );
    }

    #[test]
    fn test_missing_critical_column_fails_null_check() {
        let table = Table::new(vec![Column::from_text_cells("product_id", text(&["B001"]))]);
        let diag = CapturedDiagnostics::new();
        assert!(!check_nulls(&table, &["description".to_string()], &diag));
        assert!(diag.contains(Level::Warning, "Critical columns not found"));
    }

    #[test]
    fn test_both_checks_run_without_short_circuit() {
        let table = Table::new(vec![
            Column::from_text_cells("product_id", text(&["B001"])),
            Column::new("review_rating", ColumnType::Float, vec![Value::Null]),
        ]);
        let diag = CapturedDiagnostics::new();
        let report = Validator::default().validate(&table, &diag);

        assert!(!report.passed());
        assert_eq!(report.schema.missing_columns, vec!["description"]);
        assert_eq!(report.nulls.null_counts.len(), 1);
        assert_eq!(report.nulls.missing_columns, vec!["description"]);
        assert!(diag.contains(Level::Error, "Missing required columns"));
        assert!(diag.contains(Level::Warning, "Null values found"));
        assert!(diag.contains(Level::Warning, "Validation failed"));
    }

    #[test]
    fn test_expected_type_spellings() {
        assert_eq!("object".parse::<ExpectedType>(), Ok(ExpectedType::String));
        assert_eq!("Float64".parse::<ExpectedType>(), Ok(ExpectedType::Float));
        assert_eq!("numeric".parse::<ExpectedType>(), Ok(ExpectedType::Number));
        assert!("decimal".parse::<ExpectedType>().is_err());
    }
}
