use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    CLEAN_TEXT, DESCRIPTION, HAS_EXCLAMATION, PRODUCT_ID, RATING_LABEL, REVIEW_LENGTH, REVIEW_RATING,
};
use crate::domain::table::{Column, ColumnType, Table, Value};
use crate::observability::Diagnostics;

/// The review fields the pipeline knows how to type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewColumn {
    ProductId,
    ReviewRating,
    RatingLabel,
    Description,
    ReviewLength,
    HasExclamation,
    CleanText,
}

impl ReviewColumn {
    /// Column order of a transformed dataset
    pub const TARGET_ORDER: [ReviewColumn; 7] = [
        ReviewColumn::ProductId,
        ReviewColumn::ReviewRating,
        ReviewColumn::RatingLabel,
        ReviewColumn::Description,
        ReviewColumn::ReviewLength,
        ReviewColumn::HasExclamation,
        ReviewColumn::CleanText,
    ];

    /// Columns added by enrichment, in the order they are appended
    pub const DERIVED: [ReviewColumn; 4] = [
        ReviewColumn::ReviewLength,
        ReviewColumn::RatingLabel,
        ReviewColumn::HasExclamation,
        ReviewColumn::CleanText,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReviewColumn::ProductId => PRODUCT_ID,
            ReviewColumn::ReviewRating => REVIEW_RATING,
            ReviewColumn::RatingLabel => RATING_LABEL,
            ReviewColumn::Description => DESCRIPTION,
            ReviewColumn::ReviewLength => REVIEW_LENGTH,
            ReviewColumn::HasExclamation => HAS_EXCLAMATION,
            ReviewColumn::CleanText => CLEAN_TEXT,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::TARGET_ORDER.into_iter().find(|c| c.name() == name)
    }
}

/// Sentiment bucket derived from the numeric rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingLabel {
    Positive,
    Neutral,
    Negative,
}

impl RatingLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingLabel::Positive => "positive",
            RatingLabel::Neutral => "neutral",
            RatingLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for RatingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "positive" => Ok(RatingLabel::Positive),
            "neutral" => Ok(RatingLabel::Neutral),
            "negative" => Ok(RatingLabel::Negative),
            other => Err(format!("unknown rating label '{}'", other)),
        }
    }
}

/// A column position in a [`ReviewDataset`]
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Known(ReviewColumn),
    /// A column the pipeline carries through untouched
    Extra { name: String, dtype: ColumnType },
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Known(column) => column.name(),
            Field::Extra { name, .. } => name,
        }
    }
}

/// How `has_exclamation` is stored when the dataset is turned back into a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagEncoding {
    #[default]
    Boolean,
    Integer,
}

/// One product review
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Review {
    pub product_id: Option<String>,
    pub review_rating: Option<f64>,
    pub description: Option<String>,
    pub rating_label: Option<RatingLabel>,
    pub review_length: Option<i64>,
    pub has_exclamation: Option<bool>,
    pub clean_text: Option<String>,
    /// Values of the dataset's extra columns, in layout order
    pub extras: Vec<Value>,
    /// Source values of known columns that could not be typed
    pub unreadable: Vec<(ReviewColumn, Value)>,
}

impl Review {
    pub fn new(product_id: impl Into<String>, review_rating: f64, description: impl Into<String>) -> Self {
        Self {
            product_id: Some(product_id.into()),
            review_rating: Some(review_rating),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// Description coerced to text; missing becomes empty
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// The source value of `column` when it could not be typed
    pub fn unreadable_value(&self, column: ReviewColumn) -> Option<&Value> {
        self.unreadable
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, value)| value)
    }

    /// Row identity used for deduplication
    pub fn identity(&self) -> (Option<&str>, Option<&str>) {
        (self.product_id.as_deref(), self.description.as_deref())
    }

    fn cell(&self, column: ReviewColumn, flags: FlagEncoding) -> Value {
        match column {
            ReviewColumn::ProductId => text_cell(&self.product_id),
            ReviewColumn::ReviewRating => self.review_rating.map(Value::Float).unwrap_or(Value::Null),
            ReviewColumn::RatingLabel => self
                .rating_label
                .map(|l| Value::Str(l.as_str().to_string()))
                .unwrap_or(Value::Null),
            ReviewColumn::Description => text_cell(&self.description),
            ReviewColumn::ReviewLength => self.review_length.map(Value::Int).unwrap_or(Value::Null),
            ReviewColumn::HasExclamation => match (self.has_exclamation, flags) {
                (None, _) => Value::Null,
                (Some(flag), FlagEncoding::Boolean) => Value::Bool(flag),
                (Some(flag), FlagEncoding::Integer) => Value::Int(i64::from(flag)),
            },
            ReviewColumn::CleanText => text_cell(&self.clean_text),
        }
    }
}

fn text_cell(text: &Option<String>) -> Value {
    text.clone().map(Value::Str).unwrap_or(Value::Null)
}

fn column_type(column: ReviewColumn, flags: FlagEncoding) -> ColumnType {
    match column {
        ReviewColumn::ReviewRating => ColumnType::Float,
        ReviewColumn::ReviewLength => ColumnType::Integer,
        ReviewColumn::HasExclamation => match flags {
            FlagEncoding::Boolean => ColumnType::Boolean,
            FlagEncoding::Integer => ColumnType::Integer,
        },
        ReviewColumn::ProductId
        | ReviewColumn::RatingLabel
        | ReviewColumn::Description
        | ReviewColumn::CleanText => ColumnType::String,
    }
}

/// Ordered reviews sharing one column layout
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewDataset {
    layout: Vec<Field>,
    rows: Vec<Review>,
    flag_encoding: FlagEncoding,
}

impl ReviewDataset {
    pub fn new(layout: Vec<Field>, rows: Vec<Review>, flag_encoding: FlagEncoding) -> Self {
        Self {
            layout,
            rows,
            flag_encoding,
        }
    }

    /// Raw reviews with the three base columns
    pub fn from_reviews(rows: Vec<Review>) -> Self {
        let layout = [ReviewColumn::ProductId, ReviewColumn::ReviewRating, ReviewColumn::Description]
            .into_iter()
            .map(Field::Known)
            .collect();
        Self::new(layout, rows, FlagEncoding::Boolean)
    }

    pub fn layout(&self) -> &[Field] {
        &self.layout
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.layout.iter().map(Field::name).collect()
    }

    pub fn rows(&self) -> &[Review] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn flag_encoding(&self) -> FlagEncoding {
        self.flag_encoding
    }

    pub fn has_column(&self, column: ReviewColumn) -> bool {
        self.layout.contains(&Field::Known(column))
    }

    pub fn into_parts(self) -> (Vec<Field>, Vec<Review>, FlagEncoding) {
        (self.layout, self.rows, self.flag_encoding)
    }

    /// Type a loaded table. Values that cannot be typed are kept aside and
    /// written back as text, with one warning per column; this never fails.
    pub fn from_table(table: Table, diag: &dyn Diagnostics) -> Self {
        let row_count = table.row_count();
        let mut rows = vec![Review::default(); row_count];
        let mut layout = Vec::new();
        let mut flag_encoding = FlagEncoding::Boolean;

        for column in table.into_columns() {
            let known = ReviewColumn::from_name(&column.name)
                .filter(|c| !layout.contains(&Field::Known(*c)));

            let Some(known) = known else {
                layout.push(Field::Extra {
                    name: column.name,
                    dtype: column.dtype,
                });
                for (row, value) in rows.iter_mut().zip(column.values) {
                    row.extras.push(value);
                }
                continue;
            };

            if known == ReviewColumn::HasExclamation && column.dtype == ColumnType::Integer {
                flag_encoding = FlagEncoding::Integer;
            }

            let mut kept = 0usize;
            for (row, value) in rows.iter_mut().zip(column.values) {
                if !assign(row, known, &value) {
                    row.unreadable.push((known, value));
                    kept += 1;
                }
            }
            if kept > 0 {
                diag.warning(&format!(
                    "Kept {} unreadable '{}' value(s) as text",
                    kept,
                    known.name()
                ));
            }
            layout.push(Field::Known(known));
        }

        Self::new(layout, rows, flag_encoding)
    }

    /// Typed columns in layout order. A known column holding any unreadable
    /// value is written as text so the source value survives.
    pub fn into_table(self) -> Table {
        let row_count = self.rows.len();
        let mut extra_index = 0;
        let columns = self
            .layout
            .into_iter()
            .map(|field| match field {
                Field::Known(column) => {
                    let cells = self.rows.iter().map(|r| {
                        r.unreadable_value(column)
                            .cloned()
                            .unwrap_or_else(|| r.cell(column, self.flag_encoding))
                    });
                    if self.rows.iter().any(|r| r.unreadable_value(column).is_some()) {
                        let text = cells.map(|v| v.as_text().map(Value::Str).unwrap_or(Value::Null));
                        Column::new(column.name(), ColumnType::String, text.collect())
                    } else {
                        Column::new(
                            column.name(),
                            column_type(column, self.flag_encoding),
                            cells.collect(),
                        )
                    }
                }
                Field::Extra { name, dtype } => {
                    let index = extra_index;
                    extra_index += 1;
                    let values = self
                        .rows
                        .iter()
                        .map(|r| r.extras.get(index).cloned().unwrap_or(Value::Null))
                        .collect();
                    Column::new(name, dtype, values)
                }
            })
            .collect();
        Table::with_row_count(columns, row_count)
    }
}

/// Store one cell into its typed field. Returns false when a present value
/// could not be typed.
fn assign(row: &mut Review, column: ReviewColumn, value: &Value) -> bool {
    if value.is_null() {
        return true;
    }
    match column {
        ReviewColumn::ProductId => row.product_id = value.as_text(),
        ReviewColumn::Description => row.description = value.as_text(),
        ReviewColumn::CleanText => row.clean_text = value.as_text(),
        ReviewColumn::ReviewRating => {
            row.review_rating = value.as_f64();
            return row.review_rating.is_some();
        }
        ReviewColumn::ReviewLength => {
            row.review_length = value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64);
            return row.review_length.is_some();
        }
        ReviewColumn::HasExclamation => {
            row.has_exclamation = value.as_bool();
            return row.has_exclamation.is_some();
        }
        ReviewColumn::RatingLabel => {
            row.rating_label = value.as_text().and_then(|t| t.parse().ok());
            return row.rating_label.is_some();
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{CapturedDiagnostics, Level};

    fn raw_table() -> Table {
        Table::new(vec![
            Column::from_text_cells("product_id", vec!["B001".into(), "B002".into()]),
            Column::from_text_cells("review_rating", vec!["4.5".into(), "not_a_number".into()]),
            Column::from_text_cells("description", vec!["Great product!".into(), "".into()]),
            Column::from_text_cells("reviewer", vec!["ann".into(), "bob".into()]),
        ])
    }

    #[test]
    fn test_from_table_types_known_columns_and_keeps_extras() {
        let diag = CapturedDiagnostics::new();
        let dataset = ReviewDataset::from_table(raw_table(), &diag);

        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.column_names(),
            vec!["product_id", "review_rating", "description", "reviewer"]
        );
        let first = &dataset.rows()[0];
        assert_eq!(first.product_id.as_deref(), Some("B001"));
        assert_eq!(first.review_rating, Some(4.5));
        assert_eq!(first.extras, vec![Value::Str("ann".into())]);

        let second = &dataset.rows()[1];
        assert_eq!(second.review_rating, None);
        assert_eq!(
            second.unreadable_value(ReviewColumn::ReviewRating),
            Some(&Value::Str("not_a_number".into()))
        );
        assert_eq!(second.description, None);
        assert_eq!(second.description_text(), "");
    }

    #[test]
    fn test_unreadable_ratings_are_reported() {
        let diag = CapturedDiagnostics::new();
        ReviewDataset::from_table(raw_table(), &diag);
        assert!(diag.contains(Level::Warning, "Kept 1 unreadable 'review_rating' value(s) as text"));
    }

    #[test]
    fn test_into_table_restores_layout_and_types() {
        let diag = CapturedDiagnostics::new();
        let table = ReviewDataset::from_table(raw_table(), &diag).into_table();

        assert_eq!(
            table.column_names(),
            vec!["product_id", "review_rating", "description", "reviewer"]
        );
        assert_eq!(table.column("reviewer").unwrap().values[1], Value::Str("bob".into()));
        assert_eq!(table.column("description").unwrap().values[1], Value::Null);

        // The unreadable rating keeps the column as text
        let rating = table.column("review_rating").unwrap();
        assert_eq!(rating.dtype, ColumnType::String);
        assert_eq!(
            rating.values,
            vec![Value::Str("4.5".into()), Value::Str("not_a_number".into())]
        );
    }

    #[test]
    fn test_readable_columns_regain_their_types() {
        let table = Table::new(vec![
            Column::from_text_cells("product_id", vec!["B001".into()]),
            Column::new("review_rating", ColumnType::String, vec![Value::Str("4.5".into())]),
        ]);
        let table = ReviewDataset::from_table(table, &CapturedDiagnostics::new()).into_table();

        let rating = table.column("review_rating").unwrap();
        assert_eq!(rating.dtype, ColumnType::Float);
        assert_eq!(rating.values, vec![Value::Float(4.5)]);
    }

    #[test]
    fn test_flags_survive_float_inference() {
        // A gap widens a 0/1 column to float
        let table = Table::new(vec![Column::from_text_cells(
            "has_exclamation",
            vec!["1".into(), "".into(), "0".into()],
        )]);
        assert_eq!(table.column("has_exclamation").unwrap().dtype, ColumnType::Float);

        let diag = CapturedDiagnostics::new();
        let dataset = ReviewDataset::from_table(table, &diag);
        let flags: Vec<Option<bool>> = dataset.rows().iter().map(|r| r.has_exclamation).collect();
        assert_eq!(flags, vec![Some(true), None, Some(false)]);
        assert_eq!(diag.count(Level::Warning), 0);
    }

    #[test]
    fn test_rows_survive_without_columns() {
        let table = Table::from_rows(Vec::new(), vec![Vec::new(), Vec::new()]);
        let dataset = ReviewDataset::from_table(table, &CapturedDiagnostics::new());
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.into_table().row_count(), 2);
    }

    #[test]
    fn test_integer_flags_are_detected() {
        let table = Table::new(vec![Column::from_text_cells(
            "has_exclamation",
            vec!["1".into(), "0".into()],
        )]);
        let dataset = ReviewDataset::from_table(table, &CapturedDiagnostics::new());
        assert_eq!(dataset.flag_encoding(), FlagEncoding::Integer);
        assert_eq!(dataset.rows()[0].has_exclamation, Some(true));
        assert_eq!(dataset.rows()[1].has_exclamation, Some(false));
    }

    #[test]
    fn test_rating_label_parsing() {
        assert_eq!("neutral".parse::<RatingLabel>(), Ok(RatingLabel::Neutral));
        assert!("meh".parse::<RatingLabel>().is_err());
    }
}
