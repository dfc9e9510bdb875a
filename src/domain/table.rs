use serde::Serialize;
use std::fmt;

use crate::constants::NULL_TOKENS;

/// A single cell of a loaded table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Missing values, including floating point NaN
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the cell; text is parsed leniently, anything else is `None`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            Value::Str(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            Value::Float(f) if *f == 0.0 => Some(false),
            Value::Float(f) if *f == 1.0 => Some(true),
            Value::Str(s) => parse_bool(s),
            _ => None,
        }
    }

    /// Textual representation of the cell; `None` for missing values
    pub fn as_text(&self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        Some(match self {
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Null => unreachable!("null handled above"),
        })
    }

    pub(crate) fn coerce_to(self, dtype: ColumnType) -> Value {
        if self.is_null() {
            return Value::Null;
        }
        match (dtype, self) {
            (ColumnType::Float, Value::Int(i)) => Value::Float(i as f64),
            (ColumnType::String, Value::Str(s)) => Value::Str(s),
            (ColumnType::String, other) => other.as_text().map(Value::Str).unwrap_or(Value::Null),
            (_, other) => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("null"),
        }
    }
}

/// Floats keep a decimal point so `3.0` never reads back as an integer
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn is_null_token(text: &str) -> bool {
    NULL_TOKENS.contains(&text.trim())
}

/// Concrete storage type of a loaded column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Float,
    Integer,
    Boolean,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Float => "float64",
            ColumnType::Integer => "int64",
            ColumnType::Boolean => "bool",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Build a column from raw delimited-text cells, inferring the narrowest type.
    ///
    /// Integer columns with gaps are widened to float and all-null columns are
    /// float, which is how dataframe readers type such columns.
    pub fn from_text_cells(name: impl Into<String>, cells: Vec<String>) -> Self {
        let cells: Vec<Option<String>> = cells
            .into_iter()
            .map(|c| if is_null_token(&c) { None } else { Some(c) })
            .collect();

        let dtype = {
            let has_gaps = cells.iter().any(Option::is_none);
            if cells.iter().flatten().next().is_none() {
                ColumnType::Float
            } else if cells.iter().flatten().all(|c| parse_bool(c).is_some()) {
                ColumnType::Boolean
            } else if cells.iter().flatten().all(|c| c.trim().parse::<i64>().is_ok()) {
                if has_gaps {
                    ColumnType::Float
                } else {
                    ColumnType::Integer
                }
            } else if cells.iter().flatten().all(|c| c.trim().parse::<f64>().is_ok()) {
                ColumnType::Float
            } else {
                ColumnType::String
            }
        };

        let values = cells
            .into_iter()
            .map(|cell| match cell {
                None => Value::Null,
                Some(text) => match dtype {
                    ColumnType::Boolean => parse_bool(&text).map(Value::Bool).unwrap_or(Value::Null),
                    ColumnType::Integer => text.trim().parse().map(Value::Int).unwrap_or(Value::Null),
                    ColumnType::Float => text.trim().parse().map(Value::Float).unwrap_or(Value::Null),
                    ColumnType::String => Value::Str(text),
                },
            })
            .collect();

        Self::new(name, dtype, values)
    }

    /// Build a column from already-typed cells (structured records), applying
    /// the same widening rules as [`Column::from_text_cells`].
    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = {
            let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
            if present.is_empty() {
                ColumnType::Float
            } else if present.iter().all(|v| matches!(v, Value::Bool(_))) {
                ColumnType::Boolean
            } else if present.iter().all(|v| matches!(v, Value::Int(_))) {
                if present.len() < values.len() {
                    ColumnType::Float
                } else {
                    ColumnType::Integer
                }
            } else if present.iter().all(|v| matches!(v, Value::Int(_) | Value::Float(_))) {
                ColumnType::Float
            } else {
                ColumnType::String
            }
        };

        let values = values.into_iter().map(|v| v.coerce_to(dtype)).collect();
        Self::new(name, dtype, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// Ordered, named, typed columns of equal length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        let rows = columns.first().map_or(0, Column::len);
        Self::with_row_count(columns, rows)
    }

    /// Columns with a known row count, which also holds when there are no columns
    pub fn with_row_count(columns: Vec<Column>, rows: usize) -> Self {
        debug_assert!(
            columns.iter().all(|c| c.len() == rows),
            "columns must have equal length"
        );
        Self { columns, rows }
    }

    /// Build a table from row-major cells, inferring each column's type
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        let mut cells: Vec<Vec<Value>> = names.iter().map(|_| Vec::with_capacity(rows.len())).collect();
        for row in rows {
            let mut row = row.into_iter();
            for column in cells.iter_mut() {
                column.push(row.next().unwrap_or(Value::Null));
            }
        }
        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::from_values(name, values))
            .collect();
        Self::with_row_count(columns, row_count)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Cells of one row in column order
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// The first `n` rows
    pub fn head(&self, n: usize) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.dtype, c.values.iter().take(n).cloned().collect()))
            .collect();
        Table::with_row_count(columns, n.min(self.rows))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.row_count();
        let index_width = rows.saturating_sub(1).to_string().len();
        let rendered: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| c.values.iter().map(ToString::to_string).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&rendered)
            .map(|(c, cells)| cells.iter().map(|s| s.chars().count()).chain([c.name.chars().count()]).max().unwrap_or(0))
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", column.name)?;
        }
        writeln!(f)?;
        for row in 0..rows {
            write!(f, "{:<index_width$}", row)?;
            for (cells, width) in rendered.iter().zip(&widths) {
                write!(f, "  {:>width$}", cells[row])?;
            }
            writeln!(f)?;
        }
        write!(f, "[{} rows x {} columns]", rows, self.columns.len())
    }
}
