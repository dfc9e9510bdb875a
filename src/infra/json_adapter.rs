use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{Table, Value};
use crate::error::{EtlError, Result};

/// How records are laid out in a JSON file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLayout {
    /// An array of objects, or one object per line if the file does not open with `[`
    Auto,
    /// One object per line
    Lines,
}

pub fn read_json(path: &Path, layout: JsonLayout) -> Result<Table> {
    let content = fs::read_to_string(path)?;
    let records: Vec<serde_json::Value> = match layout {
        JsonLayout::Auto if content.trim_start().starts_with('[') => serde_json::from_str(&content)?,
        _ => content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?,
    };
    records_to_table(records, path)
}

/// Columns are the union of record keys in first-seen order; absent keys are null
fn records_to_table(records: Vec<serde_json::Value>, path: &Path) -> Result<Table> {
    let mut names: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut sparse_rows: Vec<Vec<(usize, Value)>> = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let serde_json::Value::Object(fields) = record else {
            return Err(EtlError::Malformed {
                path: path.to_path_buf(),
                message: format!("record {} is not a JSON object", index + 1),
            });
        };

        let mut row = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let next = names.len();
            let position = *positions.entry(key.clone()).or_insert_with(|| {
                names.push(key);
                next
            });
            row.push((position, json_to_value(value)));
        }
        sparse_rows.push(row);
    }

    let width = names.len();
    let rows = sparse_rows
        .into_iter()
        .map(|cells| {
            let mut row = vec![Value::Null; width];
            for (position, value) in cells {
                row[position] = value;
            }
            row
        })
        .collect();
    Ok(Table::from_rows(names, rows))
}

fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Str(s),
        nested => Value::Str(nested.to_string()),
    }
}

/// Write one JSON object per row, keys in column order
pub fn write_json_lines(table: &Table, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for index in 0..table.row_count() {
        let mut object = serde_json::Map::with_capacity(table.columns().len());
        for (column, value) in table.columns().iter().zip(table.row(index)) {
            object.insert(column.name.clone(), serde_json::to_value(value)?);
        }
        serde_json::to_writer(&mut writer, &object)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
