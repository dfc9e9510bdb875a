use csv::{ReaderBuilder, Writer};
use std::path::Path;

use crate::domain::{Column, Table};
use crate::error::Result;

/// Read a headed CSV file, inferring each column's type from its cells
pub fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        // Short rows are padded with empty (null) cells; surplus cells are ignored
        for (index, column) in cells.iter_mut().enumerate() {
            column.push(record.get(index).unwrap_or("").to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column::from_text_cells(name, cells))
        .collect();
    Ok(Table::new(columns))
}

/// Write a table as CSV with a header row; nulls become empty cells
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(table.column_names())?;
    for index in 0..table.row_count() {
        writer.write_record(
            table
                .row(index)
                .into_iter()
                .map(|value| value.as_text().unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnType, Value};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_csv_with_quotes_and_gaps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        fs::write(
            &path,
            "product_id,review_rating,description\nB001,4.5,\"Great, really great!\"\nB002,,\"\"\nB003,3\n",
        )
        .unwrap();

        let table = read_csv(&path).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("review_rating").unwrap().dtype, ColumnType::Float);
        assert_eq!(
            table.column("description").unwrap().values,
            vec![Value::Str("Great, really great!".into()), Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_written_csv_keeps_float_and_null_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = Table::new(vec![
            Column::new("product_id", ColumnType::String, vec![Value::Str("B1".into()), Value::Null]),
            Column::new("review_rating", ColumnType::Float, vec![Value::Float(3.0), Value::Float(4.5)]),
            Column::new("has_exclamation", ColumnType::Integer, vec![Value::Int(1), Value::Int(0)]),
        ]);

        write_csv(&table, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "product_id,review_rating,has_exclamation\nB1,3.0,1\n,4.5,0\n"
        );
    }
}
