use parquet::basic::{Compression, LogicalType, Repetition, Type as PhysicalType};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field;
use parquet::schema::types::{Type, TypePtr};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::domain::{Column, ColumnType, Table, Value};
use crate::error::Result;

/// Read every row group of a Parquet file. Column types come from the file
/// schema rather than from the values.
pub fn read_parquet(path: &Path) -> Result<Table> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let fields: Vec<(String, ColumnType)> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|field| (field.name().to_string(), storage_type(field)))
        .collect();

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); fields.len()];
    for row in reader.get_row_iter(None)? {
        let row = row?;
        for ((_, field), column) in row.get_column_iter().zip(values.iter_mut()) {
            column.push(field_to_value(field));
        }
    }

    let columns = fields
        .into_iter()
        .zip(values)
        .map(|((name, dtype), values)| {
            let values = values.into_iter().map(|v| v.coerce_to(dtype)).collect();
            Column::new(name, dtype, values)
        })
        .collect();
    Ok(Table::new(columns))
}

fn storage_type(field: &Type) -> ColumnType {
    if !field.is_primitive() {
        return ColumnType::String;
    }
    // Dates, timestamps and decimals are carried as text
    let plain = matches!(
        field.get_basic_info().logical_type(),
        None | Some(LogicalType::Integer { .. })
    );
    match field.get_physical_type() {
        PhysicalType::BOOLEAN if plain => ColumnType::Boolean,
        PhysicalType::INT32 | PhysicalType::INT64 if plain => ColumnType::Integer,
        PhysicalType::FLOAT | PhysicalType::DOUBLE if plain => ColumnType::Float,
        _ => ColumnType::String,
    }
}

fn field_to_value(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Bool(*b),
        Field::Byte(v) => Value::Int(i64::from(*v)),
        Field::Short(v) => Value::Int(i64::from(*v)),
        Field::Int(v) => Value::Int(i64::from(*v)),
        Field::Long(v) => Value::Int(*v),
        Field::UByte(v) => Value::Int(i64::from(*v)),
        Field::UShort(v) => Value::Int(i64::from(*v)),
        Field::UInt(v) => Value::Int(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v)
            .map(Value::Int)
            .unwrap_or(Value::Float(*v as f64)),
        Field::Float(v) => Value::Float(f64::from(*v)),
        Field::Double(v) => Value::Float(*v),
        Field::Str(s) => Value::Str(s.clone()),
        other => Value::Str(other.to_string()),
    }
}

fn build_schema(table: &Table) -> Result<TypePtr> {
    let fields = table
        .columns()
        .iter()
        .map(|column| {
            let (physical, logical) = match column.dtype {
                ColumnType::String => (PhysicalType::BYTE_ARRAY, Some(LogicalType::String)),
                ColumnType::Float => (PhysicalType::DOUBLE, None),
                ColumnType::Integer => (PhysicalType::INT64, None),
                ColumnType::Boolean => (PhysicalType::BOOLEAN, None),
            };
            Type::primitive_type_builder(&column.name, physical)
                .with_repetition(Repetition::OPTIONAL)
                .with_logical_type(logical)
                .build()
                .map(Arc::new)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let schema = Type::group_type_builder("schema").with_fields(fields).build()?;
    Ok(Arc::new(schema))
}

/// Definition levels for optional columns: 1 where a value is present
fn definition_levels<T>(cells: &[Option<T>]) -> Vec<i16> {
    cells.iter().map(|c| i16::from(c.is_some())).collect()
}

/// Write the table as a single row group with SNAPPY compression
pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let schema = build_schema(table)?;
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    );
    let mut writer = SerializedFileWriter::new(File::create(path)?, schema, props)?;
    let mut row_group = writer.next_row_group()?;

    let mut columns = table.columns().iter();
    while let Some(mut column_writer) = row_group.next_column()? {
        let Some(column) = columns.next() else {
            break;
        };
        match column.dtype {
            ColumnType::String => {
                let cells: Vec<Option<ByteArray>> = column
                    .values
                    .iter()
                    .map(|v| v.as_text().map(|s| ByteArray::from(s.into_bytes())))
                    .collect();
                let levels = definition_levels(&cells);
                let present: Vec<ByteArray> = cells.into_iter().flatten().collect();
                column_writer
                    .typed::<ByteArrayType>()
                    .write_batch(&present, Some(&levels), None)?;
            }
            ColumnType::Float => {
                let cells: Vec<Option<f64>> = column.values.iter().map(Value::as_f64).collect();
                let levels = definition_levels(&cells);
                let present: Vec<f64> = cells.into_iter().flatten().collect();
                column_writer
                    .typed::<DoubleType>()
                    .write_batch(&present, Some(&levels), None)?;
            }
            ColumnType::Integer => {
                let cells: Vec<Option<i64>> = column
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect();
                let levels = definition_levels(&cells);
                let present: Vec<i64> = cells.into_iter().flatten().collect();
                column_writer
                    .typed::<Int64Type>()
                    .write_batch(&present, Some(&levels), None)?;
            }
            ColumnType::Boolean => {
                let cells: Vec<Option<bool>> = column
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect();
                let levels = definition_levels(&cells);
                let present: Vec<bool> = cells.into_iter().flatten().collect();
                column_writer
                    .typed::<BoolType>()
                    .write_batch(&present, Some(&levels), None)?;
            }
        }
        column_writer.close()?;
    }

    row_group.close()?;
    writer.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parquet_keeps_types_and_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.parquet");
        let table = Table::new(vec![
            Column::new(
                "product_id",
                ColumnType::String,
                vec![Value::Str("B001".into()), Value::Str("B002".into())],
            ),
            Column::new("review_rating", ColumnType::Float, vec![Value::Float(4.5), Value::Null]),
            Column::new("review_length", ColumnType::Integer, vec![Value::Int(2), Value::Int(1)]),
            Column::new("flag", ColumnType::Boolean, vec![Value::Null, Value::Bool(false)]),
        ]);

        write_parquet(&table, &path).unwrap();
        let read_back = read_parquet(&path).unwrap();

        assert_eq!(read_back, table);
    }
}
