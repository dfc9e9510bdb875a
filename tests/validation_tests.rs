use anyhow::Result;
use std::fs;
use tempfile::tempdir;

use review_etl::config::PipelineConfig;
use review_etl::domain::{Column, ColumnType, Table, Value};
use review_etl::infra::load_table;
use review_etl::observability::{CapturedDiagnostics, Level};
use review_etl::pipeline::processing::{check_nulls, validate_schema, ExpectedType, Schema};

fn review_schema() -> Schema {
    Schema::new()
        .with("product_id", ExpectedType::String)
        .with("review_rating", ExpectedType::Number)
        .with("description", ExpectedType::String)
}

#[test]
fn test_missing_description_fails_schema() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("reviews.csv");
    fs::write(&path, "product_id,review_rating\nB001,4.5\n")?;
    let diag = CapturedDiagnostics::new();

    let table = load_table(&path, &diag)?;
    assert!(!validate_schema(&table, &review_schema(), &diag));

    let errors = diag.messages(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Missing required columns"));
    assert!(errors[0].contains("description"));
    Ok(())
}

#[test]
fn test_integer_ratings_satisfy_number() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("reviews.json");
    fs::write(
        &path,
        r#"{"product_id": "B001", "review_rating": 4, "description": "Good"}
{"product_id": "B002", "review_rating": 2, "description": "Bad"}"#,
    )?;
    let diag = CapturedDiagnostics::new();

    let table = load_table(&path, &diag)?;
    assert_eq!(table.column("review_rating").map(|c| c.dtype), Some(ColumnType::Integer));
    assert!(validate_schema(&table, &review_schema(), &diag));
    assert!(diag.contains(Level::Info, "Schema validation passed."));
    Ok(())
}

#[test]
fn test_type_mismatch_is_a_warning() {
    let table = Table::new(vec![
        Column::new("product_id", ColumnType::Integer, vec![Value::Int(1)]),
        Column::new("review_rating", ColumnType::Float, vec![Value::Float(4.0)]),
        Column::new("description", ColumnType::String, vec![Value::Str("ok".into())]),
    ]);
    let diag = CapturedDiagnostics::new();

    assert!(!validate_schema(&table, &review_schema(), &diag));
    assert!(diag.contains(Level::Warning, "Column 'product_id' has type int64, expected string"));
    assert_eq!(diag.count(Level::Error), 0);
}

#[test]
fn test_null_rating_fails_null_check() {
    let table = Table::new(vec![
        Column::new("review_rating", ColumnType::Float, vec![Value::Float(4.5), Value::Null]),
        Column::new(
            "description",
            ColumnType::String,
            vec![Value::Str("a".into()), Value::Str("b".into())],
        ),
    ]);
    let diag = CapturedDiagnostics::new();
    let critical = vec!["review_rating".to_string(), "description".to_string()];

    assert!(!check_nulls(&table, &critical, &diag));
    assert!(diag.contains(Level::Warning, "review_rating=1"));
    assert!(!diag.contains(Level::Warning, "description="));
}

#[test]
fn test_configured_contract_drives_validation() -> Result<()> {
    let config = PipelineConfig::from_toml(
        r#"
[validation]
critical_columns = ["product_id"]

[validation.schema]
product_id = "string"
"#,
    )?;
    let table = Table::new(vec![
        Column::new("product_id", ColumnType::String, vec![Value::Str("B1".into())]),
        Column::new("review_rating", ColumnType::Float, vec![Value::Null]),
    ]);
    let diag = CapturedDiagnostics::new();

    let report = config.validator().validate(&table, &diag);
    assert!(report.passed());
    assert!(diag.contains(Level::Info, "Validation successful"));
    Ok(())
}
