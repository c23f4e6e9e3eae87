use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use faro::{row_fn, ColumnType, Database, DatabaseConfig, Error, IfExists, ReadOptions, Source, Table, Value};
use rusqlite::Connection;

const FRUITS_CSV: &str = "fruit,id,in_stock,rating\napple,24,true,5.0\norange,34,false,4.1\nbanana,14,false,4.9\npeach,69,true,3.45\n";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let p = dir.path().join(name);
    fs::write(&p, body).expect("write fixture");
    p
}

#[test]
fn csv_ingest_query_and_reingest_is_schema_equivalent() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write(&tmp, "fruits.csv", FRUITS_CSV);
    let mut db = Database::new("workflow").unwrap();
    db.add_table(csv.as_path(), "fruits", IfExists::Fail).unwrap();

    let first = db.query("SELECT * FROM fruits").unwrap();
    assert_eq!(first.columns(), &["fruit", "id", "in_stock", "rating"]);
    assert_eq!(first.len(), 4);
    assert_eq!(first.get(0, "in_stock"), Some(&Value::Bool(true)));

    db.add_table(first.clone(), "fruits_copy", IfExists::Fail).unwrap();
    let second = db.query("SELECT * FROM fruits_copy").unwrap();
    assert_eq!(second, first);
    assert_eq!(db.tables(), &["fruits", "fruits_copy"]);
}

#[test]
fn json_file_and_records_agree() {
    let tmp = tempfile::tempdir().unwrap();
    let body = r#"[{"name":"ada","age":36},{"name":"alan","age":41}]"#;
    let json = write(&tmp, "people.json", body);
    let mut db = Database::new("workflow").unwrap();
    db.add_table(json.as_path(), "from_file", IfExists::Fail).unwrap();

    let records: serde_json::Value = serde_json::from_str(body).unwrap();
    db.add_table(Source::try_from(records).unwrap(), "from_records", IfExists::Fail).unwrap();

    let a = db.query("SELECT name, age FROM from_file ORDER BY age").unwrap();
    let b = db.query("SELECT name, age FROM from_records ORDER BY age").unwrap();
    assert_eq!(a.rows(), b.rows());
    assert_eq!(a.rows()[1], vec![Value::from("alan"), Value::Int(41)]);
}

#[test]
fn failed_ingest_under_fail_policy_leaves_relation_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write(&tmp, "fruits.csv", FRUITS_CSV);
    let mut db = Database::new("workflow").unwrap();
    db.add_table(csv.as_path(), "fruits", IfExists::Fail).unwrap();
    let before = db.query("SELECT * FROM fruits").unwrap();

    let err = db.add_table(csv.as_path(), "fruits", IfExists::Fail).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
    assert_eq!(db.query("SELECT * FROM fruits").unwrap(), before);
}

#[test]
fn read_options_reach_the_csv_parser() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write(&tmp, "airports.tsv.csv", "code\televation\nSEA\t433\nBFI\t-\n");
    let mut db = Database::new("workflow").unwrap();
    let opts = ReadOptions::default().with_separator(b'\t').with_null_values(["-"]);
    db.add_table_with(csv.as_path(), "airports", IfExists::Fail, &opts).unwrap();
    let t = db.query("SELECT elevation FROM airports").unwrap();
    assert_eq!(t.rows(), &[vec![Value::Int(433)], vec![Value::Null]]);
}

#[test]
fn map_into_then_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = Database::with_config(DatabaseConfig::new("orders").with_snapshot_dir(tmp.path())).unwrap();
    let t = Table::new(
        vec!["id", "val"],
        vec![vec![1.into(), 10.into()], vec![2.into(), 20.into()], vec![3.into(), 30.into()]],
    )
    .unwrap();
    db.add_table(t, "t", IfExists::Fail).unwrap();
    db.map_into(row_fn!(|id, val| id.as_i64().zip(val.as_i64()).map(|(a, b)| a * b)), "t", "total", false)
        .unwrap();

    let out = db.query("SELECT * FROM t").unwrap();
    assert_eq!(out.columns().last().map(String::as_str), Some("total"));
    assert_eq!(
        out.rows(),
        &[
            vec![Value::Int(1), Value::Int(10), Value::Int(10)],
            vec![Value::Int(2), Value::Int(20), Value::Int(40)],
            vec![Value::Int(3), Value::Int(30), Value::Int(90)],
        ]
    );

    let path = db.export_default_snapshot().unwrap();
    db.close().unwrap();
    let conn = Connection::open(&path).unwrap();
    let total: i64 = conn.query_row("SELECT SUM(total) FROM t", [], |r| r.get(0)).unwrap();
    assert_eq!(total, 140);
}

#[test]
fn unsupported_source_shapes_are_rejected_at_the_boundary() {
    let err = Source::try_from(serde_json::json!({"id": 1})).unwrap_err();
    assert_eq!(err.code(), "invalid_source_type");
    assert!(err.is_validation());
}

#[test]
fn workbook_first_sheet_is_read_with_header() {
    let mut db = Database::new("workflow").unwrap();
    db.add_table(fixture("fruits.xlsx").as_path(), "fruits", IfExists::Fail).unwrap();

    let t = db.query("SELECT * FROM fruits").unwrap();
    // blank header cells get a positional name
    assert_eq!(t.columns(), &["fruit", "id", "in_stock", "rating", "picked", "column_6"]);
    assert_eq!(t.len(), 3);
    assert_eq!(t.column_types()[2], ColumnType::Boolean);
    assert_eq!(t.column_types()[4], ColumnType::Timestamp);

    let picked = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    assert_eq!(t.get(0, "fruit"), Some(&Value::from("apple")));
    assert_eq!(t.get(0, "id").and_then(Value::as_f64), Some(24.0));
    assert_eq!(t.get(0, "in_stock"), Some(&Value::Bool(true)));
    assert_eq!(t.get(1, "in_stock"), Some(&Value::Bool(false)));
    assert_eq!(t.get(1, "rating").and_then(Value::as_f64), Some(4.1));
    assert_eq!(t.get(0, "picked"), Some(&Value::Timestamp(picked)));

    // the short last row is padded with nulls
    assert_eq!(t.get(2, "fruit"), Some(&Value::from("banana")));
    assert_eq!(t.get(2, "picked"), Some(&Value::Null));
    assert_eq!(t.get(2, "column_6"), Some(&Value::Null));
}

#[test]
fn workbook_named_sheet() {
    let mut db = Database::new("workflow").unwrap();
    let opts = ReadOptions::default().with_sheet("prices");
    db.add_table_with(fixture("fruits.xlsx").as_path(), "prices", IfExists::Fail, &opts).unwrap();

    let t = db.query("SELECT fruit, price FROM prices").unwrap();
    assert_eq!(t.column_types(), &[ColumnType::Text, ColumnType::Float]);
    assert_eq!(
        t.rows(),
        &[vec![Value::from("apple"), Value::Float(1.25)], vec![Value::from("peach"), Value::Float(2.5)]]
    );

    let err = db
        .add_table_with(fixture("fruits.xlsx").as_path(), "missing", IfExists::Fail, &ReadOptions::default().with_sheet("nope"))
        .unwrap_err();
    assert_eq!(err.code(), "parse_error");
    assert!(!db.has_table("missing"));
}
