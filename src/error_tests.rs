use super::*;

#[test]
fn code_mapping() {
    assert_eq!(Error::InvalidPolicy("skip".into()).code(), "invalid_policy");
    assert_eq!(Error::AlreadyExists("t".into()).code(), "already_exists");
    assert_eq!(Error::MultiStatement(2).code(), "multi_statement");
    assert_eq!(Error::invalid_argument("table", "empty").code(), "invalid_argument");
    let engine = Error::from(rusqlite::Error::InvalidQuery);
    assert_eq!(engine.code(), "engine_error");
    assert!(!engine.is_validation());
    assert!(Error::ColumnExists { table: "t".into(), column: "c".into() }.is_validation());
}

#[test]
fn unsupported_format_lists_extensions() {
    let e = Error::UnsupportedFormat { extension: "parquet".into(), supported: vec!["csv", "json", "xlsx"] };
    let msg = e.to_string();
    assert!(msg.contains("'parquet'"));
    assert!(msg.contains("csv, json, xlsx"));
}

#[test]
fn engine_errors_are_transparent() {
    let inner = rusqlite::Error::InvalidQuery;
    let expected = inner.to_string();
    assert_eq!(Error::from(inner).to_string(), expected);
}
