use super::*;

fn numbers() -> Database {
    let mut db = Database::new("tests").unwrap();
    let t = Table::new(
        vec!["id", "val", "label"],
        vec![
            vec![1.into(), 10.into(), "a".into()],
            vec![2.into(), 20.into(), "b".into()],
            vec![3.into(), 30.into(), "c".into()],
        ],
    )
    .unwrap();
    db.add_table(t, "t", IfExists::Fail).unwrap();
    db
}

fn column(db: &Database, col: &str) -> Vec<Value> {
    db.query(&format!("SELECT {} FROM t", quote_ident(col))).unwrap().into_rows().into_iter().map(|mut r| r.remove(0)).collect()
}

#[test]
fn row_lookup_by_name() {
    let names = vec!["id".to_string(), "val".to_string()];
    let values = vec![Value::Int(1), Value::Int(2)];
    let row = Row::new(&names, &values);
    assert_eq!(row["val"], Value::Int(2));
    assert_eq!(row.get("nope"), None);
    assert_eq!(row.value("nope"), &Value::Null);
    assert_eq!(row.len(), 2);
}

#[test]
fn row_fn_macro_declares_params() {
    let mut f = row_fn!(|val, id| id.as_i64().zip(val.as_i64()).map(|(a, b)| a - b));
    assert_eq!(f.params(), &["val", "id"]);
    // bound by name: column order of the row does not matter
    let names = vec!["id".to_string(), "val".to_string()];
    let values = vec![Value::Int(5), Value::Int(2)];
    assert_eq!(f.call(&Row::new(&names, &values)), Value::Int(3));
    let g = row_fn!(|| 1);
    assert!(g.params().is_empty());
}

#[test]
fn map_is_positional() {
    let mut db = numbers();
    db.map(|args: &[Value]| args[0].as_i64().unwrap() + args[1].as_i64().unwrap(), "t", ["val", "id"], "sum", false)
        .unwrap();
    assert_eq!(column(&db, "sum"), vec![Value::Int(11), Value::Int(22), Value::Int(33)]);
    assert_eq!(db.column_names("t").unwrap(), vec!["id", "val", "label", "sum"]);
}

#[test]
fn map_refuses_existing_output_without_overwrite() {
    let mut db = numbers();
    let mut calls = 0;
    let err = db
        .map(|_: &[Value]| { calls += 1; Value::Null }, "t", ["id"], "val", false)
        .unwrap_err();
    assert!(matches!(err, Error::ColumnExists { ref column, .. } if column == "val"));
    assert_eq!(calls, 0);
    assert_eq!(column(&db, "val"), vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
}

#[test]
fn map_overwrite_keeps_column_position() {
    let mut db = numbers();
    db.map(|a: &[Value]| a[0].as_i64().map(|v| v * 2), "t", ["val"], "val", true).unwrap();
    assert_eq!(column(&db, "val"), vec![Value::Int(20), Value::Int(40), Value::Int(60)]);
    assert_eq!(db.column_names("t").unwrap(), vec!["id", "val", "label"]);
}

#[test]
fn map_unknown_column() {
    let mut db = numbers();
    let err = db.map(|_: &[Value]| 0_i64, "t", ["id", "nope"], "out", false).unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound { ref column, .. } if column == "nope"));
}

#[test]
fn map_argument_validation_names_the_argument() {
    let mut db = numbers();
    let err = db.map(|_: &[Value]| 0_i64, "", ["id"], "out", false).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { argument: "table", .. }));
    let err = db.map(|_: &[Value]| 0_i64, "t", ["id"], " ", false).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { argument: "output", .. }));
    let err = db.map(|_: &[Value]| 0_i64, "t", ["id", ""], "out", false).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { argument: "columns", .. }));
}

#[test]
fn map_into_binds_by_name() {
    let mut db = numbers();
    db.map_into(row_fn!(|val, id| id.as_i64().zip(val.as_i64()).map(|(a, b)| a * b)), "t", "total", false)
        .unwrap();
    assert_eq!(column(&db, "total"), vec![Value::Int(10), Value::Int(40), Value::Int(90)]);
    assert_eq!(db.column_names("t").unwrap(), vec!["id", "val", "label", "total"]);
    // unbound columns survive the replace
    assert_eq!(column(&db, "label"), vec![Value::from("a"), Value::from("b"), Value::from("c")]);
}

#[test]
fn map_into_unbound_parameter() {
    let mut db = numbers();
    let err = db.map_into(row_fn!(|id, weight| id), "t", "out", false).unwrap_err();
    assert!(matches!(err, Error::UnboundParameter { ref parameter, .. } if parameter == "weight"));
    assert_eq!(db.column_names("t").unwrap(), vec!["id", "val", "label"]);
}

#[test]
fn map_into_overwrite_policy() {
    let mut db = numbers();
    let err = db.map_into(row_fn!(|id| id), "t", "label", false).unwrap_err();
    assert_eq!(err.code(), "column_exists");
    db.map_into(row_fn!(|label| label.as_str().map(str::to_uppercase)), "t", "label", true).unwrap();
    assert_eq!(column(&db, "label"), vec![Value::from("A"), Value::from("B"), Value::from("C")]);
}

#[test]
fn map_into_duplicate_params_rejected() {
    let mut db = numbers();
    let f = RowFn::new(["id", "id"], |r: &Row<'_>| r["id"].clone());
    let err = db.map_into(f, "t", "out", false).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { argument: "func", .. }));
}

#[test]
fn map_into_without_params_runs_once_per_row() {
    let mut db = numbers();
    let mut n = 0_i64;
    let f = RowFn::new(Vec::<String>::new(), |_: &Row<'_>| {
        n += 1;
        n
    });
    db.map_into(f, "t", "seq", false).unwrap();
    assert_eq!(column(&db, "seq"), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn map_into_unknown_table_is_engine_error() {
    let mut db = numbers();
    let err = db.map_into(row_fn!(|id| id), "missing", "out", false).unwrap_err();
    assert_eq!(err.code(), "engine_error");
}

#[test]
fn mixed_results_become_text() {
    let mut db = numbers();
    db.map(
        |a: &[Value]| if a[0].as_i64() == Some(2) { Value::from("two") } else { a[0].clone() },
        "t",
        ["id"],
        "mixed",
        false,
    )
    .unwrap();
    assert_eq!(column(&db, "mixed"), vec![Value::from("1"), Value::from("two"), Value::from("3")]);
}

#[test]
fn output_name_matches_existing_column_ignoring_case() {
    let mut db = numbers();
    let err = db.map(|a: &[Value]| a[0].clone(), "t", ["val"], "ID", false).unwrap_err();
    assert!(matches!(err, Error::ColumnExists { ref column, .. } if column == "id"));

    db.map(|a: &[Value]| a[0].as_i64().map(|v| v + 100), "t", ["id"], "ID", true).unwrap();
    assert_eq!(db.column_names("t").unwrap(), vec!["id", "val", "label"]);
    assert_eq!(column(&db, "id"), vec![Value::Int(101), Value::Int(102), Value::Int(103)]);

    let err = db.map_into(row_fn!(|val| val), "t", "Label", false).unwrap_err();
    assert_eq!(err.code(), "column_exists");
}
