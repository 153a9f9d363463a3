use rust_record_transforms::TransformError;
use rust_record_transforms::ingestion::csv::{records_from_csv_path, records_from_csv_reader, records_from_csv_str};
use rust_record_transforms::processing::fill::{FillStrategy, NullFillOptions, fill_nulls};
use rust_record_transforms::types::Value;

#[test]
fn csv_from_path_keeps_cells_as_strings() {
    let records = records_from_csv_path("tests/fixtures/people.csv").unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["id", "name", "score", "city"]);
    assert_eq!(records[0].get("id"), Some(&Value::from("1")));
    assert_eq!(records[0].get("score"), Some(&Value::from("98.5")));
    assert_eq!(records[1].get("score"), Some(&Value::from("")));
}

#[test]
fn csv_reader_accepts_custom_delimiter() {
    let input = "name;id\nAda;1\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b';')
        .from_reader(input.as_bytes());

    let records = records_from_csv_reader(&mut rdr).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("name"), Some(&Value::from("Ada")));
    assert_eq!(records[0].get("id"), Some(&Value::from("1")));
}

#[test]
fn csv_path_must_be_csv() {
    let err = records_from_csv_path("tests/fixtures/people.json").unwrap_err();
    assert!(matches!(err, TransformError::InvalidInput { .. }));
    assert!(err.to_string().contains("not a .csv file"));
}

#[test]
fn csv_missing_file_is_a_csv_error() {
    let err = records_from_csv_path("tests/fixtures/does_not_exist.csv").unwrap_err();
    assert!(matches!(err, TransformError::Csv(_)));
}

#[test]
fn empty_cells_are_filled_like_nulls() {
    let records = records_from_csv_str("id,city\n1,Oslo\n2,\n3,Rome\n").unwrap();
    let out = fill_nulls(records, &NullFillOptions::with_strategy(FillStrategy::ForwardFill)).unwrap();

    assert_eq!(out.report.summary.total_nulls_found, 1);
    assert_eq!(out.records[1].get("city"), Some(&Value::from("Oslo")));
}
