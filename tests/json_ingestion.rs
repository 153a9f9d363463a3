use rust_record_transforms::TransformError;
use rust_record_transforms::ingestion::json::{records_from_json_path, records_from_json_str};
use rust_record_transforms::ingestion::{Container, parse_records};
use rust_record_transforms::types::{Record, Value};
use serde_json::json;

#[test]
fn json_from_path_keeps_nesting_and_order() {
    let records = records_from_json_path("tests/fixtures/people.json").unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["id", "user", "score", "active"]);
    assert_eq!(records[0].get_path("user.name"), Some(&Value::from("Ada")));
    assert_eq!(records[1].get_path("user.email"), Some(&Value::Null));
    assert_eq!(records[2].get("score"), Some(&Value::Int64(87)));
}

#[test]
fn ndjson_from_path_skips_blank_lines() {
    let records = records_from_json_path("tests/fixtures/events.ndjson").unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].get("ms"), Some(&Value::Int64(300)));
}

#[test]
fn json_path_must_be_json() {
    let err = records_from_json_path("tests/fixtures/people.csv").unwrap_err();
    assert!(err.to_string().contains("not a .json or .ndjson file"));

    let err = records_from_json_path("tests/fixtures/does_not_exist.json").unwrap_err();
    assert!(matches!(err, TransformError::Io(_)));
}

#[test]
fn malformed_json_is_invalid_json() {
    assert!(matches!(
        records_from_json_str("{\"id\": 1,"),
        Err(TransformError::InvalidJson(_))
    ));
}

#[test]
fn parser_accepts_every_input_shape() {
    let from_text = parse_records(r#"[{"a": 1}, 2]"#).unwrap();
    assert_eq!(from_text[1], Record::from([("value", 2)]));

    let from_value = parse_records(json!({"a": 1})).unwrap();
    assert_eq!(from_value, vec![Record::from([("a", 1)])]);

    let containers = vec![
        Container::new(json!([{"a": 1}, {"a": 2}])),
        Container::new(Value::Null),
        Container::new(json!({"a": 3})),
    ];
    let flattened = parse_records(containers).unwrap();
    assert_eq!(flattened.len(), 3);
    assert_eq!(flattened[2].get("a"), Some(&Value::Int64(3)));
}

#[test]
fn nothing_versus_empty() {
    assert!(matches!(parse_records(json!(null)), Err(TransformError::NoData)));
    assert!(matches!(parse_records("   "), Err(TransformError::NoData)));
    assert!(matches!(parse_records(json!([])), Err(TransformError::EmptyData)));
}
