use rust_record_transforms::ingestion::json::records_from_json_path;
use rust_record_transforms::processing::dedup::{DedupOptions, deduplicate};
use rust_record_transforms::processing::fill::{FillStrategy, NullFillOptions, fill_nulls};
use rust_record_transforms::processing::mapping::{MappingOptions, map_values};
use rust_record_transforms::processing::replace::{ReplaceOptions, replace_strings};
use rust_record_transforms::processing::select::{SelectOptions, select_fields};
use rust_record_transforms::processing::split::{SplitOptions, split_data};
use rust_record_transforms::processing::validate::{ExpectedType, ValidateOptions, validate_data};
use rust_record_transforms::TransformError;
use rust_record_transforms::processing::fill::NullFiller;
use rust_record_transforms::processing::{Component, Operation};
use rust_record_transforms::types::{Record, Value};
use serde_json::json;

fn field(records: &[Record], name: &str) -> Vec<Value> {
    records
        .iter()
        .map(|r| r.get(name).cloned().unwrap_or(Value::Null))
        .collect()
}

#[test]
fn mean_fill_scenario() {
    let input = json!([{"id":1,"age":null},{"id":2,"age":30},{"id":3,"age":null}]);
    let out = fill_nulls(input, &NullFillOptions::with_strategy(FillStrategy::Mean)).unwrap();

    assert_eq!(
        field(&out.records, "age"),
        vec![Value::Float64(30.0), Value::Int64(30), Value::Float64(30.0)]
    );
    assert_eq!(out.report.summary.total_nulls_found, 2);
    assert_eq!(out.report.summary.total_nulls_filled, 2);
    assert_eq!(out.original_nulls.len(), 2);
    assert!(out.report.text().starts_with("=== NULL VALUE FILLING REPORT ==="));
}

#[test]
fn interpolation_boundaries() {
    let opts = NullFillOptions::with_strategy(FillStrategy::Interpolate);

    let out = fill_nulls(json!([{"v":10},{"v":null},{"v":30}]), &opts).unwrap();
    assert_eq!(out.records[1].get("v"), Some(&Value::Float64(20.0)));

    let out = fill_nulls(json!([{"v":null},{"v":null},{"v":30}]), &opts).unwrap();
    assert_eq!(field(&out.records, "v"), vec![Value::Float64(30.0), Value::Float64(30.0), Value::Int64(30)]);
}

#[test]
fn full_record_dedup_scenario() {
    let out = deduplicate(json!([{"a":1},{"a":1},{"a":2}]), &DedupOptions::default()).unwrap();

    assert_eq!(out.records.len(), 2);
    let groups: Vec<_> = out.duplicate_groups().collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].total_count, 2);
    assert_eq!(groups[0].original.record.get("a"), Some(&Value::Int64(1)));
}

#[test]
fn identity_selection_round_trips() {
    let input = records_from_json_path("tests/fixtures/people.json").unwrap();
    let opts = SelectOptions::default().rename([("id", "id"), ("user", "user"), ("score", "score"), ("active", "active")]);
    let out = select_fields(input.clone(), &opts).unwrap();
    assert_eq!(out.records, input);
    assert!(out.report.errors.is_empty());
}

#[test]
fn cleaning_pipeline_over_fixture() {
    let people = records_from_json_path("tests/fixtures/people.json").unwrap();

    let selected = select_fields(
        people,
        &SelectOptions {
            flatten_nested: true,
            ..SelectOptions::exclude(["active"])
        },
    )
    .unwrap();
    assert!(selected.records[0].contains_key("user_email"));

    let filled = fill_nulls(
        selected.records,
        &NullFillOptions::default().field_strategy("score", FillStrategy::Median, None).field_strategy(
            "user_email",
            FillStrategy::Constant,
            Some(Value::from("unknown@example.com")),
        ),
    )
    .unwrap();
    assert_eq!(filled.records[1].get("user_email"), Some(&Value::from("unknown@example.com")));
    assert_eq!(filled.records[1].get("score"), Some(&Value::Float64(92.75)));

    let replaced = replace_strings(
        filled.records,
        &ReplaceOptions {
            target_fields: vec!["user_email".to_string()],
            ..ReplaceOptions::simple("@example.", "@corp.")
        },
    )
    .unwrap();
    assert_eq!(replaced.records[0].get("user_email"), Some(&Value::from("ada@corp.com")));

    let mapped = map_values(
        replaced.records,
        &MappingOptions::simple([("Ada", "A. Lovelace")]).targets(["user_name"]),
    )
    .unwrap();
    assert_eq!(mapped.records[0].get("user_name"), Some(&Value::from("A. Lovelace")));
    assert_eq!(mapped.records[1].get("user_name"), Some(&Value::from("Grace")));

    let validated = validate_data(
        mapped.records,
        &ValidateOptions::default().expect_type("user_email", ExpectedType::Email),
    )
    .unwrap();
    assert_eq!(validated.clean_records.len(), 3);
    assert!(validated.report.summary.validation_passed);

    let split = split_data(validated.clean_records, &SplitOptions::ratios(2.0, 0.0, 1.0)).unwrap();
    assert_eq!(split.train().len(), 2);
    assert_eq!(split.test().len(), 1);
}

#[test]
fn component_requires_a_run_before_outputs() {
    let mut component = Component::new(NullFiller::new(NullFillOptions::default()));
    assert!(matches!(component.outcome(), Err(TransformError::NotYetRun { .. })));

    component.run(json!([{"a": null}])).unwrap();
    assert_eq!(component.outcome().unwrap().report.summary.total_nulls_filled, 1);

    let outcome = component.take_outcome().unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert!(component.outcome().is_err());

    let direct = NullFiller::new(NullFillOptions::default()).run(json!([{"a": 1}])).unwrap();
    assert_eq!(direct.report.summary.total_nulls_found, 0);
}
