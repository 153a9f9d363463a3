use rust_record_transforms::TransformError;
use rust_record_transforms::ingestion::json::records_from_json_path;
use rust_record_transforms::routing::{
    Condition, Operator, Router, RouterOptions, RuleSet, SelectionStrategy, match_category, partition_records,
};
use rust_record_transforms::types::{Record, Value};
use serde_json::json;

fn order_rules() -> RuleSet {
    RuleSet::from_json(&std::fs::read_to_string("tests/fixtures/order_rules.json").unwrap()).unwrap()
}

fn orders() -> Vec<Record> {
    records_from_json_path("tests/fixtures/orders.json").unwrap()
}

fn route_names(router: &Router, record: &Record) -> Vec<String> {
    router
        .route_record(record)
        .unwrap()
        .into_iter()
        .map(|r| r.route_name)
        .collect()
}

#[test]
fn big_rule_scenario() {
    let rules = r#"[{"name":"big","conditions":[{"field":"x","operator":">","value":10}],"logic":"AND"}]"#;
    let router = Router::from_json(rules, RouterOptions::default()).unwrap();

    let hit = router.evaluate(&Record::from([("x", 15)]));
    assert!(hit[0].matched);
    assert_eq!((hit[0].conditions_matched, hit[0].conditions_total), (1, 1));

    let miss = router.route_record(&Record::from([("x", 5)])).unwrap();
    assert_eq!(miss.len(), 1);
    assert!(!miss[0].route_matched);
    assert_eq!(miss[0].route_name, "default");
}

#[test]
fn first_match_is_deterministic_and_within_all_matches() {
    let first = Router::new(order_rules(), RouterOptions::default()).unwrap();
    let all = Router::new(order_rules(), RouterOptions::with_strategy(SelectionStrategy::AllMatches)).unwrap();

    for order in orders() {
        let once = route_names(&first, &order);
        for _ in 0..5 {
            assert_eq!(route_names(&first, &order), once);
        }
        assert_eq!(once.len(), 1);
        let every = route_names(&all, &order);
        if once[0] != "default" {
            assert!(every.contains(&once[0]));
        }
    }
}

#[test]
fn fixture_orders_route_by_strategy() {
    let orders = orders();
    let all = Router::new(order_rules(), RouterOptions::with_strategy(SelectionStrategy::AllMatches)).unwrap();
    assert_eq!(route_names(&all, &orders[0]), vec!["large_order", "nordic", "express"]);
    assert_eq!(route_names(&all, &orders[1]), vec!["needs_review"]);
    // "430" is a string, so it only compares numerically under strict typing.
    assert_eq!(route_names(&all, &orders[2]), vec!["nordic", "express"]);
    assert_eq!(route_names(&all, &orders[3]), vec!["needs_review"]);

    let by_priority = Router::new(order_rules(), RouterOptions::with_strategy(SelectionStrategy::PriorityBased)).unwrap();
    assert_eq!(route_names(&by_priority, &orders[0]), vec!["nordic", "express", "large_order"]);

    let by_score = Router::new(
        order_rules(),
        RouterOptions {
            max_matches: 1,
            ..RouterOptions::with_strategy(SelectionStrategy::ScoreBased)
        },
    )
    .unwrap();
    assert_eq!(route_names(&by_score, &orders[0]), vec!["express"]);
}

#[test]
fn case_insensitive_regex_and_strings() {
    let options = RouterOptions {
        case_sensitive: false,
        ..RouterOptions::with_strategy(SelectionStrategy::AllMatches)
    };
    let rules = r#"[{"name":"paid","conditions":[{"field":"status","operator":"==","value":"paid"}]}]"#;
    let router = Router::from_json(rules, options).unwrap();
    let orders = orders();
    assert_eq!(route_names(&router, &orders[0]), vec!["paid"]);
    assert_eq!(route_names(&router, &orders[2]), vec!["paid"]);
}

#[test]
fn batch_routing_with_metadata() {
    let router = Router::new(
        order_rules(),
        RouterOptions {
            include_metadata: true,
            ..RouterOptions::default()
        },
    )
    .unwrap();
    let outcome = rust_record_transforms::processing::Operation::apply(&router, orders()).unwrap();

    assert_eq!(outcome.routes.len(), 4);
    assert_eq!(outcome.report.summary.matched_records, 4);
    let flat = outcome.records();
    let meta = flat[0].get("metadata").and_then(Value::as_record).unwrap();
    assert_eq!(meta.get("rule_name"), Some(&Value::from("large_order")));
    assert_eq!(
        flat[0].get_path("original_data.order_id"),
        Some(&Value::from("A-1"))
    );
    assert!(outcome.report.text().contains("ROUTES:"));
}

#[test]
fn invalid_rule_sets_fail_before_evaluation() {
    let bad = [
        r#"{"name": "x"}"#,
        r#"[{"name": "x", "conditions": [{"field": "a", "operator": "≈", "value": 1}]}]"#,
        r#"[{"name": "x", "logic": "NAND", "conditions": []}]"#,
        r#"[{"name": "x", "conditions": [{"field": "a", "operator": "regex", "value": "[unclosed"}]}]"#,
    ];
    for rules in bad {
        assert!(
            matches!(Router::from_json(rules, RouterOptions::default()), Err(TransformError::InvalidRule { .. })),
            "{rules} should be rejected"
        );
    }
}

#[test]
fn partition_and_category_helpers() {
    let part = partition_records(orders(), &Condition::new("customer.tier", Operator::NotIn, json!(["gold"]))).unwrap();
    assert_eq!(part.matched.len(), 2);
    assert_eq!(part.unmatched.len(), 2);
    assert!(part.skipped.is_empty());

    let categories = vec!["billing".to_string(), "shipping".to_string()];
    assert_eq!(match_category("Shipping", &categories), Some(1));
    assert_eq!(match_category("'billing'", &categories), Some(0));
}
