use std::sync::{Arc, Mutex};

use rust_record_transforms::TransformError;
use rust_record_transforms::config::options_from_json;
use rust_record_transforms::execution::{
    LoopEngine, LoopEvent, LoopObserver, LoopOptions, LoopOutput, LoopType, OutputMode, TracingLoopObserver,
};
use rust_record_transforms::ingestion::json::records_from_json_path;
use rust_record_transforms::types::Value;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl LoopObserver for Recorder {
    fn on_event(&self, event: &LoopEvent) {
        let name = match event {
            LoopEvent::RunStarted { .. } => "started",
            LoopEvent::BatchStarted { .. } => "batch",
            LoopEvent::IterationSucceeded { .. } => "ok",
            LoopEvent::IterationFailed { .. } => "failed",
            LoopEvent::ConditionStopped { .. } => "stopped",
            LoopEvent::MaxIterationsReached { .. } => "max",
            LoopEvent::RunFinished { .. } => "finished",
            LoopEvent::RunAborted { .. } => "aborted",
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(name.to_string());
        }
    }
}

#[test]
fn range_ceiling_scenario() {
    let engine = LoopEngine::new(LoopOptions {
        max_iterations: 5,
        ..LoopOptions::range(0, 1000, 1)
    })
    .unwrap();

    let mut processed = 0;
    let run = engine
        .execute(Value::Null, |item, _| {
            processed += 1;
            Ok::<_, String>(item.clone())
        })
        .unwrap();
    assert_eq!(processed, 5);
    assert_eq!(run.stats().total_iterations, 5);
    assert_eq!(run.current.as_ref().map(|c| c.index), Some(4));
}

#[test]
fn for_each_over_fixture_records() {
    let people = records_from_json_path("tests/fixtures/people.json").unwrap();
    let input = Value::List(people.into_iter().map(Value::Map).collect());

    let recorder = Arc::new(Recorder::default());
    let engine = LoopEngine::new(LoopOptions::default())
        .unwrap()
        .with_observer(recorder.clone());
    let run = engine.execute_default(input).unwrap();

    let LoopOutput::All(items) = run.output else {
        panic!("expected all results");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(items[2].as_record().and_then(|r| r.get("loop_index")), Some(&Value::Int64(2)));
    assert_eq!(
        recorder.events.lock().unwrap().as_slice(),
        ["started", "ok", "ok", "ok", "finished"]
    );
}

#[test]
fn while_loop_reads_item_fields() {
    let engine = LoopEngine::new(LoopOptions::conditional(LoopType::While, "index < limit")).unwrap();
    let run = engine
        .execute(serde_json::json!({"limit": 4}), |_, index| Ok::<_, String>(Value::from(index)))
        .unwrap();
    assert_eq!(run.stats().total_iterations, 4);
    assert_eq!(
        run.output.into_value(),
        Value::List((0..4).map(Value::Int64).collect())
    );
}

#[test]
fn until_runs_to_the_ceiling_when_condition_cannot_hold() {
    let engine = LoopEngine::new(LoopOptions {
        max_iterations: 3,
        ..LoopOptions::conditional(LoopType::Until, "missing_field > 1")
    })
    .unwrap();
    let run = engine.execute(Value::Null, |item, _| Ok::<_, String>(item.clone())).unwrap();
    assert_eq!(run.stats().total_iterations, 3);
}

#[test]
fn aggregated_numbers_from_range() {
    let engine = LoopEngine::new(LoopOptions {
        output_mode: OutputMode::Aggregated,
        ..LoopOptions::range(1, 5, 1)
    })
    .unwrap();
    let run = engine
        .execute(Value::Null, |item, _| Ok::<_, String>(item.clone()))
        .unwrap();
    let Value::Map(agg) = run.output.into_value() else {
        panic!("expected aggregate mapping");
    };
    assert_eq!(agg.get("sum"), Some(&Value::Float64(10.0)));
    assert_eq!(agg.get("average"), Some(&Value::Float64(2.5)));
    assert_eq!(agg.get("first_item"), Some(&Value::Int64(1)));
    assert_eq!(agg.get("successful_count"), Some(&Value::Int64(4)));
}

#[test]
fn break_on_error_aborts_and_reports_index() {
    let recorder = Arc::new(Recorder::default());
    let engine = LoopEngine::new(LoopOptions::range(0, 10, 1))
        .unwrap()
        .with_observer(recorder.clone());
    let err = engine
        .execute(Value::Null, |item, index| {
            if index == 2 {
                Err(format!("cannot handle {item}"))
            } else {
                Ok(item.clone())
            }
        })
        .unwrap_err();
    assert!(matches!(err, TransformError::IterationFailed { index: 2, .. }));
    assert_eq!(err.to_string(), "iteration 2 failed: cannot handle 2");
    assert_eq!(recorder.events.lock().unwrap().last().map(String::as_str), Some("aborted"));
    assert_eq!(engine.metrics().snapshot().failed, 1);
}

#[test]
fn options_load_from_json() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("rust_record_transforms=debug"))
        .with_test_writer()
        .try_init();

    let options: LoopOptions = options_from_json(
        r#"{"loop_type": "range", "range_start": 0, "range_end": 6, "range_step": 2, "output_mode": "last_result"}"#,
    )
    .unwrap();
    let engine = LoopEngine::new(options).unwrap().with_observer(Arc::new(TracingLoopObserver));
    let run = engine.execute_default(Value::Null).unwrap();
    let LoopOutput::Last(Value::Map(last)) = run.output else {
        panic!("expected last result");
    };
    assert_eq!(last.get("original_value"), Some(&Value::Int64(4)));

    let err = options_from_json::<LoopOptions>(r#"{"loop_type": "forever"}"#).unwrap_err();
    assert!(matches!(err, TransformError::InvalidConfig { .. }));
}

#[test]
fn delay_must_fit_a_duration() {
    let err = LoopEngine::new(LoopOptions {
        delay_between_iterations: 1e20,
        ..LoopOptions::default()
    })
    .err();
    assert!(matches!(err, Some(TransformError::InvalidConfig { .. })));

    let engine = LoopEngine::new(LoopOptions {
        delay_between_iterations: 0.001,
        ..LoopOptions::range(0, 2, 1).batched(2)
    })
    .unwrap();
    let run = engine.execute_default(Value::Null).unwrap();
    assert_eq!(run.stats().total_iterations, 2);
    assert_eq!(engine.metrics().snapshot().batches, 1);
}
