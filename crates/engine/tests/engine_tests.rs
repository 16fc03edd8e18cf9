//! Integration tests for conftest-engine.
//!
//! These drive the engine through the scripted executor and check counts,
//! exception handling, multi-document fan-out and run ordering.

use conftest_engine::{
    combine_documents, EngineError, Engine, EvalContext, FileContext, NamespaceSelection,
    QueryOutput, RunOptions,
};
use conftest_test_utils::fixtures::{latest_tag_policy, LATEST_TAG_MESSAGE};
use conftest_test_utils::{document, format_check_results, inventory, ScriptedExecutor};
use conftest_types::{PolicyResult, COMBINED_FILE_NAME};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn engine(executor: &Arc<ScriptedExecutor>, definitions: &[(&str, &str)]) -> Engine {
    Engine::new(executor.clone(), inventory(definitions))
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_latest_tag_fails() {
    let executor = Arc::new(latest_tag_policy());
    let engine = engine(&executor, &[("main", "deny")]);

    let results = engine
        .check(
            &[document("deployment.yaml", json!({"image": "app:latest"}))],
            "main",
            &EvalContext::default(),
        )
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].failures, vec![PolicyResult::new(LATEST_TAG_MESSAGE)]);
    assert_eq!(results[0].successes, 0);
}

#[test]
fn test_pinned_tag_succeeds_by_inference() {
    let executor = Arc::new(latest_tag_policy());
    let engine = engine(&executor, &[("main", "deny")]);

    let results = engine
        .check(
            &[document("deployment.yaml", json!({"image": "app:v1"}))],
            "main",
            &EvalContext::default(),
        )
        .unwrap();

    assert!(results[0].failures.is_empty());
    assert_eq!(results[0].successes, 1);
}

#[test]
fn test_run_snapshot() {
    let executor = Arc::new(
        latest_tag_policy()
            .on("data.main.warn", vec![PolicyResult::new("no resource limits")])
            .except("main", "images"),
    );
    let engine = engine(
        &executor,
        &[("main", "deny"), ("main", "warn"), ("main", "deny_images")],
    );

    let results = engine
        .run(
            &[
                document("a.yaml", json!({"image": "app:latest"})),
                document("b.yaml", json!({"image": "app:v2"})),
            ],
            &RunOptions::default(),
        )
        .unwrap();

    insta::assert_snapshot!(format_check_results(&results), @r#"
    a.yaml [main] successes=0
    FAIL image uses the latest tag
    WARN no resource limits
    EXCP data.main.exception[_][_] == "images"

    b.yaml [main] successes=1
    WARN no resource limits
    EXCP data.main.exception[_][_] == "images"
    "#);
}

// ============================================================================
// Counting
// ============================================================================

#[test]
fn test_one_outcome_per_definition() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .on(
                "data.main.deny",
                vec![PolicyResult::new("bad"), PolicyResult::pass()],
            )
            .on("data.main.violation_ports", vec![PolicyResult::new("open port")]),
    );
    let engine = engine(
        &executor,
        &[
            ("main", "deny"),
            ("main", "warn"),
            ("main", "deny"),
            ("main", "violation_ports"),
            ("main", "helper"),
        ],
    );

    let results = engine
        .check(&[document("a.json", json!({}))], "main", &EvalContext::default())
        .unwrap();
    let result = &results[0];

    // deny: one failure and one pass, warn: inferred, violation_ports: failure.
    assert_eq!(result.failures.len(), 2);
    assert_eq!(result.successes, 2);
    assert_eq!(result.total(), 4);
}

#[test]
fn test_rules_are_queried_once_per_name() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(&executor, &[("main", "deny"), ("main", "deny"), ("main", "deny")]);

    let results = engine
        .check(&[document("a.json", json!({}))], "main", &EvalContext::default())
        .unwrap();

    assert_eq!(executor.call_count("data.main.deny"), 1);
    assert_eq!(results[0].successes, 3);
}

#[test]
fn test_unclassified_rules_are_ignored() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(
        &executor,
        &[("main", "helper"), ("main", "denyXYZ"), ("main", "warn_")],
    );

    let results = engine
        .check(&[document("a.json", json!({}))], "main", &EvalContext::default())
        .unwrap();

    assert!(executor.queries().is_empty());
    assert_eq!(results[0].total(), 0);
}

#[test]
fn test_more_records_than_definitions_are_kept() {
    let executor = Arc::new(ScriptedExecutor::new().on(
        "data.main.deny",
        vec![PolicyResult::new("one"), PolicyResult::new("two")],
    ));
    let engine = engine(&executor, &[("main", "deny")]);

    let results = engine
        .check(&[document("a.json", json!({}))], "main", &EvalContext::default())
        .unwrap();

    assert_eq!(results[0].failures.len(), 2);
    assert_eq!(results[0].successes, 0);
}

// ============================================================================
// Exceptions
// ============================================================================

#[test]
fn test_exception_suppresses_all_results_of_rule() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .on(
                "data.main.deny_images",
                vec![PolicyResult::new("one"), PolicyResult::new("two")],
            )
            .on("data.main.warn_images", vec![PolicyResult::new("three")])
            .except("main", "images"),
    );
    let engine = engine(&executor, &[("main", "deny_images"), ("main", "warn_images")]);

    let results = engine
        .check(&[document("a.json", json!({}))], "main", &EvalContext::default())
        .unwrap();
    let result = &results[0];

    assert!(result.failures.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.exceptions.len(), 2);
    assert_eq!(executor.call_count("data.main.deny_images"), 0);
    assert_eq!(executor.call_count("data.main.warn_images"), 0);
}

#[test]
fn test_exception_queries_are_recorded() {
    let executor = Arc::new(ScriptedExecutor::new().except("main", "images"));
    let engine = engine(&executor, &[("main", "deny_images")]);

    let results = engine
        .check(&[document("a.json", json!({}))], "main", &EvalContext::default())
        .unwrap();

    let queries: Vec<_> = results[0].queries.iter().map(|q| q.query.as_str()).collect();
    assert_eq!(queries, vec![r#"data.main.exception[_][_] == "images""#]);
}

#[test]
fn test_exception_only_applies_to_its_rule() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .on("data.main.deny_images", vec![PolicyResult::new("image")])
            .on("data.main.deny_ports", vec![PolicyResult::new("port")])
            .except("main", "images"),
    );
    let engine = engine(&executor, &[("main", "deny_images"), ("main", "deny_ports")]);

    let results = engine
        .check(&[document("a.json", json!({}))], "main", &EvalContext::default())
        .unwrap();

    assert_eq!(results[0].failures, vec![PolicyResult::new("port")]);
    assert_eq!(results[0].exceptions.len(), 1);
}

// ============================================================================
// Multi-document and combined mode
// ============================================================================

#[test]
fn test_multi_document_merge() {
    fn image(input: &serde_json::Value) -> String {
        input["image"].as_str().unwrap_or_default().to_string()
    }

    let executor = Arc::new(
        ScriptedExecutor::new()
            .on_input("data.main.deny", |input| {
                let image = image(input);
                if image.ends_with(":latest") {
                    vec![PolicyResult::new(format!("{image} uses the latest tag"))]
                } else {
                    Vec::new()
                }
            })
            .on_input("data.main.warn", |input| {
                vec![PolicyResult::new(format!("no limits on {}", image(input)))]
            }),
    );
    let engine = engine(&executor, &[("main", "deny"), ("main", "warn")]);

    let results = engine
        .check(
            &[document(
                "stack.yaml",
                json!([
                    {"image": "a:latest"},
                    {"image": "b:v1"},
                    {"image": "c:latest"}
                ]),
            )],
            "main",
            &EvalContext::default(),
        )
        .unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.file_name, "stack.yaml");
    assert_eq!(
        result.failures,
        vec![
            PolicyResult::new("a:latest uses the latest tag"),
            PolicyResult::new("c:latest uses the latest tag"),
        ]
    );
    assert_eq!(
        result.warnings,
        vec![
            PolicyResult::new("no limits on a:latest"),
            PolicyResult::new("no limits on b:v1"),
            PolicyResult::new("no limits on c:latest"),
        ]
    );
    // Only b:v1 leaves its deny definition without a record.
    assert_eq!(result.successes, 1);
    assert_eq!(result.queries.len(), 12);

    let inputs: Vec<_> = executor
        .calls()
        .into_iter()
        .filter(|call| call.query == "data.main.deny")
        .map(|call| call.input["image"].clone())
        .collect();
    assert_eq!(inputs, vec![json!("a:latest"), json!("b:v1"), json!("c:latest")]);
}

#[test]
fn test_empty_multi_document_file() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(&executor, &[("main", "deny")]);

    let results = engine
        .check(&[document("empty.yaml", json!([]))], "main", &EvalContext::default())
        .unwrap();

    assert_eq!(results[0].total(), 0);
    assert!(executor.queries().is_empty());
}

#[test]
fn test_combined_matches_single_document_check() {
    let value = json!({"image": "app:latest"});
    let executor = Arc::new(latest_tag_policy().on("data.main.warn", vec![PolicyResult::pass()]));
    let engine = engine(&executor, &[("main", "deny"), ("main", "warn")]);
    let ctx = EvalContext::default();

    let single = engine
        .check(&[document("pod.yaml", value.clone())], "main", &ctx)
        .unwrap()
        .remove(0);
    let mut combined = engine.check_combined(&value, "main", &ctx).unwrap();

    assert_eq!(combined.file_name, COMBINED_FILE_NAME);
    combined.file_name = single.file_name.clone();
    assert_eq!(combined, single);
}

#[test]
fn test_combined_does_not_fan_out() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(&executor, &[("main", "deny")]);
    let documents = [
        document("a.yaml", json!({"a": 1})),
        document("b.yaml", json!({"b": 2})),
    ];

    let result = engine
        .check_combined(&combine_documents(&documents), "main", &EvalContext::default())
        .unwrap();

    assert_eq!(executor.call_count("data.main.deny"), 1);
    assert_eq!(result.successes, 1);
    let calls = executor.calls();
    assert_eq!(calls[0].input[1]["path"], json!("b.yaml"));
    assert_eq!(calls[0].file, None);
}

#[test]
fn test_run_combined_reports_once_per_namespace() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(&executor, &[("main", "deny"), ("k8s", "warn")]);

    let results = engine
        .run(
            &[
                document("a.yaml", json!({})),
                document("b.yaml", json!({})),
            ],
            &RunOptions {
                namespaces: NamespaceSelection::All,
                combine: true,
                ..RunOptions::default()
            },
        )
        .unwrap();

    let keys: Vec<_> = results
        .iter()
        .map(|r| (r.file_name.as_str(), r.namespace.as_str()))
        .collect();
    assert_eq!(keys, vec![("Combined", "main"), ("Combined", "k8s")]);
}

// ============================================================================
// Namespaces and ordering
// ============================================================================

#[test]
fn test_run_orders_by_namespace_then_document() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(
        &executor,
        &[("main", "deny"), ("main", "warn"), ("docker", "deny")],
    );

    let results = engine
        .run(
            &[document("a.yaml", json!({})), document("b.yaml", json!({}))],
            &RunOptions {
                namespaces: NamespaceSelection::Explicit(vec![
                    "docker".to_string(),
                    "main".to_string(),
                ]),
                ..RunOptions::default()
            },
        )
        .unwrap();

    let keys: Vec<_> = results
        .iter()
        .map(|r| (r.namespace.as_str(), r.file_name.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("docker", "a.yaml"),
            ("docker", "b.yaml"),
            ("main", "a.yaml"),
            ("main", "b.yaml"),
        ]
    );

    let main_queries: Vec<_> = executor
        .queries()
        .into_iter()
        .skip(4)
        .take(4)
        .collect();
    assert_eq!(
        main_queries,
        vec![
            r#"data.main.exception[_][_] == "deny""#,
            "data.main.deny",
            r#"data.main.exception[_][_] == "warn""#,
            "data.main.warn",
        ]
    );
}

#[test]
fn test_all_namespaces_dedup_case_insensitively() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(
        &executor,
        &[("main", "deny"), ("kubernetes", "deny"), ("Main", "warn")],
    );

    assert_eq!(engine.namespaces(), vec!["main", "kubernetes"]);
}

#[test]
fn test_namespace_without_rules() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(&executor, &[("main", "deny")]);

    let results = engine
        .check(&[document("a.json", json!({}))], "missing", &EvalContext::default())
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].namespace, "missing");
    assert_eq!(results[0].total(), 0);
    assert!(executor.queries().is_empty());
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn test_file_context_reaches_executor() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(&executor, &[("main", "deny")]);

    engine
        .check(
            &[document("k8s/base/pod.yaml", json!({}))],
            "main",
            &EvalContext::new(true, None),
        )
        .unwrap();

    for call in executor.calls() {
        assert_eq!(call.file, FileContext::from_path("k8s/base/pod.yaml"));
        assert!(call.trace);
    }
}

#[test]
fn test_traces_and_outputs_are_kept() {
    let executor = Arc::new(ScriptedExecutor::new().on_output(
        "data.main.deny",
        QueryOutput {
            results: vec![PolicyResult::new("bad")],
            traces: vec!["Enter data.main.deny = _".to_string()],
            outputs: vec!["debugging".to_string()],
        },
    ));
    let engine = engine(&executor, &[("main", "deny")]);

    let results = engine
        .check(&[document("a.json", json!({}))], "main", &EvalContext::default())
        .unwrap();

    let query = &results[0].queries[1];
    assert_eq!(query.query, "data.main.deny");
    assert_eq!(query.traces, vec!["Enter data.main.deny = _"]);
    assert_eq!(query.outputs, vec!["debugging"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_executor_error_carries_file_and_namespace() {
    let executor = Arc::new(ScriptedExecutor::new().fail_on("data.main.deny", "rego_type_error"));
    let engine = engine(&executor, &[("main", "deny")]);

    let err = engine
        .check(&[document("pod.yaml", json!({}))], "main", &EvalContext::default())
        .unwrap_err();

    let EngineError::Document {
        file,
        namespace,
        source,
    } = &err
    else {
        panic!("expected a document error, got {err:?}");
    };
    assert_eq!(file, "pod.yaml");
    assert_eq!(namespace, "main");
    assert!(matches!(source.as_ref(), EngineError::Query { query, .. } if query == "data.main.deny"));
    assert_eq!(
        err.to_string(),
        "checking `pod.yaml` against namespace `main`: query `data.main.deny` failed: rego_type_error"
    );
}

#[test]
fn test_error_aborts_run() {
    let executor = Arc::new(ScriptedExecutor::new().respond("data.main.deny", |input, _| {
        if input["broken"] == json!(true) {
            Err(conftest_test_utils::ScriptedError("broken input".to_string()))
        } else {
            Ok(QueryOutput::default())
        }
    }));
    let engine = engine(&executor, &[("main", "deny")]);

    let result = engine.run(
        &[
            document("a.json", json!({})),
            document("b.json", json!({"broken": true})),
            document("c.json", json!({})),
        ],
        &RunOptions::default(),
    );

    assert!(result.is_err());
    assert_eq!(executor.call_count("data.main.deny"), 2);
}

#[test]
fn test_expired_deadline() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(&executor, &[("main", "deny")]);

    let err = engine
        .run(
            &[document("a.json", json!({}))],
            &RunOptions {
                deadline: Some(Instant::now()),
                ..RunOptions::default()
            },
        )
        .unwrap_err();

    let EngineError::Document { source, .. } = err else {
        panic!("expected a document error");
    };
    assert!(matches!(*source, EngineError::DeadlineExceeded { .. }));
    assert!(executor.queries().is_empty());
}

#[test]
fn test_future_deadline() {
    let executor = Arc::new(ScriptedExecutor::new());
    let engine = engine(&executor, &[("main", "deny")]);

    let results = engine
        .run(
            &[document("a.json", json!({}))],
            &RunOptions {
                deadline: Some(Instant::now() + Duration::from_secs(300)),
                ..RunOptions::default()
            },
        )
        .unwrap();

    assert_eq!(results[0].successes, 1);
}
