// tests/graceful_degradation.rs

use std::error::Error;
use std::time::Duration;

use dagrun::{DagError, ExecuteOptions, ExecutionOutput, Value};
use dagrun_test_utils::builders::GraphBuilder;
use dagrun_test_utils::work::{add, always_fail, CallLog};
use dagrun_test_utils::{init_tracing, with_timeout};
use serde_json::json;

type TestResult = Result<(), Box<dyn Error>>;

/// load -> enrich (fails) -> publish, load -> index
fn branching_graph() -> GraphBuilder {
    GraphBuilder::new()
        .with_node("load", add(0))
        .with_node("enrich", always_fail("enrichment service down"))
        .with_node("publish", add(100))
        .with_node("index", add(1))
        .with_chain(&["load", "enrich", "publish"])
        .with_edge("load", "index")
}

#[tokio::test]
async fn independent_branch_completes_and_failed_input_becomes_null() -> TestResult {
    init_tracing();

    let mut graph = branching_graph().build();
    let options = ExecuteOptions::default().with_graceful_degradation(true);

    let output = with_timeout(graph.execute(json!(5), &options)).await?;

    match &output {
        ExecutionOutput::Results(map) => {
            assert_eq!(map["load"], json!(5));
            assert_eq!(map["index"], json!(6));
            // `enrich` failed, so `publish` ran on a null input.
            assert_eq!(map["publish"], json!(100));
            assert!(!map.contains_key("enrich"));
        }
        other => panic!("Expected Results, got: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn without_degradation_the_failure_blocks_dependents() {
    let mut graph = branching_graph().build();

    let err = with_timeout(graph.execute(json!(5), &ExecuteOptions::default()))
        .await
        .unwrap_err();

    assert!(err.is_wrapped());
    match err.root() {
        DagError::DependentsBlocked { dependents, source } => {
            assert_eq!(dependents, &["publish"]);
            assert_eq!(source.node_id, "enrich");
            assert_eq!(source.cause, "enrichment service down");
        }
        other => panic!("Expected DependentsBlocked, got: {:?}", other),
    }
}

#[tokio::test]
async fn listed_required_node_escalates_despite_degradation() {
    let mut graph = branching_graph().build();
    let options = ExecuteOptions::default()
        .with_graceful_degradation(true)
        .with_required_nodes(["enrich"]);

    let err = with_timeout(graph.execute(json!(5), &options))
        .await
        .unwrap_err();

    assert!(err.is_wrapped());
    match err.root() {
        DagError::DependentsBlocked { dependents, source } => {
            assert_eq!(dependents, &["publish"]);
            assert_eq!(source.node_id, "enrich");
        }
        other => panic!("Expected DependentsBlocked, got: {:?}", other),
    }
    assert_eq!(err.node_id(), Some("enrich"));
}

#[tokio::test]
async fn listed_required_leaf_escalates_despite_degradation() {
    let mut graph = GraphBuilder::new()
        .with_echo("load")
        .with_node("audit", always_fail("audit log unavailable"))
        .with_echo("index")
        .with_edge("load", "audit")
        .with_edge("load", "index")
        .build();
    let options = ExecuteOptions::default()
        .with_graceful_degradation(true)
        .with_required_nodes(["audit"]);

    let err = with_timeout(graph.execute(json!(5), &options))
        .await
        .unwrap_err();

    assert!(err.is_wrapped());
    assert!(matches!(err.root(), DagError::NodeExecution(_)));
    assert_eq!(err.to_string(), "DAG execution failed: audit log unavailable");
}

#[tokio::test]
async fn failed_upstream_without_degradation_stops_the_consumer() {
    // `enrich` is not required, so its own failure does not escalate, but
    // `publish` cannot run on a failed input.
    let mut graph = branching_graph().build();
    let options = ExecuteOptions::default().with_required_nodes(["load"]);

    let err = with_timeout(graph.execute(json!(5), &options))
        .await
        .unwrap_err();

    assert!(err.is_wrapped());
    match err.root() {
        DagError::UpstreamFailed { node_id, upstream } => {
            assert_eq!(node_id, "publish");
            assert_eq!(upstream, "enrich");
        }
        other => panic!("Expected UpstreamFailed, got: {:?}", other),
    }
    assert_eq!(err.node_id(), Some("publish"));
}

#[tokio::test]
async fn non_required_failure_is_tolerated_when_others_are_required() -> TestResult {
    let mut graph = branching_graph().build();
    let options = ExecuteOptions::default()
        .with_graceful_degradation(true)
        .with_required_nodes(["load", "index"]);

    let output = with_timeout(graph.execute(json!(1), &options)).await?;

    assert_eq!(output.get("index"), Some(&json!(2)));
    assert_eq!(output.get("publish"), Some(&json!(100)));
    assert_eq!(output.get("enrich"), None);
    Ok(())
}

#[tokio::test]
async fn two_failures_are_aggregated_even_with_degradation() {
    let mut graph = GraphBuilder::new()
        .with_node("a", always_fail("a broke"))
        .with_node("b", always_fail("b broke"))
        .with_echo("c")
        .build();
    let options = ExecuteOptions::default().with_graceful_degradation(true);

    let err = with_timeout(graph.execute(Value::Null, &options))
        .await
        .unwrap_err();

    assert!(err.is_wrapped());
    let errors = err.errors().expect("aggregated errors");
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].node_id, "a");
    assert_eq!(errors[0].message, "a broke");
    assert_eq!(errors[1].node_id, "b");
    assert_eq!(errors[1].message, "b broke");
}

#[tokio::test]
async fn concurrent_degradation_keeps_sibling_running() -> TestResult {
    let log = CallLog::new();
    let mut graph = GraphBuilder::new()
        .with_echo("root")
        .with_node(
            "flaky",
            log.sleepy_failure("flaky", Duration::from_millis(10), "flaky broke"),
        )
        .with_node("slow", log.sleepy("slow", Duration::from_millis(60)))
        .with_node("after_flaky", add(7))
        .with_edge("root", "flaky")
        .with_edge("root", "slow")
        .with_edge("flaky", "after_flaky")
        .build();

    let options = ExecuteOptions::default()
        .with_graceful_degradation(true)
        .with_max_concurrency(2);
    let output = with_timeout(graph.execute(json!("seed"), &options)).await?;

    assert_eq!(output.get("slow"), Some(&json!("seed")));
    assert_eq!(output.get("after_flaky"), Some(&json!(7)));
    assert_eq!(output.get("flaky"), None);
    Ok(())
}
