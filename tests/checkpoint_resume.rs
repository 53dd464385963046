// tests/checkpoint_resume.rs

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

use dagrun::{Checkpoint, DagError, ExecuteOptions, ExecutionOutput, ExecutionState, Graph};
use dagrun_test_utils::builders::GraphBuilder;
use dagrun_test_utils::work::{add, counting, echo, fail_times};
use dagrun_test_utils::{init_tracing, with_timeout};
use serde_json::json;

type TestResult = Result<(), Box<dyn Error>>;

fn state_with(results: &[(&str, serde_json::Value)]) -> ExecutionState {
    let mut state = ExecutionState::new();
    for (id, value) in results {
        state.results.insert(id.to_string(), value.clone());
    }
    state
}

#[test]
fn save_then_load_returns_the_same_snapshot() -> TestResult {
    init_tracing();

    let mut graph = Graph::new();
    graph.add_node("A", echo())?;

    let state = state_with(&[("A", json!({ "rows": 3 }))]);
    let saved = graph.save_checkpoint("nightly", &state).clone();
    let loaded = graph.load_checkpoint("nightly").cloned();

    assert_eq!(loaded, Some(saved));
    let loaded = loaded.unwrap();
    assert_eq!(loaded.id, "nightly");
    assert_eq!(loaded.results["A"], json!({ "rows": 3 }));
    assert!(loaded.errors.is_empty());
    assert!(loaded.timestamp <= SystemTime::now());
    Ok(())
}

#[test]
fn checkpoint_is_a_copy_of_the_state() {
    let mut graph = Graph::new();
    let mut state = state_with(&[("A", json!(1))]);
    graph.save_checkpoint("cp", &state);

    state.results.insert("A".into(), json!(2));
    state.results.insert("B".into(), json!(3));

    let checkpoint = graph.load_checkpoint("cp").unwrap();
    assert_eq!(checkpoint.results.len(), 1);
    assert_eq!(checkpoint.results["A"], json!(1));
}

#[test]
fn saving_under_an_existing_id_overwrites() {
    let mut graph = Graph::new();
    graph.save_checkpoint("cp", &state_with(&[("A", json!(1))]));
    graph.save_checkpoint("cp", &state_with(&[("B", json!(2))]));

    let checkpoint = graph.load_checkpoint("cp").unwrap();
    assert!(!checkpoint.is_complete("A"));
    assert!(checkpoint.is_complete("B"));
    assert_eq!(graph.list_checkpoints(), vec!["cp"]);
}

#[test]
fn clear_and_list_checkpoints() {
    let mut graph = Graph::new();
    let state = ExecutionState::new();
    graph.save_checkpoint("b", &state);
    graph.save_checkpoint("a", &state);

    assert_eq!(graph.list_checkpoints(), vec!["a", "b"]);
    assert!(graph.clear_checkpoint("a"));
    assert!(!graph.clear_checkpoint("a"));
    assert!(graph.load_checkpoint("a").is_none());
    assert_eq!(graph.list_checkpoints(), vec!["b"]);
}

#[tokio::test]
async fn run_with_checkpoint_id_records_every_node() -> TestResult {
    let mut graph = GraphBuilder::new()
        .with_node("A", add(1))
        .with_node("B", add(1))
        .with_node("C", add(1))
        .with_chain(&["A", "B", "C"])
        .build();

    let options = ExecuteOptions::default().with_checkpoint("pipeline");
    let output = with_timeout(graph.execute(json!(0), &options)).await?;
    assert!(matches!(output, ExecutionOutput::Results(_)));

    let checkpoint = graph.load_checkpoint("pipeline").expect("checkpoint saved");
    assert_eq!(checkpoint.results.len(), 3);
    assert_eq!(checkpoint.results["C"], json!(3));
    Ok(())
}

#[tokio::test]
async fn failed_run_leaves_a_checkpoint_with_partial_results() {
    let (flaky, _) = fail_times(1, json!("loaded"));
    let mut graph = GraphBuilder::new()
        .with_node("extract", add(1))
        .with_node("load", flaky)
        .with_edge("extract", "load")
        .build();

    let options = ExecuteOptions::default().with_checkpoint("etl");
    let err = with_timeout(graph.execute(json!(1), &options))
        .await
        .unwrap_err();
    assert_eq!(err.node_id(), Some("load"));

    let checkpoint = graph.load_checkpoint("etl").unwrap();
    assert_eq!(checkpoint.results.get("extract"), Some(&json!(2)));
    assert_eq!(
        checkpoint.errors.get("load").map(String::as_str),
        Some("transient failure #1")
    );
    assert!(!checkpoint.is_complete("load"));
}

#[tokio::test]
async fn resume_skips_completed_nodes_and_reruns_failed_ones() -> TestResult {
    let (extract, extract_calls) = counting();
    let (flaky, flaky_calls) = fail_times(1, json!("loaded"));
    let mut graph = GraphBuilder::new()
        .with_node("extract", extract)
        .with_node("load", flaky)
        .with_edge("extract", "load")
        .build();

    let first = ExecuteOptions::default().with_checkpoint("etl");
    assert!(graph.execute(json!("rows"), &first).await.is_err());
    assert_eq!(extract_calls.load(Ordering::SeqCst), 1);

    let resume = ExecuteOptions::default().with_checkpoint("etl").resuming();
    let output = with_timeout(graph.execute(json!("rows"), &resume)).await?;

    assert_eq!(extract_calls.load(Ordering::SeqCst), 1);
    assert_eq!(flaky_calls.load(Ordering::SeqCst), 2);
    assert_eq!(output.get("extract"), Some(&json!("rows")));
    assert_eq!(output.get("load"), Some(&json!("loaded")));

    // The resumed run keeps checkpointing under the same id.
    let checkpoint = graph.load_checkpoint("etl").unwrap();
    assert!(checkpoint.errors.is_empty());
    assert!(checkpoint.is_complete("load"));
    Ok(())
}

#[tokio::test]
async fn resume_from_a_supplied_checkpoint() -> TestResult {
    let (extract, extract_calls) = counting();
    let mut graph = GraphBuilder::new()
        .with_node("extract", extract)
        .with_node("transform", add(10))
        .with_edge("extract", "transform")
        .build();

    let mut results = BTreeMap::new();
    results.insert("extract".to_string(), json!(5));
    results.insert("ghost".to_string(), json!("unknown node"));
    let checkpoint = Checkpoint {
        id: "external".to_string(),
        timestamp: SystemTime::now(),
        results,
        errors: BTreeMap::new(),
    };

    let output = with_timeout(graph.resume(&checkpoint, json!(0))).await?;

    assert_eq!(extract_calls.load(Ordering::SeqCst), 0);
    assert_eq!(output.get("transform"), Some(&json!(15)));
    assert_eq!(output.get("ghost"), None);
    Ok(())
}

#[tokio::test]
async fn resume_from_a_checkpoint_that_went_through_json() -> TestResult {
    let mut graph = GraphBuilder::new()
        .with_node("extract", add(1))
        .with_node("transform", add(10))
        .with_edge("extract", "transform")
        .build();

    let options = ExecuteOptions::default().with_checkpoint("persisted");
    graph.execute(json!(1), &options).await?;

    let stored = serde_json::to_string(graph.load_checkpoint("persisted").unwrap())?;
    let restored: Checkpoint = serde_json::from_str(&stored)?;

    let (transform, calls) = counting();
    let mut fresh = GraphBuilder::new()
        .with_node("extract", add(1))
        .with_node("transform", transform)
        .with_edge("extract", "transform")
        .build();

    let output = with_timeout(fresh.resume(&restored, json!(1))).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(output.get("transform"), Some(&json!(12)));
    Ok(())
}

#[tokio::test]
async fn resuming_from_missing_checkpoint_fails() {
    let mut graph = GraphBuilder::new().with_echo("A").build();
    let options = ExecuteOptions::default().with_checkpoint("nope").resuming();

    let err = with_timeout(graph.execute(json!(null), &options))
        .await
        .unwrap_err();

    match &err {
        DagError::CheckpointNotFound(id) => assert_eq!(id, "nope"),
        other => panic!("Expected CheckpointNotFound, got: {:?}", other),
    }
}
