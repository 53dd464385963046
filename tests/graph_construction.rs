// tests/graph_construction.rs

use std::error::Error;

use dagrun::{DagError, Graph};
use dagrun_test_utils::init_tracing;
use dagrun_test_utils::work::echo;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn add_node_rejects_duplicate_ids() -> TestResult {
    init_tracing();

    let mut graph = Graph::new();
    graph.add_node("A", echo())?;

    match graph.add_node("A", echo()) {
        Err(DagError::DuplicateNode(id)) => assert_eq!(id, "A"),
        other => panic!("Expected DuplicateNode, got: {:?}", other),
    }
    assert_eq!(graph.len(), 1);
    Ok(())
}

#[test]
fn connect_rejects_unknown_ids() -> TestResult {
    let mut graph = Graph::new();
    graph.add_node("A", echo())?;

    match graph.connect("A", "missing") {
        Err(DagError::UnknownNode(id)) => assert_eq!(id, "missing"),
        other => panic!("Expected UnknownNode, got: {:?}", other),
    }
    match graph.connect("ghost", "A") {
        Err(DagError::UnknownNode(id)) => assert_eq!(id, "ghost"),
        other => panic!("Expected UnknownNode, got: {:?}", other),
    }
    assert!(graph.outputs_of("A").is_empty());
    Ok(())
}

#[test]
fn connect_is_bidirectional_and_idempotent() -> TestResult {
    let mut graph = Graph::new();
    graph.add_node("A", echo())?;
    graph.add_node("B", echo())?;

    graph.connect("A", "B")?;
    graph.connect("A", "B")?;

    assert_eq!(graph.outputs_of("A"), vec!["B"]);
    assert_eq!(graph.inputs_of("B"), vec!["A"]);
    assert!(graph.inputs_of("A").is_empty());
    assert!(graph.outputs_of("B").is_empty());
    Ok(())
}

#[test]
fn index_level_edge_helpers_keep_both_sides_in_sync() -> TestResult {
    let mut graph = Graph::new();
    let a = graph.add_node("A", echo())?;
    let b = graph.add_node("B", echo())?;
    let c = graph.add_node("C", echo())?;

    graph.add_output(a, b)?;
    graph.add_input(c, b)?;
    graph.add_input(c, b)?;

    assert_eq!(graph.node("A").unwrap().outputs(), &[b]);
    assert_eq!(graph.node("B").unwrap().inputs(), &[a]);
    assert_eq!(graph.node("B").unwrap().outputs(), &[c]);
    assert_eq!(graph.node("C").unwrap().inputs(), &[b]);

    assert!(graph.remove_input(c, b)?);
    assert!(graph.node("B").unwrap().outputs().is_empty());
    assert!(graph.node("C").unwrap().inputs().is_empty());

    // Removing again is a no-op.
    assert!(!graph.remove_output(b, c)?);

    assert!(graph.remove_output(a, b)?);
    assert!(graph.node("A").unwrap().outputs().is_empty());
    assert!(graph.node("B").unwrap().inputs().is_empty());
    Ok(())
}

#[test]
fn disconnect_removes_edge_by_id() -> TestResult {
    let mut graph = Graph::new();
    graph.add_node("A", echo())?;
    graph.add_node("B", echo())?;
    graph.connect("A", "B")?;

    assert!(graph.disconnect("A", "B")?);
    assert!(!graph.disconnect("A", "B")?);
    assert!(graph.outputs_of("A").is_empty());
    assert!(graph.inputs_of("B").is_empty());
    Ok(())
}

#[test]
fn sources_and_sinks_follow_adjacency() -> TestResult {
    let mut graph = Graph::new();
    for id in ["load", "embed", "retrieve", "rerank"] {
        graph.add_node(id, echo())?;
    }
    graph.connect("load", "embed")?;
    graph.connect("load", "retrieve")?;
    graph.connect("embed", "rerank")?;

    assert_eq!(graph.sources(), vec!["load"]);
    assert_eq!(graph.sinks(), vec!["retrieve", "rerank"]);
    assert_eq!(
        graph.node_ids().collect::<Vec<_>>(),
        vec!["load", "embed", "retrieve", "rerank"]
    );
    Ok(())
}
