//! Property tests for the dependency graph
//!
//! Random sequences of edge insertions must leave the graph acyclic, and
//! a rejection must mean the edge really would have closed a loop. The
//! cascade from any flag must reach exactly its transitive dependents.

use flaggraph::graph::{cascade_deactivation, FlagGraph, GraphError};
use flaggraph::FlagId;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

const MAX_FLAGS: usize = 10;

fn graph_with(count: usize) -> (FlagGraph, Vec<FlagId>) {
    let mut graph = FlagGraph::new();
    let ids = (0..count)
        .map(|i| {
            graph
                .add_flag(format!("f{i}"))
                .unwrap_or_else(|e| panic!("add flag failed: {e}"))
        })
        .collect();
    (graph, ids)
}

/// Reference reachability along outgoing edges, written independently of
/// the graph's own search.
fn reaches(graph: &FlagGraph, from: FlagId, to: FlagId) -> bool {
    let mut seen = HashSet::new();
    let mut queue = vec![from];
    while let Some(node) = queue.pop() {
        if node == to {
            return true;
        }
        if seen.insert(node) {
            queue.extend_from_slice(graph.dependencies_of(node));
        }
    }
    false
}

fn edges_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..=MAX_FLAGS).prop_flat_map(|count| {
        (
            Just(count),
            prop::collection::vec((0..count, 0..count), 0..40),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn successful_insertions_never_form_a_cycle((count, edges) in edges_strategy()) {
        let (mut graph, ids) = graph_with(count);

        for (from, to) in edges {
            let (from, to) = (ids[from], ids[to]);
            let had_edge = graph.has_edge(from, to);
            let would_loop = from != to && reaches(&graph, to, from);

            match graph.add_dependency(from, to) {
                Ok(()) => {
                    prop_assert!(!would_loop);
                    prop_assert!(graph.has_edge(from, to));
                }
                Err(GraphError::SelfDependency { .. }) => prop_assert_eq!(from, to),
                Err(GraphError::DuplicateEdge { .. }) => prop_assert!(had_edge),
                Err(GraphError::CycleDetected { .. }) => {
                    prop_assert!(would_loop);
                    prop_assert!(!graph.has_edge(from, to));
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }

            prop_assert!(!graph.has_cycle());
        }
    }

    #[test]
    fn cascade_reaches_exactly_the_transitive_dependents(
        (count, edges) in edges_strategy(),
        root in 0..MAX_FLAGS,
    ) {
        let (mut graph, ids) = graph_with(count);
        for (from, to) in edges {
            let _ = graph.add_dependency(ids[from], ids[to]);
        }
        let root = ids[root % count];

        let plan = cascade_deactivation(&graph, root);
        let reached: Vec<FlagId> = plan.iter().map(|step| step.flag).collect();
        let unique: BTreeSet<FlagId> = reached.iter().copied().collect();
        prop_assert_eq!(unique.len(), reached.len());

        let expected: BTreeSet<FlagId> = ids
            .iter()
            .copied()
            .filter(|&id| id != root && reaches(&graph, id, root))
            .collect();
        prop_assert_eq!(unique, expected);

        // Every cause is either the root or a flag disabled earlier
        let mut disabled = HashSet::from([root]);
        for step in &plan {
            prop_assert!(disabled.contains(&step.cause));
            prop_assert!(graph.has_edge(step.flag, step.cause));
            disabled.insert(step.flag);
        }
    }
}
