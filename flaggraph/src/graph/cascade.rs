//! Deactivation cascade
//!
//! When a flag goes inactive, every flag that depends on it (directly or
//! transitively) must follow. [`cascade_deactivation`] computes that set
//! without touching the graph; the engine turns each [`Deactivation`] into a
//! state change and an `auto_disable` audit entry.
//!
//! The walk is an explicit stack in depth-first pre-order, so the order of
//! the result matches a recursive "disable, then recurse into its
//! dependents" traversal without its stack depth. Already-inactive
//! dependents are neither disabled again nor descended into.

use super::FlagGraph;
use crate::core::FlagId;
use std::collections::HashSet;

/// One flag switched off by a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deactivation {
    /// The dependent being disabled.
    pub flag: FlagId,
    /// The dependency whose deactivation reached it.
    pub cause: FlagId,
}

/// Lists the active dependents of `root` that must be disabled, in the
/// order they are reached. Each flag appears at most once and `root` never
/// appears, even if the graph were to contain a cycle.
pub fn cascade_deactivation(graph: &FlagGraph, root: FlagId) -> Vec<Deactivation> {
    let mut disabled = Vec::new();
    let mut visited: HashSet<FlagId> = HashSet::from([root]);
    let mut stack: Vec<Deactivation> = dependents_frame(graph, root);

    while let Some(step) = stack.pop() {
        if !visited.insert(step.flag) {
            continue;
        }
        let active = graph
            .get_by_id(step.flag)
            .map(|flag| flag.is_active())
            .unwrap_or(false);
        if !active {
            continue;
        }

        disabled.push(step);
        stack.extend(dependents_frame(graph, step.flag));
    }

    disabled
}

/// Direct dependents of `cause`, reversed so the first one is popped first.
fn dependents_frame(graph: &FlagGraph, cause: FlagId) -> Vec<Deactivation> {
    graph
        .dependents_of(cause)
        .iter()
        .rev()
        .map(|&flag| Deactivation { flag, cause })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(graph: &[Deactivation]) -> Vec<FlagId> {
        graph.iter().map(|d| d.flag).collect()
    }

    #[test]
    fn test_chain_cascades_in_order() {
        // a -> b -> c
        let mut graph = FlagGraph::new();
        let a = graph.add_flag("a").unwrap();
        let b = graph.add_flag("b").unwrap();
        let c = graph.add_flag("c").unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, c).unwrap();

        let plan = cascade_deactivation(&graph, c);
        assert_eq!(
            plan,
            vec![
                Deactivation { flag: b, cause: c },
                Deactivation { flag: a, cause: b },
            ]
        );
    }

    #[test]
    fn test_diamond_visits_each_flag_once() {
        // top depends on left and right, both depend on base
        let mut graph = FlagGraph::new();
        let base = graph.add_flag("base").unwrap();
        let left = graph.add_flag("left").unwrap();
        let right = graph.add_flag("right").unwrap();
        let top = graph.add_flag("top").unwrap();
        graph.add_dependency(left, base).unwrap();
        graph.add_dependency(right, base).unwrap();
        graph.add_dependency(top, left).unwrap();
        graph.add_dependency(top, right).unwrap();

        let plan = cascade_deactivation(&graph, base);
        assert_eq!(flags(&plan), vec![left, top, right]);
        assert_eq!(plan[1].cause, left);
    }

    #[test]
    fn test_inactive_dependents_are_skipped() {
        // a -> b -> c, b already inactive
        let mut graph = FlagGraph::new();
        let a = graph.add_flag("a").unwrap();
        let b = graph.add_flag("b").unwrap();
        let c = graph.add_flag("c").unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, c).unwrap();
        graph.set_active(b, false).unwrap();

        assert!(cascade_deactivation(&graph, c).is_empty());
    }

    #[test]
    fn test_unrelated_flags_untouched() {
        let mut graph = FlagGraph::new();
        let a = graph.add_flag("a").unwrap();
        let b = graph.add_flag("b").unwrap();
        let other = graph.add_flag("other").unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, other).unwrap();

        // disabling a affects nothing: nobody depends on it
        assert!(cascade_deactivation(&graph, a).is_empty());
        assert_eq!(flags(&cascade_deactivation(&graph, b)), vec![a]);
    }

    #[test]
    fn test_terminates_on_corrupt_cycle() {
        let mut graph = FlagGraph::new();
        let a = graph.add_flag("a").unwrap();
        let b = graph.add_flag("b").unwrap();
        let c = graph.add_flag("c").unwrap();
        graph.add_edge(a, b).unwrap();
        graph.add_edge(b, c).unwrap();
        graph.add_edge(c, a).unwrap();

        let plan = cascade_deactivation(&graph, c);
        assert_eq!(flags(&plan), vec![b, a]);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut graph = FlagGraph::new();
        let root = graph.add_flag("f0").unwrap();
        let mut prev = root;
        for i in 1..50_000 {
            let id = graph.add_flag(format!("f{}", i)).unwrap();
            graph.add_edge(id, prev).unwrap();
            prev = id;
        }

        assert_eq!(cascade_deactivation(&graph, root).len(), 49_999);
    }
}
