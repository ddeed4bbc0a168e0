//! Cycle validation for new dependency edges
//!
//! Both call shapes reduce to one question: starting from the flag that is
//! about to become a dependency, can the dependent flag be reached by
//! following existing "depends-on" edges? If so, the new edge would close a
//! loop.
//!
//! - [`check_edge`]: a single edge between two existing flags
//! - [`check_new_flag`]: a flag that does not exist yet plus its initial
//!   dependency list
//!
//! The search keeps its visited set on the stack of the call, so it
//! terminates on any input and never needs exclusive access to the graph.

use super::error::{GraphError, GraphResult};
use super::FlagGraph;
use crate::core::{Flag, FlagId};
use std::collections::{HashMap, HashSet};

/// Depth-first search along outgoing edges from `start`.
///
/// Returns the path `start, .., target` to the first flag matching
/// `is_target`, or `None` when no such flag is reachable. `start` itself is
/// tested as well.
pub fn find_path<F>(graph: &FlagGraph, start: FlagId, mut is_target: F) -> Option<Vec<FlagId>>
where
    F: FnMut(&Flag) -> bool,
{
    let mut visited: HashSet<FlagId> = HashSet::new();
    // Node -> the node we reached it from, for path reconstruction
    let mut parent: HashMap<FlagId, FlagId> = HashMap::new();
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        let Ok(flag) = graph.get_by_id(node) else {
            continue;
        };
        if is_target(flag) {
            let mut path = vec![node];
            let mut current = node;
            while let Some(&prev) = parent.get(&current) {
                path.push(prev);
                current = prev;
            }
            path.reverse();
            return Some(path);
        }

        // Reverse so the first dependency is explored first
        for &dep in graph.dependencies_of(node).iter().rev() {
            if !visited.contains(&dep) {
                parent.entry(dep).or_insert(node);
                stack.push(dep);
            }
        }
    }

    None
}

/// Validates the edge `from` depends on `to` without mutating the graph.
///
/// Checks, in order: self-dependency, both flags exist, the edge is new,
/// and `from` is not already reachable from `to`.
pub fn check_edge(graph: &FlagGraph, from: FlagId, to: FlagId) -> GraphResult<()> {
    let from_flag = graph.get_by_id(from)?;
    if from == to {
        return Err(GraphError::self_dependency(from_flag.name()));
    }
    let to_flag = graph.get_by_id(to)?;
    if graph.has_edge(from, to) {
        return Err(GraphError::duplicate_edge(from_flag.name(), to_flag.name()));
    }

    if let Some(path) = find_path(graph, to, |flag| flag.id() == from) {
        let mut names = vec![from_flag.name().to_string()];
        names.extend(path_names(graph, &path));
        return Err(GraphError::cycle(names.join(" -> ")));
    }

    Ok(())
}

/// Validates the initial dependencies of a flag that is about to be created.
///
/// The new flag is not part of the graph, so it can only show up as a
/// search target, matched by name. Returns the resolved dependency ids in
/// the order given.
///
/// Per dependency, in order:
/// - naming the new flag itself is a cycle
/// - the dependency must exist
/// - it must not be listed twice
/// - the new flag's name must not be reachable from it
pub fn check_new_flag(
    graph: &FlagGraph,
    name: &str,
    dependency_names: &[String],
) -> GraphResult<Vec<FlagId>> {
    let mut resolved = Vec::with_capacity(dependency_names.len());

    for dep_name in dependency_names {
        if dep_name == name {
            return Err(GraphError::cycle(format!("{} -> {}", name, name)));
        }
        let dep = graph
            .id_of(dep_name)
            .ok_or_else(|| GraphError::unknown_dependency(name, dep_name.as_str()))?;
        if resolved.contains(&dep) {
            return Err(GraphError::duplicate_edge(name, dep_name.as_str()));
        }

        if let Some(path) = find_path(graph, dep, |flag| flag.name() == name) {
            let mut names = vec![name.to_string()];
            names.extend(path_names(graph, &path));
            return Err(GraphError::cycle(names.join(" -> ")));
        }

        resolved.push(dep);
    }

    Ok(resolved)
}

fn path_names(graph: &FlagGraph, path: &[FlagId]) -> Vec<String> {
    path.iter()
        .map(|id| match graph.get_by_id(*id) {
            Ok(flag) => flag.name().to_string(),
            Err(_) => id.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// a -> b -> c, plus d on its own
    fn chain() -> (FlagGraph, [FlagId; 4]) {
        let mut graph = FlagGraph::new();
        let a = graph.add_flag("a").unwrap();
        let b = graph.add_flag("b").unwrap();
        let c = graph.add_flag("c").unwrap();
        let d = graph.add_flag("d").unwrap();
        graph.add_edge(a, b).unwrap();
        graph.add_edge(b, c).unwrap();
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_find_path_follows_dependencies() {
        let (graph, [a, b, c, d]) = chain();
        assert_eq!(find_path(&graph, a, |f| f.id() == c), Some(vec![a, b, c]));
        assert_eq!(find_path(&graph, c, |f| f.id() == a), None);
        assert_eq!(find_path(&graph, d, |f| f.id() == a), None);
        assert_eq!(find_path(&graph, b, |f| f.id() == b), Some(vec![b]));
    }

    #[test]
    fn test_reverse_edge_is_cycle() {
        let (graph, [a, b, _, _]) = chain();
        let err = check_edge(&graph, b, a).unwrap_err();
        assert_eq!(err, GraphError::cycle("b -> a -> b"));
    }

    #[test]
    fn test_transitive_cycle_reports_path() {
        let (graph, [a, _, c, _]) = chain();
        let err = check_edge(&graph, c, a).unwrap_err();
        assert_eq!(err, GraphError::cycle("c -> a -> b -> c"));
    }

    #[test]
    fn test_self_dependency_checked_before_search() {
        let (mut graph, [a, b, _, _]) = chain();
        // Corrupt the graph so a search from a would never find a fresh path
        graph.add_edge(b, a).unwrap();
        let err = check_edge(&graph, a, a).unwrap_err();
        assert!(matches!(err, GraphError::SelfDependency { flag } if flag == "a"));
    }

    #[test]
    fn test_valid_edges_pass() {
        let (graph, [a, _, c, d]) = chain();
        assert!(check_edge(&graph, a, c).is_ok());
        assert!(check_edge(&graph, d, a).is_ok());
        assert!(check_edge(&graph, c, d).is_ok());
    }

    #[test]
    fn test_duplicate_edge() {
        let (graph, [a, b, _, _]) = chain();
        assert!(matches!(
            check_edge(&graph, a, b),
            Err(GraphError::DuplicateEdge { .. })
        ));
    }

    #[test]
    fn test_search_terminates_on_corrupt_graph() {
        let (mut graph, [a, _, c, d]) = chain();
        graph.add_edge(c, a).unwrap();
        assert_eq!(find_path(&graph, a, |f| f.id() == d), None);
    }

    #[test]
    fn test_new_flag_dependencies_resolved_in_order() {
        let (graph, [_, b, c, _]) = chain();
        let deps = vec!["c".to_string(), "b".to_string()];
        assert_eq!(check_new_flag(&graph, "e", &deps).unwrap(), vec![c, b]);
    }

    #[test]
    fn test_new_flag_with_existing_name_in_subtree() {
        let (graph, _) = chain();
        // "c" already exists and a reaches it
        let err = check_new_flag(&graph, "c", &["a".to_string()]).unwrap_err();
        assert_eq!(err, GraphError::cycle("c -> a -> b -> c"));
    }

    #[test]
    fn test_new_flag_rejects_bad_dependency_lists() {
        let (graph, _) = chain();
        assert!(matches!(
            check_new_flag(&graph, "e", &["zzz".to_string()]),
            Err(GraphError::UnknownDependency { .. })
        ));
        assert!(matches!(
            check_new_flag(&graph, "e", &["a".to_string(), "a".to_string()]),
            Err(GraphError::DuplicateEdge { .. })
        ));
        assert!(matches!(
            check_new_flag(&graph, "e", &["e".to_string()]),
            Err(GraphError::CycleDetected { .. })
        ));
    }
}
