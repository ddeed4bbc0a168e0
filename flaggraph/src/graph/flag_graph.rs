//! FlagGraph - the flags and their dependency edges
//!
//! # Design
//!
//! The graph uses a bidirectional adjacency list representation:
//! - `dependencies`: flags this flag depends on (outgoing edges)
//! - `dependents`: flags that depend on this flag (incoming edges)
//!
//! Cycle validation walks outgoing edges, the deactivation cascade walks
//! incoming ones, so both directions are kept in O(1) reach.
//!
//! The plain mutators ([`FlagGraph::add_flag`], [`FlagGraph::add_edge`])
//! only enforce local rules (unique names, no self-loop, no duplicate
//! edge). [`FlagGraph::add_dependency`] runs the cycle check first and is
//! what callers outside the engine should use.

use super::cycle;
use super::error::{GraphError, GraphResult};
use crate::core::{DependencyEdge, Flag, FlagId, FlagView};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Validates and normalises a flag name.
///
/// Surrounding whitespace is trimmed. The result must be non-empty and at
/// most `max_len` characters long.
pub fn validate_flag_name(name: &str, max_len: usize) -> GraphResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GraphError::invalid_name(name, "name may not be blank"));
    }
    if trimmed.chars().count() > max_len {
        return Err(GraphError::invalid_name(
            name,
            format!("name is longer than {} characters", max_len),
        ));
    }
    Ok(trimmed.to_string())
}

/// A flag together with its adjacency lists
#[derive(Debug, Clone)]
struct FlagNode {
    flag: Flag,
    /// Flags this one depends on (outgoing edges), in insertion order
    dependencies: Vec<FlagId>,
    /// Flags that depend on this one (incoming edges), in insertion order
    dependents: Vec<FlagId>,
}

impl FlagNode {
    fn new(flag: Flag) -> Self {
        Self {
            flag,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
    }

    fn flag(&self) -> &Flag {
        &self.flag
    }

    fn dependencies(&self) -> &[FlagId] {
        &self.dependencies
    }

    fn dependents(&self) -> &[FlagId] {
        &self.dependents
    }

    /// Number of flags this one depends on
    fn out_degree(&self) -> usize {
        self.dependencies.len()
    }
}

/// Flags and the directed "depends-on" edges between them
///
/// # Example
///
/// ```
/// use flaggraph::FlagGraph;
///
/// let mut graph = FlagGraph::new();
/// let payments = graph.add_flag("payments").unwrap();
/// let checkout = graph.add_flag("checkout").unwrap();
///
/// // checkout depends on payments
/// graph.add_dependency(checkout, payments).unwrap();
///
/// // the reverse edge would close a loop
/// assert!(graph.add_dependency(payments, checkout).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct FlagGraph {
    nodes: HashMap<FlagId, FlagNode>,
    names: HashMap<String, FlagId>,
    /// Insertion order for deterministic iteration
    insertion_order: Vec<FlagId>,
    next_id: FlagId,
}

impl Default for FlagGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagGraph {
    /// Creates a new empty graph
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            names: HashMap::new(),
            insertion_order: Vec::new(),
            next_id: FlagId::new(1),
        }
    }

    /// Rebuilds a graph from stored flags and edges.
    ///
    /// Edges are inserted without cycle validation: they were validated
    /// when first created. Use [`FlagGraph::has_cycle`] to audit the result.
    pub fn from_parts(
        flags: impl IntoIterator<Item = Flag>,
        edges: impl IntoIterator<Item = DependencyEdge>,
    ) -> GraphResult<Self> {
        let mut graph = Self::new();
        for flag in flags {
            graph.insert_flag(flag)?;
        }
        for edge in edges {
            graph.add_edge(edge.from, edge.to)?;
        }
        Ok(graph)
    }

    /// Returns the number of flags in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no flags
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the total number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(FlagNode::out_degree).sum()
    }

    /// The id the next created flag will receive
    ///
    /// `i64::MAX` is never handed out, so every flag id has a successor.
    pub fn next_id(&self) -> GraphResult<FlagId> {
        match self.next_id.next() {
            Some(_) => Ok(self.next_id),
            None => Err(GraphError::IdsExhausted { id: self.next_id }),
        }
    }

    /// Adds an active flag with a fresh id
    ///
    /// Returns an error if a flag with the same name already exists.
    pub fn add_flag(&mut self, name: impl Into<String>) -> GraphResult<FlagId> {
        let id = self.next_id()?;
        self.insert_flag(Flag::new(id, name, true, Utc::now()))?;
        Ok(id)
    }

    /// Inserts a fully built flag, keeping its id
    pub fn insert_flag(&mut self, flag: Flag) -> GraphResult<()> {
        if self.names.contains_key(flag.name()) {
            return Err(GraphError::duplicate_name(flag.name()));
        }
        let id = flag.id();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateId { id });
        }

        if id >= self.next_id {
            self.next_id = id.next().ok_or(GraphError::IdsExhausted { id })?;
        }
        self.names.insert(flag.name().to_string(), id);
        self.insertion_order.push(id);
        self.nodes.insert(id, FlagNode::new(flag));
        Ok(())
    }

    /// Adds an edge: `from` depends on `to`
    ///
    /// Does not check for cycles; see [`FlagGraph::add_dependency`].
    ///
    /// Returns an error if:
    /// - `from` and `to` are the same flag
    /// - Either flag doesn't exist
    /// - The edge already exists
    pub fn add_edge(&mut self, from: FlagId, to: FlagId) -> GraphResult<()> {
        let from_name = self.get_by_id(from)?.name().to_string();
        if from == to {
            return Err(GraphError::self_dependency(from_name));
        }
        let to_name = self.get_by_id(to)?.name().to_string();
        if self.has_edge(from, to) {
            return Err(GraphError::duplicate_edge(from_name, to_name));
        }

        if let Some(node) = self.nodes.get_mut(&from) {
            node.dependencies.push(to);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.dependents.push(from);
        }
        Ok(())
    }

    /// Adds an edge after validating it cannot create a cycle
    pub fn add_dependency(&mut self, from: FlagId, to: FlagId) -> GraphResult<()> {
        cycle::check_edge(self, from, to)?;
        self.add_edge(from, to)
    }

    /// Returns true if `from` directly depends on `to`
    pub fn has_edge(&self, from: FlagId, to: FlagId) -> bool {
        self.nodes
            .get(&from)
            .is_some_and(|node| node.dependencies.contains(&to))
    }

    /// Returns true if a flag with this id exists
    pub fn contains(&self, id: FlagId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns true if a flag with this name exists
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Resolves a flag name to its id
    pub fn id_of(&self, name: &str) -> Option<FlagId> {
        self.names.get(name).copied()
    }

    /// Looks up a flag by name
    pub fn get(&self, name: &str) -> GraphResult<&Flag> {
        self.id_of(name)
            .and_then(|id| self.nodes.get(&id))
            .map(FlagNode::flag)
            .ok_or_else(|| GraphError::flag_not_found(name))
    }

    /// Looks up a flag by id
    pub fn get_by_id(&self, id: FlagId) -> GraphResult<&Flag> {
        self.nodes
            .get(&id)
            .map(FlagNode::flag)
            .ok_or_else(|| GraphError::flag_not_found(id))
    }

    /// Ids of the flags `id` depends on; empty for unknown flags
    pub fn dependencies_of(&self, id: FlagId) -> &[FlagId] {
        self.nodes
            .get(&id)
            .map(FlagNode::dependencies)
            .unwrap_or(&[])
    }

    /// Ids of the flags depending on `id`; empty for unknown flags
    pub fn dependents_of(&self, id: FlagId) -> &[FlagId] {
        self.nodes.get(&id).map(FlagNode::dependents).unwrap_or(&[])
    }

    /// The flags `id` depends on (outgoing edges)
    pub fn outgoing(&self, id: FlagId) -> Vec<&Flag> {
        self.resolve(self.dependencies_of(id))
    }

    /// The flags depending on `id` (incoming edges)
    pub fn incoming(&self, id: FlagId) -> Vec<&Flag> {
        self.resolve(self.dependents_of(id))
    }

    fn resolve(&self, ids: &[FlagId]) -> Vec<&Flag> {
        ids.iter()
            .filter_map(|id| self.nodes.get(id))
            .map(FlagNode::flag)
            .collect()
    }

    /// Sets the active bit of a flag
    pub fn set_active(&mut self, id: FlagId, active: bool) -> GraphResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::flag_not_found(id))?;
        node.flag.set_active(active);
        Ok(())
    }

    /// Returns an iterator over all flags in insertion order
    pub fn flags(&self) -> impl Iterator<Item = &Flag> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(FlagNode::flag)
    }

    /// Returns all edges, grouped by dependent flag in insertion order
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.insertion_order
            .iter()
            .flat_map(|from| {
                self.dependencies_of(*from)
                    .iter()
                    .map(move |to| DependencyEdge::new(*from, *to))
            })
            .collect()
    }

    /// Builds the view of one flag with its neighbours' names
    pub fn view(&self, id: FlagId) -> GraphResult<FlagView> {
        let flag = self.get_by_id(id)?;
        let names = |flags: Vec<&Flag>| -> Vec<String> {
            flags.iter().map(|f| f.name().to_string()).collect()
        };
        Ok(FlagView {
            id,
            name: flag.name().to_string(),
            active: flag.is_active(),
            created_at: flag.created_at(),
            dependencies: names(self.outgoing(id)),
            dependents: names(self.incoming(id)),
        })
    }

    /// Builds views of every flag in insertion order
    pub fn views(&self) -> Vec<FlagView> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.view(*id).ok())
            .collect()
    }

    /// Detects if the graph contains a cycle using iterative DFS
    ///
    /// Uses three-color marking:
    /// - White (not visited): not in any set
    /// - Gray (visiting): in `on_stack`
    /// - Black (visited): in `visited` but not `on_stack`
    pub fn has_cycle(&self) -> bool {
        let mut visited: HashSet<FlagId> = HashSet::new();
        let mut on_stack: HashSet<FlagId> = HashSet::new();

        for &root in &self.insertion_order {
            if visited.contains(&root) {
                continue;
            }

            // Each frame is a node plus the index of the next edge to follow
            let mut stack: Vec<(FlagId, usize)> = vec![(root, 0)];
            visited.insert(root);
            on_stack.insert(root);

            while let Some((node, next)) = stack.last_mut() {
                let node = *node;
                let deps = self.dependencies_of(node);
                if *next >= deps.len() {
                    on_stack.remove(&node);
                    stack.pop();
                    continue;
                }

                let child = deps[*next];
                *next += 1;
                if on_stack.contains(&child) {
                    // Back edge found - cycle detected
                    return true;
                }
                if visited.insert(child) {
                    on_stack.insert(child);
                    stack.push((child, 0));
                }
            }
        }

        false
    }
}
